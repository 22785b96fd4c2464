use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

pub const SUBJECTS: [&str; 5] = [
    "Russian language",
    "Mathematics",
    "Computer science",
    "Python",
    "English language",
];

pub const LEVELS: [&str; 3] = ["Easy", "Medium", "Hard"];

const SUBJECT_PREFIX: &str = "subject";
const LEVEL_PREFIX: &str = "level";
const MANUAL_DATA: &str = "manual";

/// What an inline button press asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Subject(String),
    Level(String),
    Manual,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == MANUAL_DATA {
            return Some(CallbackAction::Manual);
        }

        let (prefix, value) = data.split_once(':')?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        match prefix {
            SUBJECT_PREFIX => Some(CallbackAction::Subject(value.to_owned())),
            LEVEL_PREFIX => Some(CallbackAction::Level(value.to_owned())),
            _ => None,
        }
    }

    pub fn data(&self) -> String {
        match self {
            CallbackAction::Subject(subject) => format!("{}:{}", SUBJECT_PREFIX, subject),
            CallbackAction::Level(level) => format!("{}:{}", LEVEL_PREFIX, level),
            CallbackAction::Manual => MANUAL_DATA.to_owned(),
        }
    }
}

pub fn topic_for(subject: &str, level: &str) -> String {
    format!("{} ({} difficulty)", subject, level)
}

pub fn subjects_keyboard() -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = SUBJECTS
        .chunks(2)
        .map(|row| {
            row.iter()
                .map(|subject| {
                    InlineKeyboardButton::callback(
                        *subject,
                        CallbackAction::Subject(subject.to_string()).data(),
                    )
                })
                .collect()
        })
        .collect();

    keyboard.push(vec![InlineKeyboardButton::callback(
        "Enter my own topic✏️",
        CallbackAction::Manual.data(),
    )]);

    InlineKeyboardMarkup::new(keyboard)
}

pub fn levels_keyboard() -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = LEVELS
        .iter()
        .map(|level| InlineKeyboardButton::callback(*level, CallbackAction::Level(level.to_string()).data()))
        .collect();

    InlineKeyboardMarkup::new(vec![row])
}
