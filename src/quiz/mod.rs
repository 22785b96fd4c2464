use teloxide::types::{ChatId, UserId};
use uuid::Uuid;

pub mod delivery;
pub mod generation;
pub mod parser;
pub mod prompt;

pub use delivery::{dispatch_quizzes, DeliveryReport, QuizTransport};
pub use parser::{parse_quiz_blocks, parse_quiz_blocks_with, BlockOutcome, SkipReason};

/// One multiple-choice question ready to be sent as a quiz poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option_id: usize,
}

impl QuizQuestion {
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_option_id]
    }
}

/// A single "make me a quiz about X" request.
#[derive(Debug, Clone)]
pub struct QuizRequest {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub topic: String,
}

impl QuizRequest {
    pub fn new(chat_id: ChatId, user_id: UserId, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            user_id,
            topic: topic.into(),
        }
    }
}
