/// Per-chat request lifecycle:
/// `Idle -> AwaitingTopic | ChoosingLevel -> Generating -> Delivering -> Idle`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuizState {
    #[default]
    Idle,
    // the next free-text message is the quiz topic
    AwaitingTopic,
    ChoosingLevel {
        subject: String,
    },
    Generating {
        topic: String,
    },
    Delivering {
        topic: String,
    },
}

impl QuizState {
    /// A generation task owns the dialogue until it hands it back as `Idle`.
    pub fn is_busy(&self) -> bool {
        matches!(self, QuizState::Generating { .. } | QuizState::Delivering { .. })
    }
}
