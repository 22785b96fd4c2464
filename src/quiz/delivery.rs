use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::payloads::{SendMessageSetters, SendPollSetters};
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, PollType, UserId};
use teloxide::Bot;
use tracing::instrument;

use super::QuizQuestion;
use crate::context::UsageCounters;
use crate::keyboard::subjects_keyboard;

pub type TransportError = Box<dyn Error + Send + Sync>;

/// Outbound side of the chat used by the generation task.
#[async_trait]
pub trait QuizTransport: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;

    async fn send_quiz_poll(
        &self,
        chat_id: ChatId,
        question: &QuizQuestion,
    ) -> Result<(), TransportError>;

    /// Offers the subject picker again after a batch.
    async fn send_subject_menu(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;
}

#[async_trait]
impl QuizTransport for Bot {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn send_quiz_poll(
        &self,
        chat_id: ChatId,
        question: &QuizQuestion,
    ) -> Result<(), TransportError> {
        let correct_option_id = u8::try_from(question.correct_option_id)?;
        self.send_poll(chat_id, question.question.clone(), question.options.iter().cloned())
            .type_(PollType::Quiz)
            .correct_option_id(correct_option_id)
            .is_anonymous(false)
            .await?;
        Ok(())
    }

    async fn send_subject_menu(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.send_message(chat_id, text)
            .reply_markup(subjects_keyboard())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<T: QuizTransport + ?Sized> QuizTransport for Arc<T> {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        (**self).send_text(chat_id, text).await
    }

    async fn send_quiz_poll(
        &self,
        chat_id: ChatId,
        question: &QuizQuestion,
    ) -> Result<(), TransportError> {
        (**self).send_quiz_poll(chat_id, question).await
    }

    async fn send_subject_menu(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        (**self).send_subject_menu(chat_id, text).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends every question as a quiz poll, one at a time and in order.
///
/// A failed send is logged and skipped. The user's usage counter goes up once,
/// on the first poll that actually reaches the chat.
#[instrument(level = "info", skip(transport, usage, questions), fields(count = questions.len()))]
pub async fn dispatch_quizzes<T: QuizTransport + ?Sized>(
    transport: &T,
    usage: &UsageCounters,
    chat_id: ChatId,
    user_id: UserId,
    questions: &[QuizQuestion],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for (idx, question) in questions.iter().enumerate() {
        match transport.send_quiz_poll(chat_id, question).await {
            Ok(()) => {
                if report.delivered == 0 {
                    usage.increment(user_id);
                }
                report.delivered += 1;
            }
            Err(e) => {
                tracing::warn!(question = idx + 1, error = %e, "failed to send quiz poll");
                report.failed += 1;
            }
        }
    }

    report
}
