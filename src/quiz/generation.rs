use std::sync::Arc;
use std::time::{Duration, Instant};

use teloxide::types::ChatId;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::delivery::{dispatch_quizzes, QuizTransport};
use super::parser::parse_quiz_blocks;
use super::prompt::build_quiz_prompt;
use super::{QuizQuestion, QuizRequest};
use crate::context::QuizContext;
use crate::llm::{GenerateQuiz, LlmError};
use crate::state::QuizState;
use crate::UserDialogue;

const MORE_PROMPT: &str = "Want another one? Pick a new subject or press /generate:";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("the model did not answer within {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error("generation was cancelled")]
    Cancelled,
    #[error("the model reply contained no usable questions")]
    NoQuestions,
}

impl GenerationError {
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::NoQuestions => "Generation failed. Please try again.".to_owned(),
            other => format!("Generation error: {}", other),
        }
    }
}

/// Asks the model for a batch and parses it. Bounded by `timeout` and `cancel`.
pub async fn request_quiz<G: GenerateQuiz + ?Sized>(
    generator: &G,
    topic: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<QuizQuestion>, GenerationError> {
    let prompt = build_quiz_prompt(topic);

    let reply = tokio::select! {
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        reply = tokio::time::timeout(timeout, generator.generate_quiz_text(&prompt)) => match reply {
            Ok(reply) => reply.map_err(GenerationError::from),
            Err(_) => Err(GenerationError::Timeout(timeout)),
        },
    }?;

    let questions = parse_quiz_blocks(&reply);
    if questions.is_empty() {
        return Err(GenerationError::NoQuestions);
    }
    Ok(questions)
}

async fn notify<T: QuizTransport + ?Sized>(transport: &T, chat_id: ChatId, text: &str) {
    if let Err(e) = transport.send_text(chat_id, text).await {
        tracing::warn!(error = %e, "failed to notify user");
    }
}

/// Background half of a quiz request: generate, deliver, then hand the
/// dialogue back as `Idle` whatever happened.
#[instrument(
    level = "info",
    skip_all,
    fields(request = %request.id, user = request.user_id.0, topic = %request.topic)
)]
pub async fn run_generation<G, T>(
    request: QuizRequest,
    generator: Arc<G>,
    transport: T,
    ctx: QuizContext,
    dialogue: UserDialogue,
) where
    G: GenerateQuiz + ?Sized,
    T: QuizTransport,
{
    let cancel = ctx.shutdown.child_token();
    let started = Instant::now();
    tracing::info!("Generating quiz");

    match request_quiz(&*generator, &request.topic, ctx.generation_timeout, &cancel).await {
        Ok(questions) => {
            let elapsed = started.elapsed().as_secs_f32();
            if let Err(e) = dialogue
                .update(QuizState::Delivering {
                    topic: request.topic.clone(),
                })
                .await
            {
                tracing::warn!(error = %e, "failed to update dialogue");
            }

            notify(
                &transport,
                request.chat_id,
                &format!("✅ Quiz generated in {:.1} s.\nSending the questions now...", elapsed),
            )
            .await;

            let report = dispatch_quizzes(
                &transport,
                &ctx.usage,
                request.chat_id,
                request.user_id,
                &questions,
            )
            .await;
            tracing::info!(delivered = report.delivered, failed = report.failed, "Quiz batch sent");

            if report.delivered == 0 {
                notify(
                    &transport,
                    request.chat_id,
                    "Couldn't send the questions. Please try again.",
                )
                .await;
            }

            if let Err(e) = transport.send_subject_menu(request.chat_id, MORE_PROMPT).await {
                tracing::warn!(error = %e, "failed to offer another quiz");
            }
        }
        Err(e) => {
            match &e {
                GenerationError::NoQuestions => tracing::warn!("Model reply had no valid blocks"),
                other => tracing::error!(error = %other, "Quiz generation failed"),
            }
            notify(&transport, request.chat_id, &e.user_message()).await;
        }
    }

    if let Err(e) = dialogue.update(QuizState::Idle).await {
        tracing::error!(error = %e, "failed to reset dialogue");
    }
}

pub fn spawn_generation<G, T>(
    request: QuizRequest,
    generator: Arc<G>,
    transport: T,
    ctx: QuizContext,
    dialogue: UserDialogue,
) -> JoinHandle<()>
where
    G: GenerateQuiz + ?Sized + 'static,
    T: QuizTransport + 'static,
{
    tokio::spawn(run_generation(request, generator, transport, ctx, dialogue))
}
