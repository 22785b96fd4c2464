use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{EditMessageTextSetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, UserId},
    Bot,
};
use tracing::instrument;

use crate::{
    access::{gate_request, is_entitled, Gate},
    context::QuizContext,
    database::connection::RetrieveUser,
    keyboard::{levels_keyboard, topic_for, CallbackAction},
    llm::GenerateQuiz,
    quiz::{delivery::TransportError, generation::spawn_generation, QuizRequest, QuizTransport},
    state::QuizState,
    HandlerResult, UserDialogue,
};

pub(crate) const BUSY_TEXT: &str = "Your quiz is still being prepared, please wait.";
const MANUAL_TOPIC_PROMPT: &str = "Enter a topic and difficulty, for example:\nHistory of Rome (Medium)";

pub(crate) fn denial_text(ctx: &QuizContext) -> String {
    match &ctx.support_contact {
        Some(contact) => format!("Access is by subscription only. Contact {}", contact),
        None => "Access is by subscription only.".to_owned(),
    }
}

/// Replies to a denied or busy request. `true` means the caller may go on.
pub(crate) async fn admit<T, R>(
    transport: &T,
    chat_id: ChatId,
    user_id: UserId,
    state: &QuizState,
    registry: &R,
    ctx: &QuizContext,
) -> Result<bool, TransportError>
where
    T: QuizTransport + ?Sized,
    R: RetrieveUser + ?Sized,
{
    match gate_request(registry, ctx, user_id, state).await {
        Gate::Open => Ok(true),
        Gate::Denied => {
            tracing::info!(user = user_id.0, "Access denied");
            transport.send_text(chat_id, &denial_text(ctx)).await?;
            Ok(false)
        }
        Gate::Busy => {
            transport.send_text(chat_id, BUSY_TEXT).await?;
            Ok(false)
        }
    }
}

/// Puts the chat into `AwaitingTopic`, shared by `/generate` and the button.
pub(crate) async fn begin_manual_topic<T, R>(
    transport: &T,
    chat_id: ChatId,
    user_id: UserId,
    dialogue: &UserDialogue,
    state: &QuizState,
    registry: &R,
    ctx: &QuizContext,
) -> HandlerResult
where
    T: QuizTransport + ?Sized,
    R: RetrieveUser + ?Sized,
{
    if !admit(transport, chat_id, user_id, state, registry, ctx).await? {
        return Ok(());
    }

    tracing::info!(user = user_id.0, "User chose to enter a topic manually");
    transport.send_text(chat_id, MANUAL_TOPIC_PROMPT).await?;
    dialogue.update(QuizState::AwaitingTopic).await?;
    Ok(())
}

async fn start_generation<G: GenerateQuiz + 'static>(
    bot: &Bot,
    dialogue: &UserDialogue,
    generator: Arc<G>,
    ctx: &QuizContext,
    chat_id: ChatId,
    user_id: UserId,
    topic: String,
) -> HandlerResult {
    dialogue
        .update(QuizState::Generating {
            topic: topic.clone(),
        })
        .await?;

    let request = QuizRequest::new(chat_id, user_id, topic);
    tracing::info!(request = %request.id, user = user_id.0, topic = %request.topic, "Starting quiz generation");
    spawn_generation(request, generator, bot.clone(), ctx.clone(), dialogue.clone());
    Ok(())
}

#[instrument(level = "info", skip_all, fields(chat = msg.chat.id.0))]
pub(crate) async fn receive_topic<R, G>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    registry: Arc<R>,
    generator: Arc<G>,
    ctx: QuizContext,
) -> HandlerResult
where
    R: RetrieveUser,
    G: GenerateQuiz + 'static,
{
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    match msg.text().map(str::trim) {
        None | Some("") => {
            bot.send_message(msg.chat.id, "Please send the topic as text.")
                .await?;
        }
        Some(text) if text.starts_with('/') => {
            bot.send_message(
                msg.chat.id,
                "Unknown command. Send the topic as plain text or press /cancel.",
            )
            .await?;
        }
        Some(topic) => {
            if !is_entitled(&*registry, ctx.admin, user.id).await {
                bot.send_message(msg.chat.id, denial_text(&ctx)).await?;
                dialogue.update(QuizState::Idle).await?;
                return Ok(());
            }

            tracing::info!(user = user.id.0, %topic, "User entered a topic");
            bot.send_message(msg.chat.id, format!("Generating a quiz on: {}...", topic))
                .await?;
            start_generation(
                &bot,
                &dialogue,
                generator,
                &ctx,
                msg.chat.id,
                user.id,
                topic.to_owned(),
            )
            .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip_all, fields(user = q.from.id.0, data = ?q.data))]
pub(crate) async fn handle_callback<R, G>(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    state: QuizState,
    registry: Arc<R>,
    generator: Arc<G>,
    ctx: QuizContext,
) -> HandlerResult
where
    R: RetrieveUser,
    G: GenerateQuiz + 'static,
{
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(chat_id) = q.chat_id() else {
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        tracing::warn!("Unrecognized callback data");
        return Ok(());
    };
    let user_id = q.from.id;

    if action == CallbackAction::Manual {
        return begin_manual_topic(&bot, chat_id, user_id, &dialogue, &state, &*registry, &ctx).await;
    }

    if !admit(&bot, chat_id, user_id, &state, &*registry, &ctx).await? {
        return Ok(());
    }

    match action {
        CallbackAction::Subject(subject) => {
            let text = format!("Subject: {}\nChoose the difficulty:", subject);
            match &q.message {
                Some(message) => {
                    bot.edit_message_text(chat_id, message.id(), text)
                        .reply_markup(levels_keyboard())
                        .await?;
                }
                None => {
                    bot.send_message(chat_id, text)
                        .reply_markup(levels_keyboard())
                        .await?;
                }
            }
            dialogue.update(QuizState::ChoosingLevel { subject }).await?;
        }
        CallbackAction::Level(level) => {
            let QuizState::ChoosingLevel { subject } = state else {
                bot.send_message(chat_id, "Something went wrong. Start over: /start")
                    .await?;
                return Ok(());
            };

            let topic = topic_for(&subject, &level);
            tracing::info!(user = user_id.0, %subject, %level, "User chose subject and level");
            let text = format!("Generating a quiz on: {}...", topic);
            match &q.message {
                Some(message) => {
                    bot.edit_message_text(chat_id, message.id(), text).await?;
                }
                None => {
                    bot.send_message(chat_id, text).await?;
                }
            }
            start_generation(&bot, &dialogue, generator, &ctx, chat_id, user_id, topic).await?;
        }
        CallbackAction::Manual => {}
    }

    Ok(())
}

/// Messages that arrive outside `AwaitingTopic`.
#[instrument(level = "info", skip_all, fields(chat = msg.chat.id.0))]
pub(crate) async fn unexpected_message(bot: Bot, msg: Message, state: QuizState) -> HandlerResult {
    tracing::info!(state = ?state, "unexpected input '{:?}'", msg.text());

    let reply = if state.is_busy() {
        BUSY_TEXT
    } else if msg.text().is_some_and(|text| text.starts_with('/')) {
        "Unable to handle the command. Enter /help to see usages."
    } else {
        "To enter a topic, press /generate first."
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
