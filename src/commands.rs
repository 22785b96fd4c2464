use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, Message, ParseMode, UserId},
    utils::command::BotCommands,
    Bot,
};
use tracing::instrument;

use crate::{
    access::is_entitled,
    context::QuizContext,
    database::connection::RetrieveUser,
    quiz::QuizTransport,
    runner::{admit, begin_manual_topic},
    state::QuizState,
    HandlerResult, UserDialogue,
};

const SUBJECT_PROMPT: &str = "Pick a subject or press /generate to enter your own topic:";

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    #[command(description = "start the bot and pick a subject.")]
    Start,
    #[command(description = "your profile.")]
    Profile,
    #[command(description = "enter a quiz topic yourself.")]
    Generate,
    #[command(description = "display this help.")]
    Help,
    #[command(description = "stop waiting for a topic.")]
    Cancel,
    #[command(description = "(admin) add a subscriber: /add_user <id> <YYYY-MM-DD>")]
    AddUser(String),
    #[command(description = "(admin) remove a subscriber: /remove_user <id>")]
    RemoveUser(String),
    #[command(description = "(admin) list subscribers.")]
    Users,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Shows the subject picker to an entitled user and resets the dialogue.
pub(crate) async fn offer_subjects<T, R>(
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

    transport.send_subject_menu(chat_id, SUBJECT_PROMPT).await?;
    dialogue.update(QuizState::Idle).await?;
    Ok(())
}

#[instrument(level = "info", skip_all, fields(chat = msg.chat.id.0))]
pub(crate) async fn start<R: RetrieveUser>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    state: QuizState,
    registry: Arc<R>,
    ctx: QuizContext,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    offer_subjects(&bot, msg.chat.id, user.id, &dialogue, &state, &*registry, &ctx).await
}

#[instrument(level = "info", skip_all, fields(chat = msg.chat.id.0))]
pub(crate) async fn generate<R: RetrieveUser>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    state: QuizState,
    registry: Arc<R>,
    ctx: QuizContext,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    begin_manual_topic(&bot, msg.chat.id, user.id, &dialogue, &state, &*registry, &ctx).await
}

pub(crate) async fn profile<R: RetrieveUser>(
    bot: Bot,
    msg: Message,
    registry: Arc<R>,
    ctx: QuizContext,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let access = if is_entitled(&*registry, ctx.admin, user.id).await {
        "✅ Yes"
    } else {
        "❌ No"
    };
    let count = ctx.usage.get(user.id);

    bot.send_message(
        msg.chat.id,
        format!(
            "<b>Profile</b>\n\nID: <code>{}</code>\nAccess: {}\nQuizzes generated: {}",
            user.id.0, access, count
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

pub(crate) async fn cancel(bot: Bot, msg: Message, dialogue: UserDialogue, state: QuizState) -> HandlerResult {
    if state.is_busy() {
        bot.send_message(
            msg.chat.id,
            "Your quiz is already being prepared and can't be cancelled.",
        )
        .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "Cancelled. Press /start to pick a subject.")
        .await?;
    dialogue.update(QuizState::Idle).await?;
    Ok(())
}
