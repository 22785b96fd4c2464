use std::sync::Arc;

use chrono::NaiveDate;
use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{Message, ParseMode, UserId},
    Bot,
};
use thiserror::Error;
use tracing::instrument;

use crate::{
    context::QuizContext,
    database::{
        connection::{DeleteUser, RetrieveUser, UpsertUser},
        user::EXPIRY_DATE_FORMAT,
    },
    HandlerResult,
};

pub const ADD_USER_USAGE: &str = "/add_user <user_id> <YYYY-MM-DD>";
pub const REMOVE_USER_USAGE: &str = "/remove_user <user_id>";
const NO_PERMISSION: &str = "You don't have permission.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminArgsError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a valid user id")]
    UserId(String),
    #[error("'{0}' is not a valid date, expected YYYY-MM-DD")]
    Date(String),
}

fn parse_user_id(raw: &str) -> Result<UserId, AdminArgsError> {
    raw.parse::<u64>()
        .map(UserId)
        .map_err(|_| AdminArgsError::UserId(raw.to_owned()))
}

pub fn parse_add_user_args(args: &str) -> Result<(UserId, NaiveDate), AdminArgsError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [user_id, date] = parts.as_slice() else {
        return Err(AdminArgsError::Usage(ADD_USER_USAGE));
    };

    let user_id = parse_user_id(user_id)?;
    let date = NaiveDate::parse_from_str(date, EXPIRY_DATE_FORMAT)
        .map_err(|_| AdminArgsError::Date((*date).to_owned()))?;
    Ok((user_id, date))
}

pub fn parse_remove_user_args(args: &str) -> Result<UserId, AdminArgsError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [user_id] = parts.as_slice() else {
        return Err(AdminArgsError::Usage(REMOVE_USER_USAGE));
    };

    parse_user_id(user_id)
}

fn sent_by_admin(msg: &Message, ctx: &QuizContext) -> bool {
    msg.from.as_ref().is_some_and(|user| ctx.is_admin(user.id))
}

#[instrument(level = "info", skip(bot, msg, registry, ctx))]
pub(crate) async fn add_user<R: UpsertUser>(
    bot: Bot,
    msg: Message,
    args: String,
    registry: Arc<R>,
    ctx: QuizContext,
) -> HandlerResult {
    if !sent_by_admin(&msg, &ctx) {
        bot.send_message(msg.chat.id, NO_PERMISSION).await?;
        return Ok(());
    }

    let (user_id, expires) = match parse_add_user_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
            return Ok(());
        }
    };

    match registry.upsert_user(user_id, expires).await {
        Ok(()) => {
            bot.send_message(
                msg.chat.id,
                format!("User {} added until {}", user_id.0, expires.format(EXPIRY_DATE_FORMAT)),
            )
            .await?;
        }
        Err(e) => {
            tracing::error!(user = user_id.0, error = %e, "Failed to add user");
            bot.send_message(msg.chat.id, "Failed to add user").await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, msg, registry, ctx))]
pub(crate) async fn remove_user<R: DeleteUser>(
    bot: Bot,
    msg: Message,
    args: String,
    registry: Arc<R>,
    ctx: QuizContext,
) -> HandlerResult {
    if !sent_by_admin(&msg, &ctx) {
        bot.send_message(msg.chat.id, NO_PERMISSION).await?;
        return Ok(());
    }

    let user_id = match parse_remove_user_args(&args) {
        Ok(user_id) => user_id,
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
            return Ok(());
        }
    };

    match registry.delete_user(user_id).await {
        Ok(true) => {
            bot.send_message(msg.chat.id, format!("User {} removed", user_id.0))
                .await?;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, format!("User {} was not in the list", user_id.0))
                .await?;
        }
        Err(e) => {
            tracing::error!(user = user_id.0, error = %e, "Failed to remove user");
            bot.send_message(msg.chat.id, "Failed to remove user").await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip_all)]
pub(crate) async fn list_users<R: RetrieveUser>(
    bot: Bot,
    msg: Message,
    registry: Arc<R>,
    ctx: QuizContext,
) -> HandlerResult {
    if !sent_by_admin(&msg, &ctx) {
        return Ok(());
    }

    match registry.retrieve_all_users().await {
        Ok(users) if users.is_empty() => {
            bot.send_message(msg.chat.id, "No users").await?;
        }
        Ok(users) => {
            let mut text = String::from("<b>Users:</b>\n");
            for user in &users {
                text.push_str(&format!("{}\n", user));
            }
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list users");
            bot.send_message(msg.chat.id, "Failed to list users").await?;
        }
    }

    Ok(())
}
