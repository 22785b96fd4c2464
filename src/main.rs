use std::error::Error;
use std::sync::Arc;

use aiquizbot::commands::Command;
use aiquizbot::config::Config;
use aiquizbot::context::QuizContext;
use aiquizbot::database::connection::Connection;
use aiquizbot::llm::OpenRouter;
use aiquizbot::schema::schema;
use aiquizbot::state::QuizState;
use aiquizbot::telemetry::init_tracing;
use dotenvy::dotenv;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use teloxide::utils::command::BotCommands;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;

    let connection = Arc::new(Connection::connect(&config.database_url).await?);
    connection.run_migrations().await?;

    let generator = Arc::new(OpenRouter::from_config(&config)?);
    let ctx = QuizContext::new(
        config.admin_id,
        config.support_contact.clone(),
        config.generation_timeout,
    );

    let bot = Bot::new(&config.bot_token);
    tracing::info!(model = %config.llm_model, "Starting bot...");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "Failed to register the command menu");
    }

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![
            InMemStorage::<QuizState>::new(),
            connection,
            generator,
            ctx.clone()
        ])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            tracing::info!(url = %webhook.url, addr = %webhook.addr, "Receiving updates via webhook");
            let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            bot.delete_webhook().drop_pending_updates(true).await?;
            tracing::info!("Receiving updates via long polling");
            dispatcher.dispatch().await;
        }
    }

    ctx.shutdown.cancel();
    tracing::info!("Bot stopped");
    Ok(())
}
