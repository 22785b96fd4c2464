use std::error::Error;

use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        UpdateFilterExt, UpdateHandler,
    },
    dptree,
    types::Update,
};
use tracing::instrument;

use crate::{
    admin,
    commands::{cancel, generate, help, profile, start, Command},
    database::connection::Connection,
    llm::OpenRouter,
    runner,
    state::QuizState,
};

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Full update tree: commands first, then per-state message handling, then buttons.
pub fn schema() -> UpdateHandler<BoxError> {
    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>()
        .branch(message_scheme())
        .branch(callback_query_scheme())
}

#[instrument(level = "debug")]
fn command_scheme() -> UpdateHandler<BoxError> {
    use dptree::case;
    tracing::debug!("Building a dispatching tree for commands");

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start::<Connection>))
        .branch(case![Command::Profile].endpoint(profile::<Connection>))
        .branch(case![Command::Generate].endpoint(generate::<Connection>))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::AddUser(args)].endpoint(admin::add_user::<Connection>))
        .branch(case![Command::RemoveUser(args)].endpoint(admin::remove_user::<Connection>))
        .branch(case![Command::Users].endpoint(admin::list_users::<Connection>))
}

#[instrument(level = "debug")]
fn message_scheme() -> UpdateHandler<BoxError> {
    use dptree::case;
    tracing::debug!("Building a dispatching tree for messages");

    Update::filter_message()
        .branch(command_scheme())
        .branch(
            case![QuizState::AwaitingTopic]
                .endpoint(runner::receive_topic::<Connection, OpenRouter>),
        )
        .endpoint(runner::unexpected_message)
}

#[instrument(level = "debug")]
fn callback_query_scheme() -> UpdateHandler<BoxError> {
    tracing::debug!("Building a dispatching tree for callback queries");

    Update::filter_callback_query()
        .endpoint(runner::handle_callback::<Connection, OpenRouter>)
}
