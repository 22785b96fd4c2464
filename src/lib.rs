use state::QuizState;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

pub mod access;
pub mod admin;
pub mod commands;
pub mod config;
pub mod context;
pub mod database;
pub mod keyboard;
pub mod llm;
pub mod quiz;
pub mod runner;
pub mod schema;
pub mod state;
pub mod telemetry;

pub type UserDialogue = Dialogue<QuizState, InMemStorage<QuizState>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
