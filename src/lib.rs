pub mod actions;
pub mod ai;
pub mod billing;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod grading;
pub mod limits;
pub mod llm;
pub mod logger;
pub mod models;
pub mod webhook_server;

pub use actions::{ActionResult, Actions};
pub use error::AppError;
pub use models::{Deck, DeckSet, Flashcard, StudySession};
