//! AI-assisted content generation.
//!
//! Every generator tries the model first and falls back to a heuristic when
//! the provider is unavailable or its reply cannot be used. The returned
//! [`Generated`] records which path produced the items; only
//! [`Source::Ai`] results count against the account's AI allowance.

pub mod flashcards;
pub mod json;
pub mod prompts;
pub mod questions;

use serde::Serialize;
use thiserror::Error;

pub use flashcards::{generate_flashcards, FlashcardRequest, MAX_GENERATED_CARDS};
pub use prompts::{PromptKind, Prompts};
pub use questions::{generate_questions, QuestionRequest, MAX_TEST_QUESTIONS};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AiError {
    #[error("invalid generation request: {0}")]
    InvalidRequest(String),
    #[error("deck has no flashcards to build a test from")]
    NoFlashcards,
    #[error("nothing could be generated: {0}")]
    NothingGenerated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generated<T> {
    pub items: Vec<T>,
    pub source: Source,
}

impl<T> Generated<T> {
    pub fn ai(items: Vec<T>) -> Self {
        Self { items, source: Source::Ai }
    }

    pub fn fallback(items: Vec<T>) -> Self {
        Self { items, source: Source::Fallback }
    }

    pub fn used_ai(&self) -> bool {
        self.source == Source::Ai
    }
}
