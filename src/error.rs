//! Application-wide error types.

use thiserror::Error;

use crate::ai::AiError;
use crate::billing::BillingError;
use crate::limits::LimitError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Maps `QueryReturnedNoRows` to [`AppError::NotFound`], keeps other
    /// database errors as they are.
    pub fn from_lookup(err: rusqlite::Error, what: &str) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => AppError::not_found(what),
            other => AppError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn not_found_display() {
        let e = AppError::not_found("deck 7");
        assert_eq!(e.to_string(), "deck 7 not found");
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let e = AppError::from_lookup(rusqlite::Error::QueryReturnedNoRows, "flashcard 3");
        assert!(matches!(e, AppError::NotFound(ref what) if what == "flashcard 3"));
    }

    #[test]
    fn limit_error_is_transparent() {
        let e: AppError = LimitError::DeckLimit { tier: crate::models::Tier::Free, limit: 3 }.into();
        assert!(e.to_string().contains("3 decks"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
