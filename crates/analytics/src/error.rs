//! The module contains the errors the engine can return.
//!
//! Negative results (nothing matched, mixed currencies, failed conversion) are
//! not errors: they are reported through [`Outcome`]. What is left here:
//!
//! - [`Validation`] thrown before the ledger is touched, when the caller passes
//!   a malformed organization id or date range.
//! - [`Unexpected`] raised internally on malformed ledger rows; it never leaves
//!   an entry point, which logs it and answers [`Outcome::Unavailable`].
//! - [`Database`] the ledger query itself failed.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Unexpected`]: EngineError::Unexpected
//!  [`Database`]: EngineError::Database
//!  [`Outcome`]: crate::Outcome
//!  [`Outcome::Unavailable`]: crate::Outcome::Unavailable
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Unexpected(a), Self::Unexpected(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
