//! What an entry point answers.
//!
//! A report either finds something or explains, with structured data, why it
//! could not. Failures that are not a property of the data (bad arguments, a
//! broken store) travel as [`EngineError`] instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{EngineError, ResultEngine, currency::ConversionError, currency::CurrencyCount};

/// Filter stage that left nothing to report on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundStage {
    /// The organization has no movements at all.
    Ledger,
    /// Nothing inside the requested dates.
    Period,
    /// No movement carries the requested role.
    Role,
    Project,
    Contact,
    /// Category, wallet, type or role-presence filters.
    Filters,
    Currency,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFound {
    pub stage: NotFoundStage,
    /// The value that was searched for, as given by the caller.
    pub detail: Option<String>,
}

impl NotFound {
    pub fn new(stage: NotFoundStage, detail: Option<String>) -> Self {
        Self { stage, detail }
    }
}

/// More than one currency and no conversion target. Carries no sums.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmbiguity {
    pub currencies: Vec<CurrencyCount>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientData {
    /// Populated periods found.
    pub periods: usize,
    pub required: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    Found(T),
    NotFound(NotFound),
    CurrencyAmbiguity(CurrencyAmbiguity),
    ConversionFailed(ConversionError),
    InsufficientData(InsufficientData),
    /// Something unexpected happened; the caller may try again.
    Unavailable,
}

impl<T> Outcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }
}

/// Terminal negative results raised while a report is being computed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Negative {
    NotFound(NotFound),
    CurrencyAmbiguity(CurrencyAmbiguity),
    ConversionFailed(ConversionError),
    InsufficientData(InsufficientData),
}

impl<T> From<Negative> for Outcome<T> {
    fn from(negative: Negative) -> Self {
        match negative {
            Negative::NotFound(not_found) => Outcome::NotFound(not_found),
            Negative::CurrencyAmbiguity(ambiguity) => Outcome::CurrencyAmbiguity(ambiguity),
            Negative::ConversionFailed(err) => Outcome::ConversionFailed(err),
            Negative::InsufficientData(data) => Outcome::InsufficientData(data),
        }
    }
}

/// Why a report stopped early.
#[derive(Debug)]
pub(crate) enum Halt {
    Negative(Negative),
    Error(EngineError),
}

pub(crate) type Flow<T> = Result<T, Halt>;

impl From<EngineError> for Halt {
    fn from(err: EngineError) -> Self {
        Halt::Error(err)
    }
}

impl From<sea_orm::DbErr> for Halt {
    fn from(err: sea_orm::DbErr) -> Self {
        Halt::Error(EngineError::Database(err))
    }
}

impl From<NotFound> for Halt {
    fn from(not_found: NotFound) -> Self {
        Halt::Negative(Negative::NotFound(not_found))
    }
}

impl From<CurrencyAmbiguity> for Halt {
    fn from(ambiguity: CurrencyAmbiguity) -> Self {
        Halt::Negative(Negative::CurrencyAmbiguity(ambiguity))
    }
}

impl From<ConversionError> for Halt {
    fn from(err: ConversionError) -> Self {
        Halt::Negative(Negative::ConversionFailed(err))
    }
}

impl From<InsufficientData> for Halt {
    fn from(data: InsufficientData) -> Self {
        Halt::Negative(Negative::InsufficientData(data))
    }
}

/// Turns the internal flow of `operation` into what the entry point returns.
///
/// Unexpected failures are logged here and never leave the engine.
pub(crate) fn conclude<T>(operation: &'static str, flow: Flow<T>) -> ResultEngine<Outcome<T>> {
    match flow {
        Ok(value) => Ok(Outcome::Found(value)),
        Err(Halt::Negative(negative)) => {
            match &negative {
                Negative::NotFound(not_found) => {
                    debug!(operation, stage = ?not_found.stage, "nothing to report");
                }
                Negative::CurrencyAmbiguity(ambiguity) => {
                    let codes: Vec<&str> = ambiguity
                        .currencies
                        .iter()
                        .map(|currency| currency.code.as_str())
                        .collect();
                    warn!(operation, ?codes, "mixed currencies without a conversion target");
                }
                Negative::ConversionFailed(err) => {
                    warn!(operation, %err, "conversion failed");
                }
                Negative::InsufficientData(data) => {
                    debug!(operation, periods = data.periods, "not enough periods");
                }
            }
            Ok(negative.into())
        }
        Err(Halt::Error(EngineError::Unexpected(reason))) => {
            error!(operation, %reason, "unexpected failure");
            Ok(Outcome::Unavailable)
        }
        Err(Halt::Error(err)) => Err(err),
    }
}
