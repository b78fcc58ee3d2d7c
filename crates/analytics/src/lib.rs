//! Read-only analytics over an organization's movements ledger.
//!
//! Five reports share one shape: validate the request, read the ledger once
//! through a minimal projection, narrow the rows in memory, settle their
//! currency, then aggregate. See [`Engine`].

pub use currency::{ConversionError, CurrencyCount, CurrencyTag};
pub use error::EngineError;
pub use ledger::{LedgerDb, LedgerQuery, LedgerStore};
pub use movements::{CounterpartyRole, Movement, MovementKind, RoleColumn};
pub use ops::{
    BalanceFilter, BalanceSummary, CashflowFilter, CashflowSummary, ContactFilter, ContactSummary,
    DateRangeFilter, DateRangeSummary, Engine, EngineBuilder, PeriodFlow, RoleFilter, RoleMatch,
    RoleSummary, TrendScope,
};
pub use outcome::{CurrencyAmbiguity, InsufficientData, NotFound, NotFoundStage, Outcome};
pub use util::{DateBounds, DateRange};

pub mod buckets;
pub mod currency;
mod error;
pub mod ledger;
pub mod movements;
mod ops;
mod outcome;
pub mod pipeline;
pub mod projection;
pub mod summary;
pub mod text;
pub mod trend;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
