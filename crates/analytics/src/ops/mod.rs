use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::{
    ResultEngine,
    currency::{CurrencyTag, convert_movements, single_currency},
    ledger::{LedgerDb, LedgerQuery, LedgerStore},
    movements::Movement,
    outcome::{CurrencyAmbiguity, Flow, NotFound, NotFoundStage},
    util::non_blank_owned,
};

mod balance;
mod cashflow;
mod contacts;
mod date_range;
mod roles;

pub use balance::{BalanceFilter, BalanceSummary};
pub use cashflow::{CashflowFilter, CashflowSummary, PeriodFlow, TrendScope};
pub use contacts::{ContactFilter, ContactSummary, RoleMatch};
pub use date_range::{DateRangeFilter, DateRangeSummary};
pub use roles::{RoleFilter, RoleSummary};

/// Entry point of every report. Holds nothing but the ledger handle, so one
/// engine can serve any number of concurrent calls.
#[derive(Clone, Debug)]
pub struct Engine<S = LedgerDb> {
    store: S,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

impl<S: LedgerStore> Engine<S> {
    /// Engine reading from any ledger store.
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the single ledger round-trip of a report.
    ///
    /// `empty` names the stage reported when the store returns nothing.
    async fn load(&self, query: &LedgerQuery, empty: NotFound) -> Flow<Vec<Movement>> {
        let movements = self.store.fetch(query).await?;
        debug!(
            organization_id = %query.organization_id,
            fields = ?query.fields,
            rows = movements.len(),
            "ledger query"
        );
        for movement in &movements {
            movement.validate()?;
        }
        if movements.is_empty() {
            return Err(empty.into());
        }
        Ok(movements)
    }
}

/// Stage blamed when the store itself returns nothing.
fn empty_ledger(query: &LedgerQuery) -> NotFound {
    let stage = if !query.roles_present.is_empty() {
        NotFoundStage::Role
    } else if query.is_bounded() {
        NotFoundStage::Period
    } else {
        NotFoundStage::Ledger
    };
    NotFound::new(stage, None)
}

/// Movements in a single currency, ready to be summed.
#[derive(Debug)]
struct Settled {
    movements: Vec<Movement>,
    currency: CurrencyTag,
    converted: bool,
}

/// Converts into `convert_to` when given; otherwise refuses to mix currencies.
fn settle_currency(movements: Vec<Movement>, convert_to: Option<&str>) -> Flow<Settled> {
    match non_blank_owned(convert_to) {
        Some(target) => {
            let (movements, currency) = convert_movements(movements, &target)?;
            Ok(Settled {
                movements,
                currency,
                converted: true,
            })
        }
        None => {
            let currency = single_currency(&movements)
                .map_err(|currencies| CurrencyAmbiguity { currencies })?;
            Ok(Settled {
                movements,
                currency,
                converted: false,
            })
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            store: LedgerDb::new(self.database),
        })
    }
}
