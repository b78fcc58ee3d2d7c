//! Read access to the movements ledger.
//!
//! [`LedgerStore`] is the only way the engine reaches stored movements. A
//! report issues exactly one [`LedgerQuery`] and does everything else in
//! memory. [`LedgerDb`] answers queries from the `movements` table, selecting
//! only the projected columns.

use std::future::Future;

use chrono::NaiveDate;
use sea_orm::{
    Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QueryResult, QuerySelect, QueryTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    movements::{self, Movement, RoleColumn},
    projection::{MovementField, ProjectionOptions, requested_fields},
    util::DateBounds,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerQuery {
    pub organization_id: Uuid,
    pub fields: Vec<MovementField>,
    /// Inclusive.
    pub start: Option<NaiveDate>,
    /// Inclusive.
    pub end: Option<NaiveDate>,
    /// Only movements attached to some project.
    pub project_scoped: bool,
    /// At least one of these columns must be set.
    pub roles_present: Vec<RoleColumn>,
}

impl LedgerQuery {
    pub fn new(organization_id: Uuid, projection: &ProjectionOptions) -> Self {
        Self {
            organization_id,
            fields: requested_fields(projection),
            start: None,
            end: None,
            project_scoped: false,
            roles_present: Vec::new(),
        }
    }

    pub fn within(mut self, bounds: DateBounds) -> Self {
        self.start = bounds.start;
        self.end = bounds.end;
        self
    }

    pub fn project_scoped(mut self) -> Self {
        self.project_scoped = true;
        self
    }

    pub fn with_any_role(mut self, columns: &[RoleColumn]) -> Self {
        self.roles_present = columns.to_vec();
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

/// Source of movements.
pub trait LedgerStore {
    /// Movements matching `query`, oldest first. Fields outside
    /// `query.fields` are left empty.
    fn fetch(&self, query: &LedgerQuery)
    -> impl Future<Output = Result<Vec<Movement>, DbErr>> + Send;
}

/// [`LedgerStore`] over the `movements` table.
#[derive(Clone, Debug)]
pub struct LedgerDb {
    database: DatabaseConnection,
}

impl LedgerDb {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

fn column(field: MovementField) -> movements::Column {
    use movements::Column;
    match field {
        MovementField::Amount => Column::Amount,
        MovementField::OrganizationId => Column::OrganizationId,
        MovementField::MovementDate => Column::MovementDate,
        MovementField::ProjectName => Column::ProjectName,
        MovementField::CurrencyCode => Column::CurrencyCode,
        MovementField::CurrencySymbol => Column::CurrencySymbol,
        MovementField::ExchangeRate => Column::ExchangeRate,
        MovementField::TypeName => Column::TypeName,
        MovementField::CategoryName => Column::CategoryName,
        MovementField::SubcategoryName => Column::SubcategoryName,
        MovementField::WalletName => Column::WalletName,
        MovementField::Partner => Column::Partner,
        MovementField::Subcontract => Column::Subcontract,
        MovementField::SubcontractContact => Column::SubcontractContact,
        MovementField::Personnel => Column::Personnel,
        MovementField::Client => Column::Client,
        MovementField::Member => Column::Member,
        MovementField::Indirect => Column::Indirect,
        MovementField::GeneralCost => Column::GeneralCost,
    }
}

fn text(row: &QueryResult, field: MovementField) -> Result<Option<String>, DbErr> {
    row.try_get::<Option<String>>("", field.column_name())
}

/// Builds a `Movement` out of the projected columns of `row`.
fn decode_row(row: &QueryResult, fields: &[MovementField]) -> Result<Movement, DbErr> {
    let mut movement = Movement::new(
        row.try_get("", MovementField::OrganizationId.column_name())?,
        row.try_get("", MovementField::MovementDate.column_name())?,
        row.try_get("", MovementField::Amount.column_name())?,
    );
    for field in fields {
        match field {
            MovementField::Amount | MovementField::OrganizationId | MovementField::MovementDate => {}
            MovementField::ExchangeRate => {
                movement.exchange_rate = row.try_get("", field.column_name())?;
            }
            MovementField::ProjectName => movement.project_name = text(row, *field)?,
            MovementField::CurrencyCode => movement.currency_code = text(row, *field)?,
            MovementField::CurrencySymbol => movement.currency_symbol = text(row, *field)?,
            MovementField::TypeName => movement.type_name = text(row, *field)?,
            MovementField::CategoryName => movement.category_name = text(row, *field)?,
            MovementField::SubcategoryName => movement.subcategory_name = text(row, *field)?,
            MovementField::WalletName => movement.wallet_name = text(row, *field)?,
            MovementField::Partner => movement.partner = text(row, *field)?,
            MovementField::Subcontract => movement.subcontract = text(row, *field)?,
            MovementField::SubcontractContact => {
                movement.subcontract_contact = text(row, *field)?
            }
            MovementField::Personnel => movement.personnel = text(row, *field)?,
            MovementField::Client => movement.client = text(row, *field)?,
            MovementField::Member => movement.member = text(row, *field)?,
            MovementField::Indirect => movement.indirect = text(row, *field)?,
            MovementField::GeneralCost => movement.general_cost = text(row, *field)?,
        }
    }
    Ok(movement)
}

impl LedgerStore for LedgerDb {
    async fn fetch(&self, query: &LedgerQuery) -> Result<Vec<Movement>, DbErr> {
        let mut select = movements::Entity::find()
            .select_only()
            .filter(movements::Column::OrganizationId.eq(query.organization_id));
        for field in &query.fields {
            select = select.column(column(*field));
        }
        if let Some(start) = query.start {
            select = select.filter(movements::Column::MovementDate.gte(start));
        }
        if let Some(end) = query.end {
            select = select.filter(movements::Column::MovementDate.lte(end));
        }
        if query.project_scoped {
            select = select.filter(movements::Column::ProjectName.is_not_null());
        }
        if !query.roles_present.is_empty() {
            let any_role = query
                .roles_present
                .iter()
                .fold(Condition::any(), |condition, role| {
                    condition.add(column(role.field()).is_not_null())
                });
            select = select.filter(any_role);
        }
        let statement = select
            .order_by_asc(movements::Column::MovementDate)
            .build(self.database.get_database_backend());

        let rows = self.database.query_all(statement).await?;
        rows.iter()
            .map(|row| decode_row(row, &query.fields))
            .collect()
    }
}
