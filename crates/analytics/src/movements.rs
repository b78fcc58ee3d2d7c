//! Movement primitives.
//!
//! A `Movement` is one dated, directional money event of an organization. The
//! engine only reads movements: the entity below mirrors the `movements` table
//! so the SQL ledger can project it, and every column except the three scope
//! columns is optional because a projected query leaves unrequested fields
//! empty.

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    projection::{MovementField, RoleFields},
    text::{Needle, normalize},
};

/// Direction of a movement, derived from its `type_name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Income,
    Expense,
    /// Any other type label; counted, never summed.
    Other,
}

impl MovementKind {
    pub const INCOME_LABEL: &'static str = "ingreso";
    pub const EXPENSE_LABEL: &'static str = "egreso";

    pub fn from_type_name(type_name: Option<&str>) -> Self {
        match type_name.map(normalize).as_deref() {
            Some(Self::INCOME_LABEL) => Self::Income,
            Some(Self::EXPENSE_LABEL) => Self::Expense,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub amount: f64,
    pub organization_id: Uuid,
    pub movement_date: NaiveDate,
    pub type_name: Option<String>,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
    pub exchange_rate: Option<f64>,
    pub wallet_name: Option<String>,
    /// `None` for organization-level movements.
    pub project_name: Option<String>,
    pub partner: Option<String>,
    pub subcontract: Option<String>,
    pub subcontract_contact: Option<String>,
    pub personnel: Option<String>,
    pub client: Option<String>,
    pub member: Option<String>,
    pub indirect: Option<String>,
    pub general_cost: Option<String>,
}

impl Movement {
    /// A movement with only its scope columns set.
    pub fn new(organization_id: Uuid, movement_date: NaiveDate, amount: f64) -> Self {
        Self {
            amount,
            organization_id,
            movement_date,
            type_name: None,
            category_name: None,
            subcategory_name: None,
            currency_code: None,
            currency_symbol: None,
            exchange_rate: None,
            wallet_name: None,
            project_name: None,
            partner: None,
            subcontract: None,
            subcontract_contact: None,
            personnel: None,
            client: None,
            member: None,
            indirect: None,
            general_cost: None,
        }
    }

    pub fn kind(&self) -> MovementKind {
        MovementKind::from_type_name(self.type_name.as_deref())
    }

    /// Signed contribution to a balance: income adds, expense subtracts.
    pub fn signed_amount(&self) -> f64 {
        match self.kind() {
            MovementKind::Income => self.amount,
            MovementKind::Expense => -self.amount,
            MovementKind::Other => 0.0,
        }
    }

    pub fn role(&self, column: RoleColumn) -> Option<&str> {
        let value = match column {
            RoleColumn::Partner => &self.partner,
            RoleColumn::Subcontract => &self.subcontract,
            RoleColumn::SubcontractContact => &self.subcontract_contact,
            RoleColumn::Personnel => &self.personnel,
            RoleColumn::Client => &self.client,
            RoleColumn::Member => &self.member,
        };
        value.as_deref()
    }

    /// Upper-cased currency code, empty when the row has none.
    pub fn currency_key(&self) -> String {
        self.currency_code
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_uppercase()
    }

    /// Rejects rows that break the ledger invariants.
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(EngineError::Unexpected(format!(
                "movement dated {} has a non-positive amount",
                self.movement_date
            )));
        }
        Ok(())
    }
}

/// Counterparty columns a movement can be attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleColumn {
    Partner,
    Subcontract,
    SubcontractContact,
    Personnel,
    Client,
    Member,
}

impl RoleColumn {
    /// Every column a contact name can appear in.
    pub const ALL: [RoleColumn; 6] = [
        RoleColumn::Partner,
        RoleColumn::Subcontract,
        RoleColumn::SubcontractContact,
        RoleColumn::Personnel,
        RoleColumn::Client,
        RoleColumn::Member,
    ];

    pub const fn as_str(self) -> &'static str {
        self.field().column_name()
    }

    pub const fn field(self) -> MovementField {
        match self {
            RoleColumn::Partner => MovementField::Partner,
            RoleColumn::Subcontract => MovementField::Subcontract,
            RoleColumn::SubcontractContact => MovementField::SubcontractContact,
            RoleColumn::Personnel => MovementField::Personnel,
            RoleColumn::Client => MovementField::Client,
            RoleColumn::Member => MovementField::Member,
        }
    }

    /// Projection flags needed to read this column.
    pub fn role_fields(columns: &[RoleColumn]) -> RoleFields {
        let mut fields = RoleFields::default();
        for column in columns {
            match column {
                RoleColumn::Partner => fields.partner = true,
                RoleColumn::Subcontract | RoleColumn::SubcontractContact => {
                    fields.subcontract = true
                }
                RoleColumn::Personnel => fields.personnel = true,
                RoleColumn::Client => fields.client = true,
                RoleColumn::Member => fields.member = true,
            }
        }
        fields
    }
}

/// Role columns of `movement` whose value contains `needle`.
pub fn matching_roles<'a>(
    movement: &'a Movement,
    columns: &'a [RoleColumn],
    needle: &'a Needle,
) -> impl Iterator<Item = RoleColumn> + 'a {
    columns
        .iter()
        .copied()
        .filter(move |column| movement.role(*column).is_some_and(|v| needle.found_in(v)))
}

/// `true` when any of `columns` contains `needle`.
pub fn any_role_matches(movement: &Movement, columns: &[RoleColumn], needle: &Needle) -> bool {
    matching_roles(movement, columns, needle).next().is_some()
}

/// `true` when any of `columns` holds a value.
pub fn any_role_present(movement: &Movement, columns: &[RoleColumn]) -> bool {
    columns.iter().any(|column| {
        movement
            .role(*column)
            .is_some_and(|value| !value.trim().is_empty())
    })
}

/// Counterparty kinds the role spending report understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyRole {
    Subcontractor,
    Personnel,
    Partner,
}

impl CounterpartyRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subcontractor => "subcontractor",
            Self::Personnel => "personnel",
            Self::Partner => "partner",
        }
    }

    /// Columns holding this role; a subcontract is its title plus its contact.
    pub const fn columns(self) -> &'static [RoleColumn] {
        match self {
            Self::Subcontractor => &[RoleColumn::Subcontract, RoleColumn::SubcontractContact],
            Self::Personnel => &[RoleColumn::Personnel],
            Self::Partner => &[RoleColumn::Partner],
        }
    }

    /// Display name of the counterparty on `movement`.
    pub fn counterparty<'a>(self, movement: &'a Movement) -> Option<&'a str> {
        match self {
            Self::Subcontractor => movement
                .subcontract_contact
                .as_deref()
                .or(movement.subcontract.as_deref()),
            Self::Personnel => movement.personnel.as_deref(),
            Self::Partner => movement.partner.as_deref(),
        }
    }
}

impl core::fmt::Display for CounterpartyRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CounterpartyRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize(value).as_str() {
            "subcontractor" | "subcontract" => Ok(Self::Subcontractor),
            "personnel" => Ok(Self::Personnel),
            "partner" => Ok(Self::Partner),
            other => Err(EngineError::Validation(format!(
                "unsupported role: {other} (expected subcontractor, personnel or partner)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub movement_date: Date,
    pub amount: f64,
    pub type_name: Option<String>,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
    pub currency_code: Option<String>,
    pub currency_symbol: Option<String>,
    pub exchange_rate: Option<f64>,
    pub wallet_name: Option<String>,
    pub project_name: Option<String>,
    pub partner: Option<String>,
    pub subcontract: Option<String>,
    pub subcontract_contact: Option<String>,
    pub personnel: Option<String>,
    pub client: Option<String>,
    pub member: Option<String>,
    pub indirect: Option<String>,
    pub general_cost: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Movement {
    fn from(model: Model) -> Self {
        Self {
            amount: model.amount,
            organization_id: model.organization_id,
            movement_date: model.movement_date,
            type_name: model.type_name,
            category_name: model.category_name,
            subcategory_name: model.subcategory_name,
            currency_code: model.currency_code,
            currency_symbol: model.currency_symbol,
            exchange_rate: model.exchange_rate,
            wallet_name: model.wallet_name,
            project_name: model.project_name,
            partner: model.partner,
            subcontract: model.subcontract,
            subcontract_contact: model.subcontract_contact,
            personnel: model.personnel,
            client: model.client,
            member: model.member,
            indirect: model.indirect,
            general_cost: model.general_cost,
        }
    }
}
