//! Minimal column projection for ledger queries.
//!
//! Each report asks the ledger only for the columns it reads. The options are
//! explicit named flags; `subcontract` is a single flag because a contract
//! title is meaningless without its counterparty and the two columns are always
//! requested together.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementField {
    Amount,
    OrganizationId,
    MovementDate,
    ProjectName,
    CurrencyCode,
    CurrencySymbol,
    ExchangeRate,
    TypeName,
    CategoryName,
    SubcategoryName,
    WalletName,
    Partner,
    Subcontract,
    SubcontractContact,
    Personnel,
    Client,
    Member,
    Indirect,
    GeneralCost,
}

impl MovementField {
    /// Fields every query carries.
    pub const BASE: [MovementField; 3] = [
        MovementField::Amount,
        MovementField::OrganizationId,
        MovementField::MovementDate,
    ];

    pub const fn column_name(self) -> &'static str {
        match self {
            MovementField::Amount => "amount",
            MovementField::OrganizationId => "organization_id",
            MovementField::MovementDate => "movement_date",
            MovementField::ProjectName => "project_name",
            MovementField::CurrencyCode => "currency_code",
            MovementField::CurrencySymbol => "currency_symbol",
            MovementField::ExchangeRate => "exchange_rate",
            MovementField::TypeName => "type_name",
            MovementField::CategoryName => "category_name",
            MovementField::SubcategoryName => "subcategory_name",
            MovementField::WalletName => "wallet_name",
            MovementField::Partner => "partner",
            MovementField::Subcontract => "subcontract",
            MovementField::SubcontractContact => "subcontract_contact",
            MovementField::Personnel => "personnel",
            MovementField::Client => "client",
            MovementField::Member => "member",
            MovementField::Indirect => "indirect",
            MovementField::GeneralCost => "general_cost",
        }
    }
}

/// Counterparty columns to request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleFields {
    pub partner: bool,
    /// Requests both `subcontract` and `subcontract_contact`.
    pub subcontract: bool,
    pub personnel: bool,
    pub client: bool,
    pub member: bool,
}

impl RoleFields {
    pub const ALL: RoleFields = RoleFields {
        partner: true,
        subcontract: true,
        personnel: true,
        client: true,
        member: true,
    };
}

/// Classification labels to request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConceptFields {
    pub type_name: bool,
    pub category: bool,
    pub subcategory: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProjectionOptions {
    pub project: bool,
    /// Code, symbol and exchange rate.
    pub currency: bool,
    pub roles: RoleFields,
    pub concepts: ConceptFields,
    pub wallet: bool,
    pub indirect: bool,
    pub general_cost: bool,
}

/// Ordered, duplicate-free list of columns for `options`.
pub fn requested_fields(options: &ProjectionOptions) -> Vec<MovementField> {
    let mut fields = MovementField::BASE.to_vec();
    let mut push_if = |enabled: bool, extra: &[MovementField]| {
        if enabled {
            fields.extend_from_slice(extra);
        }
    };

    push_if(options.project, &[MovementField::ProjectName]);
    push_if(
        options.currency,
        &[
            MovementField::CurrencyCode,
            MovementField::CurrencySymbol,
            MovementField::ExchangeRate,
        ],
    );
    push_if(options.concepts.type_name, &[MovementField::TypeName]);
    push_if(options.concepts.category, &[MovementField::CategoryName]);
    push_if(options.concepts.subcategory, &[MovementField::SubcategoryName]);
    push_if(options.wallet, &[MovementField::WalletName]);
    push_if(options.roles.partner, &[MovementField::Partner]);
    push_if(
        options.roles.subcontract,
        &[MovementField::Subcontract, MovementField::SubcontractContact],
    );
    push_if(options.roles.personnel, &[MovementField::Personnel]);
    push_if(options.roles.client, &[MovementField::Client]);
    push_if(options.roles.member, &[MovementField::Member]);
    push_if(options.indirect, &[MovementField::Indirect]);
    push_if(options.general_cost, &[MovementField::GeneralCost]);

    fields
}
