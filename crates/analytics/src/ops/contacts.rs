use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    currency::CurrencyTag,
    ledger::{LedgerQuery, LedgerStore},
    movements::{Movement, RoleColumn, matching_roles},
    outcome::{Flow, NotFound, NotFoundStage, Outcome, conclude},
    pipeline::{FilterStage, Pipeline},
    projection::{ConceptFields, ProjectionOptions, RoleFields},
    summary::{RecentMovements, Totals},
    text::Needle,
    util::{DateBounds, parse_organization_id},
};

use super::{Engine, settle_currency};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactFilter {
    /// Searched in every role column.
    pub contact_name: String,
    pub project_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub currency: Option<String>,
    pub convert_to: Option<String>,
    /// Include the most recent movements.
    pub detail: bool,
}

impl ContactFilter {
    pub fn new(contact_name: impl Into<String>) -> Self {
        Self {
            contact_name: contact_name.into(),
            ..Default::default()
        }
    }
}

/// How often, and for how much, the contact showed up in one role column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleMatch {
    pub role: RoleColumn,
    pub count: usize,
    pub subtotal: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub contact_name: String,
    pub currency: CurrencyTag,
    pub converted: bool,
    pub totals: Totals,
    /// Ordered by column.
    pub roles: Vec<RoleMatch>,
    pub recent: Option<RecentMovements>,
}

fn role_matches(movements: &[Movement], needle: &Needle) -> Vec<RoleMatch> {
    let mut by_role: BTreeMap<RoleColumn, RoleMatch> = BTreeMap::new();
    for movement in movements {
        for role in matching_roles(movement, &RoleColumn::ALL, needle) {
            let entry = by_role.entry(role).or_insert(RoleMatch {
                role,
                count: 0,
                subtotal: 0.0,
            });
            entry.count += 1;
            entry.subtotal += movement.amount;
        }
    }
    by_role.into_values().collect()
}

impl<S: LedgerStore> Engine<S> {
    /// Every movement where `contact_name` appears as partner, subcontract,
    /// subcontract contact, personnel, client or member.
    pub async fn contact_movements(
        &self,
        organization_id: &str,
        filter: &ContactFilter,
    ) -> ResultEngine<Outcome<ContactSummary>> {
        let organization_id = parse_organization_id(organization_id)?;
        let contact_name = filter.contact_name.trim();
        if contact_name.is_empty() {
            return Err(EngineError::Validation(
                "contact_name is required".to_string(),
            ));
        }
        let bounds = DateBounds::parse(filter.start_date.as_deref(), filter.end_date.as_deref())?;

        let projection = ProjectionOptions {
            project: true,
            currency: true,
            roles: RoleFields::ALL,
            concepts: ConceptFields {
                type_name: true,
                category: filter.detail,
                ..Default::default()
            },
            wallet: filter.detail,
            ..Default::default()
        };
        let query = LedgerQuery::new(organization_id, &projection)
            .within(bounds)
            .with_any_role(&RoleColumn::ALL);

        let flow = self.contact_flow(&query, contact_name, filter).await;
        conclude("contact_movements", flow)
    }

    async fn contact_flow(
        &self,
        query: &LedgerQuery,
        contact_name: &str,
        filter: &ContactFilter,
    ) -> Flow<ContactSummary> {
        // No row names anybody: still a contact miss.
        let empty = NotFound::new(NotFoundStage::Contact, Some(contact_name.to_string()));
        let movements = self.load(query, empty).await?;

        let movements = Pipeline::new()
            .project(FilterStage::project(filter.project_name.as_deref()))
            .contact(FilterStage::contact(
                NotFoundStage::Contact,
                contact_name,
                &RoleColumn::ALL,
            ))
            .currency(FilterStage::currency(filter.currency.as_deref()))
            .run(movements)?;
        let settled = settle_currency(movements, filter.convert_to.as_deref())?;

        let needle = Needle::new(contact_name);
        Ok(ContactSummary {
            contact_name: contact_name.to_string(),
            currency: settled.currency,
            converted: settled.converted,
            totals: Totals::tally(&settled.movements),
            roles: role_matches(&settled.movements, &needle),
            recent: filter
                .detail
                .then(|| RecentMovements::of(&settled.movements)),
        })
    }
}
