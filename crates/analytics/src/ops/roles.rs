use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    ResultEngine,
    currency::CurrencyTag,
    ledger::{LedgerQuery, LedgerStore},
    movements::{CounterpartyRole, Movement, RoleColumn, any_role_present},
    outcome::{Flow, NotFoundStage, Outcome, conclude},
    pipeline::{FilterStage, Pipeline},
    projection::{ConceptFields, ProjectionOptions},
    summary::{GroupBy, GroupTotal, RecentMovements, Totals, group_totals},
    text::normalize,
    util::{DateBounds, parse_organization_id},
};

use super::{Engine, empty_ledger, settle_currency};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleFilter {
    /// `subcontractor`, `personnel` or `partner`.
    pub role: String,
    /// Narrows to one counterparty, searched in the role's own columns.
    pub contact_name: Option<String>,
    pub project_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub currency: Option<String>,
    pub convert_to: Option<String>,
    pub detail: bool,
}

impl RoleFilter {
    pub fn new(role: CounterpartyRole) -> Self {
        Self {
            role: role.as_str().to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub role: CounterpartyRole,
    pub currency: CurrencyTag,
    pub converted: bool,
    /// Sum of amounts, whatever their direction.
    pub total: f64,
    pub count: usize,
    pub totals: Totals,
    /// Present only when the movements span more than one project.
    pub by_project: Option<Vec<GroupTotal>>,
    pub by_counterparty: Vec<GroupTotal>,
    pub recent: Option<RecentMovements>,
}

fn spans_several_projects(movements: &[Movement]) -> bool {
    let projects: HashSet<String> = movements
        .iter()
        .filter_map(|m| m.project_name.as_deref().map(normalize))
        .filter(|name| !name.is_empty())
        .collect();
    projects.len() > 1
}

/// Drops rows whose role columns hold only blanks.
fn role_present(role: CounterpartyRole) -> Option<FilterStage> {
    let columns = role.columns();
    Some(FilterStage::new(
        NotFoundStage::Role,
        Some(role.as_str().to_string()),
        move |m| any_role_present(m, columns),
    ))
}

impl<S: LedgerStore> Engine<S> {
    /// What the organization paid or received through one counterparty role.
    pub async fn role_spending(
        &self,
        organization_id: &str,
        filter: &RoleFilter,
    ) -> ResultEngine<Outcome<RoleSummary>> {
        let organization_id = parse_organization_id(organization_id)?;
        let role = CounterpartyRole::try_from(filter.role.as_str())?;
        let bounds = DateBounds::parse(filter.start_date.as_deref(), filter.end_date.as_deref())?;

        let projection = ProjectionOptions {
            project: true,
            currency: true,
            roles: RoleColumn::role_fields(role.columns()),
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
            .with_any_role(role.columns());

        let flow = self.role_flow(&query, role, filter).await;
        conclude("role_spending", flow)
    }

    async fn role_flow(
        &self,
        query: &LedgerQuery,
        role: CounterpartyRole,
        filter: &RoleFilter,
    ) -> Flow<RoleSummary> {
        let movements = self.load(query, empty_ledger(query)).await?;

        let counterparty = filter
            .contact_name
            .as_deref()
            .and_then(|name| FilterStage::contact(NotFoundStage::Contact, name, role.columns()));
        let movements = Pipeline::new()
            .project(FilterStage::project(filter.project_name.as_deref()))
            .contact(counterparty)
            .filter(role_present(role))
            .currency(FilterStage::currency(filter.currency.as_deref()))
            .run(movements)?;
        let settled = settle_currency(movements, filter.convert_to.as_deref())?;
        let movements = settled.movements;

        let by_project = spans_several_projects(&movements)
            .then(|| group_totals(&movements, |m| GroupBy::Project.key_of(m)));

        Ok(RoleSummary {
            role,
            currency: settled.currency,
            converted: settled.converted,
            total: movements.iter().map(|m| m.amount).sum(),
            count: movements.len(),
            totals: Totals::tally(&movements),
            by_project,
            by_counterparty: group_totals(&movements, |m| role.counterparty(m)),
            recent: filter.detail.then(|| RecentMovements::of(&movements)),
        })
    }
}
