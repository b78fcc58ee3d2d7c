use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    ResultEngine,
    currency::CurrencyTag,
    ledger::{LedgerQuery, LedgerStore},
    movements::{Movement, RoleColumn},
    outcome::{Flow, Outcome, conclude},
    pipeline::{FilterStage, Pipeline},
    projection::{ConceptFields, ProjectionOptions},
    summary::{GroupBy, GroupTotal, RecentMovements, Totals, group_totals},
    util::{DateRange, parse_organization_id},
};

use super::{Engine, empty_ledger, settle_currency};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRangeFilter {
    pub start_date: String,
    pub end_date: String,
    /// Any of these project names, matched by containment.
    pub projects: Vec<String>,
    pub categories: Vec<String>,
    pub wallets: Vec<String>,
    /// Type labels such as `Ingreso` or `Egreso`.
    pub types: Vec<String>,
    /// Any of these role columns must be set.
    pub roles: Vec<RoleColumn>,
    pub group_by: Option<GroupBy>,
    pub currency: Option<String>,
    pub convert_to: Option<String>,
    pub detail: bool,
}

impl DateRangeFilter {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateRangeSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub currency: CurrencyTag,
    pub converted: bool,
    pub totals: Totals,
    pub group_by: Option<GroupBy>,
    /// Largest subtotal first.
    pub groups: Option<Vec<GroupTotal>>,
    pub recent: Option<RecentMovements>,
}

fn category(movement: &Movement) -> Option<&str> {
    movement.category_name.as_deref()
}

fn wallet(movement: &Movement) -> Option<&str> {
    movement.wallet_name.as_deref()
}

fn type_name(movement: &Movement) -> Option<&str> {
    movement.type_name.as_deref()
}

impl<S: LedgerStore> Engine<S> {
    /// Movements between two dates, optionally filtered and grouped by one
    /// dimension.
    pub async fn date_range_movements(
        &self,
        organization_id: &str,
        filter: &DateRangeFilter,
    ) -> ResultEngine<Outcome<DateRangeSummary>> {
        let organization_id = parse_organization_id(organization_id)?;
        let range = DateRange::parse(&filter.start_date, &filter.end_date)?;

        let grouped = |by: GroupBy| filter.group_by == Some(by);
        let projection = ProjectionOptions {
            project: true,
            currency: true,
            roles: RoleColumn::role_fields(&filter.roles),
            concepts: ConceptFields {
                type_name: true,
                category: filter.detail
                    || !filter.categories.is_empty()
                    || grouped(GroupBy::Category),
                ..Default::default()
            },
            wallet: filter.detail || !filter.wallets.is_empty() || grouped(GroupBy::Wallet),
            ..Default::default()
        };
        let query = LedgerQuery::new(organization_id, &projection)
            .within(range.into())
            .with_any_role(&filter.roles);

        let flow = self.date_range_flow(&query, range, filter).await;
        conclude("date_range_movements", flow)
    }

    async fn date_range_flow(
        &self,
        query: &LedgerQuery,
        range: DateRange,
        filter: &DateRangeFilter,
    ) -> Flow<DateRangeSummary> {
        let movements = self.load(query, empty_ledger(query)).await?;

        let movements = Pipeline::new()
            .project(FilterStage::projects(&filter.projects))
            .filter(FilterStage::one_of(category, &filter.categories))
            .filter(FilterStage::one_of(wallet, &filter.wallets))
            .filter(FilterStage::one_of(type_name, &filter.types))
            .filter(FilterStage::roles_present(filter.roles.clone()))
            .currency(FilterStage::currency(filter.currency.as_deref()))
            .run(movements)?;
        let settled = settle_currency(movements, filter.convert_to.as_deref())?;
        let movements = settled.movements;

        Ok(DateRangeSummary {
            start: range.start,
            end: range.end,
            currency: settled.currency,
            converted: settled.converted,
            totals: Totals::tally(&movements),
            group_by: filter.group_by,
            groups: filter
                .group_by
                .map(|by| group_totals(&movements, |m| by.key_of(m))),
            recent: filter.detail.then(|| RecentMovements::of(&movements)),
        })
    }
}
