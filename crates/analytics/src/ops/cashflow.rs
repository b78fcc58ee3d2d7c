use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ResultEngine,
    buckets::{Interval, format_period_name, group_by_interval},
    currency::CurrencyTag,
    ledger::{LedgerQuery, LedgerStore},
    movements::Movement,
    outcome::{Flow, InsufficientData, NotFound, NotFoundStage, Outcome, conclude},
    pipeline::{FilterStage, Pipeline},
    projection::{ConceptFields, ProjectionOptions},
    summary::Totals,
    trend::{MIN_PERIODS, TrendAnalysis, classify},
    util::{DateRange, non_blank_owned, parse_date, parse_organization_id, trailing_quarter_start},
};

use super::{Engine, settle_currency};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendScope {
    /// Every movement of the organization.
    #[default]
    Organization,
    /// Movements of one project, found by name.
    Project,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashflowFilter {
    pub interval: Interval,
    pub scope: TrendScope,
    /// Required with [`TrendScope::Project`].
    pub project_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Reference day for the default window; today when missing.
    pub as_of: Option<String>,
    pub currency: Option<String>,
    pub convert_to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodFlow {
    pub key: String,
    pub label: String,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashflowSummary {
    pub interval: Interval,
    pub scope: TrendScope,
    pub project_name: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub currency: CurrencyTag,
    pub converted: bool,
    /// Populated periods only, oldest first.
    pub periods: Vec<PeriodFlow>,
    pub totals: Totals,
    pub average_net_flow: f64,
    pub trend: TrendAnalysis,
    pub best_period: PeriodFlow,
    pub worst_period: PeriodFlow,
}

/// Window the report covers.
///
/// Without explicit dates it spans the month of `as_of` and the two before it.
fn window(filter: &CashflowFilter, today: NaiveDate) -> ResultEngine<DateRange> {
    let as_of = match non_blank_owned(filter.as_of.as_deref()) {
        Some(value) => parse_date("as_of", &value)?,
        None => today,
    };
    let end = match non_blank_owned(filter.end_date.as_deref()) {
        Some(value) => parse_date("end_date", &value)?,
        None => as_of,
    };
    let start = match non_blank_owned(filter.start_date.as_deref()) {
        Some(value) => parse_date("start_date", &value)?,
        None => trailing_quarter_start(end),
    };
    DateRange::new(start, end)
}

fn period_flows(movements: &[Movement], interval: Interval) -> Vec<PeriodFlow> {
    group_by_interval(movements, interval)
        .into_iter()
        .map(|(key, bucket)| {
            let totals = Totals::tally(bucket);
            PeriodFlow {
                label: format_period_name(&key, interval),
                key,
                income: totals.total_income,
                expense: totals.total_expenses,
                net: totals.balance,
                count: totals.movement_count,
            }
        })
        .collect()
}

impl<S: LedgerStore> Engine<S> {
    /// Net flow per period and whether it is getting better or worse.
    pub async fn cashflow_trend(
        &self,
        organization_id: &str,
        filter: &CashflowFilter,
    ) -> ResultEngine<Outcome<CashflowSummary>> {
        let organization_id = parse_organization_id(organization_id)?;
        let project_name = non_blank_owned(filter.project_name.as_deref());
        if filter.scope == TrendScope::Project && project_name.is_none() {
            return Err(EngineError::Validation(
                "project_name is required for project scope".to_string(),
            ));
        }
        let range = window(filter, Utc::now().date_naive())?;

        let projection = ProjectionOptions {
            project: filter.scope == TrendScope::Project,
            currency: true,
            concepts: ConceptFields {
                type_name: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut query = LedgerQuery::new(organization_id, &projection).within(range.into());
        if filter.scope == TrendScope::Project {
            query = query.project_scoped();
        }

        let flow = self
            .cashflow_flow(&query, range, project_name, filter)
            .await;
        conclude("cashflow_trend", flow)
    }

    async fn cashflow_flow(
        &self,
        query: &LedgerQuery,
        range: DateRange,
        project_name: Option<String>,
        filter: &CashflowFilter,
    ) -> Flow<CashflowSummary> {
        let empty = NotFound::new(NotFoundStage::Period, None);
        let movements = self.load(query, empty).await?;

        let project = match filter.scope {
            TrendScope::Project => FilterStage::project(project_name.as_deref()),
            TrendScope::Organization => None,
        };
        let movements = Pipeline::new()
            .project(project)
            .currency(FilterStage::currency(filter.currency.as_deref()))
            .run(movements)?;
        let settled = settle_currency(movements, filter.convert_to.as_deref())?;

        let periods = period_flows(&settled.movements, filter.interval);
        let nets: Vec<f64> = periods.iter().map(|period| period.net).collect();
        let insufficient = InsufficientData {
            periods: periods.len(),
            required: MIN_PERIODS,
        };
        let trend = classify(&nets).ok_or(insufficient)?;
        let best_period = periods
            .iter()
            .max_by(|a, b| a.net.total_cmp(&b.net))
            .cloned()
            .ok_or(insufficient)?;
        let worst_period = periods
            .iter()
            .min_by(|a, b| a.net.total_cmp(&b.net))
            .cloned()
            .ok_or(insufficient)?;

        Ok(CashflowSummary {
            interval: filter.interval,
            scope: filter.scope,
            project_name: match filter.scope {
                TrendScope::Project => project_name,
                TrendScope::Organization => None,
            },
            start: range.start,
            end: range.end,
            currency: settled.currency,
            converted: settled.converted,
            average_net_flow: nets.iter().sum::<f64>() / nets.len() as f64,
            totals: Totals::tally(&settled.movements),
            periods,
            trend,
            best_period,
            worst_period,
        })
    }
}
