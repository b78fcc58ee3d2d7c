use serde::{Deserialize, Serialize};

use crate::{
    ResultEngine,
    currency::CurrencyTag,
    ledger::{LedgerQuery, LedgerStore},
    outcome::{Flow, Outcome, conclude},
    pipeline::{FilterStage, Pipeline},
    projection::{ConceptFields, ProjectionOptions},
    summary::Totals,
    util::parse_organization_id,
};

use super::{Engine, empty_ledger, settle_currency};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceFilter {
    /// Only movements in this currency.
    pub currency: Option<String>,
    /// Convert everything into this currency before summing.
    pub convert_to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub currency: CurrencyTag,
    pub converted: bool,
    pub totals: Totals,
}

impl<S: LedgerStore> Engine<S> {
    /// Income, expenses and balance of every movement of the organization.
    pub async fn organization_balance(
        &self,
        organization_id: &str,
        filter: &BalanceFilter,
    ) -> ResultEngine<Outcome<BalanceSummary>> {
        let organization_id = parse_organization_id(organization_id)?;

        let projection = ProjectionOptions {
            currency: true,
            concepts: ConceptFields {
                type_name: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let query = LedgerQuery::new(organization_id, &projection);

        let flow = self.balance_flow(&query, filter).await;
        conclude("organization_balance", flow)
    }

    async fn balance_flow(
        &self,
        query: &LedgerQuery,
        filter: &BalanceFilter,
    ) -> Flow<BalanceSummary> {
        let movements = self.load(query, empty_ledger(query)).await?;
        let movements = Pipeline::new()
            .currency(FilterStage::currency(filter.currency.as_deref()))
            .run(movements)?;
        let settled = settle_currency(movements, filter.convert_to.as_deref())?;

        Ok(BalanceSummary {
            currency: settled.currency,
            converted: settled.converted,
            totals: Totals::tally(&settled.movements),
        })
    }
}
