//! Totals, groupings and itemized detail shared by the reports.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    movements::{Movement, MovementKind, RoleColumn},
    text::normalize,
};

/// Most recent movements listed in itemized detail.
pub const RECENT_LIMIT: usize = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_income: f64,
    pub total_expenses: f64,
    /// `total_income - total_expenses`.
    pub balance: f64,
    pub income_count: usize,
    pub expense_count: usize,
    /// Every movement, including those that are neither income nor expense.
    pub movement_count: usize,
}

impl Totals {
    pub fn tally<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> Self {
        let mut totals = Totals::default();
        for movement in movements {
            totals.add(movement);
        }
        totals
    }

    fn add(&mut self, movement: &Movement) {
        self.movement_count += 1;
        match movement.kind() {
            MovementKind::Income => {
                self.total_income += movement.amount;
                self.income_count += 1;
            }
            MovementKind::Expense => {
                self.total_expenses += movement.amount;
                self.expense_count += 1;
            }
            MovementKind::Other => {}
        }
        self.balance = self.total_income - self.total_expenses;
    }
}

/// One row of itemized detail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementLine {
    pub movement_date: NaiveDate,
    pub amount: f64,
    pub kind: MovementKind,
    pub type_name: Option<String>,
    pub category_name: Option<String>,
    pub project_name: Option<String>,
    pub wallet_name: Option<String>,
    /// First role column holding a value.
    pub counterparty: Option<String>,
    pub currency_code: Option<String>,
}

impl From<&Movement> for MovementLine {
    fn from(movement: &Movement) -> Self {
        let counterparty = RoleColumn::ALL
            .iter()
            .filter_map(|column| movement.role(*column))
            .find(|value| !value.trim().is_empty())
            .map(ToString::to_string);
        Self {
            movement_date: movement.movement_date,
            amount: movement.amount,
            kind: movement.kind(),
            type_name: movement.type_name.clone(),
            category_name: movement.category_name.clone(),
            project_name: movement.project_name.clone(),
            wallet_name: movement.wallet_name.clone(),
            counterparty,
            currency_code: movement.currency_code.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentMovements {
    /// Newest first, at most [`RECENT_LIMIT`].
    pub items: Vec<MovementLine>,
    pub omitted: usize,
}

impl RecentMovements {
    pub fn of(movements: &[Movement]) -> Self {
        let mut sorted: Vec<&Movement> = movements.iter().collect();
        sorted.sort_by(|a, b| b.movement_date.cmp(&a.movement_date));
        Self {
            items: sorted
                .iter()
                .take(RECENT_LIMIT)
                .map(|movement| MovementLine::from(*movement))
                .collect(),
            omitted: movements.len().saturating_sub(RECENT_LIMIT),
        }
    }
}

/// Dimension a date range report can be grouped by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Project,
    Category,
    Wallet,
    Type,
}

impl GroupBy {
    pub fn key_of(self, movement: &Movement) -> Option<&str> {
        match self {
            GroupBy::Project => movement.project_name.as_deref(),
            GroupBy::Category => movement.category_name.as_deref(),
            GroupBy::Wallet => movement.wallet_name.as_deref(),
            GroupBy::Type => movement.type_name.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    /// First spelling seen for the group; `None` gathers rows without a value.
    pub key: Option<String>,
    /// Sum of amounts regardless of direction.
    pub subtotal: f64,
    pub total_income: f64,
    pub total_expenses: f64,
    pub count: usize,
}

/// Groups `movements` by the normalized value `key` returns, largest subtotal
/// first.
pub fn group_totals<'a, F>(movements: &'a [Movement], key: F) -> Vec<GroupTotal>
where
    F: Fn(&'a Movement) -> Option<&'a str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupTotal> = Vec::new();

    for movement in movements {
        let display = key(movement).map(str::trim).filter(|v| !v.is_empty());
        let normalized = display.map(normalize).unwrap_or_default();
        let position = *index.entry(normalized).or_insert_with(|| {
            groups.push(GroupTotal {
                key: display.map(ToString::to_string),
                subtotal: 0.0,
                total_income: 0.0,
                total_expenses: 0.0,
                count: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[position];
        group.subtotal += movement.amount;
        group.count += 1;
        match movement.kind() {
            MovementKind::Income => group.total_income += movement.amount,
            MovementKind::Expense => group.total_expenses += movement.amount,
            MovementKind::Other => {}
        }
    }

    groups.sort_by(|a, b| b.subtotal.total_cmp(&a.subtotal).then_with(|| a.key.cmp(&b.key)));
    groups
}
