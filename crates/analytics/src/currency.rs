//! Currency consistency and cross-rate conversion.
//!
//! Every movement stores the exchange rate of its currency against a shared
//! base unit, captured when the movement was written. Converting between two
//! currencies goes through that base: `amount / from_rate * to_rate`. No live
//! rate is ever looked up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::movements::Movement;

/// Why a conversion could not be carried out.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConversionError {
    #[error("invalid exchange rate {rate} for {}: rates must be > 0", .currency_code.as_deref().unwrap_or("?"))]
    InvalidRate {
        currency_code: Option<String>,
        rate: f64,
    },
    #[error("no movement in {target} within the selected scope to take the rate from")]
    MissingReference {
        target: String,
        available: Vec<String>,
    },
}

/// Currency reported alongside computed amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTag {
    pub code: String,
    pub symbol: Option<String>,
}

impl CurrencyTag {
    fn of(movement: &Movement) -> Self {
        Self {
            code: movement.currency_key(),
            symbol: movement.currency_symbol.clone(),
        }
    }
}

/// One currency found in a result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyCount {
    pub code: String,
    pub symbol: Option<String>,
    pub movements: usize,
}

fn check_rate(rate: f64, currency_code: Option<&str>) -> Result<f64, ConversionError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(ConversionError::InvalidRate {
            currency_code: currency_code.map(ToString::to_string),
            rate,
        })
    }
}

/// Converts `amount` from a currency quoted at `from_rate` to one quoted at
/// `to_rate`.
pub fn convert(amount: f64, from_rate: f64, to_rate: f64) -> Result<f64, ConversionError> {
    let from_rate = check_rate(from_rate, None)?;
    let to_rate = check_rate(to_rate, None)?;
    if from_rate == to_rate {
        return Ok(amount);
    }
    Ok((amount / from_rate) * to_rate)
}

/// Distinct currencies in `movements`, sorted by code.
pub fn distinct_currencies(movements: &[Movement]) -> Vec<CurrencyCount> {
    let mut by_code: BTreeMap<String, CurrencyCount> = BTreeMap::new();
    for movement in movements {
        let code = movement.currency_key();
        let entry = by_code.entry(code.clone()).or_insert_with(|| CurrencyCount {
            code,
            symbol: None,
            movements: 0,
        });
        if entry.symbol.is_none() {
            entry.symbol = movement.currency_symbol.clone();
        }
        entry.movements += 1;
    }
    by_code.into_values().collect()
}

/// The single currency of `movements`, or every currency found when there is
/// more than one.
pub fn single_currency(movements: &[Movement]) -> Result<CurrencyTag, Vec<CurrencyCount>> {
    let currencies = distinct_currencies(movements);
    match currencies.as_slice() {
        [only] => Ok(CurrencyTag {
            code: only.code.clone(),
            symbol: only.symbol.clone(),
        }),
        [] => Ok(CurrencyTag::default()),
        _ => Err(currencies),
    }
}

/// Converts every movement into `target`, taking the target rate from the
/// first in-scope movement already expressed in `target`. Movements already
/// in `target` keep their amount.
pub fn convert_movements(
    movements: Vec<Movement>,
    target: &str,
) -> Result<(Vec<Movement>, CurrencyTag), ConversionError> {
    let target_key = target.trim().to_ascii_uppercase();
    let reference = movements
        .iter()
        .find(|movement| movement.currency_key() == target_key)
        .ok_or_else(|| ConversionError::MissingReference {
            target: target_key.clone(),
            available: distinct_currencies(&movements)
                .into_iter()
                .map(|currency| currency.code)
                .collect(),
        })?;

    let tag = CurrencyTag::of(reference);
    let to_rate = check_rate(
        reference.exchange_rate.unwrap_or_default(),
        Some(tag.code.as_str()),
    )?;

    let mut converted = Vec::with_capacity(movements.len());
    for mut movement in movements {
        let code = movement.currency_key();
        // Already in the target currency: the amount stands, whatever rate
        // was recorded with it.
        if code != target_key {
            let from_rate = check_rate(
                movement.exchange_rate.unwrap_or_default(),
                Some(code.as_str()),
            )?;
            movement.amount = convert(movement.amount, from_rate, to_rate)?;
        }
        movement.currency_code = Some(tag.code.clone());
        movement.currency_symbol = tag.symbol.clone();
        movement.exchange_rate = Some(to_rate);
        converted.push(movement);
    }

    Ok((converted, tag))
}
