//! Half-over-half trend heuristic.
//!
//! The series is split at `n / 2`; the second half's mean is compared with the
//! first half's mean against a ±10% band. This is a relative threshold, not a
//! statistical test.

use serde::{Deserialize, Serialize};

pub const IMPROVING_FACTOR: f64 = 1.1;
pub const WORSENING_FACTOR: f64 = 0.9;

/// Fewest periods a trend can be read from.
pub const MIN_PERIODS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Worsening,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub first_half_mean: f64,
    pub second_half_mean: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Classifies a chronological series of net flows; `None` below
/// [`MIN_PERIODS`] values.
pub fn classify(series: &[f64]) -> Option<TrendAnalysis> {
    if series.len() < MIN_PERIODS {
        return None;
    }
    let (first, second) = series.split_at(series.len() / 2);
    let first_half_mean = mean(first);
    let second_half_mean = mean(second);

    let direction = if second_half_mean > first_half_mean * IMPROVING_FACTOR {
        TrendDirection::Improving
    } else if second_half_mean < first_half_mean * WORSENING_FACTOR {
        TrendDirection::Worsening
    } else {
        TrendDirection::Stable
    };

    Some(TrendAnalysis {
        direction,
        first_half_mean,
        second_half_mean,
    })
}
