//! Calendar bucketing of movements.
//!
//! Bucket keys are zero-padded ISO strings (`2024-03-15`, `2024-03-11`,
//! `2024-03`), so their lexicographic order is their chronological order and a
//! `BTreeMap` keeps them sorted. Weeks start on Monday; a Sunday belongs to the
//! week of the Monday before it.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::movements::Movement;

const DAY_FORMAT: &str = "%Y-%m-%d";
const MONTH_FORMAT: &str = "%Y-%m";

const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

/// Key of the bucket `date` falls into.
pub fn bucket_key(date: NaiveDate, interval: Interval) -> String {
    match interval {
        Interval::Daily => date.format(DAY_FORMAT).to_string(),
        Interval::Weekly => week_start(date).format(DAY_FORMAT).to_string(),
        Interval::Monthly => date.format(MONTH_FORMAT).to_string(),
    }
}

/// Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back)).unwrap_or(date)
}

/// Groups movements by bucket, keys ascending.
pub fn group_by_interval(
    movements: &[Movement],
    interval: Interval,
) -> BTreeMap<String, Vec<&Movement>> {
    let mut buckets: BTreeMap<String, Vec<&Movement>> = BTreeMap::new();
    for movement in movements {
        buckets
            .entry(bucket_key(movement.movement_date, interval))
            .or_default()
            .push(movement);
    }
    buckets
}

fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn long_date(date: NaiveDate) -> String {
    format!("{} de {} de {}", date.day(), month_name(date), date.year())
}

/// Human label for a bucket key. Unparseable keys are returned unchanged.
pub fn format_period_name(key: &str, interval: Interval) -> String {
    match interval {
        Interval::Daily => NaiveDate::parse_from_str(key, DAY_FORMAT)
            .map(long_date)
            .unwrap_or_else(|_| key.to_string()),
        Interval::Weekly => match NaiveDate::parse_from_str(key, DAY_FORMAT) {
            Ok(start) => {
                let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
                week_label(start, end)
            }
            Err(_) => key.to_string(),
        },
        Interval::Monthly => NaiveDate::parse_from_str(&format!("{key}-01"), DAY_FORMAT)
            .map(|date| format!("{} {}", capitalized(month_name(date)), date.year()))
            .unwrap_or_else(|_| key.to_string()),
    }
}

fn week_label(start: NaiveDate, end: NaiveDate) -> String {
    if start.year() != end.year() {
        format!("Semana del {} al {}", long_date(start), long_date(end))
    } else if start.month() != end.month() {
        format!(
            "Semana del {} de {} al {} de {} de {}",
            start.day(),
            month_name(start),
            end.day(),
            month_name(end),
            end.year()
        )
    } else {
        format!(
            "Semana del {} al {} de {} de {}",
            start.day(),
            end.day(),
            month_name(end),
            end.year()
        )
    }
}
