use chrono::{DateTime, Datelike, Months, NaiveDate};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

pub(crate) fn parse_organization_id(organization_id: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(organization_id.trim()).map_err(|_| {
        EngineError::Validation(format!("invalid organization id: {organization_id}"))
    })
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub(crate) fn parse_date(label: &str, value: &str) -> ResultEngine<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| EngineError::Validation(format!("invalid {label}: {value}")))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn non_blank_owned(value: Option<&str>) -> Option<String> {
    non_blank(value).map(ToString::to_string)
}

/// First day of the month two months before `date`.
pub(crate) fn trailing_quarter_start(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first.checked_sub_months(Months::new(2)).unwrap_or(first)
}

/// Inclusive, ordered date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ResultEngine<Self> {
        if start > end {
            return Err(EngineError::Validation(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Both bounds are mandatory.
    pub fn parse(start: &str, end: &str) -> ResultEngine<Self> {
        let start = non_blank(Some(start))
            .ok_or_else(|| EngineError::Validation("start_date is required".to_string()))?;
        let end = non_blank(Some(end))
            .ok_or_else(|| EngineError::Validation("end_date is required".to_string()))?;
        Self::new(parse_date("start_date", start)?, parse_date("end_date", end)?)
    }
}

/// Optional inclusive bounds; blank values count as missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateBounds {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> ResultEngine<Self> {
        let start = non_blank(start)
            .map(|value| parse_date("start_date", value))
            .transpose()?;
        let end = non_blank(end)
            .map(|value| parse_date("end_date", value))
            .transpose()?;
        if let (Some(start), Some(end)) = (start, end) {
            DateRange::new(start, end)?;
        }
        Ok(Self { start, end })
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

impl From<DateRange> for DateBounds {
    fn from(range: DateRange) -> Self {
        Self {
            start: Some(range.start),
            end: Some(range.end),
        }
    }
}
