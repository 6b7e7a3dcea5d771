use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Europe::Athens;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The timezone all rental-day decisions are made in.
///
/// Source records store UTC instants, but what matters for availability is
/// which calendar day a booking occupies at the rental desk. Comparing raw
/// timestamps produces off-by-one-day bugs around midnight; every date that
/// enters the overlap engine must be normalized through this module first.
pub const BUSINESS_TZ: Tz = Athens;

/// Normalize any date-like string into a business calendar date.
///
/// Accepts:
/// - `YYYY-MM-DD` date-only strings, returned as that same calendar date
/// - RFC 3339 / ISO 8601 datetime strings, converted into the business zone
/// - `YYYY-MM-DD HH:MM:SS` style datetimes, interpreted as business-local
///
/// Anything unparseable yields `None` and the caller must treat the record
/// as having no date.
pub fn to_business_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Date-only input already names a business day; round-trips unchanged.
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(business_date_of(dt.with_timezone(&Utc)));
    }

    // Zone-less datetimes are taken as wall-clock time at the rental desk.
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.date());
        }
    }

    None
}

/// Calendar date a UTC instant falls on in the business timezone.
pub fn business_date_of(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&BUSINESS_TZ).date_naive()
}

/// Business calendar date for "now".
pub fn business_today() -> NaiveDate {
    business_date_of(Utc::now())
}

/// A date field as it arrives from the document store: either an ISO string
/// (date-only or datetime) or a native timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DateInput {
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl DateInput {
    /// Funnel both wire forms through the same normalization.
    pub fn as_business_date(&self) -> Option<NaiveDate> {
        match self {
            DateInput::Timestamp(instant) => Some(business_date_of(*instant)),
            DateInput::Text(raw) => to_business_date(raw),
        }
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(instant: DateTime<Utc>) -> Self {
        DateInput::Timestamp(instant)
    }
}

impl From<&str> for DateInput {
    fn from(raw: &str) -> Self {
        DateInput::Text(raw.to_string())
    }
}
