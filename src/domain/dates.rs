//! Conversion between human date strings and HubSpot's epoch milliseconds.

use crate::error::{CrmApiError, CrmResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Converts dates to and from the API's integer time unit.
///
/// Accepted input forms:
/// - RFC 3339 with `Z` or an offset (`2024-01-15T10:00:00-05:00`)
/// - naive date-times, read as UTC (`2024-01-15T10:00:00`, `2024-01-15 10:00`)
/// - bare dates, read as midnight UTC (`2024-01-15`)
///
/// Output is always UTC with millisecond precision and a `Z` suffix.
///
/// # Example
///
/// ```
/// use hubspot_mcp_server::domain::DateConverter;
///
/// let ms = DateConverter::to_remote_units("2024-01-15T10:00:00Z").unwrap();
/// assert_eq!(ms, 1_705_312_800_000);
/// assert_eq!(
///     DateConverter::from_remote_units(ms).unwrap(),
///     "2024-01-15T10:00:00.000Z"
/// );
/// ```
pub struct DateConverter;

impl DateConverter {
    /// Parse a human date string into epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error when the input matches none of the accepted forms.
    pub fn to_remote_units(input: &str) -> CrmResult<i64> {
        Self::parse_iso(input)
            .map(|dt| dt.timestamp_millis())
            .ok_or_else(|| invalid_date(input))
    }

    /// Render epoch milliseconds as an ISO-8601 UTC string.
    pub fn from_remote_units(millis: i64) -> CrmResult<String> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Self::format)
            .ok_or_else(|| {
                CrmApiError::validation(format!("Timestamp out of range: {}", millis))
            })
    }

    /// Canonical form of a date string: what a round trip through the API unit yields.
    pub fn normalize(input: &str) -> CrmResult<String> {
        Self::parse_iso(input)
            .map(Self::format)
            .ok_or_else(|| invalid_date(input))
    }

    pub fn format(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse_iso(input: &str) -> Option<DateTime<Utc>> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(dt.with_timezone(&Utc));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

fn invalid_date(input: &str) -> CrmApiError {
    CrmApiError::validation(format!(
        "Invalid date format: '{}'. Expected ISO-8601 (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ)",
        input
    ))
}

/// Parse a timestamp as the API returns it: epoch milliseconds or an ISO-8601 string.
pub fn parse_remote_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let digits = value.strip_prefix('-').unwrap_or(value);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<i64>()
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    }
    DateConverter::parse_iso(value)
}
