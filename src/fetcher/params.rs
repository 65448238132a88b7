//! Parameter formatting for vendor query strings

use chrono::{NaiveDate, NaiveDateTime};

/// Compact timestamp layout used by `time_from`/`time_to` style parameters
pub const API_DATETIME_FORMAT: &str = "%Y%m%dT%H%M";

/// Parameter formatting errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    /// Input matched none of the accepted layouts
    #[error("unsupported date format: {0}")]
    UnsupportedDateFormat(String),
}

/// Convert a date string to the vendor's `YYYYMMDDTHHMM` layout.
///
/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DD HH:MM`, or a value already in
/// the compact layout, which is passed through untouched.
pub fn format_datetime_for_api(input: &str) -> Result<String, ParamError> {
    if input.len() == 13 && input.contains('T') {
        return Ok(input.to_string());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(format!("{}T0000", date.format("%Y%m%d")));
    }

    NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .map(format_naive_datetime_for_api)
        .map_err(|_| ParamError::UnsupportedDateFormat(input.to_string()))
}

/// Format a typed timestamp in the vendor's `YYYYMMDDTHHMM` layout
pub fn format_naive_datetime_for_api(datetime: NaiveDateTime) -> String {
    datetime.format(API_DATETIME_FORMAT).to_string()
}
