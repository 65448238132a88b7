//! Date-range filter for CSV time series
//!
//! The first column of every data row is read as a timestamp and compared by
//! calendar date against an inclusive [`DateRange`]. The header, column order
//! and the text of kept rows are preserved; rows are never reordered.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tracing::{debug, warn};

use super::{FilterError, FilterPolicy, FilterResult};
use crate::DateRange;

/// Timestamp layouts accepted in the first column, besides RFC 3339
const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M",
];

/// Filter `csv_data` to rows dated within `start..=end` (`YYYY-MM-DD`).
///
/// Fail-open: empty input, unparseable bounds or a malformed table all return
/// the input unchanged, with a warning for the latter two.
pub fn filter_csv_by_date_range(csv_data: &str, start_date: &str, end_date: &str) -> String {
    if csv_data.trim().is_empty() {
        return csv_data.to_string();
    }

    let range = match parse_bounds(start_date, end_date) {
        Ok(range) => range,
        Err(e) => {
            warn!(error = %e, "Failed to filter CSV data by date range, returning unfiltered data");
            crate::metrics::record_filter_failure();
            return csv_data.to_string();
        }
    };

    match filter_by_range(csv_data, &range, FilterPolicy::FailOpen) {
        Ok(filtered) => filtered,
        Err(_) => csv_data.to_string(),
    }
}

/// Filter `csv_data` to rows whose first-column date lies in `range`.
///
/// # Errors
/// Only under [`FilterPolicy::Strict`]; fail-open returns the input instead.
pub fn filter_by_range(
    csv_data: &str,
    range: &DateRange,
    policy: FilterPolicy,
) -> FilterResult<String> {
    if csv_data.trim().is_empty() {
        return Ok(csv_data.to_string());
    }

    match filter_rows(csv_data, range) {
        Ok((filtered, kept, total)) => {
            debug!(kept, total, range = %range, "Filtered CSV by date range");
            Ok(filtered)
        }
        Err(e) => {
            crate::metrics::record_filter_failure();
            match policy {
                FilterPolicy::FailOpen => {
                    warn!(
                        error = %e,
                        range = %range,
                        "Failed to filter CSV data by date range, returning unfiltered data"
                    );
                    Ok(csv_data.to_string())
                }
                FilterPolicy::Strict => Err(e),
            }
        }
    }
}

/// Parse a `YYYY-MM-DD` pair into a range
pub fn parse_bounds(start_date: &str, end_date: &str) -> FilterResult<DateRange> {
    DateRange::parse(start_date, end_date)
        .map_err(|e| FilterError::InvalidBound(format!("{start_date}..{end_date}: {e}")))
}

/// Calendar date of a first-column timestamp
pub fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Some(datetime.date());
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Returns the filtered text with kept and total data-row counts
fn filter_rows(csv_data: &str, range: &DateRange) -> FilterResult<(String, usize, usize)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(FilterError::Csv("missing header row".to_string()));
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(csv_data.len()));
    writer.write_record(&headers)?;

    let mut kept = 0;
    let mut total = 0;
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        total += 1;

        let cell = record.get(0).unwrap_or_default();
        let date = parse_timestamp(cell).ok_or_else(|| FilterError::Timestamp {
            row: idx + 1,
            value: cell.to_string(),
        })?;

        if range.contains(date) {
            writer.write_record(&record)?;
            kept += 1;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FilterError::Csv(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| FilterError::Csv(e.to_string()))?;
    Ok((text, kept, total))
}
