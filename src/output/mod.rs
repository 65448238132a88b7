//! Payload post-processing

pub mod date_filter;

pub use date_filter::{filter_by_range, filter_csv_by_date_range};

/// Post-processing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// CSV structure could not be read or written
    #[error("CSV error: {0}")]
    Csv(String),

    /// First column of a data row is not a recognizable timestamp
    #[error("unparseable timestamp {value:?} in data row {row}")]
    Timestamp {
        /// 1-based data row index (header excluded)
        row: usize,
        /// Offending cell text
        value: String,
    },

    /// Range bound is not a `YYYY-MM-DD` date
    #[error("invalid date bound: {0}")]
    InvalidBound(String),
}

impl From<csv::Error> for FilterError {
    fn from(err: csv::Error) -> Self {
        FilterError::Csv(err.to_string())
    }
}

/// Result type for post-processing
pub type FilterResult<T> = Result<T, FilterError>;

/// What to do when a payload cannot be filtered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPolicy {
    /// Log a warning and return the unfiltered payload
    #[default]
    FailOpen,
    /// Return the [`FilterError`]
    Strict,
}

impl std::str::FromStr for FilterPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-open" | "open" => Ok(FilterPolicy::FailOpen),
            "strict" => Ok(FilterPolicy::Strict),
            _ => Err(format!(
                "Invalid filter policy: {s}. Valid options: fail-open, strict"
            )),
        }
    }
}
