//! CLI error types and conversions

use crate::fetcher::FetcherError;
use crate::output::FilterError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Post-processing error
    #[error("filter error: {0}")]
    FilterError(#[from] FilterError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Input could not be read
    #[error("IO error: {0}")]
    IoError(String),
}

impl CliError {
    /// Operator guidance for faults that need action outside the tool
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::FetcherError(FetcherError::RateLimited { .. }) => {
                Some("The vendor quota is exhausted. Wait before retrying or switch data vendor.")
            }
            CliError::FetcherError(FetcherError::Configuration(_)) => {
                Some("Set ALPHA_VANTAGE_API_KEY in the environment or in a .env file.")
            }
            _ => None,
        }
    }
}
