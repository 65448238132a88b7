//! CLI command implementations

pub mod error;
pub mod query;

pub use error::CliError;
pub use query::{Cli, Commands, FilterArgs, QueryArgs};
