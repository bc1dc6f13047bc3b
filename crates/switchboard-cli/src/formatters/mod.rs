//! Output formatters for command results.

pub mod human;
pub mod json;

use serde::Serialize;

pub use human::HumanFormat;
pub use json::print_json;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Print a command result in the requested format
pub fn emit<T: Serialize + HumanFormat>(result: &T, format: OutputFormat) {
    match format {
        OutputFormat::Human => result.print_human(),
        OutputFormat::Json => print_json(result),
    }
}
