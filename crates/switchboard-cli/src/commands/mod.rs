pub mod check;
pub mod config;
pub mod dispatch;
pub mod url;

pub use check::{handle_check_command, CheckArgs, CheckReport, TableSummary};
pub use config::{handle_config_command, ConfigCommand};
pub use dispatch::{handle_dispatch_command, Attempt, DispatchArgs, DispatchOutcome};
pub use url::{handle_url_command, UrlArgs, UrlOutput};
