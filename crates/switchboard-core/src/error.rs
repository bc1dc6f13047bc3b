//! Error types for Switchboard core.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting request inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// A parameter scope name is not one of `get`, `post` or `both`.
    #[error("Unknown parameter scope: {0} (expected get, post or both)")]
    UnknownScope(String),

    /// A dispatch mode name is not one of `first` or `all`.
    #[error("Unknown dispatch mode: {0} (expected first or all)")]
    UnknownMode(String),

    /// A `name=value` assignment could not be parsed.
    #[error("Invalid parameter assignment {input:?}: {reason}")]
    InvalidAssignment {
        /// The raw assignment text.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}
