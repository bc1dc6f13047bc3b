//! Error types for URL patterns.

use thiserror::Error;

/// Result type for URL pattern operations.
pub type Result<T> = std::result::Result<T, UrlError>;

/// Errors raised while compiling patterns or building URLs.
#[derive(Debug, Error)]
pub enum UrlError {
    /// The pattern text is malformed.
    #[error("Invalid URL pattern {pattern:?} at byte {position}: {reason}")]
    InvalidPattern {
        pattern: String,
        position: usize,
        reason: String,
    },

    /// A placeholder's property path did not resolve against the parameters.
    #[error("Missing parameter {{{placeholder}}} for pattern {pattern:?} (no value at {segment:?})")]
    MissingParameter {
        pattern: String,
        placeholder: String,
        /// First path segment that failed to resolve.
        segment: String,
    },

    /// A placeholder resolved to an array or object.
    #[error("Parameter {{{placeholder}}} for pattern {pattern:?} is not a scalar")]
    UnprintableParameter { pattern: String, placeholder: String },

    #[error("Invalid origin {input:?}: {reason}")]
    InvalidOrigin { input: String, reason: String },

    #[error("No origin configured for absolute URLs")]
    MissingOrigin,

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Resource already defined: {0}")]
    DuplicateResource(String),

    #[error("Parameter serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Pattern matcher failed to compile: {0}")]
    Matcher(#[from] regex::Error),
}
