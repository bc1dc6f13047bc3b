//! Security and performance constants for the rule engine
//!
//! These constants define limits to prevent various attack vectors:
//! - ReDoS (Regular Expression Denial of Service)
//! - Memory exhaustion
//! - Excessive recursion

/// Maximum size for TOML rule table files (1MB)
///
/// Rationale: rule tables are small configuration files.
/// Larger files may indicate malicious content or misconfiguration.
pub const MAX_TOML_FILE_SIZE: u64 = 1_048_576; // 1MB

/// Maximum regex pattern length (500 characters)
///
/// Rationale: Extremely long regex patterns are often a sign of
/// malicious input or poor design. This limit prevents ReDoS attacks
/// and keeps routing tables maintainable.
pub const MAX_REGEX_LENGTH: usize = 500;

/// Compiled regex size limit (10MB)
///
/// Applied during regex compilation via RegexBuilder.
pub const REGEX_SIZE_LIMIT: usize = 10_000_000; // 10MB

/// Regex DFA size limit (2MB)
///
/// Limits the size of the lazy DFA used while matching request paths.
pub const REGEX_DFA_SIZE_LIMIT: usize = 2_000_000; // 2MB

/// Maximum directory traversal depth (10 levels)
///
/// Prevents runaway recursion when loading rule tables from nested
/// directories.
pub const MAX_DIRECTORY_DEPTH: usize = 10;

/// Maximum nesting of `bool` conditions (8 levels)
///
/// Condition construction and evaluation recurse once per level, so a
/// hostile table could otherwise exhaust the stack.
pub const MAX_CONDITION_DEPTH: usize = 8;
