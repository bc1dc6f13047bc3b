//! Size-limited regex compilation shared by every configured pattern.

use crate::constants::{MAX_REGEX_LENGTH, REGEX_DFA_SIZE_LIMIT, REGEX_SIZE_LIMIT};
use crate::{Result, RuleError};
use regex::{Captures, Regex, RegexBuilder};
use serde_json::Value;

/// Compile a regex with size limits to prevent ReDoS attacks
///
/// This function adds defensive limits to regex compilation:
/// - Pattern length limit (500 chars)
/// - Compiled regex size limit (10MB)
/// - DFA size limit (2MB)
pub fn compile_regex_safe(pattern: &str) -> Result<Regex> {
    if pattern.len() > MAX_REGEX_LENGTH {
        return Err(RuleError::InvalidPattern(format!(
            "Pattern exceeds maximum length of {} characters",
            MAX_REGEX_LENGTH
        )));
    }

    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_DFA_SIZE_LIMIT)
        .build()
        .map_err(|e| RuleError::InvalidPattern(e.to_string()))
}

/// Capture groups 1.. as values; unmatched optional groups become `null`.
pub(crate) fn capture_groups(captures: &Captures<'_>) -> Vec<Value> {
    captures
        .iter()
        .skip(1)
        .map(|group| match group {
            Some(m) => Value::String(m.as_str().to_string()),
            None => Value::Null,
        })
        .collect()
}
