//! Conditions: declarative predicates evaluated against a [`Knowledge`].
//!
//! Every condition kind is built from a JSON option table (usually a
//! `[[rules.conditions]]` entry of a TOML rule table) through the
//! [`ConditionRegistry`](crate::ConditionRegistry). Construction is where
//! configuration is validated: unknown keys, missing mandatory keys,
//! unrecognized operators and malformed regexes all fail there, so
//! evaluation only ever reports a match, a non-match, or a missing fact.

mod authentication;
mod boolean;
mod request;
mod url_params;
mod url_path;

pub use authentication::{AuthOperator, AuthenticationCondition};
pub use boolean::{BoolCondition, BoolOperator};
pub use request::RequestCondition;
pub use url_params::{ParamOperator, UrlParamsCondition};
pub use url_path::{resolve_chunk_index, PathSource, UrlPathCondition};

use crate::knowledge::Knowledge;
use crate::{Result, RuleError};
use serde_json::{Map, Value};
use std::fmt;

/// A predicate over a [`Knowledge`].
///
/// # Contract
///
/// - `Ok(false)` is an ordinary non-match and must be cheap.
/// - `Err(_)` is reserved for failures the caller must see, such as a
///   mandatory fact missing from the Knowledge.
/// - Evaluation never changes facts. It may push backreferences and stage
///   results, which the owning rule commits or rolls back.
pub trait Condition: Send + Sync + fmt::Debug {
    /// Registry tag of this condition kind.
    fn kind(&self) -> &str;

    fn evaluate(&self, knowledge: &mut Knowledge) -> Result<bool>;

    /// Effective configuration, defaults included.
    fn config(&self) -> Value;
}

/// Option table being consumed by a condition constructor.
///
/// Constructors take the keys they understand; [`ConditionOptions::finish`]
/// rejects whatever is left so typos do not silently change routing.
#[derive(Debug)]
pub struct ConditionOptions {
    kind: String,
    map: Map<String, Value>,
}

impl ConditionOptions {
    pub fn new(kind: &str, options: &Map<String, Value>) -> Self {
        Self {
            kind: kind.to_string(),
            map: options.clone(),
        }
    }

    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn take_string(&mut self, key: &str) -> Result<Option<String>> {
        match self.map.remove(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(format!("`{key}` must be a string, got {other}"))),
        }
    }

    pub fn require_string(&mut self, key: &str) -> Result<String> {
        self.take_string(key)?
            .ok_or_else(|| self.invalid(format!("missing mandatory option `{key}`")))
    }

    /// A string or an array of strings.
    pub fn take_string_list(&mut self, key: &str) -> Result<Option<Vec<String>>> {
        match self.map.remove(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s])),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(self.invalid(format!("`{key}` entries must be strings, got {other}"))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(other) => Err(self.invalid(format!(
                "`{key}` must be a string or an array of strings, got {other}"
            ))),
        }
    }

    /// Remove every key accepted by `predicate`, in key order.
    pub fn take_matching(&mut self, predicate: impl Fn(&str) -> bool) -> Vec<(String, Value)> {
        let keys: Vec<String> = self
            .map
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();

        keys.into_iter()
            .filter_map(|key| self.map.remove(&key).map(|value| (key, value)))
            .collect()
    }

    pub fn invalid(&self, message: impl Into<String>) -> RuleError {
        RuleError::InvalidCondition {
            kind: self.kind.clone(),
            message: message.into(),
        }
    }

    /// Fail if any option was not consumed.
    pub fn finish(self) -> Result<()> {
        if self.map.is_empty() {
            return Ok(());
        }
        let mut unknown: Vec<&str> = self.map.keys().map(String::as_str).collect();
        unknown.sort_unstable();
        Err(self.invalid(format!("unknown option(s): {}", unknown.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> ConditionOptions {
        match value {
            Value::Object(map) => ConditionOptions::new("test", &map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_leftover_keys_are_rejected() {
        let mut opts = options(json!({"name": "a", "nmae": "typo"}));
        assert_eq!(opts.require_string("name").unwrap(), "a");

        let err = opts.finish().unwrap_err();
        assert!(err.to_string().contains("nmae"), "{err}");
    }

    #[test]
    fn test_string_list_accepts_scalar_and_array() {
        let mut opts = options(json!({"one": "GET", "many": ["GET", "POST"], "bad": [1]}));
        assert_eq!(opts.take_string_list("one").unwrap(), Some(vec!["GET".to_string()]));
        assert_eq!(opts.take_string_list("many").unwrap().unwrap().len(), 2);
        assert!(opts.take_string_list("bad").is_err());
        assert_eq!(opts.take_string_list("absent").unwrap(), None);
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let mut opts = options(json!({"name": 5}));
        assert!(matches!(
            opts.require_string("name"),
            Err(RuleError::InvalidCondition { .. })
        ));
        assert!(opts.require_string("other").is_err());
    }
}
