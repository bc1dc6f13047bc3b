//! `url_params`: tests on a single request parameter.

use super::{Condition, ConditionOptions};
use crate::knowledge::Knowledge;
use crate::safe_regex::{capture_groups, compile_regex_safe};
use crate::Result;
use regex::Regex;
use serde_json::{json, Map, Value};
use switchboard_core::value::{display_value, is_numeric, loose_eq};
use switchboard_core::ParamScope;
use tracing::trace;

/// The test applied to the parameter value.
#[derive(Debug, Clone)]
pub enum ParamOperator {
    /// The parameter is present.
    IsSet,
    /// Loose equality with a configured value.
    Equal(Value),
    /// The value's text matches a regex; groups become backreferences.
    Regexp(Regex),
    /// The value reads as a finite number.
    IsNumeric,
}

impl ParamOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamOperator::IsSet => "isset",
            ParamOperator::Equal(_) => "equal",
            ParamOperator::Regexp(_) => "regexp",
            ParamOperator::IsNumeric => "isnumeric",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UrlParamsCondition {
    name: String,
    operator: ParamOperator,
    scope: ParamScope,
}

impl UrlParamsCondition {
    pub const KIND: &'static str = "url_params";

    pub fn new(name: impl Into<String>, operator: ParamOperator) -> Self {
        Self {
            name: name.into(),
            operator,
            scope: ParamScope::default(),
        }
    }

    pub fn scope(mut self, scope: ParamScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let mut opts = ConditionOptions::new(Self::KIND, options);

        let name = opts.require_string("name")?;
        let scope = match opts.take_string("scope")? {
            None => ParamScope::default(),
            Some(scope) => scope.parse::<ParamScope>().map_err(|e| opts.invalid(format!("{e}")))?,
        };

        let operator = opts
            .take_string("operator")?
            .unwrap_or_else(|| "isset".to_string());
        let operator = match operator.as_str() {
            "isset" => ParamOperator::IsSet,
            "isnumeric" => ParamOperator::IsNumeric,
            "equal" => match opts.take("value") {
                Some(value) if !value.is_null() => ParamOperator::Equal(value),
                _ => return Err(opts.invalid("operator `equal` needs a `value`")),
            },
            "regexp" => {
                let pattern = opts.require_string("value")?;
                let regex = compile_regex_safe(&pattern)
                    .map_err(|e| opts.invalid(format!("`value`: {e}")))?;
                ParamOperator::Regexp(regex)
            }
            other => {
                return Err(opts.invalid(format!(
                    "unknown operator {other:?} (expected isset, equal, regexp or isnumeric)"
                )))
            }
        };

        opts.finish()?;
        Ok(Self {
            name,
            operator,
            scope,
        })
    }
}

impl Condition for UrlParamsCondition {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn evaluate(&self, knowledge: &mut Knowledge) -> Result<bool> {
        let Some(source) = knowledge.parameters() else {
            trace!(name = %self.name, "no parameter source");
            return Ok(false);
        };
        let Some(value) = source.parameter(&self.name, self.scope) else {
            trace!(name = %self.name, scope = %self.scope, "parameter absent");
            return Ok(false);
        };

        let matched = match &self.operator {
            ParamOperator::IsSet => true,
            ParamOperator::IsNumeric => is_numeric(&value),
            ParamOperator::Equal(expected) => loose_eq(&value, expected),
            ParamOperator::Regexp(regex) => {
                let Some(text) = display_value(&value) else {
                    return Ok(false);
                };
                match regex.captures(&text) {
                    Some(captures) => {
                        knowledge.extend_backreferences(capture_groups(&captures));
                        true
                    }
                    None => false,
                }
            }
        };

        Ok(matched)
    }

    fn config(&self) -> Value {
        let mut config = json!({
            "type": Self::KIND,
            "name": self.name,
            "operator": self.operator.as_str(),
            "scope": self.scope.as_str(),
        });
        let value = match &self.operator {
            ParamOperator::Equal(value) => Some(value.clone()),
            ParamOperator::Regexp(regex) => Some(json!(regex.as_str())),
            _ => None,
        };
        if let (Some(map), Some(value)) = (config.as_object_mut(), value) {
            map.insert("value".to_string(), value);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchboard_core::RequestParameters;

    fn condition(value: Value) -> UrlParamsCondition {
        UrlParamsCondition::from_options(value.as_object().unwrap()).unwrap()
    }

    fn knowledge() -> Knowledge {
        let params = RequestParameters::new()
            .with_get("page", "42")
            .with_get("slug", "hello-world")
            .with_post("token", "abc");
        Knowledge::for_request("GET", "/").with_parameters(Arc::new(params))
    }

    #[test]
    fn test_isset_is_default() {
        let mut knowledge = knowledge();
        assert!(condition(json!({"name": "page"})).evaluate(&mut knowledge).unwrap());
        assert!(!condition(json!({"name": "missing"})).evaluate(&mut knowledge).unwrap());
    }

    #[test]
    fn test_scope() {
        let mut knowledge = knowledge();
        assert!(!condition(json!({"name": "token", "scope": "get"}))
            .evaluate(&mut knowledge)
            .unwrap());
        assert!(condition(json!({"name": "token", "scope": "post"}))
            .evaluate(&mut knowledge)
            .unwrap());
        assert!(condition(json!({"name": "token"})).evaluate(&mut knowledge).unwrap());
    }

    #[test]
    fn test_loose_equal() {
        let mut knowledge = knowledge();
        assert!(condition(json!({"name": "page", "operator": "equal", "value": 42}))
            .evaluate(&mut knowledge)
            .unwrap());
        assert!(!condition(json!({"name": "slug", "operator": "equal", "value": 0}))
            .evaluate(&mut knowledge)
            .unwrap());
    }

    #[test]
    fn test_regexp_pushes_groups() {
        let mut knowledge = knowledge();
        let matched = condition(json!({
            "name": "slug",
            "operator": "regexp",
            "value": "^(\\w+)-(\\w+)$",
        }))
        .evaluate(&mut knowledge)
        .unwrap();

        assert!(matched);
        assert_eq!(knowledge.backreferences(), [json!("hello"), json!("world")]);
    }

    #[test]
    fn test_isnumeric() {
        let mut knowledge = knowledge();
        assert!(condition(json!({"name": "page", "operator": "isnumeric"}))
            .evaluate(&mut knowledge)
            .unwrap());
        assert!(!condition(json!({"name": "slug", "operator": "isnumeric"}))
            .evaluate(&mut knowledge)
            .unwrap());
    }

    #[test]
    fn test_without_parameter_source() {
        let mut knowledge = Knowledge::for_request("GET", "/");
        assert!(!condition(json!({"name": "page"})).evaluate(&mut knowledge).unwrap());
    }

    #[test]
    fn test_configuration_errors() {
        for bad in [
            json!({}),
            json!({"name": "a", "operator": "like"}),
            json!({"name": "a", "operator": "equal"}),
            json!({"name": "a", "operator": "regexp"}),
            json!({"name": "a", "operator": "regexp", "value": "("}),
            json!({"name": "a", "scope": "cookie"}),
            json!({"name": "a", "extra": 1}),
        ] {
            assert!(
                UrlParamsCondition::from_options(bad.as_object().unwrap()).is_err(),
                "expected {bad} to be rejected"
            );
        }
    }
}
