//! `request`: method and path-template matching on the request line.

use super::{Condition, ConditionOptions};
use crate::knowledge::{Knowledge, FACT_METHOD, FACT_PATH};
use crate::Result;
use serde_json::{json, Map, Value};
use switchboard_url::UrlPattern;
use tracing::trace;

/// Matches the request method and/or a URL pattern against the path.
///
/// The query string is ignored. Every placeholder the pattern extracts is
/// appended as a backreference and staged as a result named by its dotted
/// property path (`/users/{user.id}` stages `user.id`).
#[derive(Debug, Clone)]
pub struct RequestCondition {
    methods: Vec<String>,
    path: Option<UrlPattern>,
}

impl RequestCondition {
    pub const KIND: &'static str = "request";

    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            path: None,
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.methods.push(method.to_ascii_uppercase());
        self
    }

    pub fn path(mut self, template: &str) -> Result<Self> {
        self.path = Some(UrlPattern::parse(Self::KIND, template)?);
        Ok(self)
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let mut opts = ConditionOptions::new(Self::KIND, options);
        let mut condition = Self::new();

        if let Some(methods) = opts.take_string_list("method")? {
            if methods.is_empty() {
                return Err(opts.invalid("`method` must name at least one method"));
            }
            for method in methods {
                condition = condition.method(&method);
            }
        }

        if let Some(template) = opts.take_string("path")? {
            let pattern = UrlPattern::parse(Self::KIND, template)
                .map_err(|e| opts.invalid(format!("`path`: {e}")))?;
            condition.path = Some(pattern);
        }

        if condition.methods.is_empty() && condition.path.is_none() {
            return Err(opts.invalid("needs `method` or `path`"));
        }

        opts.finish()?;
        Ok(condition)
    }
}

impl Default for RequestCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl Condition for RequestCondition {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn evaluate(&self, knowledge: &mut Knowledge) -> Result<bool> {
        if !self.methods.is_empty() {
            let method = knowledge.fact_text(FACT_METHOD)?;
            if !self.methods.iter().any(|m| m.eq_ignore_ascii_case(&method)) {
                trace!(method = %method, "method not accepted");
                return Ok(false);
            }
        }

        let Some(pattern) = &self.path else {
            return Ok(true);
        };

        let raw = knowledge.fact_text(FACT_PATH)?;
        let path = raw.split_once('?').map_or(raw.as_str(), |(path, _)| path);

        let Some(found) = pattern.matches(path)? else {
            trace!(path, pattern = pattern.pattern(), "path template did not match");
            return Ok(false);
        };

        for (property, value) in found.iter() {
            knowledge.push_backreference(value);
            knowledge.set_result(property.to_string(), value, true);
        }

        Ok(true)
    }

    fn config(&self) -> Value {
        let mut config = json!({ "type": Self::KIND });
        if let Some(map) = config.as_object_mut() {
            if !self.methods.is_empty() {
                map.insert("method".to_string(), json!(self.methods));
            }
            if let Some(pattern) = &self.path {
                map.insert("path".to_string(), json!(pattern.pattern()));
            }
        }
        config
    }
}
