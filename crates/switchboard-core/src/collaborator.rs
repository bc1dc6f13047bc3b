//! Collaborator traits consumed by the dispatcher.
//!
//! The engine never parses requests or talks to an auth backend itself. It
//! asks these collaborators instead, synchronously, during condition
//! evaluation. Implementations are expected to answer from memory (already
//! parsed parameters, an identity cached for the request).

use crate::error::{Error, Result};
use crate::types::ParamScope;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Source of request parameters, looked up by name and scope.
///
/// # Thread Safety
///
/// Implementations must be Send + Sync so a Knowledge can be built on one
/// thread and evaluated on another.
pub trait ParameterSource: Send + Sync + fmt::Debug {
    /// Returns the parameter value, or `None` if it is not present in `scope`.
    fn parameter(&self, name: &str, scope: ParamScope) -> Option<Value>;

    /// Whether the parameter is present in `scope`.
    fn has_parameter(&self, name: &str, scope: ParamScope) -> bool {
        self.parameter(name, scope).is_some()
    }
}

/// Source of the current identity and its group memberships.
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Name of the current identity, or `None` when the request is anonymous.
    fn current_identity(&self) -> Option<String>;

    /// Whether `identity` belongs to `group`.
    fn is_member_of(&self, identity: &str, group: &str) -> bool;

    fn has_identity(&self) -> bool {
        self.current_identity().is_some()
    }
}

/// In-memory request parameters split into query and body views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParameters {
    #[serde(default)]
    pub get: Map<String, Value>,
    #[serde(default)]
    pub post: Map<String, Value>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (`a=1&b=two%20words`) into the `get` view.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::new();
        let query = query.strip_prefix('?').unwrap_or(query);
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .get
                .insert(name.into_owned(), Value::String(value.into_owned()));
        }
        params
    }

    pub fn with_get(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.get.insert(name.into(), value.into());
        self
    }

    pub fn with_post(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.post.insert(name.into(), value.into());
        self
    }
}

impl ParameterSource for RequestParameters {
    fn parameter(&self, name: &str, scope: ParamScope) -> Option<Value> {
        match scope {
            ParamScope::Get => self.get.get(name).cloned(),
            ParamScope::Post => self.post.get(name).cloned(),
            ParamScope::Both => self
                .post
                .get(name)
                .or_else(|| self.get.get(name))
                .cloned(),
        }
    }
}

/// Parse a `name=value` assignment, as given on a command line.
///
/// The value is kept as a string; an assignment without `=` is rejected.
pub fn parse_assignment(input: &str) -> Result<(String, Value)> {
    let (name, value) = input.split_once('=').ok_or_else(|| Error::InvalidAssignment {
        input: input.to_string(),
        reason: "expected name=value".to_string(),
    })?;

    if name.is_empty() {
        return Err(Error::InvalidAssignment {
            input: input.to_string(),
            reason: "parameter name is empty".to_string(),
        });
    }

    Ok((name.to_string(), Value::String(value.to_string())))
}

/// Fixed identity with an explicit membership table.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    name: Option<String>,
    memberships: HashMap<String, HashSet<String>>,
}

impl StaticIdentity {
    /// No current identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A logged-in identity with no groups yet.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            memberships: HashMap::new(),
        }
    }

    /// Add the current identity to `group`. No-op for anonymous identities.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        if let Some(name) = self.name.clone() {
            self.memberships
                .entry(name)
                .or_default()
                .insert(group.into());
        }
        self
    }

    /// Record a membership for any identity.
    pub fn with_membership(mut self, identity: impl Into<String>, group: impl Into<String>) -> Self {
        self.memberships
            .entry(identity.into())
            .or_default()
            .insert(group.into());
        self
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_identity(&self) -> Option<String> {
        self.name.clone()
    }

    fn is_member_of(&self, identity: &str, group: &str) -> bool {
        self.memberships
            .get(identity)
            .is_some_and(|groups| groups.contains(group))
    }
}
