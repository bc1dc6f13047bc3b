//! Condition registry: maps type tags to condition constructors.

use crate::condition::{
    AuthenticationCondition, BoolCondition, Condition, RequestCondition, UrlParamsCondition,
    UrlPathCondition,
};
use crate::{Result, RuleError};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a condition from its option table.
///
/// The registry is passed in so composite conditions can build their
/// children through it.
pub type ConditionFactory =
    Arc<dyn Fn(&ConditionRegistry, &Map<String, Value>) -> Result<Box<dyn Condition>> + Send + Sync>;

/// Registry of condition kinds.
///
/// Owned by the caller and shared by reference. Factories are looked up
/// under a read lock that is released before they run, so a factory may
/// construct further conditions (or even register new kinds) without
/// deadlocking.
#[derive(Default)]
pub struct ConditionRegistry {
    factories: RwLock<HashMap<String, ConditionFactory>>,
}

impl ConditionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in kinds: `url_path`, `url_params`,
    /// `authentication`, `bool` and `request`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        {
            let mut factories = registry.factories.write();
            let builtins: [(&str, ConditionFactory); 5] = [
                (UrlPathCondition::KIND, Arc::new(build_url_path)),
                (UrlParamsCondition::KIND, Arc::new(build_url_params)),
                (AuthenticationCondition::KIND, Arc::new(build_authentication)),
                (BoolCondition::KIND, Arc::new(build_bool)),
                (RequestCondition::KIND, Arc::new(build_request)),
            ];
            for (tag, factory) in builtins {
                factories.insert(tag.to_string(), factory);
            }
        }
        registry
    }

    /// Register a condition kind under `tag`.
    ///
    /// Tags are non-empty and use only `[a-z0-9_.-]`. A tag can be
    /// registered once.
    pub fn register<F>(&self, tag: &str, factory: F) -> Result<()>
    where
        F: Fn(&ConditionRegistry, &Map<String, Value>) -> Result<Box<dyn Condition>>
            + Send
            + Sync
            + 'static,
    {
        validate_tag(tag)?;

        let mut factories = self.factories.write();
        if factories.contains_key(tag) {
            return Err(RuleError::Registry(format!(
                "condition type '{tag}' is already registered"
            )));
        }
        factories.insert(tag.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Construct a condition of kind `tag`.
    pub fn construct(&self, tag: &str, options: &Map<String, Value>) -> Result<Box<dyn Condition>> {
        let factory = self
            .factories
            .read()
            .get(tag)
            .cloned()
            .ok_or_else(|| RuleError::UnknownConditionType(tag.to_string()))?;

        factory(self, options)
    }

    /// Construct a condition from a table carrying its kind under `type`.
    pub fn construct_table(&self, table: &Map<String, Value>) -> Result<Box<dyn Condition>> {
        let tag = match table.get("type") {
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => {
                return Err(RuleError::InvalidCondition {
                    kind: "?".to_string(),
                    message: format!("`type` must be a string, got {other}"),
                })
            }
            None => {
                return Err(RuleError::InvalidCondition {
                    kind: "?".to_string(),
                    message: "condition table has no `type`".to_string(),
                })
            }
        };

        let mut options = table.clone();
        options.remove("type");
        self.construct(tag, &options)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.read().contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.factories.read().keys().cloned().collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

fn build_url_path(_: &ConditionRegistry, options: &Map<String, Value>) -> Result<Box<dyn Condition>> {
    Ok(Box::new(UrlPathCondition::from_options(options)?))
}

fn build_url_params(_: &ConditionRegistry, options: &Map<String, Value>) -> Result<Box<dyn Condition>> {
    Ok(Box::new(UrlParamsCondition::from_options(options)?))
}

fn build_authentication(
    _: &ConditionRegistry,
    options: &Map<String, Value>,
) -> Result<Box<dyn Condition>> {
    Ok(Box::new(AuthenticationCondition::from_options(options)?))
}

fn build_bool(registry: &ConditionRegistry, options: &Map<String, Value>) -> Result<Box<dyn Condition>> {
    Ok(Box::new(BoolCondition::from_options(registry, options)?))
}

fn build_request(_: &ConditionRegistry, options: &Map<String, Value>) -> Result<Box<dyn Condition>> {
    Ok(Box::new(RequestCondition::from_options(options)?))
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(RuleError::Registry("condition type must not be empty".to_string()));
    }
    if let Some(c) = tag
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-')))
    {
        return Err(RuleError::Registry(format!(
            "condition type '{tag}' contains invalid character {c:?}"
        )));
    }
    Ok(())
}
