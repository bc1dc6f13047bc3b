//! Actions run by a rule once it fully matched.
//!
//! Rules built in code can take any closure. Rules loaded from TOML tables
//! use the declarative [`RuleAction`] variants, whose `handler` entries are
//! resolved by name through an [`ActionRegistry`].

use crate::knowledge::Knowledge;
use crate::{Result, RuleError};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Error returned by an action.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Something a matched rule does.
///
/// Receives the Knowledge (with the rule's output already committed) and the
/// backreferences captured by this rule's conditions, in capture order.
pub trait Action: Send + Sync {
    fn run(&self, knowledge: &mut Knowledge, backreferences: &[Value]) -> std::result::Result<(), ActionError>;
}

impl<F> Action for F
where
    F: Fn(&mut Knowledge, &[Value]) -> std::result::Result<(), ActionError> + Send + Sync,
{
    fn run(&self, knowledge: &mut Knowledge, backreferences: &[Value]) -> std::result::Result<(), ActionError> {
        self(knowledge, backreferences)
    }
}

/// Declarative action from a rule table.
#[derive(Clone)]
pub enum RuleAction {
    /// Call a named handler.
    Handler { name: String, handler: Arc<dyn Action> },
    /// Store backreferences as results, by position. A name with no
    /// matching backreference stores `null`.
    Bind(Vec<String>),
    /// Store constant results.
    Set(Map<String, Value>),
    /// Emit an `info` event.
    Log(String),
    /// Any other action built in code.
    Custom(Arc<dyn Action>),
}

impl RuleAction {
    /// Wrap a closure or [`Action`] implementation.
    pub fn custom(action: impl Action + 'static) -> Self {
        RuleAction::Custom(Arc::new(action))
    }

    /// Effective configuration, in rule-table form.
    pub fn describe(&self) -> Value {
        match self {
            RuleAction::Handler { name, .. } => json!({ "handler": name }),
            RuleAction::Bind(names) => json!({ "bind": names }),
            RuleAction::Set(values) => json!({ "set": values }),
            RuleAction::Log(message) => json!({ "log": message }),
            RuleAction::Custom(_) => json!({ "custom": true }),
        }
    }

    pub(crate) fn execute(
        &self,
        rule: &str,
        knowledge: &mut Knowledge,
        backreferences: &[Value],
    ) -> std::result::Result<(), ActionError> {
        match self {
            RuleAction::Handler { handler, .. } | RuleAction::Custom(handler) => {
                handler.run(knowledge, backreferences)
            }
            RuleAction::Bind(names) => {
                for (index, name) in names.iter().enumerate() {
                    let value = backreferences.get(index).cloned().unwrap_or(Value::Null);
                    knowledge.set_result(name.clone(), value, false);
                }
                Ok(())
            }
            RuleAction::Set(values) => {
                for (name, value) in values {
                    knowledge.set_result(name.clone(), value.clone(), false);
                }
                Ok(())
            }
            RuleAction::Log(message) => {
                info!(rule, backreferences = ?backreferences, "{message}");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleAction::Handler { name, .. } => f.debug_tuple("Handler").field(name).finish(),
            RuleAction::Bind(names) => f.debug_tuple("Bind").field(names).finish(),
            RuleAction::Set(values) => f.debug_tuple("Set").field(values).finish(),
            RuleAction::Log(message) => f.debug_tuple("Log").field(message).finish(),
            RuleAction::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Named handlers available to rule tables.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn Action>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(&self, name: impl Into<String>, handler: impl Action + 'static) {
        self.handlers.write().insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.handlers.read().get(name).cloned()
    }

    /// A `handler` action for `name`, failing if no such handler exists.
    pub fn resolve(&self, name: &str) -> Result<RuleAction> {
        let handler = self
            .get(name)
            .ok_or_else(|| RuleError::UnknownHandler(name.to_string()))?;
        Ok(RuleAction::Handler {
            name: name.to_string(),
            handler,
        })
    }

    /// Registered handler names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Knowledge, _: &[Value]) -> std::result::Result<(), ActionError> {
        Ok(())
    }

    #[test]
    fn test_bind_stores_backreferences_by_position() {
        let mut knowledge = Knowledge::new();
        let action = RuleAction::Bind(vec!["year".into(), "slug".into(), "page".into()]);

        action
            .execute("r", &mut knowledge, &[json!("2024"), json!("hello")])
            .unwrap();

        assert_eq!(knowledge.result("year"), Some(&json!("2024")));
        assert_eq!(knowledge.result("slug"), Some(&json!("hello")));
        assert_eq!(knowledge.result("page"), Some(&Value::Null));
    }

    #[test]
    fn test_set_stores_constants() {
        let mut knowledge = Knowledge::new();
        let mut values = Map::new();
        values.insert("controller".into(), json!("blog"));
        RuleAction::Set(values).execute("r", &mut knowledge, &[]).unwrap();
        assert_eq!(knowledge.result("controller"), Some(&json!("blog")));
    }

    #[test]
    fn test_closure_actions() {
        let action = RuleAction::custom(|knowledge: &mut Knowledge, refs: &[Value]| {
            knowledge.set_result("count", refs.len(), false);
            Ok::<(), ActionError>(())
        });

        let mut knowledge = Knowledge::new();
        action.execute("r", &mut knowledge, &[json!(1), json!(2)]).unwrap();
        assert_eq!(knowledge.result("count"), Some(&json!(2)));
    }

    #[test]
    fn test_registry_resolves_handlers() {
        let registry = ActionRegistry::new();
        registry.register("noop", noop);

        let action = registry.resolve("noop").unwrap();
        assert_eq!(action.describe(), json!({"handler": "noop"}));
        assert!(matches!(
            registry.resolve("missing"),
            Err(RuleError::UnknownHandler(name)) if name == "missing"
        ));
        assert_eq!(registry.names(), vec!["noop"]);
    }

    #[test]
    fn test_handler_errors_are_returned() {
        let registry = ActionRegistry::new();
        registry.register("fail", |_: &mut Knowledge, _: &[Value]| -> std::result::Result<(), ActionError> {
            Err("storage unavailable".into())
        });

        let action = registry.resolve("fail").unwrap();
        let err = action.execute("r", &mut Knowledge::new(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "storage unavailable");
    }
}
