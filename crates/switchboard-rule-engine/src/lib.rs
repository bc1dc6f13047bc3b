//! Switchboard Rule Engine - declarative request dispatch
//!
//! This crate matches a request context (a [`Knowledge`]) against ordered
//! rules. A rule is a list of conditions guarding a list of actions; the
//! [`Dispatcher`] attempts rules in order and runs the actions of the first
//! match (or of every match, in [`DispatchMode::All`]).
//!
//! # Architecture
//!
//! - **Knowledge**: request facts, committed results, and the transaction a
//!   rule attempt stages its output in
//! - **Conditions**: `url_path`, `url_params`, `authentication`, `bool` and
//!   `request`, plus any kind registered in a [`ConditionRegistry`]
//! - **Rules & hooks**: transactional rule execution with observer events
//!   and vetoes
//! - **TOML tables**: rules declared in files and loaded by [`RuleLoader`]
//!
//! # Example
//!
//! ```
//! use switchboard_rule_engine::{Dispatcher, Knowledge, RequestCondition, Rule, RuleAction};
//!
//! let dispatcher = Dispatcher::from_rules([Rule::new("user")
//!     .condition(RequestCondition::new().method("GET").path("/users/{id}").unwrap())
//!     .action(RuleAction::Bind(vec!["user_id".into()]))])
//! .unwrap();
//!
//! let mut knowledge = Knowledge::for_request("GET", "/users/42");
//! let matched = dispatcher.dispatch(&mut knowledge).unwrap();
//!
//! assert_eq!(matched.unwrap().name(), "user");
//! assert_eq!(knowledge.result("user_id"), Some(&serde_json::json!("42")));
//! ```

pub mod action;
pub mod condition;
pub mod constants;
pub mod engine;
pub mod hooks;
pub mod knowledge;
pub mod loader;
pub mod registry;
pub mod rule;
pub mod safe_regex;
pub mod toml_rule;

// Re-export core types
pub use action::{Action, ActionError, ActionRegistry, RuleAction};
pub use condition::{
    resolve_chunk_index, AuthOperator, AuthenticationCondition, BoolCondition, BoolOperator,
    Condition, ConditionOptions, ParamOperator, PathSource, RequestCondition, UrlParamsCondition,
    UrlPathCondition,
};
pub use constants::*;
pub use engine::{DispatchReport, Dispatcher};
pub use hooks::{Hooks, RuleEvent, RuleObserver, TracingObserver, Veto};
pub use knowledge::{
    FactExtractor, Knowledge, Savepoint, FACT_EXTRA_PATH, FACT_METHOD, FACT_PATH, RESULT_IDENTITY,
};
pub use loader::{sort_by_priority, LoadedTable, RuleLoader, RULES_DIR_ENV};
pub use registry::{ConditionFactory, ConditionRegistry};
pub use rule::Rule;
pub use safe_regex::compile_regex_safe;
pub use switchboard_core::DispatchMode;
pub use toml_rule::{ConditionConfig, RuleActionConfig, TableMetadata, TomlRule, TomlRuleFile};

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// Error types for rule engine
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown condition type: {0}")]
    UnknownConditionType(String),

    #[error("Invalid {kind} condition: {message}")]
    InvalidCondition { kind: String, message: String },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Missing fact: {0}")]
    MissingFact(String),

    #[error("Fact '{name}' must be {expected}")]
    InvalidFact { name: String, expected: &'static str },

    #[error("Duplicate rule: {0}")]
    DuplicateRule(String),

    #[error("Unknown action handler: {0}")]
    UnknownHandler(String),

    #[error("Invalid action in rule '{rule}': {message}")]
    InvalidAction { rule: String, message: String },

    #[error("Action of rule '{rule}' failed: {source}")]
    Action { rule: String, source: ActionError },

    #[error("Failed to load rules from {path}: {source}")]
    LoadError {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Url(#[from] switchboard_url::UrlError),
}
