//! TOML rule table definitions and types
//!
//! This module defines the structure of rule tables as they appear in TOML
//! files, and turns them into executable [`Rule`]s.
//!
//! ```toml
//! [table]
//! name = "blog"
//!
//! [[rules]]
//! name = "post"
//! priority = 10
//!
//! [[rules.conditions]]
//! type = "request"
//! method = "GET"
//! path = "/posts/{year}/{slug}"
//!
//! [[rules.actions]]
//! bind = ["year", "slug"]
//!
//! [[rules.actions]]
//! handler = "show_post"
//! ```

use crate::action::{ActionRegistry, RuleAction};
use crate::registry::ConditionRegistry;
use crate::rule::Rule;
use crate::{Result, RuleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use switchboard_core::DispatchMode;

/// A complete TOML rule file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlRuleFile {
    /// Table metadata (optional)
    #[serde(default)]
    pub table: Option<TableMetadata>,

    /// List of rules, in file order
    #[serde(default)]
    pub rules: Vec<TomlRule>,
}

/// Table metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableMetadata {
    /// Table name (e.g., "blog", "admin")
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Version of this table
    #[serde(default)]
    pub version: Option<String>,

    /// Dispatch mode for this table, used when it is dispatched on its own
    #[serde(default)]
    pub mode: Option<DispatchMode>,
}

/// A single TOML rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlRule {
    /// Rule name, unique within a dispatcher
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Priority (higher = attempted first)
    #[serde(default)]
    pub priority: Option<i64>,

    /// Conditions, evaluated in order
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,

    /// Actions, run in order on match
    #[serde(default)]
    pub actions: Vec<RuleActionConfig>,
}

/// One `[[rules.conditions]]` entry: the kind tag plus its options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConditionConfig {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Action configuration from TOML
///
/// Exactly one field must be set per entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleActionConfig {
    /// Call a handler registered in the [`ActionRegistry`]
    #[serde(default)]
    pub handler: Option<String>,

    /// Store backreferences as named results (single string or array)
    #[serde(default, deserialize_with = "deserialize_names")]
    pub bind: Option<Vec<String>>,

    /// Store constant results
    #[serde(default)]
    pub set: Option<Map<String, Value>>,

    /// Log a message when the rule runs
    #[serde(default)]
    pub log: Option<String>,
}

/// Custom deserializer for `bind` that accepts both String and Vec<String>
fn deserialize_names<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct NamesVisitor;

    impl<'de> Visitor<'de> for NamesVisitor {
        type Value = Option<Vec<String>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(vec![value.to_string()]))
        }

        fn visit_string<E>(self, value: String) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(vec![value]))
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut names = Vec::new();
            while let Some(name) = seq.next_element()? {
                names.push(name);
            }
            Ok(Some(names))
        }
    }

    deserializer.deserialize_any(NamesVisitor)
}

impl RuleActionConfig {
    /// Convert to an executable RuleAction, resolving handlers through
    /// `actions`.
    pub fn to_action(&self, rule: &str, actions: &ActionRegistry) -> Result<RuleAction> {
        let set_fields = [
            self.handler.is_some(),
            self.bind.is_some(),
            self.set.is_some(),
            self.log.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        if set_fields != 1 {
            return Err(RuleError::InvalidAction {
                rule: rule.to_string(),
                message: format!(
                    "an action sets exactly one of handler, bind, set or log ({set_fields} given)"
                ),
            });
        }

        if let Some(name) = &self.handler {
            return actions.resolve(name);
        }
        if let Some(names) = &self.bind {
            return Ok(RuleAction::Bind(names.clone()));
        }
        if let Some(values) = &self.set {
            return Ok(RuleAction::Set(values.clone()));
        }
        Ok(RuleAction::Log(self.log.clone().unwrap_or_default()))
    }
}

impl TomlRule {
    /// Build the executable rule.
    pub fn compile(&self, conditions: &ConditionRegistry, actions: &ActionRegistry) -> Result<Rule> {
        let mut rule = Rule::new(&self.name).priority(self.priority.unwrap_or(0));
        if let Some(description) = &self.description {
            rule = rule.description(description);
        }

        for condition in &self.conditions {
            rule = rule.boxed_condition(conditions.construct(&condition.kind, &condition.options)?);
        }
        for action in &self.actions {
            rule = rule.action(action.to_action(&self.name, actions)?);
        }

        Ok(rule)
    }

    /// Every regex configured by this rule's conditions, nested ones
    /// included.
    pub fn regex_patterns(&self) -> Vec<&str> {
        let mut patterns = Vec::new();
        for condition in &self.conditions {
            collect_patterns(&condition.kind, &condition.options, &mut patterns);
        }
        patterns
    }
}

impl TomlRuleFile {
    /// Build every rule of the file, in file order.
    pub fn compile(&self, conditions: &ConditionRegistry, actions: &ActionRegistry) -> Result<Vec<Rule>> {
        self.rules
            .iter()
            .map(|rule| rule.compile(conditions, actions))
            .collect()
    }
}

fn collect_patterns<'a>(kind: &str, options: &'a Map<String, Value>, out: &mut Vec<&'a str>) {
    match kind {
        "url_path" => {
            for (key, value) in options {
                if key == "pattern" || key.starts_with("chunk[") {
                    if let Some(pattern) = value.as_str() {
                        out.push(pattern);
                    }
                }
            }
        }
        "url_params" if options.get("operator").and_then(Value::as_str) == Some("regexp") => {
            if let Some(pattern) = options.get("value").and_then(Value::as_str) {
                out.push(pattern);
            }
        }
        "bool" => {
            let nested = options
                .get("conditions")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_object);
            for table in nested {
                if let Some(kind) = table.get("type").and_then(Value::as_str) {
                    collect_patterns(kind, table, out);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Knowledge;
    use crate::Hooks;
    use serde_json::json;

    const BLOG: &str = r#"
[table]
name = "blog"
mode = "first"

[[rules]]
name = "post"
description = "a single post"
priority = 10

[[rules.conditions]]
type = "request"
method = ["GET", "HEAD"]
path = "/posts/{year}/{slug}"

[[rules.actions]]
bind = ["year", "slug"]

[[rules.actions]]
set = { controller = "posts", page = 1 }

[[rules]]
name = "archive"

[[rules.conditions]]
type = "bool"
operator = "or"
conditions = [
    { type = "url_path", pattern = "^/archive$" },
    { type = "url_path", "chunk[0]" = "^old$" },
]

[[rules.actions]]
log = "archive hit"
"#;

    #[test]
    fn test_parse_rule_file() {
        let file: TomlRuleFile = toml::from_str(BLOG).unwrap();
        let table = file.table.as_ref().unwrap();
        assert_eq!(table.name, "blog");
        assert_eq!(table.mode, Some(DispatchMode::First));

        assert_eq!(file.rules.len(), 2);
        let post = &file.rules[0];
        assert_eq!(post.priority, Some(10));
        assert_eq!(post.conditions[0].kind, "request");
        assert_eq!(post.conditions[0].options["path"], json!("/posts/{year}/{slug}"));
        assert_eq!(post.actions[0].bind, Some(vec!["year".to_string(), "slug".to_string()]));
    }

    #[test]
    fn test_compile_and_run() {
        let file: TomlRuleFile = toml::from_str(BLOG).unwrap();
        let rules = file
            .compile(&ConditionRegistry::with_builtins(), &ActionRegistry::new())
            .unwrap();

        let mut knowledge = Knowledge::for_request("head", "/posts/2024/hello");
        assert!(rules[0].execute(&mut knowledge, &Hooks::new()).unwrap());
        assert_eq!(knowledge.result("year"), Some(&json!("2024")));
        assert_eq!(knowledge.result("slug"), Some(&json!("hello")));
        assert_eq!(knowledge.result("controller"), Some(&json!("posts")));
        assert_eq!(knowledge.result("page"), Some(&json!(1)));
    }

    #[test]
    fn test_bind_accepts_single_name() {
        let action: RuleActionConfig = toml::from_str(r#"bind = "id""#).unwrap();
        assert_eq!(action.bind, Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_action_needs_exactly_one_field() {
        let registry = ActionRegistry::new();

        let empty = RuleActionConfig::default();
        assert!(matches!(
            empty.to_action("r", &registry),
            Err(RuleError::InvalidAction { .. })
        ));

        let both = RuleActionConfig {
            log: Some("x".into()),
            bind: Some(vec!["a".into()]),
            ..Default::default()
        };
        assert!(both.to_action("r", &registry).is_err());

        let unknown = RuleActionConfig {
            handler: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(
            unknown.to_action("r", &registry),
            Err(RuleError::UnknownHandler(_))
        ));
    }

    #[test]
    fn test_unknown_action_keys_are_rejected() {
        let parsed: std::result::Result<RuleActionConfig, _> = toml::from_str(r#"redirect = "/""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_regex_patterns_include_nested() {
        let file: TomlRuleFile = toml::from_str(BLOG).unwrap();
        assert!(file.rules[0].regex_patterns().is_empty());
        assert_eq!(file.rules[1].regex_patterns(), vec!["^/archive$", "^old$"]);
    }

    #[test]
    fn test_unknown_condition_type() {
        let file: TomlRuleFile = toml::from_str(
            r#"
[[rules]]
name = "bad"
[[rules.conditions]]
type = "cookie"
name = "session"
"#,
        )
        .unwrap();

        assert!(matches!(
            file.compile(&ConditionRegistry::with_builtins(), &ActionRegistry::new()),
            Err(RuleError::UnknownConditionType(kind)) if kind == "cookie"
        ));
    }
}
