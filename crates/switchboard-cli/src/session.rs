//! Shared setup for commands: config, rule tables, dispatcher and request.

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchboard_config::{ConfigError, ConfigManager, GlobalSettings};
use switchboard_core::{parse_assignment, DispatchMode, RequestParameters, StaticIdentity};
use switchboard_rule_engine::{
    ActionError, ActionRegistry, ConditionRegistry, Dispatcher, Knowledge, LoadedTable,
    RuleLoader, TomlRule, FACT_EXTRA_PATH,
};
use switchboard_url::Resources;
use tracing::debug;

/// Configuration for one CLI invocation.
///
/// The config file is optional for everything except `config` commands:
/// without one, defaults apply and only tables given on the command line
/// (or in `SWITCHBOARD_RULES_DIR`) are loaded.
#[derive(Debug, Default)]
pub struct Session {
    config: Option<ConfigManager>,
}

impl Session {
    /// Open the config at `explicit`, or at the default location.
    ///
    /// An explicit path must exist; a missing default config is not an error.
    pub fn open(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Some(
                ConfigManager::load_from(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
            ),
            None => match ConfigManager::load() {
                Ok(manager) => Some(manager),
                Err(ConfigError::ConfigNotFound(path)) => {
                    debug!(path = %path.display(), "no config file, using defaults");
                    None
                }
                Err(e) => return Err(e).context("Failed to load config"),
            },
        };
        Ok(Self { config })
    }

    pub fn with_manager(manager: ConfigManager) -> Self {
        Self {
            config: Some(manager),
        }
    }

    pub fn config(&self) -> Option<&ConfigManager> {
        self.config.as_ref()
    }

    pub fn settings(&self) -> GlobalSettings {
        self.config
            .as_ref()
            .map(|manager| manager.config().settings.clone())
            .unwrap_or_default()
    }

    /// Loader over the environment directory, configured tables, then `extra`.
    pub fn loader(&self, extra: &[PathBuf]) -> RuleLoader {
        let configured = self.config.iter().flat_map(|manager| manager.tables());
        configured
            .chain(extra)
            .fold(RuleLoader::from_env(), |loader, path| loader.with_path(path))
    }

    /// Load every table, failing when there is nothing to load.
    pub fn load_tables(&self, extra: &[PathBuf]) -> Result<Vec<LoadedTable>> {
        let loader = self.loader(extra);
        if loader.paths().is_empty() {
            bail!(
                "No rule tables given. Pass table paths, set {}, or run 'switchboard config add-table <path>'.",
                switchboard_rule_engine::RULES_DIR_ENV
            );
        }
        loader.load_tables().context("Failed to load rule tables")
    }

    pub fn resources(&self) -> Result<Resources> {
        match &self.config {
            Some(manager) => manager.resources().context("Invalid resources in config"),
            None => Ok(Resources::new()),
        }
    }
}

/// Rules of all tables in dispatch order (priority, then load order).
pub fn ordered_rules(tables: &[LoadedTable]) -> Vec<TomlRule> {
    let mut rules: Vec<TomlRule> = tables
        .iter()
        .flat_map(|table| table.file.rules.iter().cloned())
        .collect();
    switchboard_rule_engine::sort_by_priority(&mut rules);
    rules
}

/// Dispatch mode for `tables`.
///
/// A lone table that declares a `mode` overrides the configured one; a set
/// of tables always uses `settings.mode`.
pub fn effective_mode(tables: &[LoadedTable], settings: &GlobalSettings) -> DispatchMode {
    match tables {
        [single] => single
            .file
            .table
            .as_ref()
            .and_then(|metadata| metadata.mode)
            .unwrap_or(settings.mode),
        _ => settings.mode,
    }
}

/// A handler invocation captured during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerCall {
    pub handler: String,
    pub backreferences: Vec<Value>,
}

/// Records handler invocations instead of running application code.
///
/// Every handler name referenced by the rules is registered, so tables
/// written for an application can be dispatched as a dry run.
#[derive(Debug, Clone, Default)]
pub struct HandlerLog {
    calls: Arc<Mutex<Vec<HandlerCall>>>,
}

impl HandlerLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self, rules: &[TomlRule]) -> ActionRegistry {
        let registry = ActionRegistry::new();
        let names = rules
            .iter()
            .flat_map(|rule| rule.actions.iter())
            .filter_map(|action| action.handler.as_deref());

        for name in names {
            let calls = Arc::clone(&self.calls);
            let handler = name.to_string();
            registry.register(
                name,
                move |_: &mut Knowledge, refs: &[Value]| -> Result<(), ActionError> {
                    calls.lock().push(HandlerCall {
                        handler: handler.clone(),
                        backreferences: refs.to_vec(),
                    });
                    Ok(())
                },
            );
        }
        registry
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().clone()
    }
}

/// Compile rules into a dispatcher configured from `settings`.
pub fn build_dispatcher(
    rules: &[TomlRule],
    settings: &GlobalSettings,
    actions: &ActionRegistry,
) -> Result<Dispatcher> {
    let dispatcher =
        Dispatcher::from_toml_rules(rules, &ConditionRegistry::with_builtins(), actions)
            .context("Failed to compile rule tables")?;
    Ok(dispatcher
        .with_mode(settings.mode)
        .with_clear_extractors(settings.clear_extractors))
}

/// A request described on the command line.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub method: String,
    pub path: String,
    pub extra_path: Option<String>,
    /// `name=value` query parameters
    pub get: Vec<String>,
    /// `name=value` body parameters
    pub post: Vec<String>,
    /// `name=value` additional facts
    pub facts: Vec<String>,
    pub user: Option<String>,
    pub groups: Vec<String>,
}

impl RequestSpec {
    /// Build the Knowledge for this request.
    ///
    /// The query string of `path` seeds the query parameters; `--get`
    /// assignments override it. Without a user the request is anonymous.
    pub fn knowledge(&self) -> Result<Knowledge> {
        let query = self.path.split_once('?').map_or("", |(_, query)| query);
        let mut params = RequestParameters::from_query(query);
        for assignment in &self.get {
            let (name, value) = parse_assignment(assignment)?;
            params.get.insert(name, value);
        }
        for assignment in &self.post {
            let (name, value) = parse_assignment(assignment)?;
            params.post.insert(name, value);
        }

        let mut knowledge =
            Knowledge::for_request(&self.method, &self.path).with_parameters(Arc::new(params));

        if let Some(extra) = &self.extra_path {
            knowledge = knowledge.with_fact(FACT_EXTRA_PATH, extra.as_str());
        }
        for assignment in &self.facts {
            let (name, value) = parse_assignment(assignment)?;
            knowledge = knowledge.with_fact(name, value);
        }

        match &self.user {
            Some(user) => {
                let identity = self
                    .groups
                    .iter()
                    .fold(StaticIdentity::user(user), |identity, group| {
                        identity.with_group(group)
                    });
                knowledge = knowledge.with_identity(Arc::new(identity));
            }
            None if !self.groups.is_empty() => bail!("--group requires --user"),
            None => {}
        }

        Ok(knowledge)
    }
}
