//! `switchboard dispatch`: run one request through the rule tables.

use crate::formatters::{self, OutputFormat};
use crate::session::{build_dispatcher, effective_mode, ordered_rules, HandlerCall, HandlerLog, RequestSpec, Session};
use anyhow::{Context, Result};
use clap::Args;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use switchboard_core::DispatchMode;
use switchboard_rule_engine::{Knowledge, Rule, RuleEvent};

#[derive(Args, Debug)]
pub struct DispatchArgs {
    /// Request method (GET, POST, ...)
    pub method: String,

    /// Request path, optionally with a query string
    pub path: String,

    /// Rule table files or directories, in addition to the configured ones
    #[arg(short, long = "table", value_name = "PATH")]
    pub tables: Vec<PathBuf>,

    /// Extra path after the script or mount point
    #[arg(long, value_name = "PATH")]
    pub extra_path: Option<String>,

    /// Query parameter (can be specified multiple times)
    #[arg(long = "get", value_name = "NAME=VALUE")]
    pub get: Vec<String>,

    /// Body parameter (can be specified multiple times)
    #[arg(long = "post", value_name = "NAME=VALUE")]
    pub post: Vec<String>,

    /// Additional fact (can be specified multiple times)
    #[arg(long = "fact", value_name = "NAME=VALUE")]
    pub facts: Vec<String>,

    /// Current identity; the request is anonymous without one
    #[arg(long)]
    pub user: Option<String>,

    /// Group membership of --user (can be specified multiple times)
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Run every matching rule instead of stopping at the first
    #[arg(long)]
    pub all: bool,
}

/// One rule attempt and its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub rule: String,
    pub matched: bool,
}

/// Everything a dispatch produced.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub method: String,
    pub path: String,
    pub mode: DispatchMode,
    pub found: bool,
    pub matched: Vec<String>,
    pub attempts: Vec<Attempt>,
    pub results: Map<String, Value>,
    pub backreferences: Vec<Value>,
    pub handlers: Vec<HandlerCall>,
}

/// Returns whether any rule matched.
pub fn handle_dispatch_command(
    args: DispatchArgs,
    session: &Session,
    format: OutputFormat,
) -> Result<bool> {
    let outcome = dispatch(&args, session)?;
    formatters::emit(&outcome, format);
    Ok(outcome.found)
}

pub fn dispatch(args: &DispatchArgs, session: &Session) -> Result<DispatchOutcome> {
    let tables = session.load_tables(&args.tables)?;

    let mut settings = session.settings();
    settings.mode = effective_mode(&tables, &settings);
    if args.all {
        settings.mode = DispatchMode::All;
    }
    let rules = ordered_rules(&tables);

    let log = HandlerLog::new();
    let dispatcher = build_dispatcher(&rules, &settings, &log.registry(&rules))?;

    let attempts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&attempts);
    dispatcher.add_observer(move |event: RuleEvent, rule: &Rule, _: &Knowledge| {
        if let RuleEvent::ProcessEnd { matched } = event {
            sink.lock().push(Attempt {
                rule: rule.name().to_string(),
                matched,
            });
        }
    });

    let request = RequestSpec {
        method: args.method.clone(),
        path: args.path.clone(),
        extra_path: args.extra_path.clone(),
        get: args.get.clone(),
        post: args.post.clone(),
        facts: args.facts.clone(),
        user: args.user.clone(),
        groups: args.groups.clone(),
    };
    let mut knowledge = request.knowledge()?;

    let report = dispatcher
        .run(&mut knowledge)
        .with_context(|| format!("Dispatch of {} {} failed", args.method, args.path))?;

    let attempts = attempts.lock().clone();
    Ok(DispatchOutcome {
        method: args.method.clone(),
        path: args.path.clone(),
        mode: settings.mode,
        found: report.is_found(),
        matched: report.names().into_iter().map(str::to_string).collect(),
        attempts,
        results: knowledge.results().clone(),
        backreferences: knowledge.backreferences().to_vec(),
        handlers: log.calls(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const TABLE: &str = r#"
[[rules]]
name = "admin"
priority = 10

[[rules.conditions]]
type = "authentication"
operator = "ingroup"
value = "admins"

[[rules.conditions]]
type = "url_path"
pattern = "^/admin/(\\w+)"

[[rules.actions]]
handler = "admin_page"

[[rules]]
name = "page"

[[rules.conditions]]
type = "request"
method = "GET"
path = "/{area}/{page}"

[[rules.actions]]
bind = ["area", "page"]
"#;

    fn args(dir: &TempDir, path: &str) -> DispatchArgs {
        let table = dir.path().join("site.toml");
        std::fs::write(&table, TABLE).unwrap();
        DispatchArgs {
            method: "GET".to_string(),
            path: path.to_string(),
            tables: vec![table],
            extra_path: None,
            get: Vec::new(),
            post: Vec::new(),
            facts: Vec::new(),
            user: None,
            groups: Vec::new(),
            all: false,
        }
    }

    #[test]
    fn test_anonymous_falls_through() {
        let dir = TempDir::new().unwrap();
        let outcome = dispatch(&args(&dir, "/admin/users"), &Session::default()).unwrap();

        assert!(outcome.found);
        assert_eq!(outcome.matched, vec!["page"]);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].matched);
        assert_eq!(outcome.results.get("area"), Some(&json!("admin")));
        assert!(outcome.handlers.is_empty());
    }

    #[test]
    fn test_group_member_reaches_handler() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, "/admin/users");
        args.user = Some("root".to_string());
        args.groups = vec!["admins".to_string()];
        args.all = true;

        let outcome = dispatch(&args, &Session::default()).unwrap();
        assert_eq!(outcome.mode, DispatchMode::All);
        assert_eq!(outcome.matched, vec!["admin", "page"]);
        assert_eq!(outcome.handlers[0].handler, "admin_page");
        assert_eq!(outcome.handlers[0].backreferences, vec![json!("users")]);
        assert_eq!(outcome.results.get("identity"), Some(&json!("root")));
    }

    #[test]
    fn test_table_mode_applies_without_flag() {
        let dir = TempDir::new().unwrap();
        let mut args = args(&dir, "/admin/users");
        std::fs::write(
            &args.tables[0],
            format!("[table]\nname = \"site\"\nmode = \"all\"\n{TABLE}"),
        )
        .unwrap();
        args.user = Some("root".to_string());
        args.groups = vec!["admins".to_string()];

        let outcome = dispatch(&args, &Session::default()).unwrap();
        assert_eq!(outcome.mode, DispatchMode::All);
        assert_eq!(outcome.matched, vec!["admin", "page"]);
    }

    #[test]
    fn test_not_found() {
        let dir = TempDir::new().unwrap();
        let outcome = dispatch(&args(&dir, "/"), &Session::default()).unwrap();
        assert!(!outcome.found);
        assert!(outcome.results.is_empty());
    }
}
