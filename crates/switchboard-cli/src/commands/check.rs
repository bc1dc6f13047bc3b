//! `switchboard check`: load and compile rule tables without dispatching.

use crate::formatters::{self, OutputFormat};
use crate::session::{build_dispatcher, effective_mode, ordered_rules, HandlerLog, Session};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use switchboard_core::DispatchMode;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Rule table files or directories, in addition to the configured ones
    #[arg(value_name = "PATH")]
    pub tables: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub path: PathBuf,
    pub name: Option<String>,
    pub description: Option<String>,
    pub mode: Option<DispatchMode>,
    pub rules: usize,
}

/// Loaded tables and the effective configuration of every rule, in
/// dispatch order.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub mode: DispatchMode,
    pub tables: Vec<TableSummary>,
    pub rules: Vec<Value>,
}

pub fn handle_check_command(args: CheckArgs, session: &Session, format: OutputFormat) -> Result<()> {
    let report = check(&args, session)?;
    formatters::emit(&report, format);
    Ok(())
}

pub fn check(args: &CheckArgs, session: &Session) -> Result<CheckReport> {
    let tables = session.load_tables(&args.tables)?;
    let mut settings = session.settings();
    settings.mode = effective_mode(&tables, &settings);
    let rules = ordered_rules(&tables);

    let dispatcher = build_dispatcher(&rules, &settings, &HandlerLog::new().registry(&rules))?;

    let summaries = tables
        .iter()
        .map(|table| {
            let metadata = table.file.table.as_ref();
            TableSummary {
                path: table.path.clone(),
                name: metadata.map(|m| m.name.clone()),
                description: metadata.and_then(|m| m.description.clone()),
                mode: metadata.and_then(|m| m.mode),
                rules: table.file.rules.len(),
            }
        })
        .collect();

    Ok(CheckReport {
        mode: dispatcher.mode(),
        tables: summaries,
        rules: dispatcher.rules().iter().map(|rule| rule.describe()).collect(),
    })
}
