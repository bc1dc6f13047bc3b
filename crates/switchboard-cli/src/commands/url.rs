//! `switchboard url`: build the URL of a configured resource.

use crate::formatters::{self, OutputFormat};
use crate::session::Session;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

#[derive(Args, Debug)]
pub struct UrlArgs {
    /// Resource name
    pub resource: String,

    /// Parameters as a JSON object, e.g. '{"user": {"id": 7}}'
    #[arg(short, long, value_name = "JSON", default_value = "{}")]
    pub params: String,

    /// Do not percent-encode placeholder values
    #[arg(long)]
    pub raw: bool,

    /// Prefix the configured origin
    #[arg(long)]
    pub absolute: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlOutput {
    pub resource: String,
    pub url: String,
}

pub fn handle_url_command(args: UrlArgs, session: &Session, format: OutputFormat) -> Result<()> {
    let output = build_url(&args, session)?;
    formatters::emit(&output, format);
    Ok(())
}

pub fn build_url(args: &UrlArgs, session: &Session) -> Result<UrlOutput> {
    let params: Value = serde_json::from_str(&args.params)
        .with_context(|| format!("--params is not valid JSON: {}", args.params))?;
    let escape = session.settings().escape_urls && !args.raw;
    let resources = session.resources()?;

    let url = if args.absolute {
        resources.absolute_url_for(&args.resource, &params, escape)
    } else {
        resources.url_for(&args.resource, &params, escape)
    }
    .with_context(|| format!("Failed to build URL for '{}'", args.resource))?;

    Ok(UrlOutput {
        resource: args.resource.clone(),
        url,
    })
}
