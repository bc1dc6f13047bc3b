use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use switchboard_config::{ConfigManager, ResourceEntry};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Initialize config file at ~/.switchboard/config.toml
    Init,

    /// Show config file path
    Path,

    /// Validate config file
    Validate,

    /// List settings, rule tables and resources
    List,

    /// Add a named URL pattern
    AddResource {
        /// Resource name (a-z, 0-9, '_', '.', '-')
        name: String,

        /// URL pattern, e.g. /users/{user.id}
        pattern: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a named URL pattern
    RemoveResource {
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Add a rule table file or directory
    AddTable {
        path: PathBuf,
    },
}

/// `explicit` is the global `--config` override.
pub fn handle_config_command(cmd: ConfigCommand, explicit: Option<&Path>) -> Result<()> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => ConfigManager::config_path()?,
    };

    match cmd {
        ConfigCommand::Init => init_config(&config_path),
        ConfigCommand::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigCommand::Validate => validate_config(&config_path),
        ConfigCommand::List => list_config(&config_path),
        ConfigCommand::AddResource {
            name,
            pattern,
            description,
        } => add_resource(&config_path, name, pattern, description),
        ConfigCommand::RemoveResource { name, yes } => remove_resource(&config_path, &name, yes),
        ConfigCommand::AddTable { path } => add_table(&config_path, &path),
    }
}

fn load(config_path: &Path) -> Result<ConfigManager> {
    ConfigManager::load_from(config_path)
        .context("Config not found. Run 'switchboard config init' first.")
}

fn init_config(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("To reinitialize, please delete the existing config first.");
        return Ok(());
    }

    ConfigManager::init_at(config_path)?;
    println!("{} Initialized config at: {}", "✓".green(), config_path.display());
    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    let manager = load(config_path)?;
    manager.validate().context("Config is invalid")?;

    let config = manager.config();
    println!("{} Config is valid", "✓".green());
    println!("  Version: {}", config.version);
    println!("  Tables: {}", config.tables.len());
    println!("  Resources: {}", config.resources.len());
    Ok(())
}

fn list_config(config_path: &Path) -> Result<()> {
    let manager = load(config_path)?;
    let config = manager.config();

    println!("{}", "Settings:".bold());
    println!("  mode: {}", config.settings.mode);
    println!("  escape_urls: {}", config.settings.escape_urls);
    println!("  clear_extractors: {}", config.settings.clear_extractors);
    if let Some(origin) = &config.origin {
        println!("  origin: {}", origin);
    }

    println!();
    println!("{}", "Rule tables:".bold());
    if config.tables.is_empty() {
        println!("  {}", "(none) add one with: switchboard config add-table <path>".bright_black());
    }
    for table in &config.tables {
        let marker = if table.exists() { "✓".green() } else { "✗".red() };
        println!("  {} {}", marker, table.display());
    }

    println!();
    println!("{}", "Resources:".bold());
    if config.resources.is_empty() {
        println!("  {}", "(none) add one with: switchboard config add-resource <name> <pattern>".bright_black());
    }
    for resource in &config.resources {
        println!("  {:20} {}", resource.name.cyan(), resource.pattern);
        if let Some(description) = &resource.description {
            println!("  {:20} {}", "", description.bright_black());
        }
    }

    Ok(())
}

fn add_resource(
    config_path: &Path,
    name: String,
    pattern: String,
    description: Option<String>,
) -> Result<()> {
    let mut manager = load(config_path)?;
    let entry = ResourceEntry {
        name: name.clone(),
        pattern: pattern.clone(),
        description,
    };

    manager
        .add_resource(entry)
        .with_context(|| format!("Failed to add resource '{}'", name))?;

    println!("{} Added resource: {} -> {}", "✓".green(), name, pattern);
    Ok(())
}

fn remove_resource(config_path: &Path, name: &str, skip_confirm: bool) -> Result<()> {
    let mut manager = load(config_path)?;

    let resource = manager
        .config()
        .resource(name)
        .ok_or_else(|| anyhow::anyhow!("Resource not found: {}", name))?;

    // Confirm removal unless --yes flag is provided
    if !skip_confirm {
        println!("Remove resource '{}' ({})?", resource.name, resource.pattern);
        print!("Continue? [y/N] ");
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;

        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    manager
        .remove_resource(name)
        .with_context(|| format!("Failed to remove resource '{}'", name))?;

    println!("{} Removed resource: {}", "✓".green(), name);
    Ok(())
}

fn add_table(config_path: &Path, path: &Path) -> Result<()> {
    let mut manager = load(config_path)?;

    manager
        .add_table(path)
        .with_context(|| format!("Failed to add rule table '{}'", path.display()))?;

    let added = manager.tables().last().map_or(path, PathBuf::as_path);
    println!("{} Added rule table: {}", "✓".green(), added.display());
    Ok(())
}
