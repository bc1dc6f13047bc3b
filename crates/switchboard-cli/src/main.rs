//! Switchboard CLI - rule-based request dispatch from the command line.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use switchboard_cli::commands::{self, CheckArgs, ConfigCommand, DispatchArgs, UrlArgs};
use switchboard_cli::{OutputFormat, Session};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(about = "Dispatch requests against rule tables and build URLs from named patterns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long = "output", value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Output JSON format (alias for --output json)
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file path (defaults to $SWITCHBOARD_CONFIG or ~/.switchboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run a request through the rule tables
    ///
    /// Examples:
    ///   switchboard dispatch GET /users/42 -t rules/
    ///   switchboard dispatch POST /login --post user=ada --all
    Dispatch(DispatchArgs),

    /// Build the URL of a configured resource
    Url(UrlArgs),

    /// Load and compile rule tables, printing the effective rules
    Check(CheckArgs),

    /// Manage switchboard configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = if cli.json { OutputFormat::Json } else { cli.format };
    let explicit = cli.config.as_deref();

    match cli.command {
        Command::Config { command } => commands::handle_config_command(command, explicit)?,
        Command::Dispatch(args) => {
            let session = Session::open(explicit)?;
            if !commands::handle_dispatch_command(args, &session, format)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Url(args) => {
            let session = Session::open(explicit)?;
            commands::handle_url_command(args, &session, format)?;
        }
        Command::Check(args) => {
            let session = Session::open(explicit)?;
            commands::handle_check_command(args, &session, format)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
