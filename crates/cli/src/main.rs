//! bmk: resolve build labels against a workspace.

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// bmk - Incremental build label resolver
#[derive(Parser)]
#[command(name = "bmk")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Workspace root (default: current directory)
  #[arg(short, long, global = true)]
  workspace: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve labels to targets
  Resolve {
    /// Labels to resolve, e.g. //a:foo
    #[arg(required = true)]
    labels: Vec<String>,

    /// Keep resolving other labels after the first failure
    #[arg(short, long)]
    keep_going: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// List the targets declared by a package
  Targets {
    /// Package name, e.g. a/b or //a/b
    package: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
  let filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(code) => code,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<ExitCode> {
  let workspace = match cli.workspace {
    Some(path) => path,
    None => std::env::current_dir().context("Failed to determine current directory")?,
  };
  let workspace =
    dunce::canonicalize(&workspace).with_context(|| format!("Workspace not found: {}", workspace.display()))?;

  match cli.command {
    Commands::Resolve {
      labels,
      keep_going,
      format,
    } => cmd::cmd_resolve(&workspace, &labels, keep_going, format, cli.verbose),
    Commands::Targets { package, format } => cmd::cmd_targets(&workspace, &package, format),
  }
}
