//! Command line trigger surface and listener for the `paperdrive` library.
//!
//! This crate provides the `paperdrive` binary. It supports:
//! - Writing a default configuration
//! - Saving the paper behind a page URL, optionally under a custom title
//! - Managing the destination folder path and its history
//! - A JSON-lines listener that a browser bridge can drive
//!
//! # Usage
//!
//! ```bash
//! # Write a default configuration
//! paperdrive init
//!
//! # Choose where papers go
//! paperdrive path set papers/crypto
//!
//! # Save a paper
//! paperdrive save https://arxiv.org/abs/2301.07041
//!
//! # Save it under your own title
//! paperdrive save https://arxiv.org/abs/2301.07041 --prompt
//!
//! # Serve triggers and prompt messages over stdin/stdout
//! paperdrive listen
//! ```
//!
//! Bearer tokens are read from `$PAPERDRIVE_TOKEN` or the configured token file. Use `-v`
//! (repeatable) to raise the log level; `RUST_LOG` overrides it.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use paperdrive::{
  notify::{Notification, NotificationLevel},
  prelude::*,
  saver::{Command, Outcome, PaperSaver, SaveContext},
  Config,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "File academic papers into Google Drive")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the configuration file. If not specified, uses the default platform-specific
  /// configuration directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,
}

impl Cli {
  /// The configuration file this invocation works with.
  fn config_path(&self) -> PathBuf { self.config.clone().unwrap_or_else(Config::default_path) }
}

/// Configures the logging system based on the verbosity level
///
/// # Arguments
///
/// * `verbosity` - Number of times the verbose flag was used
/// * `log_dir` - When set, logs go to a daily rolling file there instead of stderr
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// The returned guard flushes the log file and must be held until exit.
fn setup_logging(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true);

  match log_dir {
    Some(log_dir) => {
      let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "paperdrive.log"));
      builder.with_writer(writer).with_ansi(false).init();
      Some(guard)
    },
    None => {
      builder.with_writer(std::io::stderr).init();
      None
    },
  }
}

/// Entry point for the paperdrive CLI application
///
/// Parses arguments, loads the configuration, sets up logging, and runs the requested
/// command.
///
/// # Errors
///
/// Returns a [`PaperdrivedError`] when:
/// - The configuration cannot be read or written
/// - A save fails
/// - The terminal prompt fails
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let config_path = cli.config_path();
  let config = Config::load(&config_path)?;

  let _guard = match cli.command {
    Commands::Listen => setup_logging(cli.verbose, Some(&config.storage_path.join("logs"))),
    _ => setup_logging(cli.verbose, None),
  };
  debug!("Using configuration at {config_path:?}");

  let interaction = Terminal::new(cli.accept_defaults);
  match cli.command {
    Commands::Init(args) => init(&interaction, &config_path, args).await,
    Commands::Save(args) => save(&interaction, config, args).await,
    Commands::Path { cmd } => path(&interaction, config, cmd).await,
    Commands::Listen => listen(config).await,
  }
}
