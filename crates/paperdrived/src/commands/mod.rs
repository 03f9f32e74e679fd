//! CLI commands.

use super::*;

pub mod init;
pub mod listen;
pub mod path;
pub mod save;

pub use init::{init, InitArgs};
pub use listen::listen;
pub use path::{path, PathCommands};
pub use save::{save, SaveArgs};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Write a default configuration file and create the storage directory
  Init(InitArgs),

  /// Save the paper behind a page URL to Drive
  Save(SaveArgs),

  /// Show or change the Drive folder papers are saved into
  Path {
    /// What to do with the folder path
    #[command(subcommand)]
    cmd: PathCommands,
  },

  /// Serve triggers and prompt messages as JSON lines on stdin/stdout
  Listen,
}

/// The service as the terminal commands use it.
fn terminal_saver(config: &Config) -> PaperSaver {
  PaperSaver::builder().with_config(config.clone()).with_notifier(ConsoleNotifier).build()
}
