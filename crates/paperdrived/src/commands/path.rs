//! Module for the destination folder path and its history.

use super::*;

/// Subcommands of [`Commands::Path`]
#[derive(Subcommand, Clone)]
pub enum PathCommands {
  /// Print the folder papers are saved into
  Show,

  /// Change the folder papers are saved into
  Set {
    /// Slash separated folder path, e.g. "papers/systems/2024". Empty resets to the default.
    path: String,
  },

  /// List previously used folder paths, most recent first
  History,
}

/// Function for the [`Commands::Path`] in the CLI.
pub async fn path<I: UserInteraction>(
  interaction: &I,
  config: Config,
  cmd: PathCommands,
) -> Result<()> {
  let saver = terminal_saver(&config);
  let settings = saver.settings();

  match cmd {
    PathCommands::Show => {
      let path = settings.folder_path().await?;
      interaction.reply(ResponseContent::Info(&format!("Saving papers to '{path}'")))?;
    },
    PathCommands::Set { path } => {
      let stored = settings.save_folder_path(&path).await?;
      if path.trim().trim_matches('/').is_empty() {
        interaction.reply(ResponseContent::Info(&format!("Path reset to default \"{stored}\".")))?;
      } else {
        interaction.reply(ResponseContent::Success(&format!("Folder path saved: '{stored}'")))?;
      }
    },
    PathCommands::History => {
      let history = settings.path_history().await?;
      interaction.reply(ResponseContent::Paths(&history))?;
    },
  }
  Ok(())
}
