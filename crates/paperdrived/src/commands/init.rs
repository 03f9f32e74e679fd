//! Module for setting up a paperdrive configuration.

use super::*;

/// Arguments that can be used for the [`Commands::Init`]
#[derive(Args, Clone)]
pub struct InitArgs {
  /// Directory for settings and logs
  #[arg(long)]
  pub storage_path: Option<PathBuf>,

  /// Drive folder id paths are resolved from (defaults to "root", the user's My Drive)
  #[arg(long)]
  pub root_folder_id: Option<String>,
}

/// Function for the [`Commands::Init`] in the CLI.
pub async fn init<I: UserInteraction>(
  interaction: &I,
  config_path: &Path,
  args: InitArgs,
) -> Result<()> {
  let InitArgs { storage_path, root_folder_id } = args;

  if config_path.exists()
    && !interaction.confirm(&format!(
      "Configuration already exists at {config_path:?}, do you want to overwrite it?"
    ))?
  {
    interaction.reply(ResponseContent::Info(
      "Keeping the existing configuration. Pass --config to write one elsewhere.",
    ))?;
    return Ok(());
  }

  let mut config = if let Some(storage_path) = storage_path {
    Config::default().with_storage_path(&storage_path)
  } else if !interaction.confirm(&format!(
    "Would you like to use the default path {:?} for settings and logs?",
    Config::default_storage_path(),
  ))? {
    interaction.reply(ResponseContent::Info(
      "Please pass in your intended storage path using --storage-path",
    ))?;
    return Ok(());
  } else {
    Config::default()
  };

  if let Some(root_folder_id) = root_folder_id {
    config.drive.root_folder_id = root_folder_id;
  }

  std::fs::create_dir_all(&config.storage_path)?;
  config.save(config_path)?;
  info!("Wrote configuration to {config_path:?}");

  interaction.reply(ResponseContent::Success(&format!(
    "Created paperdrive configuration with\nConfig path: {:?}\nStorage path: {:?}\nToken \
     variable: ${}",
    config_path, config.storage_path, config.auth.token_env,
  )))?;
  Ok(())
}
