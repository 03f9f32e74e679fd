//! Module for saving the paper behind a page URL.

use paperdrive::saver::{CustomTitleUpload, Message, OriginalData};

use super::*;

/// Arguments that can be used for the [`Commands::Save`]
#[derive(Args, Clone)]
pub struct SaveArgs {
  /// URL of the paper page (arXiv, ACM Digital Library or Usenix)
  /// Examples: "https://arxiv.org/abs/2301.07041", "https://dl.acm.org/doi/10.1145/3600006.3613140"
  pub url: String,

  /// Save under this title instead of the page's own
  #[arg(long, group = "title_source")]
  pub title: Option<String>,

  /// Ask for a title, pre-filled with the page's own
  #[arg(long, group = "title_source")]
  pub prompt: bool,
}

/// Function for the [`Commands::Save`] in the CLI.
pub async fn save<I: UserInteraction>(interaction: &I, config: Config, args: SaveArgs) -> Result<()> {
  let SaveArgs { url, title, prompt } = args;
  let saver = terminal_saver(&config);
  let mut context = SaveContext::new(config.save.debounce());

  if !prompt && title.is_none() {
    return match saver.handle_command(&mut context, Command::SavePaper, &url).await {
      Outcome::Uploaded(result) if result.success => Ok(()),
      Outcome::Uploaded(result) => Err(PaperdrivedError::SaveFailed(result.message)),
      Outcome::Failed(reason) => Err(PaperdrivedError::SaveFailed(reason)),
      outcome => {
        debug!("Save finished without upload: {outcome:?}");
        Ok(())
      },
    };
  }

  let data = match saver.handle_command(&mut context, Command::SavePaperWithCustomTitle, &url).await
  {
    Outcome::PromptOpened(data) => data,
    Outcome::Failed(reason) => return Err(PaperdrivedError::SaveFailed(reason)),
    outcome => {
      debug!("Custom title flow did not start: {outcome:?}");
      return Ok(());
    },
  };

  let custom_title = match title {
    Some(title) => title,
    None => interaction.prompt("Title", data.original_title.as_deref())?,
  };

  if custom_title.trim().is_empty() {
    interaction.reply(ResponseContent::Error("Please enter a title."))?;
    return Err(PaperdrivedError::SaveFailed("no title given".to_string()));
  }

  let message = Message::UploadCustomTitle(CustomTitleUpload {
    custom_title:  Some(custom_title),
    original_data: OriginalData::from(&data),
  });
  let response = saver.handle_message(&mut context, message).await;
  if response.success {
    Ok(())
  } else {
    Err(PaperdrivedError::SaveFailed(response.message.unwrap_or_default()))
  }
}
