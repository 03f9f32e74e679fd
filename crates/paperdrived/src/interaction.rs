//! Terminal interaction: prompts, replies, and notices.

use dialoguer::{Confirm, Input};

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for user prompts
pub static PROMPT_PREFIX: &str = "❯ ";
/// Prefix for list items
pub static ITEM_PREFIX: &str = "├─";
/// Prefix for the last list item
pub static LAST_ITEM_PREFIX: &str = "└─";

/// Something a command reports back to the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// The command did what was asked
  Success(&'a str),
  /// The command failed
  Error(&'a str),
  /// Neutral information
  Info(&'a str),
  /// A list of folder paths, most recent first
  Paths(&'a [String]),
}

/// How commands talk to the user.
pub trait UserInteraction {
  /// Asks a yes/no question.
  fn confirm(&self, message: &str) -> Result<bool>;
  /// Asks for a line of text, pre-filled with `default`.
  fn prompt(&self, message: &str, default: Option<&str>) -> Result<String>;
  /// Shows a reply.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

/// [`UserInteraction`] on the controlling terminal.
#[derive(Debug, Clone, Copy)]
pub struct Terminal {
  /// Answer every question with its default instead of asking
  accept_defaults: bool,
}

impl Terminal {
  /// Creates a terminal interaction.
  pub fn new(accept_defaults: bool) -> Self { Self { accept_defaults } }
}

impl UserInteraction for Terminal {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    Ok(
      Confirm::new()
        .with_prompt(format!("{}{message}", style(PROMPT_PREFIX).cyan()))
        .default(true)
        .interact()?,
    )
  }

  fn prompt(&self, message: &str, default: Option<&str>) -> Result<String> {
    if self.accept_defaults {
      return Ok(default.unwrap_or_default().to_string());
    }
    let mut input =
      Input::<String>::new().with_prompt(format!("{}{message}", style(PROMPT_PREFIX).cyan()));
    if let Some(default) = default {
      input = input.with_initial_text(default);
    }
    Ok(input.interact_text()?)
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Success(message) => println!("{}{message}", style(SUCCESS_PREFIX).green()),
      ResponseContent::Error(message) => println!("{}{}", style(ERROR_PREFIX).red(), style(message).red()),
      ResponseContent::Info(message) => println!("{}{message}", style(INFO_PREFIX).cyan()),
      ResponseContent::Paths(paths) => {
        if paths.is_empty() {
          println!("{}No folder paths used yet", style(INFO_PREFIX).cyan());
        }
        for (index, path) in paths.iter().enumerate() {
          let prefix = if index + 1 == paths.len() { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
          println!("{} {}", style(prefix).dim(), style(path).yellow());
        }
      },
    }
    Ok(())
  }
}

/// [`Notifier`] that prints notices to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
  async fn notify(&self, notification: &Notification) -> paperdrive::error::Result<()> {
    let message = notification.message.as_str();
    match notification.level {
      NotificationLevel::Info => println!("{}{message}", style(INFO_PREFIX).cyan()),
      NotificationLevel::Success => println!("{}{message}", style(SUCCESS_PREFIX).green()),
      NotificationLevel::Failure =>
        println!("{}{}", style(ERROR_PREFIX).red(), style(message).red()),
    }
    Ok(())
  }
}
