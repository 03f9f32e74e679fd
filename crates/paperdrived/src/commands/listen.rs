//! Module for the JSON-lines listener.
//!
//! Each line on stdin is either a trigger or a prompt message:
//!
//! ```text
//! {"command":"SavePaper","url":"https://arxiv.org/abs/2301.07041"}
//! {"action":"uploadCustomTitle","data":{"customTitle":"..","originalData":{..}}}
//! {"action":"forceClosePopup"}
//! ```
//!
//! Every line produces exactly one `outcome`, `response` or `error` event on stdout.
//! Notifications and prompt open/close requests are written as they happen, so a bridge
//! reading stdout sees them before the event that ends the line. Logs go to a file, never
//! to stdout.

use std::io::Write;

use paperdrive::{
  saver::{Message, Response, Trigger},
  settings::CustomTitleData,
  upload::UploadResult,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::*;

/// One inbound line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
  /// A user trigger
  Trigger(Trigger),
  /// A prompt message
  Message(Message),
}

/// One outbound line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
  /// A notice for the user
  Notification(Notification),
  /// The prompt should open or close
  Popup {
    /// `open` or `close`
    state: &'static str,
  },
  /// How a trigger ended
  Outcome {
    /// Name of the outcome
    outcome: &'static str,
    /// Upload result, for triggers that uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    result:  Option<UploadResult>,
    /// Data for the prompt, when a custom-title flow started
    #[serde(skip_serializing_if = "Option::is_none")]
    data:    Option<CustomTitleData>,
    /// Why the trigger failed
    #[serde(skip_serializing_if = "Option::is_none")]
    error:   Option<String>,
  },
  /// Reply to a prompt message
  Response(Response),
  /// The line could not be understood
  Error {
    /// What was wrong with it
    message: String,
  },
}

impl From<Outcome> for Event {
  fn from(outcome: Outcome) -> Self {
    let (name, result, data, error) = match outcome {
      Outcome::Uploaded(result) => ("uploaded", Some(result), None, None),
      Outcome::Skipped => ("skipped", None, None, None),
      Outcome::Unsupported => ("unsupported", None, None, None),
      Outcome::PromptOpened(data) => ("promptOpened", None, Some(data), None),
      Outcome::PromptCancelled => ("promptCancelled", None, None, None),
      Outcome::Failed(error) => ("failed", None, None, Some(error)),
    };
    Event::Outcome { outcome: name, result, data, error }
  }
}

/// Writes events to stdout, one JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLines;

impl JsonLines {
  /// Writes and flushes one event.
  pub fn emit(&self, event: &Event) -> Result<()> {
    let line = serde_json::to_string(event)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
  }
}

/// Maps a write failure into the library's error type.
fn library_error(error: PaperdrivedError) -> PaperDriveError {
  match error {
    PaperdrivedError::Io(e) => PaperDriveError::Io(e),
    PaperdrivedError::Json(e) => PaperDriveError::Json(e),
    other => PaperDriveError::Storage(other.to_string()),
  }
}

#[async_trait]
impl Notifier for JsonLines {
  async fn notify(&self, notification: &Notification) -> paperdrive::error::Result<()> {
    self.emit(&Event::Notification(notification.clone())).map_err(library_error)
  }
}

#[async_trait]
impl PopupControl for JsonLines {
  async fn open(&self) -> paperdrive::error::Result<()> {
    self.emit(&Event::Popup { state: "open" }).map_err(library_error)
  }

  async fn force_close(&self) -> paperdrive::error::Result<()> {
    self.emit(&Event::Popup { state: "close" }).map_err(library_error)
  }
}

/// Parses one inbound line.
fn parse_line(line: &str) -> core::result::Result<Inbound, String> {
  serde_json::from_str(line).map_err(|e| format!("Invalid message: {e}"))
}

/// Function for the [`Commands::Listen`] in the CLI.
pub async fn listen(config: Config) -> Result<()> {
  let saver = PaperSaver::builder()
    .with_config(config.clone())
    .with_notifier(JsonLines)
    .with_popup(JsonLines)
    .build();
  let mut context = SaveContext::new(config.save.debounce());
  let mut stdin = BufReader::new(tokio::io::stdin());
  let mut buffer = Vec::new();
  info!("Listening for triggers and messages on stdin");

  loop {
    buffer.clear();
    if stdin.read_until(b'\n', &mut buffer).await? == 0 {
      break;
    }
    let line = match String::from_utf8(std::mem::take(&mut buffer)) {
      Ok(line) => line,
      Err(e) => {
        warn!("Rejected line that is not UTF-8: {e}");
        JsonLines.emit(&Event::Error { message: format!("Invalid message: {e}") })?;
        continue;
      },
    };
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let event = match parse_line(line) {
      Ok(Inbound::Trigger(trigger)) => saver.handle_trigger(&mut context, &trigger).await.into(),
      Ok(Inbound::Message(message)) =>
        Event::Response(saver.handle_message(&mut context, message).await),
      Err(message) => {
        warn!("Rejected line {line:?}: {message}");
        Event::Error { message }
      },
    };
    JsonLines.emit(&event)?;
  }

  info!("stdin closed, listener stopping");
  Ok(())
}

#[cfg(test)]
mod tests {
  use paperdrive::paper::IdType;

  use super::*;

  #[test]
  fn test_parse_trigger_and_messages() {
    let trigger = parse_line(r#"{"command":"SavePaperWithCustomTitle","url":"https://arxiv.org/abs/1"}"#);
    assert!(matches!(
      trigger,
      Ok(Inbound::Trigger(Trigger { command: Command::SavePaperWithCustomTitle, .. }))
    ));

    let close = parse_line(r#"{"action":"closePopup"}"#);
    assert!(matches!(close, Ok(Inbound::Message(Message::ClosePopup))));

    let upload = parse_line(
      r#"{"action":"uploadCustomTitle","data":{"customTitle":"T","originalData":{"pdfUrl":"https://x/y.pdf","identifier":"1","idType":"Usenix"}}}"#,
    );
    let Ok(Inbound::Message(Message::UploadCustomTitle(upload))) = upload else {
      panic!("expected an upload message");
    };
    assert_eq!(upload.custom_title.as_deref(), Some("T"));
    assert_eq!(upload.original_data.id_type, Some(IdType::Usenix));

    assert!(parse_line(r#"{"command":"maybe_open_popup"}"#).is_err());
    assert!(parse_line("not json").is_err());
  }

  #[test]
  fn test_event_wire_format() {
    let event = Event::from(Outcome::Unsupported);
    assert_eq!(
      serde_json::to_value(&event).unwrap(),
      serde_json::json!({ "event": "outcome", "outcome": "unsupported" })
    );

    let event = Event::Response(Response::ok());
    assert_eq!(
      serde_json::to_value(&event).unwrap(),
      serde_json::json!({ "event": "response", "success": true })
    );

    let event = Event::Notification(Notification::info("Saving: X.pdf"));
    assert_eq!(
      serde_json::to_value(&event).unwrap(),
      serde_json::json!({ "event": "notification", "level": "info", "message": "Saving: X.pdf" })
    );
  }
}
