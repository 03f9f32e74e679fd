//! Command and message handlers of the save service.
//!
//! A [`PaperSaver`] reacts to two kinds of input:
//!
//! - [`Command`]s, fired by the user on the page they are reading (save it now, or save it
//!   under a title of their choosing), and
//! - [`Message`]s, sent back by the custom-title prompt.
//!
//! State that must survive between inputs (the last save attempt for debouncing, and
//! whether a custom-title flow is in progress) lives in a [`SaveContext`] the caller owns
//! and passes by `&mut` to every handler.
//!
//! # Examples
//!
//! ```no_run
//! use paperdrive::{
//!   saver::{Message, PaperSaver, SaveContext},
//!   Config,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let saver = PaperSaver::builder().with_config(config.clone()).build();
//! let mut context = SaveContext::new(config.save.debounce());
//!
//! let message: Message = serde_json::from_str(r#"{"action":"forceClosePopup"}"#)?;
//! let response = saver.handle_message(&mut context, message).await;
//! assert!(response.success);
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::{
  drive::DriveClient,
  notify::{LogNotifier, NoPopup},
  settings::{CustomTitleData, JsonFileStore},
  site::SiteResolver,
  title::HttpTitleFetcher,
  upload::{ConfiguredTokenBroker, FileUploadRequest, UploadResult, Uploader},
};

/// Notice shown when a trigger repeats inside the debounce window.
const SKIP_NOTICE: &str = "Skipping duplicate download request for URL:";
/// Notice shown when the page matches no site binding.
const UNSUPPORTED_NOTICE: &str = "Current page is not a supported paper page.";
/// Failure notice for direct saves.
const SAVE_FAILED: &str = "Error saving paper";
/// Failure notice for starting a custom-title flow.
const CUSTOM_TITLE_FAILED: &str = "Error initializing custom title mode";
/// Response when a custom-title upload lacks a field.
const MISSING_DATA: &str = "Missing required data for custom save.";

/// A user trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
  /// Save the current page's paper under its own title
  SavePaper,
  /// Toggle the custom-title flow for the current page
  SavePaperWithCustomTitle,
}

impl FromStr for Command {
  type Err = PaperDriveError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "SavePaper" => Ok(Command::SavePaper),
      "SavePaperWithCustomTitle" => Ok(Command::SavePaperWithCustomTitle),
      other => Err(PaperDriveError::InvalidMessage(format!("unrecognized command `{other}`"))),
    }
  }
}

/// A command together with the page it was fired on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
  /// Which command
  pub command: Command,
  /// URL of the page the user is on
  pub url:     String,
}

/// A message from the custom-title prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum Message {
  /// Save the pending paper under the given title
  UploadCustomTitle(CustomTitleUpload),
  /// The prompt was dismissed
  ClosePopup,
  /// The prompt must be closed regardless of state
  ForceClosePopup,
}

/// Payload of [`Message::UploadCustomTitle`].
///
/// Every field is optional on the wire so that an incomplete request is answered with a
/// failure response instead of being rejected as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomTitleUpload {
  /// Title entered by the user
  pub custom_title:  Option<String>,
  /// The paper the title is for
  pub original_data: OriginalData,
}

/// The resolved paper a custom title applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OriginalData {
  /// Where the PDF is downloaded from
  pub pdf_url:    Option<String>,
  /// Identifier of the paper
  pub identifier: Option<String>,
  /// Scheme of the identifier, only named in log lines
  pub id_type:    Option<IdType>,
}

impl From<&CustomTitleData> for OriginalData {
  fn from(data: &CustomTitleData) -> Self {
    Self {
      pdf_url:    Some(data.pdf_url.clone()),
      identifier: Some(data.identifier.clone()),
      id_type:    Some(data.id_type),
    }
  }
}

/// Reply to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
  /// Whether the request did what it asked
  pub success: bool,
  /// Detail for the user, if any
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl Response {
  /// A bare success.
  pub fn ok() -> Self { Self { success: true, message: None } }

  /// A failure with a reason.
  pub fn failure(message: impl Into<String>) -> Self {
    Self { success: false, message: Some(message.into()) }
  }
}

impl From<UploadResult> for Response {
  fn from(result: UploadResult) -> Self {
    Self { success: result.success, message: Some(result.message) }
  }
}

/// What a command led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// An upload ran; the result says whether it succeeded
  Uploaded(UploadResult),
  /// The trigger repeated inside the debounce window
  Skipped,
  /// The page is not a supported paper page
  Unsupported,
  /// A custom-title flow started; the prompt should offer this data
  PromptOpened(CustomTitleData),
  /// A running custom-title flow was cancelled by repeating the trigger
  PromptCancelled,
  /// Resolution failed; the message is the logged error
  Failed(String),
}

/// The most recent admitted trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Attempt {
  /// Page URL of the trigger
  url: String,
  /// When it was admitted
  at:  DateTime<Utc>,
}

/// State carried between commands and messages.
#[derive(Debug, Clone)]
pub struct SaveContext {
  /// How long a repeated trigger for one URL is suppressed
  window:            Duration,
  /// Last admitted trigger
  last_attempt:      Option<Attempt>,
  /// Whether a custom-title flow is in progress
  custom_title_mode: bool,
}

impl SaveContext {
  /// Creates an idle context with the given debounce window.
  pub fn new(window: Duration) -> Self { Self { window, last_attempt: None, custom_title_mode: false } }

  /// Decides whether a trigger for `url` at `now` goes ahead, recording it if so.
  ///
  /// A trigger is suppressed only when the previous admitted trigger was for the same URL
  /// and less than the window ago. Suppressed triggers do not move the window.
  ///
  /// # Examples
  ///
  /// ```
  /// use chrono::{Duration, Utc};
  /// use paperdrive::saver::SaveContext;
  ///
  /// let mut context = SaveContext::new(Duration::milliseconds(1000));
  /// let start = Utc::now();
  /// assert!(context.admit("https://arxiv.org/abs/2301.07041", start));
  /// assert!(!context.admit("https://arxiv.org/abs/2301.07041", start + Duration::milliseconds(500)));
  /// assert!(context.admit("https://arxiv.org/abs/2301.07041", start + Duration::milliseconds(1100)));
  /// ```
  pub fn admit(&mut self, url: &str, now: DateTime<Utc>) -> bool {
    if let Some(last) = &self.last_attempt {
      if last.url == url && now.signed_duration_since(last.at) < self.window {
        return false;
      }
    }
    self.last_attempt = Some(Attempt { url: url.to_string(), at: now });
    true
  }

  /// Whether a custom-title flow is in progress.
  pub fn in_custom_title_mode(&self) -> bool { self.custom_title_mode }
}

impl Default for SaveContext {
  fn default() -> Self { Self::new(configuration::SaveConfig::default().debounce()) }
}

/// The save service.
pub struct PaperSaver {
  /// Maps page URLs to papers
  resolver: SiteResolver,
  /// Files papers on the remote store
  uploader: Uploader,
  /// Folder path and custom-title data
  settings: Settings,
  /// Receives progress notices
  notifier: Arc<dyn Notifier>,
  /// Custom-title prompt
  popup:    Arc<dyn PopupControl>,
}

impl std::fmt::Debug for PaperSaver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PaperSaver")
      .field("resolver", &self.resolver)
      .field("uploader", &self.uploader)
      .field("settings", &self.settings)
      .finish_non_exhaustive()
  }
}

/// Assembles a [`PaperSaver`], defaulting every collaborator that is not supplied.
///
/// | collaborator   | default                                           |
/// |----------------|---------------------------------------------------|
/// | config         | [`Config::default`]                               |
/// | remote store   | [`DriveClient`] on the configured endpoints       |
/// | token broker   | [`ConfiguredTokenBroker`] from the `[auth]` table |
/// | settings store | [`JsonFileStore`] in the storage directory        |
/// | title fetcher  | [`HttpTitleFetcher`]                              |
/// | notifier       | [`LogNotifier`]                                   |
/// | prompt         | [`NoPopup`]                                       |
#[derive(Default)]
pub struct PaperSaverBuilder {
  /// Configuration the defaults are derived from
  config:         Option<Config>,
  /// Destination store
  store:          Option<Arc<dyn RemoteStore>>,
  /// Bearer token source
  tokens:         Option<Arc<dyn TokenBroker>>,
  /// Settings backing store
  settings_store: Option<Arc<dyn KeyValueStore>>,
  /// Page title source
  title_fetcher:  Option<Box<dyn TitleFetcher>>,
  /// Notice sink
  notifier:       Option<Arc<dyn Notifier>>,
  /// Custom-title prompt
  popup:          Option<Arc<dyn PopupControl>>,
  /// HTTP client for PDF downloads
  client:         Option<reqwest::Client>,
}

impl PaperSaverBuilder {
  /// Uses `config` for endpoints, debounce-independent save settings and defaults.
  pub fn with_config(mut self, config: Config) -> Self {
    self.config = Some(config);
    self
  }

  /// Files papers on `store`.
  pub fn with_store(mut self, store: impl RemoteStore + 'static) -> Self {
    self.store = Some(Arc::new(store));
    self
  }

  /// Takes bearer tokens from `tokens`.
  pub fn with_token_broker(mut self, tokens: impl TokenBroker + 'static) -> Self {
    self.tokens = Some(Arc::new(tokens));
    self
  }

  /// Keeps settings in `store`.
  pub fn with_settings_store(mut self, store: impl KeyValueStore + 'static) -> Self {
    self.settings_store = Some(Arc::new(store));
    self
  }

  /// Keeps settings in a store shared with other owners.
  pub fn with_shared_settings_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
    self.settings_store = Some(store);
    self
  }

  /// Fetches page titles with `fetcher`.
  pub fn with_title_fetcher(mut self, fetcher: impl TitleFetcher + 'static) -> Self {
    self.title_fetcher = Some(Box::new(fetcher));
    self
  }

  /// Sends notices to `notifier`.
  pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
    self.notifier = Some(Arc::new(notifier));
    self
  }

  /// Drives the custom-title prompt through `popup`.
  pub fn with_popup(mut self, popup: impl PopupControl + 'static) -> Self {
    self.popup = Some(Arc::new(popup));
    self
  }

  /// Downloads PDFs with `client`.
  pub fn with_client(mut self, client: reqwest::Client) -> Self {
    self.client = Some(client);
    self
  }

  /// Builds the service.
  pub fn build(self) -> PaperSaver {
    let config = self.config.unwrap_or_default();
    let store = self.store.unwrap_or_else(|| Arc::new(DriveClient::new(&config.drive)));
    let tokens = self.tokens.unwrap_or_else(|| Arc::new(ConfiguredTokenBroker::new(&config.auth)));
    let settings_store =
      self.settings_store.unwrap_or_else(|| Arc::new(JsonFileStore::new(&config.storage_path)));
    let title_fetcher = self.title_fetcher.unwrap_or_else(|| Box::new(HttpTitleFetcher::new()));
    let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
    let popup = self.popup.unwrap_or_else(|| Arc::new(NoPopup));

    let mut uploader = Uploader::new(store, tokens, notifier.clone());
    if let Some(client) = self.client {
      uploader = uploader.with_client(client);
    }

    PaperSaver {
      resolver: SiteResolver::from_boxed(title_fetcher),
      uploader,
      settings: Settings::new(settings_store, &config.save),
      notifier,
      popup,
    }
  }
}

impl PaperSaver {
  /// Starts assembling a service.
  pub fn builder() -> PaperSaverBuilder { PaperSaverBuilder::default() }

  /// The settings the service reads its folder path from.
  pub fn settings(&self) -> &Settings { &self.settings }

  /// Handles a command fired on the page at `tab_url`.
  pub async fn handle_command(
    &self,
    context: &mut SaveContext,
    command: Command,
    tab_url: &str,
  ) -> Outcome {
    self.handle_command_at(context, command, tab_url, Utc::now()).await
  }

  /// Handles a command as if fired at `now`.
  pub async fn handle_command_at(
    &self,
    context: &mut SaveContext,
    command: Command,
    tab_url: &str,
    now: DateTime<Utc>,
  ) -> Outcome {
    debug!("Command received: {command:?} for {tab_url}");
    match command {
      Command::SavePaper => match self.save_paper(context, tab_url, now).await {
        Ok(outcome) => outcome,
        Err(e) => self.fail(SAVE_FAILED, e).await,
      },
      Command::SavePaperWithCustomTitle =>
        match self.toggle_custom_title(context, tab_url, now).await {
          Ok(outcome) => outcome,
          Err(e) => self.fail(CUSTOM_TITLE_FAILED, e).await,
        },
    }
  }

  /// Handles a trigger.
  pub async fn handle_trigger(&self, context: &mut SaveContext, trigger: &Trigger) -> Outcome {
    self.handle_command(context, trigger.command, &trigger.url).await
  }

  /// Handles a message from the custom-title prompt.
  pub async fn handle_message(&self, context: &mut SaveContext, message: Message) -> Response {
    match message {
      Message::UploadCustomTitle(upload) => self.upload_custom_title(context, upload).await,
      Message::ClosePopup | Message::ForceClosePopup => {
        self.close_prompt().await;
        context.custom_title_mode = false;
        if let Err(e) = self.settings.clear_custom_title_data().await {
          warn!("Failed to clear custom title data: {e}");
        }
        Response::ok()
      },
    }
  }

  /// Direct save of the page's paper.
  async fn save_paper(
    &self,
    context: &mut SaveContext,
    tab_url: &str,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    if !context.admit(tab_url, now) {
      self.notice(Notification::info(format!("{SKIP_NOTICE} {tab_url}"))).await;
      return Ok(Outcome::Skipped);
    }

    let Some(paper) = self.resolver.resolve(tab_url).await? else {
      self.notice(Notification::info(UNSUPPORTED_NOTICE)).await;
      return Ok(Outcome::Unsupported);
    };

    let filename = paper.filename();
    self.notice(Notification::info(format!("Saving: {filename}"))).await;

    let folder_path = self.settings.folder_path().await?;
    let request = FileUploadRequest { remote_source_url: paper.pdf_url, target_filename: filename };
    Ok(Outcome::Uploaded(self.uploader.upload(&request, &folder_path).await))
  }

  /// Starts or cancels a custom-title flow.
  async fn toggle_custom_title(
    &self,
    context: &mut SaveContext,
    tab_url: &str,
    now: DateTime<Utc>,
  ) -> Result<Outcome> {
    if context.custom_title_mode {
      context.custom_title_mode = false;
      self.settings.clear_custom_title_data().await?;
      self.close_prompt().await;
      debug!("Custom title mode cancelled");
      return Ok(Outcome::PromptCancelled);
    }

    self.popup.open().await?;

    if !context.admit(tab_url, now) {
      self.notice(Notification::info(format!("{SKIP_NOTICE} {tab_url}"))).await;
      return Ok(Outcome::Skipped);
    }

    let Some(paper) = self.resolver.resolve(tab_url).await? else {
      self.notice(Notification::info(UNSUPPORTED_NOTICE)).await;
      self.close_prompt().await;
      return Ok(Outcome::Unsupported);
    };

    let data = CustomTitleData::from(&paper);
    self.settings.set_custom_title_data(&data).await?;
    context.custom_title_mode = true;
    debug!("Custom title mode entered for {}", data.identifier);
    Ok(Outcome::PromptOpened(data))
  }

  /// Uploads the pending paper under a user-chosen title.
  async fn upload_custom_title(
    &self,
    context: &mut SaveContext,
    upload: CustomTitleUpload,
  ) -> Response {
    let custom_title = upload.custom_title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let OriginalData { pdf_url, identifier, id_type } = upload.original_data;
    let pdf_url = pdf_url.filter(|url| !url.is_empty());
    let identifier = identifier.filter(|id| !id.is_empty());

    let (Some(custom_title), Some(pdf_url), Some(identifier)) = (custom_title, pdf_url, identifier)
    else {
      warn!("Invalid data received for custom upload");
      return Response::failure(MISSING_DATA);
    };

    let folder_path = match self.settings.folder_path().await {
      Ok(path) => path,
      Err(e) => {
        warn!("Error handling custom title upload: {e}");
        return Response::failure(e.to_string());
      },
    };

    let filename =
      format::build_filename(Some(custom_title), Some(&identifier), Some(&identifier), id_type);
    debug!("Uploading custom title file '{filename}' to path: '{folder_path}'");
    let request = FileUploadRequest { remote_source_url: pdf_url, target_filename: filename };
    let result = self.uploader.upload(&request, &folder_path).await;

    context.custom_title_mode = false;
    if let Err(e) = self.settings.clear_custom_title_data().await {
      warn!("Failed to clear custom title data: {e}");
    }
    result.into()
  }

  /// Force-closes the prompt, logging a failure.
  async fn close_prompt(&self) {
    if let Err(e) = self.popup.force_close().await {
      warn!("Failed to close prompt: {e}");
    }
  }

  /// Sends a notice, logging a failure.
  async fn notice(&self, notification: Notification) {
    notify::send(self.notifier.as_ref(), notification).await;
  }

  /// Logs `error`, shows the generic failure notice, and reports the failure.
  async fn fail(&self, notice: &str, error: PaperDriveError) -> Outcome {
    warn!("{notice}: {error}");
    self.notice(Notification::failure(notice)).await;
    Outcome::Failed(error.to_string())
  }
}
