//! Token brokers and the upload orchestrator.
//!
//! [`Uploader::upload`] is the single place a paper gets filed. It runs four steps and stops
//! at the first failure:
//!
//! 1. ask the [`TokenBroker`] for a bearer token
//! 2. download the PDF from its source
//! 3. resolve the destination folder hierarchy on the [`RemoteStore`]
//! 4. create the file in the resolved folder
//!
//! Whatever happens, the caller gets an [`UploadResult`] back and the user gets a success or
//! failure notification. Errors never escape this boundary.

use reqwest::header::CONTENT_TYPE;

use super::*;
use crate::drive::{resolve_folder_hierarchy, NewFile};

/// Content type used when the source does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

/// Source of bearer tokens for the remote store.
#[async_trait]
pub trait TokenBroker: Send + Sync {
  /// Returns a token, or [`PaperDriveError::Authentication`] when none is available.
  async fn token(&self) -> Result<String>;
}

/// [`TokenBroker`] handing out one fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
  /// Creates a broker that always returns `token`.
  pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }
}

#[async_trait]
impl TokenBroker for StaticToken {
  async fn token(&self) -> Result<String> { Ok(self.0.clone()) }
}

/// [`TokenBroker`] reading an environment variable, then an optional token file.
///
/// The token is looked up on every call, so a refreshed token file is picked up without a
/// restart.
#[derive(Debug, Clone)]
pub struct ConfiguredTokenBroker {
  /// Environment variable checked first
  env_var: String,
  /// File read when the variable is unset or blank
  file:    Option<PathBuf>,
}

impl ConfiguredTokenBroker {
  /// Creates a broker from the `[auth]` configuration section.
  pub fn new(config: &configuration::AuthConfig) -> Self {
    Self { env_var: config.token_env.clone(), file: config.token_file.clone() }
  }
}

#[async_trait]
impl TokenBroker for ConfiguredTokenBroker {
  async fn token(&self) -> Result<String> {
    if let Ok(token) = std::env::var(&self.env_var) {
      let token = token.trim();
      if !token.is_empty() {
        trace!("Using token from ${}", self.env_var);
        return Ok(token.to_string());
      }
    }

    if let Some(file) = &self.file {
      let content = tokio::fs::read_to_string(file).await.map_err(|e| {
        PaperDriveError::Authentication(format!("could not read token file {}: {e}", file.display()))
      })?;
      let token = content.trim();
      if !token.is_empty() {
        trace!("Using token from {}", file.display());
        return Ok(token.to_string());
      }
    }

    Err(PaperDriveError::Authentication(format!(
      "no token in ${} and no usable token file",
      self.env_var
    )))
  }
}

/// What to upload and what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadRequest {
  /// Where the PDF is downloaded from
  pub remote_source_url: String,
  /// Name of the file created on the store
  pub target_filename:   String,
}

/// Uniform outcome of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
  /// Whether the file was created
  pub success: bool,
  /// User-facing description of what happened
  pub message: String,
}

/// Files PDFs on a remote store.
#[derive(Clone)]
pub struct Uploader {
  /// Client used to download sources
  client:   reqwest::Client,
  /// Destination store
  store:    Arc<dyn RemoteStore>,
  /// Bearer token source
  tokens:   Arc<dyn TokenBroker>,
  /// Receives the success or failure notice
  notifier: Arc<dyn Notifier>,
}

impl Uploader {
  /// Creates an uploader from its collaborators.
  pub fn new(
    store: Arc<dyn RemoteStore>,
    tokens: Arc<dyn TokenBroker>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self { client: reqwest::Client::new(), store, tokens, notifier }
  }

  /// Replaces the HTTP client used to download sources.
  pub fn with_client(mut self, client: reqwest::Client) -> Self {
    self.client = client;
    self
  }

  /// Downloads `request.remote_source_url` and files it as `request.target_filename` under
  /// `folder_path`.
  ///
  /// # Examples
  ///
  /// ```no_run
  /// use std::sync::Arc;
  ///
  /// use paperdrive::{
  ///   configuration::DriveConfig,
  ///   drive::DriveClient,
  ///   notify::LogNotifier,
  ///   upload::{FileUploadRequest, StaticToken, Uploader},
  /// };
  ///
  /// # async fn example() {
  /// let uploader = Uploader::new(
  ///   Arc::new(DriveClient::new(&DriveConfig::default())),
  ///   Arc::new(StaticToken::new("ya29.token")),
  ///   Arc::new(LogNotifier),
  /// );
  /// let request = FileUploadRequest {
  ///   remote_source_url: "https://arxiv.org/pdf/2301.07041.pdf".to_string(),
  ///   target_filename:   "Verifiable Fully Homomorphic Encryption [2301.07041].pdf".to_string(),
  /// };
  /// let result = uploader.upload(&request, "papers/crypto").await;
  /// println!("{}", result.message);
  /// # }
  /// ```
  pub async fn upload(&self, request: &FileUploadRequest, folder_path: &str) -> UploadResult {
    debug!("Initiating upload for: {} to path: {folder_path}", request.target_filename);

    match self.try_upload(request, folder_path).await {
      Ok(()) => {
        let message = format!(
          "File '{}' uploaded to path '{folder_path}' successfully.",
          request.target_filename
        );
        info!("{message}");
        notify::send(self.notifier.as_ref(), Notification::success(&message)).await;
        UploadResult { success: true, message }
      },
      Err(e) => {
        warn!("Error uploading '{}' to '{folder_path}': {e}", request.target_filename);
        let message = format!("Error uploading to '{folder_path}': {}", describe_failure(&e));
        notify::send(self.notifier.as_ref(), Notification::failure(&message)).await;
        UploadResult { success: false, message }
      },
    }
  }

  /// The upload steps, short-circuiting on the first error.
  async fn try_upload(&self, request: &FileUploadRequest, folder_path: &str) -> Result<()> {
    let token = self.tokens.token().await?;

    let response = self
      .client
      .get(&request.remote_source_url)
      .send()
      .await
      .map_err(PaperDriveError::SourceUnreachable)?;
    if !response.status().is_success() {
      return Err(PaperDriveError::SourceFetch { status: response.status().as_u16() });
    }
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|value| value.to_str().ok())
      .unwrap_or(DEFAULT_CONTENT_TYPE)
      .to_string();
    let bytes = response.bytes().await.map_err(PaperDriveError::SourceUnreachable)?.to_vec();
    debug!("Downloaded {} bytes from {}", bytes.len(), request.remote_source_url);

    let parent_id =
      resolve_folder_hierarchy(self.store.as_ref(), &FolderPath::parse(folder_path), &token).await?;

    let file = NewFile {
      name: request.target_filename.clone(),
      parent_id,
      content_type,
      bytes,
    };
    let created = self
      .store
      .create_file(file, &token)
      .await
      .map_err(|e| PaperDriveError::Upload(Box::new(e)))?;
    trace!("File upload API result: {created:?}");
    Ok(())
  }
}

impl std::fmt::Debug for Uploader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Uploader").field("root_id", &self.store.root_id()).finish()
  }
}

/// The user-facing detail for a failed upload.
fn describe_failure(error: &PaperDriveError) -> String {
  match error {
    PaperDriveError::Authentication(_) =>
      "Authentication failed. Please try the command again.".to_string(),
    PaperDriveError::SourceFetch { .. } | PaperDriveError::SourceUnreachable(_) =>
      "Could not download the paper PDF.".to_string(),
    PaperDriveError::FolderSetup { .. } =>
      format!("Error setting up Drive folder structure: {error}"),
    PaperDriveError::Upload(_) => format!("Drive upload failed: {error}"),
    other => other.to_string(),
  }
}
