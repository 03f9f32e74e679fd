//! Error types for the paperdrive library.
//!
//! This module provides a single error type that covers the failure modes of resolving a
//! paper page and filing it on the remote store:
//! - Network and remote API errors
//! - Authentication and source download failures
//! - Folder hierarchy setup
//! - Settings storage and configuration
//!
//! The upload orchestrator never lets these escape; it turns them into an
//! [`UploadResult`](crate::upload::UploadResult). Everywhere below that boundary they are
//! propagated with `?`.
//!
//! # Examples
//!
//! ```
//! use paperdrive::error::PaperDriveError;
//!
//! let error = PaperDriveError::SourceFetch { status: 404 };
//! assert_eq!(error.to_string(), "HTTP error fetching PDF! status: 404");
//! ```

use thiserror::Error;

/// Error type alias used for the [`paperdrive`](crate) crate.
pub type Result<T> = core::result::Result<T, PaperDriveError>;

/// Errors that can occur when resolving and filing papers.
///
/// Most variants carry either the remote status and body or the wrapped
/// underlying error, so the user-facing message can name what went wrong.
#[derive(Error, Debug)]
pub enum PaperDriveError {
  /// A network request failed before any status was received.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable
  /// - TLS errors occur
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The token broker could not produce a bearer token.
  #[error("Authentication failed: {0}")]
  Authentication(String),

  /// The paper's PDF could not be downloaded from its source.
  #[error("HTTP error fetching PDF! status: {status}")]
  SourceFetch {
    /// HTTP status returned by the source
    status: u16,
  },

  /// The paper's PDF source could not be reached, or its body could not be read.
  #[error("Could not reach PDF source: {0}")]
  SourceUnreachable(#[source] reqwest::Error),

  /// The remote store answered with a non-success status.
  #[error("Google Drive API error (Status: {status}): {body}")]
  Api {
    /// HTTP status returned by the store
    status: u16,
    /// Response body, kept verbatim for diagnostics
    body:   String,
  },

  /// Searching for or creating one segment of a folder path failed.
  ///
  /// Segments before `segment` may already exist on the store; a retry finds them.
  #[error("Failed to find or create folder '{segment}': {source}")]
  FolderSetup {
    /// The path segment that could not be resolved
    segment: String,
    /// What the store reported
    #[source]
    source:  Box<PaperDriveError>,
  },

  /// The final multipart file creation failed.
  #[error("Google Drive API error uploading file: {0}")]
  Upload(#[source] Box<PaperDriveError>),

  /// A site handler matched the page but could not resolve it.
  #[error("Could not resolve {site} page: {reason}")]
  Resolution {
    /// Name of the site binding that matched
    site:   &'static str,
    /// Why resolution failed
    reason: String,
  },

  /// A resolved paper or a custom-title request lacks a field the upload needs.
  #[error("Could not determine {0}.")]
  MissingField(&'static str),

  /// An inbound command or message could not be understood.
  #[error("Invalid message: {0}")]
  InvalidMessage(String),

  /// The settings store could not be read or written.
  #[error("Settings storage error: {0}")]
  Storage(String),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// JSON encoding or decoding failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// The configuration could not be written back out.
  #[error(transparent)]
  TomlSer(#[from] toml::ser::Error),

  /// Configuration is missing or inconsistent.
  #[error("{0}")]
  Config(String),
}
