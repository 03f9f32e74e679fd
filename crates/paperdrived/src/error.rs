//! Error types for the paperdrive command line tool.

use thiserror::Error;

use super::*;

/// Error type alias used for the `paperdrive` binary.
pub type Result<T> = core::result::Result<T, PaperdrivedError>;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum PaperdrivedError {
  /// The library failed.
  #[error(transparent)]
  PaperDrive(#[from] PaperDriveError),

  /// A terminal prompt failed.
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Reading stdin or writing stdout failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A listener event could not be encoded.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A save ran and did not file the paper.
  #[error("{0}")]
  SaveFailed(String),
}
