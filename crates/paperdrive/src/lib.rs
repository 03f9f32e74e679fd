//! Academic paper detection and Drive filing library.
//!
//! `paperdrive` takes the URL of a page a reader is looking at, works out whether it is an
//! academic paper it knows about, and files the paper's PDF into a folder hierarchy on a
//! Google Drive style object store. It provides:
//!
//! - Site resolution for arXiv, ACM Digital Library and Usenix pages
//! - Title scraping and bracketed identifier extraction
//! - Filesystem-safe filename construction
//! - Idempotent folder hierarchy resolution on the remote store
//! - A single upload orchestrator returning a uniform [`upload::UploadResult`]
//! - The command and message handlers of the background service
//!
//! # Features
//!
//! - **Ordered site table**: URL patterns are tried in a fixed order and the first match wins:
//!   - arXiv abstract and PDF pages
//!   - ACM abstract and PDF pages (DOI based)
//!   - Usenix presentation and PDF pages
//! - **Find-or-create folders**: saving into `papers/systems/2024` twice never creates the same
//!   folder twice
//! - **Trait seams**: the token broker, settings store, notifications, prompt and remote store are
//!   all traits, so the service can run in a CLI, a daemon or a test harness
//!
//! # Getting Started
//!
//! ```no_run
//! use paperdrive::{
//!   drive::DriveClient,
//!   prelude::*,
//!   saver::{Command, Outcome, PaperSaver, SaveContext},
//!   settings::MemoryStore,
//!   upload::StaticToken,
//!   Config,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let config = Config::default();
//!   let saver = PaperSaver::builder()
//!     .with_config(config.clone())
//!     .with_store(DriveClient::new(&config.drive))
//!     .with_token_broker(StaticToken::new("ya29.token"))
//!     .with_settings_store(MemoryStore::default())
//!     .build();
//!
//!   let mut context = SaveContext::new(config.save.debounce());
//!   let outcome =
//!     saver.handle_command(&mut context, Command::SavePaper, "https://arxiv.org/abs/2301.07041").await;
//!   if let Outcome::Uploaded(result) = outcome {
//!     println!("{}", result.message);
//!   }
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`title`]: Page title fetching and bracketed identifier parsing
//! - [`format`]: Filename sanitising and construction
//! - [`paper`]: Resolved paper and identifier scheme types
//! - [`site`]: The ordered site table and per-site resolution
//! - [`drive`]: Remote store trait, Drive client, and folder hierarchy resolution
//! - [`upload`]: Token brokers and the upload orchestrator
//! - [`settings`]: Key-value settings store and the folder path history
//! - [`notify`]: Notification and prompt control seams
//! - [`saver`]: Command and message handlers with the debounce context
//! - [`prelude`]: Common traits and types for ergonomic imports

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
  sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod configuration;
pub mod drive;
pub mod error;
pub mod format;
pub mod notify;
pub mod paper;
pub mod saver;
pub mod settings;
pub mod site;
pub mod title;
pub mod upload;

pub use configuration::Config;

use crate::{
  configuration::DriveConfig,
  drive::{FolderPath, RemoteStore},
  error::*,
  notify::{Notification, Notifier, PopupControl},
  paper::{IdType, ResolvedPaper},
  settings::{KeyValueStore, Settings},
  title::{ParsedTitle, TitleFetcher},
  upload::TokenBroker,
};

/// Common traits and types for ergonomic imports.
///
/// This module provides a convenient way to import frequently used traits
/// and types with a single glob import. It includes:
///
/// - The collaborator traits the service is built from
/// - Error types and the common `Result` type
///
/// # Usage
///
/// ```no_run
/// use paperdrive::{prelude::*, site::SiteResolver, title::HttpTitleFetcher};
///
/// async fn example() -> Result<(), PaperDriveError> {
///   let resolver = SiteResolver::new(HttpTitleFetcher::new());
///   let paper = resolver.resolve("https://arxiv.org/abs/2301.07041").await?;
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    drive::RemoteStore,
    error::PaperDriveError,
    notify::{Notifier, PopupControl},
    settings::KeyValueStore,
    title::TitleFetcher,
    upload::TokenBroker,
  };
}
