//! Notification and prompt control seams.
//!
//! The service reports progress through a [`Notifier`] and drives the custom-title prompt
//! through a [`PopupControl`]. Both are fire-and-report: the service awaits each call and
//! logs a failure, but a broken notifier never fails a save.

use super::*;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
  /// Progress or a benign skip
  Info,
  /// The paper was filed
  Success,
  /// Something went wrong
  Failure,
}

/// A user-facing notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  /// How the notice should be presented
  pub level:   NotificationLevel,
  /// Text shown to the user
  pub message: String,
}

impl Notification {
  /// Creates an informational notice.
  pub fn info(message: impl Into<String>) -> Self {
    Self { level: NotificationLevel::Info, message: message.into() }
  }

  /// Creates a success notice.
  pub fn success(message: impl Into<String>) -> Self {
    Self { level: NotificationLevel::Success, message: message.into() }
  }

  /// Creates a failure notice.
  pub fn failure(message: impl Into<String>) -> Self {
    Self { level: NotificationLevel::Failure, message: message.into() }
  }
}

/// Displays notices to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
  /// Shows one notice.
  async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Opens and closes the interactive custom-title prompt.
#[async_trait]
pub trait PopupControl: Send + Sync {
  /// Opens the prompt.
  async fn open(&self) -> Result<()>;

  /// Closes the prompt regardless of its state.
  async fn force_close(&self) -> Result<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
  async fn notify(&self, notification: &Notification) -> Result<()> {
    (**self).notify(notification).await
  }
}

#[async_trait]
impl<T: PopupControl + ?Sized> PopupControl for Arc<T> {
  async fn open(&self) -> Result<()> { (**self).open().await }

  async fn force_close(&self) -> Result<()> { (**self).force_close().await }
}

/// [`Notifier`] that only writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn notify(&self, notification: &Notification) -> Result<()> {
    match notification.level {
      NotificationLevel::Failure => warn!("{}", notification.message),
      _ => info!("{}", notification.message),
    }
    Ok(())
  }
}

/// [`PopupControl`] for surfaces without a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPopup;

#[async_trait]
impl PopupControl for NoPopup {
  async fn open(&self) -> Result<()> {
    debug!("No prompt surface to open");
    Ok(())
  }

  async fn force_close(&self) -> Result<()> { Ok(()) }
}

/// Sends `notification`, logging instead of failing when the notifier errors.
pub(crate) async fn send(notifier: &dyn Notifier, notification: Notification) {
  if let Err(e) = notifier.notify(&notification).await {
    warn!("Failed to show notification '{}': {e}", notification.message);
  }
}
