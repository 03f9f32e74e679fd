//! Persistent settings: the destination folder, its history, and pending custom-title data.
//!
//! Settings live in a [`KeyValueStore`] with two scopes. Preferences the user would expect
//! to follow them between machines (the folder path and its history) are [`Scope::Synced`];
//! the hand-off between the custom-title trigger and the prompt is [`Scope::Local`].
//!
//! | key                      | scope  | value                            |
//! |--------------------------|--------|----------------------------------|
//! | `driveFolderPath`        | synced | string, default `papers`         |
//! | `driveFolderPathHistory` | synced | strings, most recent first       |
//! | `customTitleData`        | local  | [`CustomTitleData`] object       |

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::*;

/// Synced key holding the current folder path.
pub const FOLDER_PATH_KEY: &str = "driveFolderPath";
/// Synced key holding the folder path history.
pub const PATH_HISTORY_KEY: &str = "driveFolderPathHistory";
/// Local key holding pending custom-title data.
pub const CUSTOM_TITLE_KEY: &str = "customTitleData";

/// Which half of the store a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
  /// Machine local state
  Local,
  /// User preferences
  Synced,
}

impl Scope {
  /// File name [`JsonFileStore`] keeps this scope in.
  fn file_name(self) -> &'static str {
    match self {
      Scope::Local => "local.json",
      Scope::Synced => "sync.json",
    }
  }
}

/// A persistent key-value store with JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  /// Reads a key, `None` when it was never set or was removed.
  async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>>;

  /// Writes a key.
  async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()>;

  /// Deletes a key; deleting a missing key is not an error.
  async fn remove(&self, scope: Scope, key: &str) -> Result<()>;
}

/// [`KeyValueStore`] held in memory, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
  /// Values by scope and key
  values: std::sync::Mutex<HashMap<(Scope, String), Value>>,
}

impl MemoryStore {
  /// Locks the map, mapping a poisoned lock to a storage error.
  fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(Scope, String), Value>>> {
    self.values.lock().map_err(|e| PaperDriveError::Storage(e.to_string()))
  }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
  async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
    Ok(self.values()?.get(&(scope, key.to_string())).cloned())
  }

  async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()> {
    self.values()?.insert((scope, key.to_string()), value);
    Ok(())
  }

  async fn remove(&self, scope: Scope, key: &str) -> Result<()> {
    self.values()?.remove(&(scope, key.to_string()));
    Ok(())
  }
}

/// [`KeyValueStore`] keeping each scope as a JSON object in a file under one directory.
///
/// Writes rewrite the whole scope file. Access is serialised within a process; two processes
/// sharing a directory can lose each other's writes.
#[derive(Debug)]
pub struct JsonFileStore {
  /// Directory holding `local.json` and `sync.json`
  dir:  PathBuf,
  /// Serialises read-modify-write cycles
  lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
  /// Creates a store rooted at `dir`. Nothing is touched until the first write.
  pub fn new(dir: impl AsRef<Path>) -> Self {
    Self { dir: dir.as_ref().to_path_buf(), lock: tokio::sync::Mutex::new(()) }
  }

  /// Reads a scope file, treating a missing file as empty.
  async fn read_scope(&self, scope: Scope) -> Result<Map<String, Value>> {
    let path = self.dir.join(scope.file_name());
    match tokio::fs::read_to_string(&path).await {
      Ok(content) if content.trim().is_empty() => Ok(Map::new()),
      Ok(content) => serde_json::from_str(&content).map_err(|e| {
        PaperDriveError::Storage(format!("corrupt settings file {}: {e}", path.display()))
      }),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
      Err(e) => Err(e.into()),
    }
  }

  /// Replaces a scope file.
  async fn write_scope(&self, scope: Scope, values: &Map<String, Value>) -> Result<()> {
    tokio::fs::create_dir_all(&self.dir).await?;
    let path = self.dir.join(scope.file_name());
    tokio::fs::write(&path, serde_json::to_string_pretty(values)?).await?;
    trace!("Wrote {} keys to {}", values.len(), path.display());
    Ok(())
  }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
  async fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>> {
    let _guard = self.lock.lock().await;
    Ok(self.read_scope(scope).await?.remove(key))
  }

  async fn set(&self, scope: Scope, key: &str, value: Value) -> Result<()> {
    let _guard = self.lock.lock().await;
    let mut values = self.read_scope(scope).await?;
    values.insert(key.to_string(), value);
    self.write_scope(scope, &values).await
  }

  async fn remove(&self, scope: Scope, key: &str) -> Result<()> {
    let _guard = self.lock.lock().await;
    let mut values = self.read_scope(scope).await?;
    if values.remove(key).is_some() {
      self.write_scope(scope, &values).await?;
    }
    Ok(())
  }
}

/// What the custom-title prompt needs to finish a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTitleData {
  /// Marks the data as belonging to an active custom-title flow
  pub is_custom_title_flow: bool,
  /// Where the PDF is downloaded from
  pub pdf_url:              String,
  /// Title found on the page, used to pre-fill the prompt
  #[serde(default)]
  pub original_title:       Option<String>,
  /// Identifier of the resolved paper
  pub identifier:           String,
  /// Scheme of the identifier
  pub id_type:              IdType,
}

impl From<&ResolvedPaper> for CustomTitleData {
  fn from(paper: &ResolvedPaper) -> Self {
    Self {
      is_custom_title_flow: true,
      pdf_url:              paper.pdf_url.clone(),
      original_title:       paper.title.clone(),
      identifier:           paper.identifier.clone(),
      id_type:              paper.id_type,
    }
  }
}

/// Typed access to the settings keys.
#[derive(Clone)]
pub struct Settings {
  /// Backing store
  store:         Arc<dyn KeyValueStore>,
  /// Folder path used when none is stored
  default_path:  String,
  /// Maximum history length
  history_limit: usize,
}

impl Settings {
  /// Creates settings over `store` with the defaults from `config`.
  pub fn new(store: Arc<dyn KeyValueStore>, config: &configuration::SaveConfig) -> Self {
    Self {
      store,
      default_path: config.default_folder_path.clone(),
      history_limit: config.history_limit,
    }
  }

  /// The folder path uploads go to.
  pub async fn folder_path(&self) -> Result<String> {
    let stored = self.store.get(Scope::Synced, FOLDER_PATH_KEY).await?;
    Ok(
      stored
        .as_ref()
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
        .map_or_else(|| self.default_path.clone(), str::to_string),
    )
  }

  /// Normalises and stores a user-entered folder path, recording it in the history.
  ///
  /// The input is trimmed and stripped of leading and trailing slashes; if nothing remains
  /// the default path is stored instead. Returns the path that was stored.
  pub async fn save_folder_path(&self, raw: &str) -> Result<String> {
    let path = raw.trim().trim_matches('/');
    let path = if path.is_empty() { self.default_path.clone() } else { path.to_string() };

    self.store.set(Scope::Synced, FOLDER_PATH_KEY, Value::String(path.clone())).await?;
    self.add_to_path_history(&path).await?;
    debug!("Folder path set to '{path}'");
    Ok(path)
  }

  /// Previously used folder paths, most recent first.
  pub async fn path_history(&self) -> Result<Vec<String>> {
    match self.store.get(Scope::Synced, PATH_HISTORY_KEY).await? {
      Some(value) => Ok(serde_json::from_value(value)?),
      None => Ok(Vec::new()),
    }
  }

  /// Moves `path` to the front of the history, dropping entries past the limit.
  pub async fn add_to_path_history(&self, path: &str) -> Result<Vec<String>> {
    let mut history = self.path_history().await?;
    history.retain(|entry| entry != path);
    history.insert(0, path.to_string());
    history.truncate(self.history_limit);

    self.store.set(Scope::Synced, PATH_HISTORY_KEY, serde_json::to_value(&history)?).await?;
    Ok(history)
  }

  /// Pending custom-title data, if a custom-title flow is active.
  pub async fn custom_title_data(&self) -> Result<Option<CustomTitleData>> {
    let Some(value) = self.store.get(Scope::Local, CUSTOM_TITLE_KEY).await? else {
      return Ok(None);
    };
    let data: CustomTitleData = serde_json::from_value(value)?;
    Ok(data.is_custom_title_flow.then_some(data))
  }

  /// Stores custom-title data for the prompt to pick up.
  pub async fn set_custom_title_data(&self, data: &CustomTitleData) -> Result<()> {
    self.store.set(Scope::Local, CUSTOM_TITLE_KEY, serde_json::to_value(data)?).await
  }

  /// Forgets any pending custom-title data.
  pub async fn clear_custom_title_data(&self) -> Result<()> {
    self.store.remove(Scope::Local, CUSTOM_TITLE_KEY).await
  }
}

impl std::fmt::Debug for Settings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Settings")
      .field("default_path", &self.default_path)
      .field("history_limit", &self.history_limit)
      .finish()
  }
}
