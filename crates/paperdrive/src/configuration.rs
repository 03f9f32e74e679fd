//! Configuration for paperdrive.
//!
//! Configuration is a single TOML file, by default at `<config_dir>/paperdrive/config.toml`.
//! Every field has a default, so a missing file or a partial file is fine.
//!
//! ```toml
//! storage_path = "/home/me/.local/share/paperdrive"
//!
//! [drive]
//! api_url        = "https://www.googleapis.com/drive/v3/files"
//! upload_url     = "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart"
//! root_folder_id = "root"
//!
//! [save]
//! debounce_ms         = 1000
//! default_folder_path = "papers"
//! history_limit       = 100
//!
//! [auth]
//! token_env = "PAPERDRIVE_TOKEN"
//! ```

use super::*;

/// Top level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory holding the settings store files
  pub storage_path: PathBuf,
  /// Remote store endpoints
  pub drive:        DriveConfig,
  /// Save behaviour
  pub save:         SaveConfig,
  /// Where bearer tokens come from
  pub auth:         AuthConfig,
}

/// Remote store endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
  /// Files collection used for folder search and creation
  pub api_url:        String,
  /// Multipart upload endpoint
  pub upload_url:     String,
  /// Id of the folder every path is resolved from
  pub root_folder_id: String,
}

/// Save behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
  /// Window within which repeated saves of one URL collapse, in milliseconds
  pub debounce_ms:         u64,
  /// Folder path used until the user picks one
  pub default_folder_path: String,
  /// Maximum number of remembered folder paths
  pub history_limit:       usize,
}

/// Where bearer tokens come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
  /// Environment variable checked first
  pub token_env:  String,
  /// File read when the environment variable is unset
  pub token_file: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      storage_path: Self::default_storage_path(),
      drive:        DriveConfig::default(),
      save:         SaveConfig::default(),
      auth:         AuthConfig::default(),
    }
  }
}

impl Default for DriveConfig {
  fn default() -> Self {
    Self {
      api_url:        "https://www.googleapis.com/drive/v3/files".to_string(),
      upload_url:     "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart"
        .to_string(),
      root_folder_id: "root".to_string(),
    }
  }
}

impl Default for SaveConfig {
  fn default() -> Self {
    Self { debounce_ms: 1000, default_folder_path: "papers".to_string(), history_limit: 100 }
  }
}

impl Default for AuthConfig {
  fn default() -> Self { Self { token_env: "PAPERDRIVE_TOKEN".to_string(), token_file: None } }
}

impl SaveConfig {
  /// The debounce window as a duration.
  pub fn debounce(&self) -> Duration {
    Duration::milliseconds(i64::try_from(self.debounce_ms).unwrap_or(i64::MAX))
  }
}

impl Config {
  /// Default location of the configuration file.
  pub fn default_path() -> PathBuf {
    dirs::config_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("paperdrive")
      .join("config.toml")
  }

  /// Default directory for the settings store.
  pub fn default_storage_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("paperdrive")
  }

  /// Parses a configuration from TOML text.
  pub fn from_toml(toml_str: &str) -> Result<Self> { Ok(toml::from_str(toml_str)?) }

  /// Loads the configuration at `path`, falling back to defaults when the file does not exist.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      debug!("No configuration at {path:?}, using defaults");
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(path)?;
    Self::from_toml(&content)
  }

  /// Writes the configuration to `path`, creating parent directories.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(self)?)?;
    Ok(())
  }

  /// Sets the settings store directory.
  pub fn with_storage_path(mut self, storage_path: &Path) -> Self {
    self.storage_path = storage_path.to_path_buf();
    self
  }

  /// Sets the remote store endpoints.
  pub fn with_drive(mut self, drive: DriveConfig) -> Self {
    self.drive = drive;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml(
      r#"
      [save]
      debounce_ms = 250

      [drive]
      root_folder_id = "0AbCdEf"
      "#,
    )
    .unwrap();
    assert_eq!(config.save.debounce_ms, 250);
    assert_eq!(config.save.default_folder_path, "papers");
    assert_eq!(config.save.history_limit, 100);
    assert_eq!(config.drive.root_folder_id, "0AbCdEf");
    assert_eq!(config.drive.api_url, "https://www.googleapis.com/drive/v3/files");
    assert_eq!(config.auth.token_env, "PAPERDRIVE_TOKEN");
  }

  #[test]
  fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = Config::default().with_storage_path(dir.path());
    config.save(&path).unwrap();
    assert_eq!(Config::load(&path).unwrap(), config);
  }

  #[test]
  fn test_missing_file_is_default() {
    let dir = tempdir().unwrap();
    assert_eq!(Config::load(dir.path().join("absent.toml")).unwrap(), Config::default());
  }

  #[test]
  fn test_debounce_duration() {
    assert_eq!(SaveConfig::default().debounce(), Duration::milliseconds(1000));
  }
}
