//! Remote folder/file store and folder hierarchy resolution.
//!
//! The store is reached through the [`RemoteStore`] trait. [`DriveClient`] implements it
//! against the Google Drive v3 files API: folders are listed with a query filter, and both
//! folders and files are created with a POST.
//!
//! [`resolve_folder_hierarchy`] turns a slash separated path such as `papers/systems/2024`
//! into the id of the deepest folder, searching for each segment under its parent and only
//! creating what is missing. Running it twice for the same path finds everything the first
//! run created. Two runs interleaving on a segment that does not exist yet can both create
//! it; nothing here locks against that.

use reqwest::{header::AUTHORIZATION, multipart};

use super::*;

/// MIME type Drive uses for folder objects.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A folder path split into its non-empty segments.
///
/// # Examples
///
/// ```
/// use paperdrive::drive::FolderPath;
///
/// let path = FolderPath::parse("/papers//systems/2024/");
/// assert_eq!(path.segments(), ["papers", "systems", "2024"]);
/// assert_eq!(path.to_string(), "papers/systems/2024");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FolderPath(Vec<String>);

impl FolderPath {
  /// Splits `path` on `/`, discarding empty segments.
  pub fn parse(path: &str) -> Self {
    Self(path.split('/').filter(|segment| !segment.is_empty()).map(str::to_string).collect())
  }

  /// The segments, outermost first.
  pub fn segments(&self) -> &[String] { &self.0 }
}

impl Display for FolderPath {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0.join("/"))
  }
}

/// A file to create on the remote store.
#[derive(Debug, Clone)]
pub struct NewFile {
  /// Name of the file object
  pub name:         String,
  /// Id of the folder it is created in
  pub parent_id:    String,
  /// MIME type of the content
  pub content_type: String,
  /// File content
  pub bytes:        Vec<u8>,
}

/// A file object as reported by the remote store after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
  /// Store assigned id
  pub id:   String,
  /// Name, when the store echoes it back
  #[serde(default)]
  pub name: Option<String>,
}

/// A folder/file object store addressed by ids, authenticated with a bearer token.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// Id of the folder every path is resolved from.
  fn root_id(&self) -> &str;

  /// Finds a non-trashed folder called exactly `name` directly under `parent_id`.
  async fn find_folder(&self, name: &str, parent_id: &str, token: &str) -> Result<Option<String>>;

  /// Creates a folder called `name` under `parent_id`, returning its id.
  async fn create_folder(&self, name: &str, parent_id: &str, token: &str) -> Result<String>;

  /// Creates a file object with content.
  async fn create_file(&self, file: NewFile, token: &str) -> Result<RemoteFile>;
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
  fn root_id(&self) -> &str { (**self).root_id() }

  async fn find_folder(&self, name: &str, parent_id: &str, token: &str) -> Result<Option<String>> {
    (**self).find_folder(name, parent_id, token).await
  }

  async fn create_folder(&self, name: &str, parent_id: &str, token: &str) -> Result<String> {
    (**self).create_folder(name, parent_id, token).await
  }

  async fn create_file(&self, file: NewFile, token: &str) -> Result<RemoteFile> {
    (**self).create_file(file, token).await
  }
}

/// Walks `path` from the store's root, creating missing folders, and returns the id of the
/// deepest folder.
///
/// An empty path resolves to the root. A failure at any segment aborts with
/// [`PaperDriveError::FolderSetup`] naming that segment; folders created for earlier
/// segments are left in place.
///
/// # Examples
///
/// ```no_run
/// use paperdrive::{
///   drive::{resolve_folder_hierarchy, DriveClient, FolderPath},
///   configuration::DriveConfig,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DriveClient::new(&DriveConfig::default());
/// let id = resolve_folder_hierarchy(&client, &FolderPath::parse("papers/systems"), "ya29.token").await?;
/// println!("papers/systems is {id}");
/// # Ok(())
/// # }
/// ```
pub async fn resolve_folder_hierarchy(
  store: &dyn RemoteStore,
  path: &FolderPath,
  token: &str,
) -> Result<String> {
  let mut parent_id = store.root_id().to_string();
  debug!("Resolving path components: {path}");

  for segment in path.segments() {
    debug!("Searching for folder '{segment}' within parent '{parent_id}'");
    parent_id = resolve_segment(store, segment, &parent_id, token).await.map_err(|e| {
      warn!("Error processing folder component '{segment}' in path '{path}': {e}");
      PaperDriveError::FolderSetup { segment: segment.clone(), source: Box::new(e) }
    })?;
  }
  Ok(parent_id)
}

/// Finds or creates one folder under `parent_id`.
async fn resolve_segment(
  store: &dyn RemoteStore,
  segment: &str,
  parent_id: &str,
  token: &str,
) -> Result<String> {
  if let Some(id) = store.find_folder(segment, parent_id, token).await? {
    debug!("Folder '{segment}' found with ID: {id}");
    return Ok(id);
  }
  debug!("Folder '{segment}' not found. Creating within parent '{parent_id}'");
  let id = store.create_folder(segment, parent_id, token).await?;
  debug!("Folder '{segment}' created with ID: {id}");
  Ok(id)
}

/// [`RemoteStore`] backed by the Google Drive v3 REST API.
#[derive(Debug, Clone)]
pub struct DriveClient {
  /// HTTP client shared by all requests
  client:         reqwest::Client,
  /// Files collection endpoint
  api_url:        String,
  /// Multipart upload endpoint
  upload_url:     String,
  /// Id paths are resolved from
  root_folder_id: String,
}

/// Body of a files list response.
#[derive(Debug, Deserialize)]
struct FileList {
  /// Matching objects, only their ids requested
  #[serde(default)]
  files: Vec<FileId>,
}

/// An object reference carrying only an id.
#[derive(Debug, Deserialize)]
struct FileId {
  /// Store assigned id
  id: String,
}

/// Metadata part of folder and file creation requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata<'a> {
  /// Object name
  name:      &'a str,
  /// Sole parent folder
  parents:   [&'a str; 1],
  /// Set for folders only
  #[serde(skip_serializing_if = "Option::is_none")]
  mime_type: Option<&'a str>,
}

impl DriveClient {
  /// Creates a client for the configured endpoints.
  pub fn new(config: &DriveConfig) -> Self { Self::with_client(reqwest::Client::new(), config) }

  /// Creates a client reusing an existing HTTP client.
  pub fn with_client(client: reqwest::Client, config: &DriveConfig) -> Self {
    Self {
      client,
      api_url: config.api_url.clone(),
      upload_url: config.upload_url.clone(),
      root_folder_id: config.root_folder_id.clone(),
    }
  }

  /// Builds the search query for a folder under a parent.
  ///
  /// Backslashes and single quotes in names are escaped as the query language requires.
  pub fn folder_query(name: &str, parent_id: &str) -> String {
    let escape = |s: &str| s.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
      "name='{}' and mimeType='{FOLDER_MIME_TYPE}' and '{}' in parents and trashed=false",
      escape(name),
      escape(parent_id)
    )
  }
}

/// Turns a non-success response into [`PaperDriveError::Api`], passing successes through.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  trace!("Drive error response ({status}): {body}");
  Err(PaperDriveError::Api { status: status.as_u16(), body })
}

#[async_trait]
impl RemoteStore for DriveClient {
  fn root_id(&self) -> &str { &self.root_folder_id }

  async fn find_folder(&self, name: &str, parent_id: &str, token: &str) -> Result<Option<String>> {
    let query = Self::folder_query(name, parent_id);
    let response = self
      .client
      .get(&self.api_url)
      .query(&[("q", query.as_str()), ("fields", "files(id)")])
      .header(AUTHORIZATION, format!("Bearer {token}"))
      .send()
      .await?;
    let list: FileList = check_status(response).await?.json().await?;
    trace!("Folder search for '{name}' under '{parent_id}': {list:?}");
    Ok(list.files.into_iter().next().map(|file| file.id))
  }

  async fn create_folder(&self, name: &str, parent_id: &str, token: &str) -> Result<String> {
    let metadata = ObjectMetadata { name, parents: [parent_id], mime_type: Some(FOLDER_MIME_TYPE) };
    let response = self
      .client
      .post(&self.api_url)
      .header(AUTHORIZATION, format!("Bearer {token}"))
      .json(&metadata)
      .send()
      .await?;
    let created: FileId = check_status(response).await?.json().await?;
    Ok(created.id)
  }

  async fn create_file(&self, file: NewFile, token: &str) -> Result<RemoteFile> {
    let metadata = ObjectMetadata {
      name:      file.name.as_str(),
      parents:   [file.parent_id.as_str()],
      mime_type: None,
    };
    let metadata = multipart::Part::text(serde_json::to_string(&metadata)?)
      .mime_str("application/json")?;
    let content = multipart::Part::bytes(file.bytes)
      .file_name(file.name.clone())
      .mime_str(&file.content_type)?;
    let form = multipart::Form::new().part("metadata", metadata).part("file", content);

    debug!("Uploading '{}' to parent folder ID: {}", file.name, file.parent_id);
    let response = self
      .client
      .post(&self.upload_url)
      .header(AUTHORIZATION, format!("Bearer {token}"))
      .multipart(form)
      .send()
      .await?;
    let created: RemoteFile = check_status(response).await?.json().await?;
    trace!("File upload API result: {created:?}");
    Ok(created)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use mockito::{Matcher, Server};

  use super::*;

  /// Folder store kept in memory: (id, name, parent).
  #[derive(Default)]
  struct MemoryDrive {
    folders:      Mutex<Vec<(String, String, String)>>,
    fail_segment: Option<String>,
  }

  #[async_trait]
  impl RemoteStore for MemoryDrive {
    fn root_id(&self) -> &str { "root" }

    async fn find_folder(&self, name: &str, parent_id: &str, _token: &str) -> Result<Option<String>> {
      Ok(
        self
          .folders
          .lock()
          .unwrap()
          .iter()
          .find(|(_, n, p)| n == name && p == parent_id)
          .map(|(id, ..)| id.clone()),
      )
    }

    async fn create_folder(&self, name: &str, parent_id: &str, _token: &str) -> Result<String> {
      if self.fail_segment.as_deref() == Some(name) {
        return Err(PaperDriveError::Api { status: 403, body: "quota".to_string() });
      }
      let mut folders = self.folders.lock().unwrap();
      let id = format!("folder-{}", folders.len() + 1);
      folders.push((id.clone(), name.to_string(), parent_id.to_string()));
      Ok(id)
    }

    async fn create_file(&self, file: NewFile, _token: &str) -> Result<RemoteFile> {
      Ok(RemoteFile { id: "file-1".to_string(), name: Some(file.name) })
    }
  }

  #[tokio::test]
  async fn test_resolution_is_idempotent() {
    let drive = MemoryDrive::default();
    let path = FolderPath::parse("a/b/c");

    let first = resolve_folder_hierarchy(&drive, &path, "token").await.unwrap();
    let second = resolve_folder_hierarchy(&drive, &path, "token").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(drive.folders.lock().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn test_shared_prefix_is_reused() {
    let drive = MemoryDrive::default();
    let ab = resolve_folder_hierarchy(&drive, &FolderPath::parse("a/b"), "token").await.unwrap();
    let abd = resolve_folder_hierarchy(&drive, &FolderPath::parse("/a/b/d/"), "token").await.unwrap();

    assert_ne!(ab, abd);
    let folders = drive.folders.lock().unwrap();
    assert_eq!(folders.len(), 3);
    assert!(folders.iter().any(|(id, name, parent)| id == &abd && name == "d" && parent == &ab));
  }

  #[tokio::test]
  async fn test_empty_path_is_root() {
    let drive = MemoryDrive::default();
    assert_eq!(resolve_folder_hierarchy(&drive, &FolderPath::parse("//"), "t").await.unwrap(), "root");
  }

  #[tokio::test]
  async fn test_failure_names_segment_and_keeps_prefix() {
    let drive = MemoryDrive { fail_segment: Some("b".to_string()), ..Default::default() };
    let err = resolve_folder_hierarchy(&drive, &FolderPath::parse("a/b/c"), "t").await.unwrap_err();

    match err {
      PaperDriveError::FolderSetup { segment, source } => {
        assert_eq!(segment, "b");
        assert!(matches!(*source, PaperDriveError::Api { status: 403, .. }));
      },
      e => panic!("unexpected error: {e:?}"),
    }
    assert_eq!(drive.folders.lock().unwrap().len(), 1);
  }

  #[test]
  fn test_folder_query_escapes_quotes() {
    assert_eq!(
      DriveClient::folder_query("Bob's papers", "root"),
      "name='Bob\\'s papers' and mimeType='application/vnd.google-apps.folder' and 'root' in \
       parents and trashed=false"
    );
  }

  fn client_for(server: &Server) -> DriveClient {
    DriveClient::new(&DriveConfig {
      api_url:        format!("{}/drive/v3/files", server.url()),
      upload_url:     format!("{}/upload/drive/v3/files?uploadType=multipart", server.url()),
      root_folder_id: "root".to_string(),
    })
  }

  #[traced_test]
  #[tokio::test]
  async fn test_drive_client_finds_existing_folder() {
    let mut server = Server::new_async().await;
    let search = server
      .mock("GET", "/drive/v3/files")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("q".into(), DriveClient::folder_query("papers", "root")),
        Matcher::UrlEncoded("fields".into(), "files(id)".into()),
      ]))
      .match_header("authorization", "Bearer secret")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"files":[{"id":"papers-id"},{"id":"other"}]}"#)
      .expect(1)
      .create_async()
      .await;
    let create = server.mock("POST", "/drive/v3/files").expect(0).create_async().await;

    let client = client_for(&server);
    let id = resolve_folder_hierarchy(&client, &FolderPath::parse("papers"), "secret").await.unwrap();

    assert_eq!(id, "papers-id");
    search.assert_async().await;
    create.assert_async().await;
  }

  #[traced_test]
  #[tokio::test]
  async fn test_drive_client_creates_missing_folder() {
    let mut server = Server::new_async().await;
    let _search = server
      .mock("GET", "/drive/v3/files")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(r#"{"files":[]}"#)
      .create_async()
      .await;
    let create = server
      .mock("POST", "/drive/v3/files")
      .match_body(Matcher::Json(serde_json::json!({
        "name": "papers",
        "parents": ["root"],
        "mimeType": FOLDER_MIME_TYPE,
      })))
      .with_status(200)
      .with_body(r#"{"id":"new-id"}"#)
      .expect(1)
      .create_async()
      .await;

    let client = client_for(&server);
    let id = resolve_folder_hierarchy(&client, &FolderPath::parse("papers"), "secret").await.unwrap();

    assert_eq!(id, "new-id");
    create.assert_async().await;
  }

  #[traced_test]
  #[tokio::test]
  async fn test_drive_client_search_error() {
    let mut server = Server::new_async().await;
    let _search = server
      .mock("GET", "/drive/v3/files")
      .match_query(Matcher::Any)
      .with_status(401)
      .with_body("invalid credentials")
      .create_async()
      .await;

    let client = client_for(&server);
    let err = resolve_folder_hierarchy(&client, &FolderPath::parse("papers"), "bad").await.unwrap_err();
    assert_eq!(
      err.to_string(),
      "Failed to find or create folder 'papers': Google Drive API error (Status: 401): invalid \
       credentials"
    );
  }

  #[traced_test]
  #[tokio::test]
  async fn test_drive_client_uploads_file() {
    let mut server = Server::new_async().await;
    let upload = server
      .mock("POST", "/upload/drive/v3/files")
      .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
      .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
      .match_body(Matcher::Regex(r#""parents":\["folder-9"\]"#.into()))
      .with_status(200)
      .with_body(r#"{"id":"file-id","name":"Paper [1].pdf"}"#)
      .expect(1)
      .create_async()
      .await;

    let client = client_for(&server);
    let file = NewFile {
      name:         "Paper [1].pdf".to_string(),
      parent_id:    "folder-9".to_string(),
      content_type: "application/pdf".to_string(),
      bytes:        b"%PDF-1.5".to_vec(),
    };
    let created = client.create_file(file, "secret").await.unwrap();

    assert_eq!(created, RemoteFile {
      id:   "file-id".to_string(),
      name: Some("Paper [1].pdf".to_string()),
    });
    upload.assert_async().await;
  }
}
