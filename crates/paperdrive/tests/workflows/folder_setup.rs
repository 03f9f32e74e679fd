use paperdrive::drive::{resolve_folder_hierarchy, FolderPath};

use super::*;

#[traced_test]
#[tokio::test]
async fn test_existing_hierarchy_creates_nothing() -> TestResult<()> {
  let mut server = Server::new_async().await;
  let a = mock_search(&mut server, "a", "root", r#"{"files":[{"id":"a-id"}]}"#).await;
  let b = mock_search(&mut server, "b", "a-id", r#"{"files":[{"id":"b-id"}]}"#).await;
  let create = server.mock("POST", "/drive/v3/files").expect(0).create_async().await;

  let client = DriveClient::new(&drive_config(&server));
  let id = resolve_folder_hierarchy(&client, &FolderPath::parse("a/b"), "ya29.test").await?;
  assert_eq!(id, "b-id");

  a.assert_async().await;
  b.assert_async().await;
  create.assert_async().await;
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_search_failure_names_segment() -> TestResult<()> {
  let mut server = Server::new_async().await;
  let _a = mock_search(&mut server, "a", "root", r#"{"files":[{"id":"a-id"}]}"#).await;
  let _b = server
    .mock("GET", "/drive/v3/files")
    .match_query(Matcher::UrlEncoded("q".into(), DriveClient::folder_query("b", "a-id")))
    .with_status(403)
    .with_body("insufficientPermissions")
    .create_async()
    .await;

  let client = DriveClient::new(&drive_config(&server));
  let error = resolve_folder_hierarchy(&client, &FolderPath::parse("a/b/c"), "ya29.test")
    .await
    .unwrap_err();
  assert_eq!(
    error.to_string(),
    "Failed to find or create folder 'b': Google Drive API error (Status: 403): \
     insufficientPermissions"
  );
  assert!(matches!(error, PaperDriveError::FolderSetup { ref segment, .. } if segment == "b"));
  Ok(())
}
