use super::*;

#[traced_test]
#[tokio::test]
async fn test_custom_title_upload_creates_missing_folder() -> TestResult<()> {
  let mut server = Server::new_async().await;
  let pdf = server
    .mock("GET", "/paper.pdf")
    .with_status(200)
    .with_header("content-type", "application/pdf")
    .with_body("%PDF-1.5 spanner")
    .expect(1)
    .create_async()
    .await;
  let papers = mock_search(&mut server, "papers", "root", r#"{"files":[{"id":"papers-id"}]}"#).await;
  let systems = mock_search(&mut server, "systems", "papers-id", r#"{"files":[]}"#).await;
  let create = server
    .mock("POST", "/drive/v3/files")
    .match_body(Matcher::Json(serde_json::json!({
      "name": "systems",
      "parents": ["papers-id"],
      "mimeType": "application/vnd.google-apps.folder"
    })))
    .with_status(200)
    .with_body(r#"{"id":"systems-id"}"#)
    .expect(1)
    .create_async()
    .await;
  let upload = server
    .mock("POST", "/upload/drive/v3/files")
    .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
    .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
    .match_body(Matcher::AllOf(vec![
      Matcher::Regex(r#""name":"Spanner- TrueTime \[10.1145_2491245\].pdf""#.to_string()),
      Matcher::Regex(r#""parents":\["systems-id"\]"#.to_string()),
      Matcher::Regex("%PDF-1.5 spanner".to_string()),
    ]))
    .with_status(200)
    .with_body(r#"{"id":"file-1","name":"Spanner- TrueTime [10.1145_2491245].pdf"}"#)
    .expect(1)
    .create_async()
    .await;

  let (saver, _settings) = create_test_saver(&server);
  saver.settings().save_folder_path("/papers/systems/").await?;

  let mut context = SaveContext::default();
  let response =
    saver.handle_message(&mut context, custom_title_message(&server, "Spanner: TrueTime")).await;

  assert!(response.success, "{response:?}");
  assert_eq!(
    response.message.as_deref(),
    Some("File 'Spanner- TrueTime [10.1145_2491245].pdf' uploaded to path 'papers/systems' successfully.")
  );
  assert!(!context.in_custom_title_mode());

  pdf.assert_async().await;
  papers.assert_async().await;
  systems.assert_async().await;
  create.assert_async().await;
  upload.assert_async().await;
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_custom_title_upload_reports_remote_failure() -> TestResult<()> {
  let mut server = Server::new_async().await;
  let _pdf = server.mock("GET", "/paper.pdf").with_body("%PDF").create_async().await;
  let _papers = mock_search(&mut server, "papers", "root", r#"{"files":[{"id":"papers-id"}]}"#).await;
  let _upload = server
    .mock("POST", "/upload/drive/v3/files")
    .match_query(Matcher::Any)
    .with_status(507)
    .with_body("storageQuotaExceeded")
    .create_async()
    .await;

  let (saver, _settings) = create_test_saver(&server);
  let response =
    saver.handle_message(&mut SaveContext::default(), custom_title_message(&server, "Notes")).await;

  assert!(!response.success);
  let message = response.message.unwrap_or_default();
  assert!(message.starts_with("Error uploading to 'papers': Drive upload failed:"), "{message}");
  assert!(message.contains("(Status: 507): storageQuotaExceeded"), "{message}");
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_missing_token_skips_download() -> TestResult<()> {
  let mut server = Server::new_async().await;
  let pdf = server.mock("GET", "/paper.pdf").expect(0).create_async().await;

  let mut config = Config::default().with_drive(drive_config(&server));
  config.auth.token_env = "PAPERDRIVE_INTEGRATION_TOKEN_UNSET".to_string();
  let saver = PaperSaver::builder()
    .with_config(config)
    .with_settings_store(MemoryStore::default())
    .build();

  let response =
    saver.handle_message(&mut SaveContext::default(), custom_title_message(&server, "Notes")).await;
  assert_eq!(
    response.message.as_deref(),
    Some("Error uploading to 'papers': Authentication failed. Please try the command again.")
  );
  pdf.assert_async().await;
  Ok(())
}
