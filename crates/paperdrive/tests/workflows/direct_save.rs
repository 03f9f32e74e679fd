use async_trait::async_trait;
use chrono::{Duration, Utc};
use paperdrive::saver::{Command, Outcome};

use super::*;

/// Title source standing in for the Usenix presentation page.
struct PresentationTitles;

#[async_trait]
impl TitleFetcher for PresentationTitles {
  async fn fetch_title(&self, url: &str) -> Option<String> {
    (url == "https://www.usenix.org/conference/osdi24/presentation/smith")
      .then(|| "Fast Consensus".to_string())
  }
}

#[traced_test]
#[tokio::test]
async fn test_repeated_save_uploads_once_per_window() -> TestResult<()> {
  let mut server = Server::new_async().await;
  // A mirror of the Usenix PDF; the page URL carries the original address.
  let tab_url = format!(
    "{}/mirror.pdf?src=https://www.usenix.org/system/files/osdi24-smith.pdf",
    server.url()
  );
  let pdf = server
    .mock("GET", "/mirror.pdf")
    .match_query(Matcher::Any)
    .with_status(200)
    .with_header("content-type", "application/pdf")
    .with_body("%PDF-1.7 consensus")
    .expect(2)
    .create_async()
    .await;
  let _papers = mock_search(&mut server, "papers", "root", r#"{"files":[{"id":"papers-id"}]}"#).await;
  let upload = server
    .mock("POST", "/upload/drive/v3/files")
    .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
    .match_body(Matcher::AllOf(vec![
      Matcher::Regex(r#""name":"Fast Consensus \[osdi24_smith\].pdf""#.to_string()),
      Matcher::Regex(r#""parents":\["papers-id"\]"#.to_string()),
    ]))
    .with_status(200)
    .with_body(r#"{"id":"file-1","name":"Fast Consensus [osdi24_smith].pdf"}"#)
    .expect(2)
    .create_async()
    .await;

  let config = Config::default().with_drive(drive_config(&server));
  let saver = PaperSaver::builder()
    .with_store(DriveClient::new(&config.drive))
    .with_token_broker(StaticToken::new("ya29.test"))
    .with_settings_store(MemoryStore::default())
    .with_title_fetcher(PresentationTitles)
    .with_client(reqwest::Client::new())
    .with_config(config)
    .build();

  let mut context = SaveContext::default();
  let start = Utc::now();
  let mut outcomes = Vec::new();
  for offset in [0, 500, 1100] {
    let now = start + Duration::milliseconds(offset);
    outcomes.push(saver.handle_command_at(&mut context, Command::SavePaper, &tab_url, now).await);
  }

  let Outcome::Uploaded(first) = &outcomes[0] else {
    panic!("expected an upload, got {:?}", outcomes[0]);
  };
  assert!(first.success, "{first:?}");
  assert_eq!(
    first.message,
    "File 'Fast Consensus [osdi24_smith].pdf' uploaded to path 'papers' successfully."
  );
  assert_eq!(outcomes[1], Outcome::Skipped);
  assert!(matches!(&outcomes[2], Outcome::Uploaded(result) if result.success));

  pdf.assert_async().await;
  upload.assert_async().await;
  Ok(())
}
