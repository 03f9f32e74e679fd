//! Page title fetching and bracketed identifier parsing.
//!
//! Paper landing pages carry the most readable title in their HTML `<title>` element. arXiv
//! prefixes it with the paper id in brackets (`[2301.07041] Verifiable Fully Homomorphic
//! Encryption`), which [`ParsedTitle::parse`] splits back out.
//!
//! Fetching a title is best effort: every failure, from DNS errors to a page without a
//! `<title>`, yields `None` and the caller falls back to an identifier-only filename.

use super::*;

lazy_static! {
  /// The first single-line `<title>` element of a page.
  static ref TITLE_ELEMENT: Regex = Regex::new(r"<title>(.*?)</title>").unwrap();
  /// Any HTML tag, respecting quoted attribute values.
  static ref HTML_TAG: Regex = Regex::new(r#"<("[^"]*"|'[^']*'|[^'">])*>"#).unwrap();
  /// Characters that cannot appear in a title used as a filename.
  static ref TITLE_ILLEGAL: Regex = Regex::new(r#"[/?%*:|"<>]"#).unwrap();
  /// A bracketed token at the very start of a title.
  static ref BRACKET_PREFIX: Regex = Regex::new(r"^\s*\[([^\]]+)\]\s*").unwrap();
  /// Runs of whitespace.
  static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Source of page titles.
///
/// The site resolver only ever needs "the title of this URL, if there is one", so that is
/// the whole contract. Implementations must not fail: absence is the failure signal.
#[async_trait]
pub trait TitleFetcher: Send + Sync {
  /// Fetch the page at `url` and return its cleaned `<title>` text.
  async fn fetch_title(&self, url: &str) -> Option<String>;
}

#[async_trait]
impl<T: TitleFetcher + ?Sized> TitleFetcher for Arc<T> {
  async fn fetch_title(&self, url: &str) -> Option<String> { (**self).fetch_title(url).await }
}

/// [`TitleFetcher`] that performs a plain HTTP GET.
#[derive(Debug, Clone, Default)]
pub struct HttpTitleFetcher {
  /// Client shared across fetches
  client: reqwest::Client,
}

impl HttpTitleFetcher {
  /// Creates a fetcher with a fresh HTTP client.
  pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
  async fn fetch_title(&self, url: &str) -> Option<String> {
    let response = match self.client.get(url).send().await {
      Ok(response) => response,
      Err(e) => {
        warn!("Error fetching title from page {url}: {e}");
        return None;
      },
    };

    if !response.status().is_success() {
      warn!("Error fetching title from page {url}: HTTP error! status: {}", response.status());
      return None;
    }

    let body = match response.text().await {
      Ok(body) => body,
      Err(e) => {
        warn!("Error reading page body from {url}: {e}");
        return None;
      },
    };

    let title = extract_title(&body);
    if title.is_none() {
      warn!("Title not found in page {url}");
    }
    title
  }
}

/// Extracts the first `<title>` of an HTML document, strips nested tags, and replaces
/// characters that are illegal in filenames with `-`.
///
/// # Examples
///
/// ```
/// use paperdrive::title::extract_title;
///
/// let html = "<html><head><title>Paxos: Made <b>Simple</b></title></head></html>";
/// assert_eq!(extract_title(html).as_deref(), Some("Paxos- Made Simple"));
/// assert_eq!(extract_title("<html></html>"), None);
/// ```
pub fn extract_title(html: &str) -> Option<String> {
  let raw = TITLE_ELEMENT.captures(html)?.get(1)?.as_str();
  let untagged = HTML_TAG.replace_all(raw, "");
  Some(TITLE_ILLEGAL.replace_all(&untagged, "-").into_owned())
}

/// A raw page title split into its display part and an optional embedded identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
  /// Cleaned display title, absent when nothing usable remains
  pub title:      Option<String>,
  /// Token found in a leading `[...]`, if any
  pub identifier: Option<String>,
}

impl ParsedTitle {
  /// Splits a raw title into title and identifier.
  ///
  /// A leading bracketed token (optionally preceded by whitespace) becomes the identifier and
  /// is removed along with the whitespace after it. What remains is sanitised: illegal
  /// filename characters become `-`, whitespace runs collapse to one space, and the ends are
  /// trimmed. An empty remainder leaves `title` absent.
  ///
  /// # Examples
  ///
  /// ```
  /// use paperdrive::title::ParsedTitle;
  ///
  /// let parsed = ParsedTitle::parse(Some("[2301.00001] A Great Paper"));
  /// assert_eq!(parsed.identifier.as_deref(), Some("2301.00001"));
  /// assert_eq!(parsed.title.as_deref(), Some("A Great Paper"));
  ///
  /// assert_eq!(ParsedTitle::parse(None), ParsedTitle::default());
  /// ```
  pub fn parse(raw: Option<&str>) -> Self {
    let Some(raw) = raw else {
      return Self::default();
    };
    trace!("Raw title input for parsing: {raw}");

    let (identifier, rest) = match BRACKET_PREFIX.captures(raw) {
      Some(captures) => {
        let whole = captures.get(0).map_or(0, |m| m.end());
        let identifier = captures.get(1).map(|m| m.as_str().to_string());
        debug!("Parsed bracketed identifier: {identifier:?}");
        (identifier, &raw[whole..])
      },
      None => (None, raw),
    };

    Self { title: sanitize(rest), identifier }
  }
}

/// Replaces illegal characters, collapses whitespace and trims; `None` if nothing is left.
fn sanitize(text: &str) -> Option<String> {
  let replaced = TITLE_ILLEGAL.replace_all(text, "-");
  let collapsed = WHITESPACE.replace_all(&replaced, " ");
  let trimmed = collapsed.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}
