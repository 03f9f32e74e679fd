//! Site resolution: from a page URL to a [`ResolvedPaper`].
//!
//! Supported pages are described by an ordered table of (pattern, [`SiteKind`]) bindings.
//! The first pattern that matches a URL decides how it is resolved; there is no attempt to
//! pick a "best" match, so table order matters. Each kind knows how to turn its capture
//! groups into a PDF URL and identifier, and which page to ask for a human readable title.
//!
//! Identifiers come from the URL wherever possible. The only site whose page title carries
//! an identifier is arXiv, and even there the URL's id is the fallback.
//!
//! # Examples
//!
//! ```no_run
//! use paperdrive::{site::SiteResolver, title::HttpTitleFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = SiteResolver::new(HttpTitleFetcher::new());
//! match resolver.resolve("https://arxiv.org/abs/2301.07041").await? {
//!   Some(paper) => println!("{} -> {}", paper.identifier, paper.pdf_url),
//!   None => println!("not a supported paper page"),
//! }
//! # Ok(())
//! # }
//! ```

use super::*;

/// The kinds of page the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKind {
  /// `https://arxiv.org/abs/{id}`
  ArxivAbstract,
  /// `https://dl.acm.org/doi/{doi}`
  AcmAbstract,
  /// `https://arxiv.org/pdf/{id}`
  ArxivPdf,
  /// `https://dl.acm.org/doi/pdf/{doi}`
  AcmPdf,
  /// `https://www.usenix.org/system/files/{conference}-{author}.pdf`
  UsenixPdf,
  /// `https://www.usenix.org/conference/{conference}/presentation/{author}`
  UsenixPresentation,
}

/// One row of the site table.
#[derive(Debug)]
pub struct SiteBinding {
  /// Pattern tried against the full page URL
  pub pattern: Regex,
  /// How a match is resolved
  pub kind:    SiteKind,
}

lazy_static! {
  /// The site table, in match order.
  static ref SITE_BINDINGS: Vec<SiteBinding> = vec![
    SiteBinding {
      pattern: Regex::new(r"https://arxiv\.org/abs/(\S+)").unwrap(),
      kind:    SiteKind::ArxivAbstract,
    },
    SiteBinding {
      pattern: Regex::new(r"(?i)https://dl\.acm\.org/doi/(10\.\d{4,9}/[-._;()/:A-Z0-9]+)").unwrap(),
      kind:    SiteKind::AcmAbstract,
    },
    SiteBinding {
      pattern: Regex::new(r"https://arxiv\.org/pdf/(\S+)").unwrap(),
      kind:    SiteKind::ArxivPdf,
    },
    SiteBinding {
      pattern: Regex::new(r"(?i)https://dl\.acm\.org/doi/pdf/(10\.\d{4,9}/[-._;()/:A-Z0-9]+)")
        .unwrap(),
      kind:    SiteKind::AcmPdf,
    },
    SiteBinding {
      pattern: Regex::new(r"(?i)https://www\.usenix\.org/system/files/(\w+)-([\w-]+)\.pdf").unwrap(),
      kind:    SiteKind::UsenixPdf,
    },
    SiteBinding {
      pattern: Regex::new(r"(?i)https://www\.usenix\.org/conference/(\w+)/presentation/([\w-]+)")
        .unwrap(),
      kind:    SiteKind::UsenixPresentation,
    },
  ];
}

impl SiteKind {
  /// Display name used in logs and errors.
  pub fn name(self) -> &'static str {
    match self {
      SiteKind::ArxivAbstract => "arXiv Abstract",
      SiteKind::AcmAbstract => "ACM Abstract",
      SiteKind::ArxivPdf => "arXiv PDF",
      SiteKind::AcmPdf => "ACM PDF",
      SiteKind::UsenixPdf => "Usenix PDF",
      SiteKind::UsenixPresentation => "Usenix Presentation",
    }
  }

  /// Identifier scheme every page of this kind resolves to.
  pub fn id_type(self) -> IdType {
    match self {
      SiteKind::ArxivAbstract | SiteKind::ArxivPdf => IdType::Arxiv,
      SiteKind::AcmAbstract | SiteKind::AcmPdf => IdType::Doi,
      SiteKind::UsenixPdf | SiteKind::UsenixPresentation => IdType::Usenix,
    }
  }

  /// Resolves a matched URL.
  ///
  /// `groups` are the pattern's capture groups in order (group 0 excluded). At most one
  /// title fetch is made.
  pub async fn resolve(
    self,
    url: &str,
    groups: &[String],
    fetcher: &dyn TitleFetcher,
  ) -> Result<ResolvedPaper> {
    let group = |index: usize| {
      groups.get(index).filter(|g| !g.is_empty()).cloned().ok_or_else(|| {
        PaperDriveError::Resolution {
          site:   self.name(),
          reason: format!("missing capture group {} in {url}", index + 1),
        }
      })
    };

    let (pdf_url, title_url, url_identifier) = match self {
      SiteKind::ArxivAbstract => {
        let id = group(0)?;
        (format!("https://arxiv.org/pdf/{id}.pdf"), url.to_string(), id)
      },
      SiteKind::ArxivPdf => {
        let id = group(0)?.replacen(".pdf", "", 1);
        (url.to_string(), format!("https://arxiv.org/abs/{id}"), id)
      },
      SiteKind::AcmAbstract => {
        let doi = group(0)?;
        (format!("https://dl.acm.org/doi/pdf/{doi}"), url.to_string(), doi)
      },
      SiteKind::AcmPdf => {
        let doi = group(0)?;
        (url.to_string(), format!("https://dl.acm.org/doi/{doi}"), doi)
      },
      SiteKind::UsenixPdf => {
        let (conference, author) = (group(0)?, group(1)?);
        (
          url.to_string(),
          format!("https://www.usenix.org/conference/{conference}/presentation/{author}"),
          format!("{conference}_{author}"),
        )
      },
      SiteKind::UsenixPresentation => {
        let (conference, author) = (group(0)?, group(1)?);
        (
          format!("https://www.usenix.org/system/files/{conference}-{author}.pdf"),
          url.to_string(),
          format!("{conference}_{author}"),
        )
      },
    };

    debug!("Fetching title for {} page from {title_url}", self.name());
    let parsed = ParsedTitle::parse(fetcher.fetch_title(&title_url).await.as_deref());

    // Only arXiv titles carry an identifier worth trusting.
    let identifier = match self.id_type() {
      IdType::Arxiv => parsed.identifier.unwrap_or(url_identifier),
      IdType::Doi | IdType::Usenix => url_identifier,
    };

    let paper = ResolvedPaper { pdf_url, title: parsed.title, identifier, id_type: self.id_type() };
    debug!(
      "{} handler: PDF URL={}, Title={:?}, Identifier={}",
      self.name(),
      paper.pdf_url,
      paper.title,
      paper.identifier
    );
    Ok(paper)
  }
}

/// Resolves page URLs against the site table.
pub struct SiteResolver {
  /// Where page titles come from
  fetcher: Box<dyn TitleFetcher>,
}

impl SiteResolver {
  /// Creates a resolver using the given title source.
  pub fn new(fetcher: impl TitleFetcher + 'static) -> Self { Self { fetcher: Box::new(fetcher) } }

  /// Creates a resolver from an already boxed title source.
  pub fn from_boxed(fetcher: Box<dyn TitleFetcher>) -> Self { Self { fetcher } }

  /// The site table, in match order.
  pub fn bindings() -> &'static [SiteBinding] { &SITE_BINDINGS }

  /// Finds the first binding matching `url` and its capture groups.
  pub fn classify(url: &str) -> Option<(SiteKind, Vec<String>)> {
    SITE_BINDINGS.iter().find_map(|binding| {
      binding.pattern.captures(url).map(|captures| {
        let groups = captures
          .iter()
          .skip(1)
          .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
          .collect();
        (binding.kind, groups)
      })
    })
  }

  /// Resolves a page URL into a paper.
  ///
  /// # Returns
  ///
  /// - `Ok(Some(paper))` when a binding matched and resolved with a PDF URL and identifier
  /// - `Ok(None)` when no binding matches; this is not an error
  /// - `Err(..)` when the matching binding failed; later bindings are not tried
  pub async fn resolve(&self, url: &str) -> Result<Option<ResolvedPaper>> {
    debug!("Processing URL: {url}");
    let Some((kind, groups)) = Self::classify(url) else {
      debug!("URL does not match any supported pattern: {url}");
      return Ok(None);
    };
    debug!("Matched pattern for {}", kind.name());

    let paper = kind.resolve(url, &groups, self.fetcher.as_ref()).await.map_err(|e| {
      warn!("Error in handler for {}: {e}", kind.name());
      e
    })?;
    paper.validate().map(Some)
  }
}

impl std::fmt::Debug for SiteResolver {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SiteResolver").field("bindings", &SITE_BINDINGS.len()).finish()
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, sync::Mutex};

  use super::*;

  /// Title source answering from a fixed table and recording what was asked.
  #[derive(Default)]
  struct FixedTitles {
    titles:    HashMap<String, String>,
    requested: Mutex<Vec<String>>,
  }

  impl FixedTitles {
    fn with(mut self, url: &str, title: &str) -> Self {
      self.titles.insert(url.to_string(), title.to_string());
      self
    }
  }

  #[async_trait]
  impl TitleFetcher for FixedTitles {
    async fn fetch_title(&self, url: &str) -> Option<String> {
      self.requested.lock().unwrap().push(url.to_string());
      self.titles.get(url).cloned()
    }
  }

  fn resolver(titles: FixedTitles) -> (SiteResolver, Arc<FixedTitles>) {
    let titles = Arc::new(titles);
    (SiteResolver::new(titles.clone()), titles)
  }

  #[tokio::test]
  async fn test_arxiv_abstract() {
    let (resolver, titles) = resolver(FixedTitles::default().with(
      "https://arxiv.org/abs/2301.00001",
      "[2301.00001v2] A Great Paper",
    ));
    let paper = resolver.resolve("https://arxiv.org/abs/2301.00001").await.unwrap().unwrap();
    assert_eq!(paper.pdf_url, "https://arxiv.org/pdf/2301.00001.pdf");
    assert_eq!(paper.id_type, IdType::Arxiv);
    assert_eq!(paper.identifier, "2301.00001v2");
    assert_eq!(paper.title.as_deref(), Some("A Great Paper"));
    assert_eq!(*titles.requested.lock().unwrap(), vec!["https://arxiv.org/abs/2301.00001"]);
  }

  #[tokio::test]
  async fn test_arxiv_abstract_without_title() {
    let (resolver, _) = resolver(FixedTitles::default());
    let paper = resolver.resolve("https://arxiv.org/abs/2301.00001").await.unwrap().unwrap();
    assert_eq!(paper.pdf_url, "https://arxiv.org/pdf/2301.00001.pdf");
    assert_eq!(paper.identifier, "2301.00001");
    assert_eq!(paper.title, None);
    assert_eq!(paper.filename(), "2301.00001.pdf");
  }

  #[tokio::test]
  async fn test_arxiv_pdf_uses_abstract_title() {
    let (resolver, titles) = resolver(FixedTitles::default().with(
      "https://arxiv.org/abs/2301.07041",
      "[2301.07041] Verifiable Fully Homomorphic Encryption",
    ));
    let paper = resolver.resolve("https://arxiv.org/pdf/2301.07041.pdf").await.unwrap().unwrap();
    assert_eq!(paper.pdf_url, "https://arxiv.org/pdf/2301.07041.pdf");
    assert_eq!(paper.identifier, "2301.07041");
    assert_eq!(paper.title.as_deref(), Some("Verifiable Fully Homomorphic Encryption"));
    assert_eq!(*titles.requested.lock().unwrap(), vec!["https://arxiv.org/abs/2301.07041"]);
  }

  #[tokio::test]
  async fn test_acm_abstract() {
    let (resolver, _) = resolver(FixedTitles::default().with(
      "https://dl.acm.org/doi/10.1145/3600006.3613140",
      "[Misleading] Some SOSP Paper | Proceedings",
    ));
    let paper =
      resolver.resolve("https://dl.acm.org/doi/10.1145/3600006.3613140").await.unwrap().unwrap();
    assert_eq!(paper.pdf_url, "https://dl.acm.org/doi/pdf/10.1145/3600006.3613140");
    assert_eq!(paper.identifier, "10.1145/3600006.3613140");
    assert_eq!(paper.id_type, IdType::Doi);
    assert_eq!(paper.title.as_deref(), Some("Some SOSP Paper - Proceedings"));
  }

  #[tokio::test]
  async fn test_acm_pdf_fetches_landing_page() {
    let (resolver, titles) = resolver(FixedTitles::default());
    let paper = resolver
      .resolve("https://dl.acm.org/doi/pdf/10.1145/3600006.3613140")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(paper.pdf_url, "https://dl.acm.org/doi/pdf/10.1145/3600006.3613140");
    assert_eq!(paper.identifier, "10.1145/3600006.3613140");
    assert_eq!(*titles.requested.lock().unwrap(), vec![
      "https://dl.acm.org/doi/10.1145/3600006.3613140"
    ]);
  }

  #[tokio::test]
  async fn test_usenix_pdf() {
    let (resolver, titles) = resolver(FixedTitles::default().with(
      "https://www.usenix.org/conference/nsdi23/presentation/liu-tianfeng",
      "Understanding Something | USENIX",
    ));
    let paper = resolver
      .resolve("https://www.usenix.org/system/files/nsdi23-liu-tianfeng.pdf")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(paper.pdf_url, "https://www.usenix.org/system/files/nsdi23-liu-tianfeng.pdf");
    assert_eq!(paper.identifier, "nsdi23_liu-tianfeng");
    assert_eq!(paper.id_type, IdType::Usenix);
    assert_eq!(paper.title.as_deref(), Some("Understanding Something - USENIX"));
    assert_eq!(titles.requested.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_usenix_presentation() {
    let (resolver, _) = resolver(FixedTitles::default());
    let paper = resolver
      .resolve("https://www.usenix.org/conference/osdi24/presentation/zhang-wei")
      .await
      .unwrap()
      .unwrap();
    assert_eq!(paper.pdf_url, "https://www.usenix.org/system/files/osdi24-zhang-wei.pdf");
    assert_eq!(paper.identifier, "osdi24_zhang-wei");
  }

  #[tokio::test]
  async fn test_unsupported_page() {
    let (resolver, titles) = resolver(FixedTitles::default());
    assert_eq!(resolver.resolve("https://example.com/paper.pdf").await.unwrap(), None);
    assert!(titles.requested.lock().unwrap().is_empty());
  }

  #[test]
  fn test_table_order() {
    let kinds: Vec<SiteKind> = SiteResolver::bindings().iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![
      SiteKind::ArxivAbstract,
      SiteKind::AcmAbstract,
      SiteKind::ArxivPdf,
      SiteKind::AcmPdf,
      SiteKind::UsenixPdf,
      SiteKind::UsenixPresentation,
    ]);
    assert_eq!(
      SiteResolver::classify("https://dl.acm.org/doi/pdf/10.1145/1.2").map(|(k, _)| k),
      Some(SiteKind::AcmPdf)
    );
  }
}
