//! Resolved paper metadata.
//!
//! A [`ResolvedPaper`] is what the site resolver hands to the upload path: where the PDF
//! lives, what to call it, and which identifier scheme the identifier came from. It is built
//! fresh for every save attempt and never cached.
//!
//! # Examples
//!
//! ```
//! use paperdrive::paper::{IdType, ResolvedPaper};
//!
//! let paper = ResolvedPaper {
//!   pdf_url:    "https://arxiv.org/pdf/2301.07041.pdf".to_string(),
//!   title:      Some("Verifiable Fully Homomorphic Encryption".to_string()),
//!   identifier: "2301.07041".to_string(),
//!   id_type:    IdType::Arxiv,
//! };
//! assert_eq!(paper.filename(), "Verifiable Fully Homomorphic Encryption [2301.07041].pdf");
//! ```

use super::*;

/// A paper page resolved to everything needed to save it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPaper {
  /// Direct URL of the PDF document
  pub pdf_url:    String,
  /// Human readable title, if one could be found
  pub title:      Option<String>,
  /// Canonical identifier used to disambiguate the saved file
  pub identifier: String,
  /// Scheme the identifier belongs to
  pub id_type:    IdType,
}

/// Identifier scheme of a resolved paper.
///
/// Serialises to the display names used in stored custom-title data (`"arXiv"`, `"DOI"`,
/// `"Usenix"`) and parses case-insensitively.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use paperdrive::paper::IdType;
///
/// assert_eq!(IdType::from_str("arxiv").unwrap(), IdType::Arxiv);
/// assert_eq!(IdType::Doi.to_string(), "DOI");
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum IdType {
  /// arXiv papers (e.g., "2301.07041")
  #[serde(rename = "arXiv")]
  Arxiv,
  /// Papers with Digital Object Identifiers (ACM Digital Library)
  #[serde(rename = "DOI")]
  Doi,
  /// Usenix conference papers, identified by conference and author tokens
  #[serde(rename = "Usenix")]
  Usenix,
}

impl ResolvedPaper {
  /// Checks that the fields an upload cannot do without are present.
  pub fn validate(self) -> Result<Self> {
    if self.pdf_url.is_empty() {
      return Err(PaperDriveError::MissingField("PDF URL"));
    }
    if self.identifier.is_empty() {
      return Err(PaperDriveError::MissingField("identifier"));
    }
    Ok(self)
  }

  /// The filename this paper is saved under, using its own title.
  pub fn filename(&self) -> String {
    format::build_filename(
      self.title.as_deref(),
      Some(&self.identifier),
      Some(&self.identifier),
      Some(self.id_type),
    )
  }
}

impl Display for IdType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      IdType::Arxiv => write!(f, "arXiv"),
      IdType::Doi => write!(f, "DOI"),
      IdType::Usenix => write!(f, "Usenix"),
    }
  }
}

impl FromStr for IdType {
  type Err = PaperDriveError;

  fn from_str(s: &str) -> Result<Self> {
    match &s.to_lowercase() as &str {
      "arxiv" => Ok(IdType::Arxiv),
      "doi" => Ok(IdType::Doi),
      "usenix" => Ok(IdType::Usenix),
      s => Err(PaperDriveError::InvalidMessage(format!("unknown identifier type `{s}`"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn paper(pdf_url: &str, identifier: &str) -> ResolvedPaper {
    ResolvedPaper {
      pdf_url:    pdf_url.to_string(),
      title:      None,
      identifier: identifier.to_string(),
      id_type:    IdType::Doi,
    }
  }

  #[test]
  fn test_validate_requires_pdf_url_and_identifier() {
    assert!(paper("https://dl.acm.org/doi/pdf/10.1145/1", "10.1145/1").validate().is_ok());
    assert!(matches!(
      paper("", "10.1145/1").validate(),
      Err(PaperDriveError::MissingField("PDF URL"))
    ));
    assert!(matches!(
      paper("https://dl.acm.org/doi/pdf/10.1145/1", "").validate(),
      Err(PaperDriveError::MissingField("identifier"))
    ));
  }

  #[test]
  fn test_filename_without_title() {
    assert_eq!(paper("https://x", "10.1145/1").filename(), "10.1145_1.pdf");
  }

  #[test]
  fn test_id_type_serde_names() {
    assert_eq!(serde_json::to_string(&IdType::Arxiv).unwrap(), "\"arXiv\"");
    assert_eq!(serde_json::from_str::<IdType>("\"Usenix\"").unwrap(), IdType::Usenix);
    assert!("iacr".parse::<IdType>().is_err());
  }
}
