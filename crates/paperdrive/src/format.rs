//! Filename construction for saved papers.
//!
//! Saved files are named `"{title} [{identifier}].pdf"`, or `"{identifier}.pdf"` when no
//! title is known. Both parts are made filesystem safe: titles have illegal characters
//! replaced with `-`, identifiers with `_` (a DOI like `10.1145/3600006.3613140` becomes
//! `10.1145_3600006.3613140`).

use super::*;

lazy_static! {
  /// Characters that cannot appear in a filename component.
  static ref FILENAME_ILLEGAL: Regex = Regex::new(r#"[\\/?%*:|"<>]"#).unwrap();
  /// Runs of whitespace.
  static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Identifier used when neither an identifier nor a fallback is available.
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Cleans a title for use in a filename.
///
/// Illegal characters become `-`, whitespace runs collapse to one space and the ends are
/// trimmed. Returns `None` when nothing is left.
///
/// # Examples
///
/// ```
/// use paperdrive::format::format_title;
///
/// assert_eq!(format_title("  Time,  Clocks: and\nOrdering ").as_deref(), Some("Time, Clocks- and Ordering"));
/// assert_eq!(format_title(" \t "), None);
/// ```
pub fn format_title(title: &str) -> Option<String> {
  let replaced = FILENAME_ILLEGAL.replace_all(title, "-");
  let collapsed = WHITESPACE.replace_all(&replaced, " ");
  let trimmed = collapsed.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Cleans an identifier for use in a filename, replacing illegal characters with `_`.
pub fn format_identifier(identifier: &str) -> String {
  FILENAME_ILLEGAL.replace_all(identifier, "_").into_owned()
}

/// Builds the filename a paper is saved under.
///
/// The identifier used is the first non-empty of `identifier`, `fallback_id` and
/// [`UNKNOWN_IDENTIFIER`]. `id_type` only names the scheme in the fallback log line. This
/// function is total: absent or empty inputs degrade to the identifier-only form.
///
/// # Examples
///
/// ```
/// use paperdrive::{format::build_filename, paper::IdType};
///
/// assert_eq!(build_filename(None, None, Some("X"), Some(IdType::Arxiv)), "X.pdf");
/// assert_eq!(build_filename(Some("Foo"), None, Some("X"), Some(IdType::Arxiv)), "Foo [X].pdf");
/// assert_eq!(build_filename(Some("A/B"), Some("Y:Z"), Some("X"), Some(IdType::Doi)), "A-B [Y_Z].pdf");
/// ```
pub fn build_filename(
  title: Option<&str>,
  identifier: Option<&str>,
  fallback_id: Option<&str>,
  id_type: Option<IdType>,
) -> String {
  let identifier = identifier
    .filter(|id| !id.is_empty())
    .or(fallback_id.filter(|id| !id.is_empty()))
    .unwrap_or(UNKNOWN_IDENTIFIER);
  let identifier = format_identifier(identifier);

  match title.and_then(format_title) {
    Some(title) => format!("{title} [{identifier}].pdf"),
    None => {
      match id_type {
        Some(id_type) => warn!("Using fallback filename based on {id_type} ID: {identifier}"),
        None => warn!("Using fallback filename: {identifier}"),
      }
      format!("{identifier}.pdf")
    },
  }
}
