use serde::{Deserialize, Serialize};

/// How much of each definition the model is asked to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
  /// Verbatim definitions, list sections collapsed under their header
  #[default]
  Full,
  /// One-sentence definitions only
  Sentence,
  /// Dash-prefixed keyword lists instead of prose definitions
  Keywords,
}

impl ExtractionMode {
  /// Resolve a client-supplied mode string. Unknown or absent values fall
  /// back to `Full` silently rather than erroring.
  pub fn parse(raw: Option<&str>) -> Self {
    match raw.map(str::trim) {
      Some("sentence") => Self::Sentence,
      Some("keywords") => Self::Keywords,
      _ => Self::Full,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Full => "full",
      Self::Sentence => "sentence",
      Self::Keywords => "keywords",
    }
  }
}
