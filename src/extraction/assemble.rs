//! Response contract types and the final assembly step.
//!
//! The assembler is the last pipeline stage: it takes whatever the recovery
//! parser salvaged and guarantees the response contract, in particular that
//! `categories` is always an array.

use serde::{Deserialize, Serialize};

use super::mode::ExtractionMode;
use super::recovery::RawReviewer;

/// One term/definition record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A named group of terms with a palette color.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub terms: Vec<Term>,
}

/// The assembled reviewer, as returned to and stored for the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    pub title: String,
    pub extraction_mode: String,
    pub categories: Vec<Category>,
}

/// Success body of the generation endpoint: the reviewer plus the caller's
/// post-charge remaining quota.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub reviewer: Reviewer,
    pub remaining: i64,
}

/// Normalize the parsed object into the response contract.
///
/// A missing or null `categories` becomes an empty array (a title-only
/// response is still useful). The mode stamped on the result is the mode the
/// request actually ran with, not whatever the model echoed back.
pub fn assemble(raw: RawReviewer, mode: ExtractionMode, remaining: i64) -> ExtractionResult {
    ExtractionResult {
        reviewer: Reviewer {
            title: raw.title.unwrap_or_default(),
            extraction_mode: mode.as_str().to_string(),
            categories: raw.categories.unwrap_or_default(),
        },
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_categories_becomes_empty_array() {
        let raw = RawReviewer {
            title: Some("Cell Biology".to_string()),
            categories: None,
        };
        let result = assemble(raw, ExtractionMode::Full, 5);
        assert_eq!(result.reviewer.categories, vec![]);
        assert_eq!(result.remaining, 5);
    }

    #[test]
    fn null_categories_serializes_as_empty_array() {
        let raw: RawReviewer = serde_json::from_str(r#"{"title":"T","categories":null}"#).unwrap();
        let result = assemble(raw, ExtractionMode::Full, 9);
        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(body["categories"], serde_json::json!([]));
    }

    #[test]
    fn stamps_the_requested_mode() {
        let raw: RawReviewer =
            serde_json::from_str(r#"{"title":"T","extractionMode":"full","categories":[]}"#).unwrap();
        let result = assemble(raw, ExtractionMode::Sentence, 3);
        assert_eq!(result.reviewer.extraction_mode, "sentence");
    }

    #[test]
    fn missing_title_defaults_to_empty() {
        let raw = RawReviewer { title: None, categories: Some(vec![Category::default()]) };
        let result = assemble(raw, ExtractionMode::Full, 0);
        assert_eq!(result.reviewer.title, "");
        assert_eq!(result.reviewer.categories.len(), 1);
    }

    #[test]
    fn result_body_uses_camel_case_field_names() {
        let result = assemble(RawReviewer::default(), ExtractionMode::Keywords, 7);
        let body = serde_json::to_value(&result).unwrap();
        assert!(body.get("extractionMode").is_some());
        assert!(body.get("remaining").is_some());
        assert!(body.get("categories").is_some());
    }
}
