//! Recovery parsing of model output.
//!
//! Models are not guaranteed to emit strictly valid JSON, so parsing walks an
//! ordered chain of increasingly aggressive repairs and stops at the first
//! success. The chain never runs a stage out of order: a successful strict
//! parse must never be mutated by a later stage.

use serde::Deserialize;
use thiserror::Error;

use super::assemble::Category;

/// Lenient mirror of the reviewer object as the model emits it. Field
/// normalization happens in the assembler, not here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReviewer {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("model returned an empty response")]
  EmptyResponse,
  #[error("no JSON object found in model response")]
  NoJsonFound,
  #[error("model response could not be parsed after all repair stages")]
  Unparseable,
}

/// Repair stages, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
  Strict,
  ExtractObject,
  StripTrailingCommas,
  StripControlChars,
}

/// Which stages a parse actually attempted. Lets tests assert that the chain
/// short-circuits and never mutates already-valid input.
#[derive(Debug, Clone, Default)]
pub struct RepairTrace {
  pub attempted: Vec<RepairStage>,
}

/// Parse model output through the repair chain.
pub fn parse(raw: &str) -> Result<RawReviewer, ParseError> {
  parse_traced(raw).0
}

/// As [`parse`], but also reports which repair stages ran.
pub fn parse_traced(raw: &str) -> (Result<RawReviewer, ParseError>, RepairTrace) {
  let mut trace = RepairTrace::default();

  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return (Err(ParseError::EmptyResponse), trace);
  }

  trace.attempted.push(RepairStage::Strict);
  if let Ok(reviewer) = serde_json::from_str::<RawReviewer>(trimmed) {
    return (Ok(reviewer), trace);
  }

  trace.attempted.push(RepairStage::ExtractObject);
  let Some(object) = extract_outer_object(trimmed) else {
    tracing::warn!(preview = %preview(trimmed), "no JSON object in model response");
    return (Err(ParseError::NoJsonFound), trace);
  };
  if let Ok(reviewer) = serde_json::from_str::<RawReviewer>(object) {
    return (Ok(reviewer), trace);
  }

  trace.attempted.push(RepairStage::StripTrailingCommas);
  let decommaed = strip_trailing_commas(object);
  if let Ok(reviewer) = serde_json::from_str::<RawReviewer>(&decommaed) {
    tracing::debug!("model response recovered by stripping trailing commas");
    return (Ok(reviewer), trace);
  }

  trace.attempted.push(RepairStage::StripControlChars);
  let cleaned = strip_control_chars(&decommaed);
  if let Ok(reviewer) = serde_json::from_str::<RawReviewer>(&cleaned) {
    tracing::debug!("model response recovered by stripping control characters");
    return (Ok(reviewer), trace);
  }

  tracing::warn!(preview = %preview(trimmed), "model response unparseable after all repair stages");
  (Err(ParseError::Unparseable), trace)
}

/// Substring from the first `{` to the last `}`, if any.
fn extract_outer_object(s: &str) -> Option<&str> {
  let start = s.find('{')?;
  let end = s.rfind('}')?;
  (end > start).then(|| &s[start..=end])
}

/// Remove commas that sit (possibly across whitespace) directly before a
/// closing `}` or `]`, outside of string literals.
fn strip_trailing_commas(s: &str) -> String {
  let chars: Vec<char> = s.chars().collect();
  let mut out = String::with_capacity(s.len());
  let mut in_string = false;
  let mut escaped = false;

  for (i, &c) in chars.iter().enumerate() {
    if in_string {
      out.push(c);
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }
    match c {
      '"' => {
        in_string = true;
        out.push(c);
      }
      ',' => {
        let next = chars[i + 1..].iter().copied().find(|c| !c.is_whitespace());
        if !matches!(next, Some('}' | ']')) {
          out.push(c);
        }
      }
      _ => out.push(c),
    }
  }
  out
}

/// Drop C0 control characters except the JSON whitespace trio.
fn strip_control_chars(s: &str) -> String {
  s.chars()
    .filter(|c| *c as u32 >= 0x20 || matches!(c, '\t' | '\n' | '\r'))
    .collect()
}

/// Bounded prefix of the raw response for server-side logs.
fn preview(s: &str) -> String {
  s.chars().take(200).collect()
}
