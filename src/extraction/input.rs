//! Input normalization for extraction requests.
//!
//! Validates the raw multipart fields before any quota-charged provider work
//! runs, and resolves the effective extraction mode and source material.

use thiserror::Error;

use super::mode::ExtractionMode;

/// Accepted upload types: (canonical MIME, filename extension).
///
/// Only the PDF family is accepted today; new types get a row here and
/// nothing else has to change.
const ACCEPTED_FILE_TYPES: &[(&str, &str)] = &[("application/pdf", ".pdf")];

/// Declared content types that carry no real information and should defer
/// to extension sniffing.
const OPAQUE_CONTENT_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Raw upload as it arrived in the multipart form.
#[derive(Debug, Clone, Default)]
pub struct FileUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// The decoded request before validation.
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    pub file: Option<FileUpload>,
    pub text: Option<String>,
    pub mode: Option<String>,
}

/// Source material after validation, ready for the prompt builder.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMaterial {
    File { bytes: Vec<u8>, mime: &'static str },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub source: SourceMaterial,
    pub mode: ExtractionMode,
}

/// Size ceilings, sourced from configuration.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_upload_bytes: usize,
    pub max_text_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("provide a file or pasted text to generate a reviewer")]
    MissingInput,
    #[error("file exceeds the {limit_mib} MiB upload limit")]
    FileTooLarge { limit_mib: usize },
    #[error("pasted text exceeds the {limit} character limit")]
    TextTooLong { limit: usize },
    #[error("unsupported file type, only PDF uploads are accepted")]
    UnsupportedFileType,
    #[error("request body could not be read")]
    MalformedBody,
}

/// Validate and normalize a decoded request.
///
/// Rules run in a fixed order: presence, file size, text length, file type,
/// then mode resolution (which never fails).
pub fn validate(request: ExtractionRequest, limits: &Limits) -> Result<NormalizedInput, ValidationError> {
    // Empty uploads and whitespace-only text count as absent.
    let file = request.file.filter(|f| !f.bytes.is_empty());
    let text = request.text.filter(|t| !t.trim().is_empty());

    if file.is_none() && text.is_none() {
        return Err(ValidationError::MissingInput);
    }

    if let Some(file) = &file {
        if file.bytes.len() > limits.max_upload_bytes {
            return Err(ValidationError::FileTooLarge {
                limit_mib: limits.max_upload_bytes / (1024 * 1024),
            });
        }
    }

    if let Some(text) = &text {
        if text.chars().count() > limits.max_text_chars {
            return Err(ValidationError::TextTooLong {
                limit: limits.max_text_chars,
            });
        }
    }

    let mode = ExtractionMode::parse(request.mode.as_deref());

    // A file takes precedence when both somehow arrive.
    let source = match (file, text) {
        (Some(file), _) => {
            let mime = resolve_mime(&file)?;
            SourceMaterial::File { bytes: file.bytes, mime }
        }
        (None, Some(text)) => SourceMaterial::Text(text),
        (None, None) => unreachable!("presence checked above"),
    };

    Ok(NormalizedInput { source, mode })
}

/// Resolve the file's MIME type from the declared content type, falling back
/// to filename-extension sniffing when the declaration is absent or opaque.
fn resolve_mime(file: &FileUpload) -> Result<&'static str, ValidationError> {
    let declared = file
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && !OPAQUE_CONTENT_TYPES.contains(&ct.as_str()));

    if let Some(declared) = declared {
        return ACCEPTED_FILE_TYPES
            .iter()
            .find(|(mime, _)| *mime == declared)
            .map(|(mime, _)| *mime)
            .ok_or(ValidationError::UnsupportedFileType);
    }

    let name = file.file_name.as_deref().unwrap_or_default().to_ascii_lowercase();
    ACCEPTED_FILE_TYPES
        .iter()
        .find(|(_, ext)| name.ends_with(ext))
        .map(|(mime, _)| *mime)
        .ok_or(ValidationError::UnsupportedFileType)
}
