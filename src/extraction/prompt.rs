//! Prompt construction for reviewer extraction.
//!
//! Pure assembly of the model payload from normalized input. The system
//! instruction pins the output to a fixed JSON shape and a closed color
//! palette so the client can style categories deterministically.

use super::input::{NormalizedInput, SourceMaterial};
use super::mode::ExtractionMode;

/// Allowed category colors. The model must pick from this palette; anything
/// else would leak arbitrary styling into the client.
pub const CATEGORY_PALETTE: [&str; 6] = [
    "#E0F2FE", "#DCFCE7", "#FEF9C3", "#FCE7F3", "#EDE9FE", "#FFEDD5",
];

/// Fixed generation parameters for every extraction call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: &'static str,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 8192,
            response_mime_type: "application/json",
        }
    }
}

/// Everything the generation client needs for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPayload {
    pub system_instruction: String,
    pub user_instruction: String,
    pub source: SourceMaterial,
    pub params: GenerationParams,
}

/// Build the model payload for a validated request. Pure, no I/O.
pub fn build_payload(input: NormalizedInput) -> ModelPayload {
    ModelPayload {
        system_instruction: system_instruction(input.mode),
        user_instruction: USER_INSTRUCTION.to_string(),
        source: input.source,
        params: GenerationParams::default(),
    }
}

const USER_INSTRUCTION: &str = "Extract the terms and definitions from the \
following study material. Return ONLY the JSON object described in your \
instructions, with no surrounding prose or markdown fences. Pay special \
attention to sections near the end of the document and keep extracting all \
the way to the final page.";

fn system_instruction(mode: ExtractionMode) -> String {
    format!(
        r##"You are a study assistant that turns course material into a reviewer: a set of terms and definitions grouped into categories.

Rules:
1. Extract every term the material defines. Do not skip minor terms.
2. Group related terms into categories with short descriptive names.
3. {definition_rule}
4. Choose each category's "color" from exactly this palette: {palette}.
5. Respond with ONLY a JSON object of this exact shape, no prose and no markdown fences:

{{
  "title": "short title for the material",
  "extractionMode": "{mode}",
  "categories": [
    {{
      "name": "category name",
      "color": "#E0F2FE",
      "terms": [
        {{ "term": "...", "definition": "...", "examples": [], "keywords": [] }}
      ]
    }}
  ]
}}"##,
        definition_rule = definition_rule(mode),
        palette = CATEGORY_PALETTE.join(", "),
        mode = mode.as_str(),
    )
}

fn definition_rule(mode: ExtractionMode) -> &'static str {
    match mode {
        ExtractionMode::Sentence => {
            "Write every definition as exactly one sentence, even when the \
             material defines the term at length."
        }
        ExtractionMode::Keywords => {
            "Write every definition as a dash-prefixed list of comma-separated \
             keywords, with at least 3-5 keywords per term \
             (for example: \"- chlorophyll, light energy, glucose\")."
        }
        ExtractionMode::Full => {
            "Copy definitions verbatim from the material. When a header \
             introduces a bulleted or numbered list, collapse it into a single \
             term: the header becomes the term and the combined list items \
             become the definition. Standalone concept definitions stay as \
             separate terms."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::input::NormalizedInput;

    fn text_input(mode: ExtractionMode) -> NormalizedInput {
        NormalizedInput {
            source: SourceMaterial::Text("Osmosis: diffusion of water.".to_string()),
            mode,
        }
    }

    #[test]
    fn sentence_mode_requests_single_sentence_definitions() {
        let payload = build_payload(text_input(ExtractionMode::Sentence));
        assert!(payload.system_instruction.contains("exactly one sentence"));
        assert!(payload.system_instruction.contains("\"extractionMode\": \"sentence\""));
    }

    #[test]
    fn keywords_mode_requests_keyword_lists() {
        let payload = build_payload(text_input(ExtractionMode::Keywords));
        assert!(payload.system_instruction.contains("comma-separated"));
        assert!(payload.system_instruction.contains("3-5 keywords"));
    }

    #[test]
    fn full_mode_requests_verbatim_extraction_with_list_collapse() {
        let payload = build_payload(text_input(ExtractionMode::Full));
        assert!(payload.system_instruction.contains("verbatim"));
        assert!(payload.system_instruction.contains("header becomes the term"));
    }

    #[test]
    fn every_palette_color_appears_in_the_instruction() {
        let payload = build_payload(text_input(ExtractionMode::Full));
        for color in CATEGORY_PALETTE {
            assert!(payload.system_instruction.contains(color), "missing {color}");
        }
    }

    #[test]
    fn user_instruction_flags_end_of_document() {
        let payload = build_payload(text_input(ExtractionMode::Full));
        assert!(payload.user_instruction.contains("end of the document"));
        assert!(payload.user_instruction.contains("ONLY the JSON object"));
    }

    #[test]
    fn generation_params_are_fixed() {
        let payload = build_payload(text_input(ExtractionMode::Full));
        assert_eq!(payload.params, GenerationParams::default());
        assert_eq!(payload.params.response_mime_type, "application/json");
    }

    #[test]
    fn source_material_passes_through_unchanged() {
        let input = NormalizedInput {
            source: SourceMaterial::File {
                bytes: b"%PDF".to_vec(),
                mime: "application/pdf",
            },
            mode: ExtractionMode::Full,
        };
        let payload = build_payload(input.clone());
        assert_eq!(payload.source, input.source);
    }

    #[test]
    fn payload_is_deterministic_for_equal_input() {
        let a = build_payload(text_input(ExtractionMode::Keywords));
        let b = build_payload(text_input(ExtractionMode::Keywords));
        assert_eq!(a, b);
    }
}
