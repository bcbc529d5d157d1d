//! Vision OCR engine: reads scanned page images through the multimodal
//! model endpoint instead of a local Tesseract install.
//!
//! Bridges the `VisionClient` (analysis layer) to the `OcrEngine` trait
//! (extraction layer).

use std::sync::Arc;

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;
use crate::pipeline::analysis::types::VisionClient;

/// Returned by the model when the page carries no legible text.
const NO_TEXT_MARKER: &str = "[SEM_TEXTO]";

/// Production OCR engine backed by the configured vision-capable model.
pub struct VisionOcr {
    client: Arc<dyn VisionClient + Send + Sync>,
}

impl VisionOcr {
    pub fn new(client: Arc<dyn VisionClient + Send + Sync>) -> Self {
        Self { client }
    }
}

/// Human-readable language name for a Tesseract-style hint (`por+eng` → first code).
fn language_name(lang: &str) -> &'static str {
    match lang.split('+').next().unwrap_or_default().trim() {
        "por" => "português",
        "eng" => "inglês",
        "spa" => "espanhol",
        _ => "o idioma original do documento",
    }
}

fn build_ocr_prompt(lang: &str) -> String {
    format!(
        "Transcreva integralmente o texto visível nesta imagem de página de documento, \
         escrito em {}. Preserve a ordem de leitura, parágrafos e tabelas. \
         Não resuma, não corrija e não acrescente nada. \
         Se não houver texto legível, responda exatamente {NO_TEXT_MARKER}.",
        language_name(lang)
    )
}

/// Strip a surrounding code fence the model sometimes adds around transcriptions.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
        return body.strip_suffix("```").unwrap_or(body).trim();
    }
    trimmed
}

impl OcrEngine for VisionOcr {
    fn recognize(&self, image_png: &[u8], lang: &str) -> Result<OcrPageResult, ExtractionError> {
        let _span = tracing::info_span!("vision_ocr", image_size = image_png.len()).entered();
        let start = std::time::Instant::now();

        let raw = self
            .client
            .generate_with_image(&build_ocr_prompt(lang), image_png)
            .map_err(|e| ExtractionError::OcrProcessing(format!("Vision OCR failed: {e}")))?;

        let text = strip_code_fence(&raw);
        let (text, confidence) = if text.contains(NO_TEXT_MARKER) {
            (String::new(), 0.0)
        } else {
            (text.to_string(), if text.len() > 20 { 0.85 } else { 0.5 })
        };

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Vision OCR complete"
        );

        Ok(OcrPageResult { text, confidence })
    }
}
