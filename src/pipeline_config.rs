//! Deployment capability flags.
//!
//! OCR availability and the two-call classification used to be separate
//! program variants; here they are one pipeline switched by configuration.

use serde::Serialize;

use crate::pipeline::extraction::ExtractionPolicy;
use crate::pipeline::history::NullFieldPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    /// Batch-wide OCR fallback when the text layer yields too little text.
    pub ocr_enabled: bool,
    /// Second model call that authoritatively sets the final classification.
    pub two_stage_classification: bool,
    /// Lookup treats an empty searched cell as matching every question.
    pub lookup_null_matches: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: false,
            two_stage_classification: true,
            lookup_null_matches: true,
        }
    }
}

impl PipelineConfig {
    pub fn extraction_policy(&self) -> ExtractionPolicy {
        if self.ocr_enabled {
            ExtractionPolicy::OcrFallback
        } else {
            ExtractionPolicy::TextLayerOnly
        }
    }

    pub fn null_field_policy(&self) -> NullFieldPolicy {
        NullFieldPolicy::from_flag(self.lookup_null_matches)
    }
}
