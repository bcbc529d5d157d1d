pub mod types;
pub mod sanitize;
pub mod pdf;
pub mod pdfium;
pub mod ocr;
pub mod vision_ocr;
pub mod orchestrator;

pub use types::*;
pub use sanitize::*;
pub use pdf::*;
pub use pdfium::*;
pub use ocr::*;
pub use vision_ocr::*;
pub use orchestrator::*;

use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a case document into text. Inside a batch these
/// never abort the run; they become inline markers.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Could not read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR engine unavailable: {0}")]
    OcrInit(String),

    #[error("OCR failed: {0}")]
    OcrProcessing(String),

    #[error("Not a readable PDF: {0}")]
    PdfParsing(String),

    #[error("Page {page} could not be rendered: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is encrypted or password-protected")]
    PdfEncrypted,

    #[error("Page image error: {0}")]
    ImageProcessing(String),

    #[error("Portuguese traineddata not found in {0}")]
    TessdataNotFound(PathBuf),
}
