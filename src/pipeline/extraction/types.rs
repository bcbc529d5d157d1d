use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// A named document blob as supplied by the document source.
#[derive(Debug, Clone)]
pub struct DocumentBlob {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentBlob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a document from disk, naming it after the file name.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Text recovered from one page of a document. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    pub confidence: f32,
}

/// Which extraction policy a batch runs under.
///
/// This is a deployment capability, fixed when the extractor is built:
/// an OCR-capable environment gets `OcrFallback`, everything else
/// `TextLayerOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    /// Direct text layer first; if the whole batch yields too little text,
    /// every document is rendered and OCR'd.
    OcrFallback,
    /// Direct text layer only. Pages without text get a placeholder.
    TextLayerOnly,
}

/// Per-document bookkeeping for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub pages: usize,
    pub pages_with_text: usize,
    pub ocr_pages: usize,
    pub errors: Vec<String>,
}

/// Result of extracting a whole batch of documents into one annotated blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExtraction {
    pub text: String,
    /// Characters of text recovered from the text layer, across all documents.
    pub direct_chars: usize,
    pub ocr_applied: bool,
    pub documents: Vec<DocumentSummary>,
}

impl BatchExtraction {
    pub fn error_count(&self) -> usize {
        self.documents.iter().map(|d| d.errors.len()).sum()
    }
}

/// PDF text-layer extraction abstraction
pub trait PdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

/// Renders PDF pages to PNG images for OCR.
pub trait PdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render a single page (0-based index) to PNG bytes.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    /// Recognize text in a PNG image. `lang` is a Tesseract-style
    /// language hint such as `por` or `por+eng`.
    fn recognize(&self, image_png: &[u8], lang: &str) -> Result<OcrPageResult, ExtractionError>;
}
