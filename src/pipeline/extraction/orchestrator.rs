use super::sanitize::sanitize_extracted_text;
use super::types::{
    BatchExtraction, DocumentBlob, DocumentSummary, ExtractionPolicy, OcrEngine, PdfExtractor,
    PdfPageRenderer,
};

/// Below this many characters of text-layer text across the whole batch,
/// the batch is treated as scanned and every document goes through OCR.
pub const OCR_TRIGGER_MIN_CHARS: usize = 100;

/// Default rendering DPI for OCR.
pub const DEFAULT_OCR_DPI: u32 = 150;

/// Placeholder for an empty page when OCR fallback is available.
pub const NO_TEXT_FOUND: &str = "[Nenhum texto encontrado nesta página]";

/// Placeholder for an empty page when running without OCR.
pub const TEXT_NOT_EXTRACTED: &str = "[Texto não extraído: página sem camada de texto]";

// ═══════════════════════════════════════════════════════════
// Page labels and markers
// ═══════════════════════════════════════════════════════════

fn page_label(name: &str, page: usize) -> String {
    format!("[{name} - Página {page}]")
}

fn ocr_page_label(name: &str, page: usize) -> String {
    format!("[{name} - Página {page} (OCR)]")
}

fn read_error_marker(name: &str, error: &str) -> String {
    format!("[{name} - Erro na leitura do documento: {error}]")
}

fn ocr_error_marker(name: &str, error: &str) -> String {
    format!("[{name} - Erro ao aplicar OCR: {error}]")
}

// ═══════════════════════════════════════════════════════════
// BatchExtractor
// ═══════════════════════════════════════════════════════════

/// Everything needed to OCR a rendered page.
struct OcrStage {
    renderer: Box<dyn PdfPageRenderer + Send + Sync>,
    engine: Box<dyn OcrEngine + Send + Sync>,
    lang: String,
    dpi: u32,
}

/// Turns a batch of uploaded documents into one page-annotated text blob.
///
/// Uses trait objects for text-layer extraction, page rendering and OCR,
/// enabling dependency injection. Without an OCR stage the extractor runs
/// [`ExtractionPolicy::TextLayerOnly`].
pub struct BatchExtractor {
    pdf_extractor: Box<dyn PdfExtractor + Send + Sync>,
    ocr: Option<OcrStage>,
}

impl BatchExtractor {
    pub fn new(pdf_extractor: Box<dyn PdfExtractor + Send + Sync>) -> Self {
        Self {
            pdf_extractor,
            ocr: None,
        }
    }

    /// Enable the OCR fallback policy.
    pub fn with_ocr_fallback(
        mut self,
        renderer: Box<dyn PdfPageRenderer + Send + Sync>,
        engine: Box<dyn OcrEngine + Send + Sync>,
        lang: &str,
        dpi: u32,
    ) -> Self {
        self.ocr = Some(OcrStage {
            renderer,
            engine,
            lang: lang.to_string(),
            dpi,
        });
        self
    }

    pub fn policy(&self) -> ExtractionPolicy {
        if self.ocr.is_some() {
            ExtractionPolicy::OcrFallback
        } else {
            ExtractionPolicy::TextLayerOnly
        }
    }

    /// Extract every document, in order. Never fails as a whole: a document
    /// that cannot be read leaves an inline error marker in the text.
    pub fn extract_batch(&self, documents: &[DocumentBlob]) -> BatchExtraction {
        let policy = self.policy();
        let mut text = String::new();
        let mut direct_chars = 0usize;
        let mut summaries = Vec::with_capacity(documents.len());

        let empty_placeholder = match policy {
            ExtractionPolicy::OcrFallback => NO_TEXT_FOUND,
            ExtractionPolicy::TextLayerOnly => TEXT_NOT_EXTRACTED,
        };

        for doc in documents {
            let mut summary = DocumentSummary {
                name: doc.name.clone(),
                ..Default::default()
            };

            match self.pdf_extractor.extract_pages(&doc.bytes) {
                Ok(pages) => {
                    summary.pages = pages.len();
                    for page in pages {
                        let clean = sanitize_extracted_text(&page.text);
                        text.push('\n');
                        text.push_str(&page_label(&doc.name, page.page_number));
                        text.push('\n');
                        if clean.is_empty() {
                            text.push_str(empty_placeholder);
                        } else {
                            direct_chars += clean.chars().count();
                            summary.pages_with_text += 1;
                            text.push_str(&clean);
                        }
                        text.push('\n');
                    }
                    tracing::debug!(
                        document = %doc.name,
                        pages = summary.pages,
                        pages_with_text = summary.pages_with_text,
                        "Text layer extracted"
                    );
                }
                Err(e) => {
                    tracing::warn!(document = %doc.name, error = %e, "Document read failed");
                    let message = e.to_string();
                    text.push('\n');
                    text.push_str(&read_error_marker(&doc.name, &message));
                    text.push('\n');
                    summary.errors.push(message);
                }
            }

            summaries.push(summary);
        }

        let mut ocr_applied = false;
        if let Some(stage) = &self.ocr {
            if direct_chars < OCR_TRIGGER_MIN_CHARS {
                tracing::info!(
                    direct_chars,
                    threshold = OCR_TRIGGER_MIN_CHARS,
                    documents = documents.len(),
                    "Insufficient text layer across batch, applying OCR to every document"
                );
                for (doc, summary) in documents.iter().zip(summaries.iter_mut()) {
                    self.ocr_document(stage, doc, summary, &mut text);
                }
                ocr_applied = true;
            }
        }

        tracing::info!(
            documents = documents.len(),
            direct_chars,
            ocr_applied,
            text_length = text.len(),
            "Batch extraction complete"
        );

        BatchExtraction {
            text,
            direct_chars,
            ocr_applied,
            documents: summaries,
        }
    }

    fn ocr_document(
        &self,
        stage: &OcrStage,
        doc: &DocumentBlob,
        summary: &mut DocumentSummary,
        text: &mut String,
    ) {
        let page_count = match stage.renderer.page_count(&doc.bytes) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(document = %doc.name, error = %e, "OCR page count failed");
                let message = e.to_string();
                text.push('\n');
                text.push_str(&ocr_error_marker(&doc.name, &message));
                text.push('\n');
                summary.errors.push(message);
                return;
            }
        };

        for index in 0..page_count {
            let recognized = stage
                .renderer
                .render_page(&doc.bytes, index, stage.dpi)
                .and_then(|png| stage.engine.recognize(&png, &stage.lang));

            match recognized {
                Ok(result) => {
                    let clean = sanitize_extracted_text(&result.text);
                    text.push('\n');
                    text.push_str(&ocr_page_label(&doc.name, index + 1));
                    text.push('\n');
                    text.push_str(&clean);
                    text.push('\n');
                    summary.ocr_pages += 1;
                    tracing::debug!(
                        document = %doc.name,
                        page = index + 1,
                        confidence = result.confidence,
                        text_len = clean.len(),
                        "Page OCR complete"
                    );
                }
                Err(e) => {
                    // A failed page ends OCR for this document; the rest of the batch continues.
                    tracing::warn!(
                        document = %doc.name,
                        page = index + 1,
                        error = %e,
                        "OCR failed"
                    );
                    let message = e.to_string();
                    text.push('\n');
                    text.push_str(&ocr_error_marker(&doc.name, &message));
                    text.push('\n');
                    summary.errors.push(message);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::extraction::ocr::MockOcrEngine;
    use crate::pipeline::extraction::pdf::MockPdfExtractor;
    use crate::pipeline::extraction::pdfium::MockPdfPageRenderer;

    fn long_typed_text() -> String {
        "O gestor informou a implantação do sistema de controle de estoque \
         em todas as unidades hospitalares regionais, com relatórios mensais."
            .repeat(2)
    }

    fn ocr_extractor(engine: Arc<MockOcrEngine>) -> BatchExtractor {
        BatchExtractor::new(Box::new(MockPdfExtractor)).with_ocr_fallback(
            Box::new(MockPdfPageRenderer),
            Box::new(engine),
            "por",
            DEFAULT_OCR_DPI,
        )
    }

    #[test]
    fn annotates_pages_in_document_then_page_order() {
        let extractor = BatchExtractor::new(Box::new(MockPdfExtractor));
        let docs = vec![
            DocumentBlob::new("relatorio.pdf", b"pagina um\x0cpagina dois".to_vec()),
            DocumentBlob::new("resposta.pdf", b"resposta do gestor".to_vec()),
        ];
        let result = extractor.extract_batch(&docs);

        let first = result.text.find("[relatorio.pdf - Página 1]").unwrap();
        let second = result.text.find("[relatorio.pdf - Página 2]").unwrap();
        let third = result.text.find("[resposta.pdf - Página 1]").unwrap();
        assert!(first < second && second < third);
        assert!(result.text.contains("pagina dois"));
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0].pages, 2);
    }

    #[test]
    fn text_layer_only_marks_empty_pages_not_extracted() {
        let extractor = BatchExtractor::new(Box::new(MockPdfExtractor));
        assert_eq!(extractor.policy(), ExtractionPolicy::TextLayerOnly);

        let docs = vec![DocumentBlob::new("scan.pdf", b"   \x0c".to_vec())];
        let result = extractor.extract_batch(&docs);

        assert!(!result.ocr_applied);
        assert_eq!(result.text.matches(TEXT_NOT_EXTRACTED).count(), 2);
        assert_eq!(result.direct_chars, 0);
    }

    #[test]
    fn short_batch_triggers_ocr_for_every_document() {
        let engine = Arc::new(MockOcrEngine::new("texto reconhecido", 0.9));
        let extractor = ocr_extractor(engine.clone());
        assert_eq!(extractor.policy(), ExtractionPolicy::OcrFallback);

        let docs = vec![
            DocumentBlob::new("a.pdf", b"curto".to_vec()),
            DocumentBlob::new("b.pdf", b"\x0c".to_vec()),
        ];
        let result = extractor.extract_batch(&docs);

        assert!(result.ocr_applied);
        // a.pdf has 1 page, b.pdf has 2 pages
        assert_eq!(engine.calls(), 3);
        assert!(result.text.contains("[a.pdf - Página 1 (OCR)]"));
        assert!(result.text.contains("[b.pdf - Página 2 (OCR)]"));
        assert!(result.text.contains(NO_TEXT_FOUND));
        assert_eq!(engine.langs(), vec!["por"; 3]);
    }

    #[test]
    fn long_typed_document_suppresses_ocr_for_scanned_sibling() {
        let engine = Arc::new(MockOcrEngine::new("nunca usado", 0.9));
        let extractor = ocr_extractor(engine.clone());

        let docs = vec![
            DocumentBlob::new("digitado.pdf", long_typed_text().into_bytes()),
            DocumentBlob::new("escaneado.pdf", b"".to_vec()),
        ];
        let result = extractor.extract_batch(&docs);

        assert!(result.direct_chars >= OCR_TRIGGER_MIN_CHARS);
        assert!(!result.ocr_applied);
        assert_eq!(engine.calls(), 0);
        assert!(result.text.contains("[escaneado.pdf - Página 1]\n[Nenhum texto"));
    }

    #[test]
    fn threshold_counts_text_not_labels() {
        let engine = Arc::new(MockOcrEngine::new("ocr", 0.9));
        let extractor = ocr_extractor(engine.clone());

        // 99 characters of real text, plus long file names that must not count
        let text = "x".repeat(OCR_TRIGGER_MIN_CHARS - 1);
        let docs = vec![DocumentBlob::new(
            "um_nome_de_arquivo_bastante_comprido_para_o_teste.pdf",
            text.into_bytes(),
        )];
        let result = extractor.extract_batch(&docs);

        assert_eq!(result.direct_chars, OCR_TRIGGER_MIN_CHARS - 1);
        assert!(result.ocr_applied);
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn exactly_threshold_does_not_trigger_ocr() {
        let engine = Arc::new(MockOcrEngine::new("ocr", 0.9));
        let extractor = ocr_extractor(engine.clone());
        let docs = vec![DocumentBlob::new(
            "a.pdf",
            "y".repeat(OCR_TRIGGER_MIN_CHARS).into_bytes(),
        )];
        let result = extractor.extract_batch(&docs);
        assert!(!result.ocr_applied);
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn read_failure_is_inline_and_batch_continues() {
        let extractor = BatchExtractor::new(Box::new(MockPdfExtractor));
        let docs = vec![
            DocumentBlob::new("quebrado.pdf", b"%CORRUPT data".to_vec()),
            DocumentBlob::new("ok.pdf", long_typed_text().into_bytes()),
        ];
        let result = extractor.extract_batch(&docs);

        assert!(result
            .text
            .contains("[quebrado.pdf - Erro na leitura do documento: PDF parsing failed"));
        assert!(result.text.contains("[ok.pdf - Página 1]"));
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.documents[0].errors.len(), 1);
    }

    #[test]
    fn ocr_failure_is_inline_and_batch_continues() {
        let engine = Arc::new(MockOcrEngine::failing());
        let extractor = ocr_extractor(engine.clone());
        let docs = vec![
            DocumentBlob::new("a.pdf", b"".to_vec()),
            DocumentBlob::new("b.pdf", b"".to_vec()),
        ];
        let result = extractor.extract_batch(&docs);

        assert!(result.ocr_applied);
        assert_eq!(engine.calls(), 2);
        assert!(result.text.contains("[a.pdf - Erro ao aplicar OCR:"));
        assert!(result.text.contains("[b.pdf - Erro ao aplicar OCR:"));
        assert_eq!(result.error_count(), 2);
    }

    #[test]
    fn unreadable_document_is_still_ocrd_in_scanned_batch() {
        let engine = Arc::new(MockOcrEngine::new("conteúdo escaneado", 0.7));
        let extractor = ocr_extractor(engine.clone());
        let docs = vec![DocumentBlob::new("x.pdf", b"%CORRUPT".to_vec())];
        let result = extractor.extract_batch(&docs);

        assert!(result.ocr_applied);
        assert!(result.text.contains("[x.pdf - Página 1 (OCR)]\nconteúdo escaneado"));
    }

    #[test]
    fn empty_batch_yields_empty_text() {
        let extractor = BatchExtractor::new(Box::new(MockPdfExtractor));
        let result = extractor.extract_batch(&[]);
        assert!(result.text.is_empty());
        assert!(result.documents.is_empty());
    }
}
