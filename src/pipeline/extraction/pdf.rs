use std::panic::{self, AssertUnwindSafe};

use super::types::{PageText, PdfExtractor};
use super::ExtractionError;

/// Reads the embedded text layer with `pdf-extract`. Scanned pages carry no
/// text layer and come back as empty strings.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        // pdf-extract panics on some valid PDFs (pages without /Contents or
        // /Resources). A panic is a read failure of this document only.
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|_| {
            tracing::warn!(bytes = pdf_bytes.len(), "Text layer extraction panicked");
            ExtractionError::PdfParsing("text layer extraction failed".into())
        })?;
        let pages = extracted.map_err(|e| {
            let reason = e.to_string();
            if reason.to_lowercase().contains("encrypt") {
                ExtractionError::PdfEncrypted
            } else {
                ExtractionError::PdfParsing(reason)
            }
        })?;
        tracing::debug!(pages = pages.len(), "Text layer read");
        Ok(number_pages(pages))
    }
}

fn number_pages(texts: impl IntoIterator<Item = String>) -> Vec<PageText> {
    texts
        .into_iter()
        .zip(1..)
        .map(|(text, page_number)| PageText { page_number, text })
        .collect()
}

/// Page separator understood by [`MockPdfExtractor`] and the mock renderer.
pub const MOCK_PAGE_BREAK: char = '\u{0C}';

/// Documents starting with this fail to open in [`MockPdfExtractor`].
pub const MOCK_CORRUPT_PREFIX: &str = "%CORRUPT";

/// In-memory stand-in for the text layer: the bytes are UTF-8 and pages are
/// separated by [`MOCK_PAGE_BREAK`].
pub struct MockPdfExtractor;

impl PdfExtractor for MockPdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let body = String::from_utf8_lossy(pdf_bytes);
        if body.starts_with(MOCK_CORRUPT_PREFIX) {
            return Err(ExtractionError::PdfParsing("xref table unreadable".into()));
        }
        Ok(number_pages(body.split(MOCK_PAGE_BREAK).map(str::to_owned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{BatchExtractor, DocumentBlob};
    use lopdf::{dictionary, Document, Object, ObjectId, Stream};

    /// Build a PDF with one text-bearing page per entry.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let kids: Vec<ObjectId> = pages
            .iter()
            .map(|line| {
                let ops = format!("BT /F1 11 Tf 72 720 Td ({line}) Tj ET");
                let contents = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                    "Contents" => contents,
                    "Resources" => dictionary! { "Font" => dictionary! { "F1" => font } },
                })
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn reads_each_page_of_a_digital_pdf() {
        let bytes = pdf_with_pages(&["Acordao 1234 de 2024", "Recomendacao 3"]);
        let pages = PdfTextExtractor.extract_pages(&bytes).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].page_number, 2);
        assert!(pages[0].text.contains("Acordao"), "got {:?}", pages[0].text);
        assert!(pages[1].text.contains("Recomendacao"), "got {:?}", pages[1].text);
    }

    /// One page with neither /Contents nor /Resources.
    fn pdf_with_bare_page() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page)],
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn bare_page_never_panics_out_of_the_extractor() {
        let result = PdfTextExtractor.extract_pages(&pdf_with_bare_page());
        match result {
            Ok(pages) => assert!(pages.iter().all(|p| p.text.trim().is_empty())),
            Err(e) => assert!(matches!(e, ExtractionError::PdfParsing(_))),
        }
    }

    #[test]
    fn bare_page_document_does_not_abort_the_batch() {
        let extractor = BatchExtractor::new(Box::new(PdfTextExtractor));
        let docs = vec![
            DocumentBlob::new("anexo_em_branco.pdf", pdf_with_bare_page()),
            DocumentBlob::new(
                "decisao.pdf",
                pdf_with_pages(&["Acordao 1234 de 2024 recomenda inventario"]),
            ),
        ];

        let result = extractor.extract_batch(&docs);

        assert_eq!(result.documents.len(), 2);
        assert!(result.text.contains("[decisao.pdf - Página 1]"));
        assert!(result.text.contains("Acordao"), "got {:?}", result.text);
        let blank = &result.documents[0];
        if !blank.errors.is_empty() {
            assert!(result
                .text
                .contains("[anexo_em_branco.pdf - Erro na leitura do documento:"));
        }
    }

    #[test]
    fn garbage_bytes_are_a_parsing_error() {
        let result = PdfTextExtractor.extract_pages(b"definitely not %PDF");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn mock_keeps_blank_pages_in_place() {
        let pages = MockPdfExtractor
            .extract_pages("capa\u{0C}\u{0C}despacho".as_bytes())
            .unwrap();
        let texts: Vec<_> = pages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["capa", "", "despacho"]);
        assert_eq!(pages[2].page_number, 3);
    }

    #[test]
    fn mock_rejects_corrupt_documents() {
        let result = MockPdfExtractor.extract_pages(b"%CORRUPT\x00\x01");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }
}
