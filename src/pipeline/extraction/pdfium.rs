//! Page rendering for the OCR fallback, backed by Google PDFium.
//!
//! The library location is resolved once when the renderer is built. A
//! `Pdfium` handle is `!Send`, so each call binds a fresh one from that
//! location; the dynamic loader caches the library after the first bind.

use std::io::Cursor;
use std::path::PathBuf;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Longest side of a rendered page, in pixels.
const MAX_RENDER_SIDE_PX: u32 = 4096;

const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Explicit path to the PDFium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Where the PDFium shared library was found.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LibrarySource {
    File(PathBuf),
    System,
}

/// Renders PDF pages to PNG for OCR.
pub struct PdfiumRenderer {
    source: LibrarySource,
}

impl PdfiumRenderer {
    /// Locate PDFium and check that it binds. Lookup order: the
    /// `PDFIUM_DYNAMIC_LIB_PATH` variable, the executable's directory, then
    /// the system search path.
    pub fn new() -> Result<Self, ExtractionError> {
        let source = locate_library()?;
        tracing::info!(source = ?source, "PDFium available for page rendering");
        Ok(Self { source })
    }

    fn bind(&self) -> Result<Pdfium, ExtractionError> {
        let bindings = match &self.source {
            LibrarySource::File(path) => Pdfium::bind_to_library(path),
            LibrarySource::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| render_error(0, format!("PDFium bind failed: {e}")))?;
        Ok(Pdfium::new(bindings))
    }
}

fn locate_library() -> Result<LibrarySource, ExtractionError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let path = PathBuf::from(path);
        Pdfium::bind_to_library(&path).map_err(|e| {
            render_error(0, format!("{PDFIUM_LIB_PATH_ENV}={}: {e}", path.display()))
        })?;
        return Ok(LibrarySource::File(path));
    }

    let beside_exe = std::env::current_exe().ok().and_then(|exe| {
        exe.parent()
            .map(|dir| Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref()))
    });
    if let Some(candidate) = beside_exe {
        if Pdfium::bind_to_library(&candidate).is_ok() {
            return Ok(LibrarySource::File(candidate));
        }
    }

    Pdfium::bind_to_system_library().map_err(|e| {
        render_error(
            0,
            format!("PDFium not found; install it or set {PDFIUM_LIB_PATH_ENV} ({e})"),
        )
    })?;
    Ok(LibrarySource::System)
}

fn render_error(page: usize, reason: String) -> ExtractionError {
    ExtractionError::PdfRendering { page, reason }
}

fn open_error(e: PdfiumError) -> ExtractionError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        render_error(0, format!("cannot open document: {message}"))
    }
}

/// Pixel size of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderSize {
    width: u32,
    height: u32,
    /// The longest side was reduced to `MAX_RENDER_SIDE_PX`.
    capped: bool,
}

impl RenderSize {
    /// Scale page points to pixels at `dpi`, never below 1px and never
    /// above the side limit, aspect ratio kept.
    fn for_page(width_pt: f32, height_pt: f32, dpi: u32) -> Self {
        let scale = dpi as f32 / PDF_POINTS_PER_INCH;
        let width = (width_pt * scale).max(1.0);
        let height = (height_pt * scale).max(1.0);
        let longest = width.max(height);

        if longest <= MAX_RENDER_SIDE_PX as f32 {
            return Self {
                width: width as u32,
                height: height as u32,
                capped: false,
            };
        }

        let shrink = MAX_RENDER_SIDE_PX as f32 / longest;
        Self {
            width: ((width * shrink) as u32).clamp(1, MAX_RENDER_SIDE_PX),
            height: ((height * shrink) as u32).clamp(1, MAX_RENDER_SIDE_PX),
            capped: true,
        }
    }
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(open_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(open_error)?;

        let pages = document.pages();
        let page = u16::try_from(page_index)
            .ok()
            .and_then(|index| pages.get(index).ok())
            .ok_or_else(|| {
                render_error(
                    page_index,
                    format!("no page {} in a {}-page document", page_index + 1, pages.len()),
                )
            })?;

        let size = RenderSize::for_page(page.width().value, page.height().value, dpi);
        if size.capped {
            tracing::warn!(
                page = page_index + 1,
                width = size.width,
                height = size.height,
                "Page larger than render limit, scaled down"
            );
        }

        let render_config = PdfRenderConfig::new()
            .set_target_width(size.width as i32)
            .set_maximum_height(size.height as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_error(page_index, e.to_string()))?;

        let mut png = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding: {e}")))?;
        let png = png.into_inner();

        tracing::debug!(
            page = page_index + 1,
            width = size.width,
            height = size.height,
            bytes = png.len(),
            "Page rendered"
        );
        Ok(png)
    }
}

/// Test renderer: one page per form-feed separated chunk (the same
/// convention as [`super::MockPdfExtractor`]), each rendered as a 1x1 PNG.
pub struct MockPdfPageRenderer;

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(String::from_utf8_lossy(pdf_bytes)
            .split(super::pdf::MOCK_PAGE_BREAK)
            .count())
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let count = self.page_count(pdf_bytes)?;
        if page_index >= count {
            return Err(render_error(
                page_index,
                format!("no page {} in a {count}-page document", page_index + 1),
            ));
        }
        Ok(minimal_png())
    }
}

/// A valid 1x1 RGB PNG.
pub fn minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, //
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, //
        0xDE, //
        0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT
        0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, //
        0x00, 0x02, 0x00, 0x01, 0xE2, 0x21, 0xBC, 0x33, //
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND
        0xAE, 0x42, 0x60, 0x82, //
    ]
}
