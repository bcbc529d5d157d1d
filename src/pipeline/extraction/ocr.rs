use std::sync::{Arc, Mutex};

use super::types::{OcrEngine, OcrPageResult};
use super::ExtractionError;

/// Local Tesseract engine (`ocr` feature). A fresh handle is created per
/// page; language data is loaded from `tessdata_dir`.
#[cfg(feature = "ocr")]
pub struct TesseractOcr {
    tessdata_dir: String,
}

#[cfg(feature = "ocr")]
impl TesseractOcr {
    /// Case documents are Portuguese, so `por.traineddata` must be present.
    pub fn new(tessdata_dir: &std::path::Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("por.traineddata").is_file() {
            return Err(ExtractionError::TessdataNotFound(tessdata_dir.to_path_buf()));
        }
        let tessdata_dir = tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("tessdata path is not UTF-8".into()))?
            .to_owned();
        tracing::info!(dir = %tessdata_dir, "Tesseract OCR ready");
        Ok(Self { tessdata_dir })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for TesseractOcr {
    fn recognize(&self, image_png: &[u8], lang: &str) -> Result<OcrPageResult, ExtractionError> {
        let processing = |e: &dyn std::fmt::Debug| ExtractionError::OcrProcessing(format!("{e:?}"));

        let mut engine = tesseract::Tesseract::new(Some(&self.tessdata_dir), Some(lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{lang}: {e:?}")))?
            .set_image_from_mem(image_png)
            .map_err(|e| processing(&e))?;
        let text = engine.get_text().map_err(|e| processing(&e))?;
        let confidence = (engine.mean_text_conf().clamp(0, 100) as f32) / 100.0;

        Ok(OcrPageResult { text, confidence })
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for Arc<T> {
    fn recognize(&self, image_png: &[u8], lang: &str) -> Result<OcrPageResult, ExtractionError> {
        T::recognize(self, image_png, lang)
    }
}

/// Scripted engine for tests: answers every page with the same text and
/// records the language hint of each call.
pub struct MockOcrEngine {
    reply: Result<OcrPageResult, String>,
    seen_langs: Mutex<Vec<String>>,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            reply: Ok(OcrPageResult {
                text: text.to_owned(),
                confidence,
            }),
            seen_langs: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err("scripted OCR failure".to_owned()),
            seen_langs: Mutex::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.langs().len()
    }

    pub fn langs(&self) -> Vec<String> {
        self.seen_langs.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_png: &[u8], lang: &str) -> Result<OcrPageResult, ExtractionError> {
        if let Ok(mut seen) = self.seen_langs.lock() {
            seen.push(lang.to_owned());
        }
        self.reply
            .clone()
            .map_err(ExtractionError::OcrProcessing)
    }
}
