//! The two entry points offered to the presentation layer: `analyze` and
//! `ask`.
//!
//! Every failure inside a flow is caught here and turned into a [`Notice`].
//! Recoverable problems (a broken document, a malformed reply, a failed
//! history write) ride along with a successful outcome; only failures that
//! leave nothing to show end the flow with `Err(Notice)`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::config::{AppConfig, ConfigError, OcrBackend};
use crate::models::{analysis_date_today, CaseFields, CaseRecord};
use crate::pipeline::analysis::{
    AnalysisError, CaseAnalyzer, GeminiClient, LlmClient, Reconciliation,
};
use crate::pipeline::extraction::{
    BatchExtractor, DocumentBlob, DocumentSummary, OcrEngine, PdfTextExtractor, PdfiumRenderer,
    VisionOcr,
};
use crate::pipeline::history::{
    csv_file_name, rows_to_csv, HistoryError, HistoryRow, HistoryStore, LookupAnswer,
    LookupResponder,
};
use crate::pipeline_config::PipelineConfig;
use crate::session::ReviewSession;

// ═══════════════════════════════════════════════════════════
// Notices
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible message produced at the flow boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<AnalysisError> for Notice {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::ActionStatusNotSelected => {
                Notice::warning("Selecione o status da ação antes de analisar.")
            }
            AnalysisError::MissingDecisionNumber => {
                Notice::warning("Informe o número da decisão antes de analisar.")
            }
            AnalysisError::NoDocuments => {
                Notice::warning("Envie ao menos um documento para análise.")
            }
            other => Notice::error(format!("Erro ao consultar o modelo: {other}")),
        }
    }
}

impl From<HistoryError> for Notice {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::EmptyQuestion => Notice::warning("Digite uma pergunta."),
            HistoryError::Model(e) => Notice::error(format!("Erro ao consultar o modelo: {e}")),
            other => Notice::error(format!("Erro no histórico: {other}")),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Outcome
// ═══════════════════════════════════════════════════════════

/// Text-extraction figures shown next to the result.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub direct_chars: usize,
    pub ocr_applied: bool,
    pub documents: Vec<DocumentSummary>,
}

/// Everything the presentation layer needs to show one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub flow_id: Uuid,
    pub record: CaseRecord,
    /// Raw reply of the general-analysis call, shown when parsing failed.
    pub raw_reply: String,
    pub parse_failure: Option<String>,
    pub reconciliation: Reconciliation,
    pub extraction: ExtractionReport,
    /// Single-row export (UTF-8 with BOM). Empty if serialization failed.
    #[serde(skip)]
    pub csv: Vec<u8>,
    pub csv_file_name: String,
    /// Row count after the history append; `None` if the append failed.
    pub history_rows: Option<usize>,
    pub notices: Vec<Notice>,
    pub elapsed_ms: u64,
}

// ═══════════════════════════════════════════════════════════
// ReviewService
// ═══════════════════════════════════════════════════════════

/// Wires extraction, analysis and history together.
pub struct ReviewService {
    extractor: BatchExtractor,
    analyzer: CaseAnalyzer,
    history: HistoryStore,
    lookup: LookupResponder,
}

impl ReviewService {
    /// Production wiring from the startup configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let gemini = Arc::new(
            GeminiClient::from_config(config).map_err(|e| ConfigError::ModelClient(e.to_string()))?,
        );

        let mut extractor = BatchExtractor::new(Box::new(PdfTextExtractor));
        if config.pipeline.ocr_enabled {
            let renderer =
                PdfiumRenderer::new().map_err(|e| ConfigError::OcrInit(e.to_string()))?;
            let engine = build_ocr_engine(config, gemini.clone())?;
            extractor = extractor.with_ocr_fallback(
                Box::new(renderer),
                engine,
                &config.ocr.lang,
                config.ocr.dpi,
            );
        }

        tracing::info!(
            model = %config.model,
            policy = ?extractor.policy(),
            two_stage = config.pipeline.two_stage_classification,
            history = %config.history_path().display(),
            "Review service ready"
        );

        Self::with_components(extractor, gemini, config.pipeline, config.history_path())
    }

    /// Assemble the service from prebuilt parts. The extractor's policy must
    /// be the one `pipeline.ocr_enabled` selects.
    pub fn with_components(
        extractor: BatchExtractor,
        llm: Arc<dyn LlmClient + Send + Sync>,
        pipeline: PipelineConfig,
        history_path: PathBuf,
    ) -> Result<Self, ConfigError> {
        let configured = pipeline.extraction_policy();
        if extractor.policy() != configured {
            return Err(ConfigError::ExtractionPolicyMismatch {
                configured: format!("{configured:?}"),
                built: format!("{:?}", extractor.policy()),
            });
        }

        let history = HistoryStore::new(history_path);
        Ok(Self {
            extractor,
            analyzer: CaseAnalyzer::new(llm.clone(), pipeline.two_stage_classification),
            lookup: LookupResponder::new(history.clone(), llm, pipeline.null_field_policy()),
            history,
        })
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Extract, analyze, export and persist one case.
    pub fn analyze(
        &self,
        session: &mut ReviewSession,
        fields: &CaseFields,
        documents: &[DocumentBlob],
    ) -> Result<AnalysisOutcome, Notice> {
        let flow_id = Uuid::new_v4();
        let _span =
            tracing::info_span!("analyze", flow = %flow_id, session = %session.id()).entered();
        let start = Instant::now();

        let status = CaseAnalyzer::validate(fields, documents.len()).map_err(|e| {
            tracing::info!(reason = %e, "Analysis not started");
            Notice::from(e)
        })?;

        let mut notices = Vec::new();

        let extraction = self.extractor.extract_batch(documents);
        for doc in &extraction.documents {
            for error in &doc.errors {
                notices.push(Notice::warning(format!("{}: {error}", doc.name)));
            }
        }
        if extraction.ocr_applied {
            notices.push(Notice::info(
                "Pouco texto encontrado; OCR aplicado a todos os documentos.",
            ));
        }

        let run = self
            .analyzer
            .analyze(fields, status, &extraction.text, analysis_date_today())
            .map_err(|e| {
                tracing::warn!(error = %e, "Analysis request failed");
                Notice::from(e)
            })?;

        if let Some(failure) = &run.parse_failure {
            notices.push(Notice::error(format!(
                "Erro ao decodificar a resposta do modelo: {failure}. A saída bruta foi preservada."
            )));
        }
        if let Reconciliation::Failed { error } = &run.reconciliation {
            notices.push(Notice::warning(format!(
                "Classificação final não confirmada pela segunda consulta: {error}"
            )));
        }

        let row = HistoryRow::from_record(&run.record);
        let csv = match rows_to_csv(std::slice::from_ref(&row)) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "CSV export failed");
                notices.push(Notice::warning(format!("Não foi possível gerar o CSV: {e}")));
                Vec::new()
            }
        };

        let history_rows = match self.history.append(row) {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "History append failed");
                notices.push(Notice::warning(format!(
                    "A análise não foi salva no histórico: {e}"
                )));
                None
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            elapsed_ms,
            classification = run.record.analysis.classification.as_str(),
            notices = notices.len(),
            "Analyze flow finished"
        );

        let outcome = AnalysisOutcome {
            flow_id,
            csv_file_name: csv_file_name(&run.record.decision_number),
            record: run.record,
            raw_reply: run.raw_reply,
            parse_failure: run.parse_failure,
            reconciliation: run.reconciliation,
            extraction: ExtractionReport {
                direct_chars: extraction.direct_chars,
                ocr_applied: extraction.ocr_applied,
                documents: extraction.documents,
            },
            csv,
            history_rows,
            notices,
            elapsed_ms,
        };
        session.set_analysis(outcome.clone());
        Ok(outcome)
    }

    /// Answer a question from the History Store.
    pub fn ask(&self, session: &mut ReviewSession, question: &str) -> Result<LookupAnswer, Notice> {
        let flow_id = Uuid::new_v4();
        let _span = tracing::info_span!("ask", flow = %flow_id, session = %session.id()).entered();

        let answer = self.lookup.ask(question).map_err(|e| {
            tracing::warn!(error = %e, "Lookup failed");
            Notice::from(e)
        })?;
        session.set_answer(question, answer.clone());
        Ok(answer)
    }
}

fn build_ocr_engine(
    config: &AppConfig,
    gemini: Arc<GeminiClient>,
) -> Result<Box<dyn OcrEngine + Send + Sync>, ConfigError> {
    match config.ocr.backend {
        OcrBackend::Vision => Ok(Box::new(VisionOcr::new(gemini))),
        #[cfg(feature = "ocr")]
        OcrBackend::Tesseract => {
            let dir = config.ocr.tessdata_dir.as_deref().ok_or_else(|| {
                ConfigError::OcrInit(
                    "PPCI_TESSDATA_DIR must be set for the tesseract backend".into(),
                )
            })?;
            let engine = crate::pipeline::extraction::TesseractOcr::new(dir)
                .map_err(|e| ConfigError::OcrInit(e.to_string()))?;
            Ok(Box::new(engine))
        }
        #[cfg(not(feature = "ocr"))]
        OcrBackend::Tesseract => Err(ConfigError::OcrBackendUnavailable("tesseract".into())),
    }
}
