use serde::{Deserialize, Serialize};

use super::AnalysisError;
use crate::models::CaseRecord;

/// Text-completion endpoint abstraction (allows mocking).
///
/// Every call is a blocking RPC bounded by the client's configured deadline.
/// Implementations never retry.
pub trait LlmClient {
    fn generate(&self, prompt: &str) -> Result<String, AnalysisError>;

    fn model_name(&self) -> &str;
}

/// Multimodal endpoint abstraction used by vision OCR.
pub trait VisionClient {
    fn generate_with_image(&self, prompt: &str, image_png: &[u8]) -> Result<String, AnalysisError>;
}

/// What happened to the reconciliation call of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Two-stage classification is switched off for this deployment.
    Disabled,
    /// The reconciliation reply set the final classification.
    Applied { reply: String },
    /// The call failed; the first call's classification stands.
    Failed { error: String },
}

/// Full result of one analysis run, before persistence.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub record: CaseRecord,
    /// Raw reply of the general-analysis call.
    pub raw_reply: String,
    /// Set when no structured record could be recovered from `raw_reply`.
    pub parse_failure: Option<String>,
    pub reconciliation: Reconciliation,
}
