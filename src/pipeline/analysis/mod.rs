pub mod types;
pub mod prompt;
pub mod parser;
pub mod classify;
pub mod gemini;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use classify::*;
pub use gemini::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Model endpoint is not reachable at {0}")]
    Connection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model endpoint returned error (status {status}): {body}")]
    Endpoint { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model response could not be decoded: {0}")]
    ResponseParsing(String),

    #[error("Model returned no content: {0}")]
    EmptyResponse(String),

    #[error("No structured payload found in model reply")]
    NoStructuredPayload,

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Action status must be selected before analysis")]
    ActionStatusNotSelected,

    #[error("Decision number is required")]
    MissingDecisionNumber,

    #[error("At least one document is required")]
    NoDocuments,
}

impl AnalysisError {
    /// Preconditions on the case form; nothing was sent to the model.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ActionStatusNotSelected | Self::MissingDecisionNumber | Self::NoDocuments
        )
    }
}
