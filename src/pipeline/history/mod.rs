pub mod types;
pub mod store;
pub mod prompt;
pub mod lookup;

pub use types::*;
pub use store::*;
pub use prompt::*;
pub use lookup::*;

use thiserror::Error;

use super::analysis::AnalysisError;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History store is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export error: {0}")]
    Export(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Lookup answer failed: {0}")]
    Model(#[from] AnalysisError),
}
