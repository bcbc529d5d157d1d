use std::sync::Arc;

use super::classify::classify_reconciliation_reply;
use super::parser::parse_analysis_reply;
use super::prompt::{build_analysis_prompt, build_reconciliation_prompt};
use super::types::{AnalysisRun, LlmClient, Reconciliation};
use super::AnalysisError;
use crate::models::{ActionStatus, CaseAnalysis, CaseFields, CaseRecord};

/// Runs the model side of an analysis:
/// prompt → general call → parse → (reconciliation call → classify) → record
pub struct CaseAnalyzer {
    llm: Arc<dyn LlmClient + Send + Sync>,
    two_stage: bool,
}

impl CaseAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, two_stage: bool) -> Self {
        Self { llm, two_stage }
    }

    pub fn two_stage(&self) -> bool {
        self.two_stage
    }

    /// Form preconditions, checked before any extraction or model call.
    pub fn validate(
        fields: &CaseFields,
        document_count: usize,
    ) -> Result<ActionStatus, AnalysisError> {
        if document_count == 0 {
            return Err(AnalysisError::NoDocuments);
        }
        if fields.decision_number.trim().is_empty() {
            return Err(AnalysisError::MissingDecisionNumber);
        }
        ActionStatus::from_form(&fields.action_status).ok_or(AnalysisError::ActionStatusNotSelected)
    }

    /// Run the analysis for one case.
    ///
    /// A failed general call is returned as an error. A malformed reply is
    /// not: the record carries the extraction-failed placeholder and the
    /// raw reply travels along in the run.
    pub fn analyze(
        &self,
        fields: &CaseFields,
        status: ActionStatus,
        documents_text: &str,
        analysis_date: String,
    ) -> Result<AnalysisRun, AnalysisError> {
        let prompt = build_analysis_prompt(fields, status, documents_text);
        tracing::info!(
            model = self.llm.model_name(),
            prompt_chars = prompt.chars().count(),
            "Sending analysis request"
        );
        let raw_reply = self.llm.generate(&prompt)?;

        let (analysis, parse_failure) = match parse_analysis_reply(&raw_reply) {
            Ok(analysis) => (analysis, None),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    reply_chars = raw_reply.len(),
                    "Model reply not parseable"
                );
                (CaseAnalysis::extraction_failed(), Some(e.to_string()))
            }
        };

        let mut record = CaseRecord::new(fields, status, analysis, analysis_date);

        let reconciliation = if self.two_stage {
            self.reconcile(&mut record)
        } else {
            Reconciliation::Disabled
        };

        tracing::info!(
            classification = record.analysis.classification.as_str(),
            parsed = parse_failure.is_none(),
            "Analysis complete"
        );

        Ok(AnalysisRun {
            record,
            raw_reply,
            parse_failure,
            reconciliation,
        })
    }

    /// Second, narrow call; its verdict replaces the first classification.
    fn reconcile(&self, record: &mut CaseRecord) -> Reconciliation {
        let prompt = build_reconciliation_prompt(
            &record.recommendation,
            &record.manager_action,
            record.action_status,
        );
        match self.llm.generate(&prompt) {
            Ok(reply) => {
                let classification = classify_reconciliation_reply(&reply);
                tracing::debug!(
                    before = record.analysis.classification.as_str(),
                    after = classification.as_str(),
                    "Reconciliation classification applied"
                );
                record.override_classification(classification);
                Reconciliation::Applied { reply }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Reconciliation call failed, keeping first classification"
                );
                Reconciliation::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
