use serde::{Deserialize, Serialize};

use super::enums::{ActionStatus, ComplianceClassification};

/// Free-text fields destined for storage are cut to this many characters.
pub const STORED_TEXT_LIMIT: usize = 200;

/// Issuing body used when the form leaves it blank.
pub const DEFAULT_ISSUING_BODY: &str = "TCE-MT";

/// Placeholder for a derived narrative the model did not provide.
pub const NOT_AVAILABLE: &str = "Não disponível";

/// Narrative recorded when no structured record could be recovered.
pub const EXTRACTION_FAILED: &str =
    "Erro: não foi possível extrair o JSON estruturado da resposta do modelo.";

/// Case metadata as typed into the form. All values are free text; the
/// action status is the raw single-choice value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseFields {
    pub analyst: String,
    pub decision_number: String,
    pub decision_date: String,
    pub process_number: String,
    pub ppci_number: String,
    pub recommendation_number: String,
    pub responsible_code: String,
    pub issuing_body: String,
    pub manager: String,
    pub recommendation: String,
    pub action_status: String,
    pub implementation_date: String,
    pub manager_action: String,
}

impl CaseFields {
    pub fn issuing_body_or_default(&self) -> &str {
        let body = self.issuing_body.trim();
        if body.is_empty() {
            DEFAULT_ISSUING_BODY
        } else {
            body
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingInsights {
    pub identified_patterns: Vec<String>,
    pub prevention_suggestions: Vec<String>,
    pub modus_operandi: Vec<String>,
}

impl TrainingInsights {
    pub fn is_empty(&self) -> bool {
        self.identified_patterns.is_empty()
            && self.prevention_suggestions.is_empty()
            && self.modus_operandi.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryDamage {
    pub indicated: bool,
    pub description: String,
    pub legal_basis: String,
}

impl Default for TreasuryDamage {
    fn default() -> Self {
        Self {
            indicated: false,
            description: NOT_AVAILABLE.to_string(),
            legal_basis: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Fields derived by the model for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseAnalysis {
    pub technical_report: String,
    pub contextual_assessment: String,
    pub classification: ComplianceClassification,
    pub training_insights: TrainingInsights,
    pub treasury_damage: TreasuryDamage,
    pub memory_remarks: String,
}

impl CaseAnalysis {
    /// Record used when the model reply held no usable structured payload.
    pub fn extraction_failed() -> Self {
        Self {
            technical_report: EXTRACTION_FAILED.to_string(),
            contextual_assessment: NOT_AVAILABLE.to_string(),
            classification: ComplianceClassification::Unclassified,
            training_insights: TrainingInsights::default(),
            treasury_damage: TreasuryDamage::default(),
            memory_remarks: NOT_AVAILABLE.to_string(),
        }
    }
}

/// The unit persisted per analysis.
///
/// Holds full recommendation and action text (the model sees them untruncated);
/// truncation happens only when the record is turned into a history row.
#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub analysis_date: String,
    pub analyst: String,
    pub decision_number: String,
    pub decision_date: String,
    pub process_number: String,
    pub ppci_number: String,
    pub recommendation_number: String,
    pub responsible_code: String,
    pub issuing_body: String,
    pub manager: String,
    pub recommendation: String,
    pub manager_action: String,
    pub action_status: ActionStatus,
    pub implementation_date: String,
    pub analysis: CaseAnalysis,
}

impl CaseRecord {
    pub fn new(
        fields: &CaseFields,
        action_status: ActionStatus,
        analysis: CaseAnalysis,
        analysis_date: String,
    ) -> Self {
        Self {
            analysis_date,
            analyst: fields.analyst.trim().to_string(),
            decision_number: fields.decision_number.trim().to_string(),
            decision_date: fields.decision_date.trim().to_string(),
            process_number: fields.process_number.trim().to_string(),
            ppci_number: fields.ppci_number.trim().to_string(),
            recommendation_number: fields.recommendation_number.trim().to_string(),
            responsible_code: fields.responsible_code.trim().to_string(),
            issuing_body: fields.issuing_body_or_default().to_string(),
            manager: fields.manager.trim().to_string(),
            recommendation: fields.recommendation.clone(),
            manager_action: fields.manager_action.clone(),
            action_status,
            implementation_date: fields.implementation_date.trim().to_string(),
            analysis,
        }
    }

    /// The only mutation a record sees after creation: the reconciliation
    /// call overriding the final classification.
    pub fn override_classification(&mut self, classification: ComplianceClassification) {
        self.analysis.classification = classification;
    }

    pub fn stored_recommendation(&self) -> String {
        truncate_chars(&self.recommendation, STORED_TEXT_LIMIT)
    }

    pub fn stored_manager_action(&self) -> String {
        truncate_chars(&self.manager_action, STORED_TEXT_LIMIT)
    }
}

/// Keep at most `limit` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Today's date in the local `dd/mm/YYYY` format used on case records.
pub fn analysis_date_today() -> String {
    chrono::Local::now().format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CaseFields {
        CaseFields {
            decision_number: " Acórdão 1234/2025 ".into(),
            recommendation: "r".repeat(250),
            manager_action: "ação ".repeat(60),
            action_status: "Implementada".into(),
            ..Default::default()
        }
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "ç".repeat(300);
        let cut = truncate_chars(&text, STORED_TEXT_LIMIT);
        assert_eq!(cut.chars().count(), 200);
        assert_eq!(cut.len(), 400);
    }

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_chars("curto", 200), "curto");
        assert_eq!(truncate_chars("", 200), "");
        let exact = "a".repeat(200);
        assert_eq!(truncate_chars(&exact, 200), exact);
    }

    #[test]
    fn record_keeps_full_text_and_truncates_stored_copies() {
        let record = CaseRecord::new(
            &fields(),
            ActionStatus::Implemented,
            CaseAnalysis::extraction_failed(),
            "01/02/2025".into(),
        );
        assert_eq!(record.recommendation.chars().count(), 250);
        assert_eq!(record.stored_recommendation().chars().count(), 200);
        assert_eq!(record.stored_manager_action().chars().count(), 200);
        assert_eq!(record.decision_number, "Acórdão 1234/2025");
    }

    #[test]
    fn blank_issuing_body_defaults() {
        let record = CaseRecord::new(
            &fields(),
            ActionStatus::InProgress,
            CaseAnalysis::extraction_failed(),
            "01/02/2025".into(),
        );
        assert_eq!(record.issuing_body, DEFAULT_ISSUING_BODY);

        let custom = CaseFields {
            issuing_body: "TCU".into(),
            ..fields()
        };
        assert_eq!(custom.issuing_body_or_default(), "TCU");
    }

    #[test]
    fn override_replaces_classification() {
        let mut record = CaseRecord::new(
            &fields(),
            ActionStatus::Implemented,
            CaseAnalysis::extraction_failed(),
            "01/02/2025".into(),
        );
        assert_eq!(
            record.analysis.classification,
            ComplianceClassification::Unclassified
        );
        record.override_classification(ComplianceClassification::Incompatible);
        assert_eq!(
            record.analysis.classification,
            ComplianceClassification::Incompatible
        );
    }

    #[test]
    fn analysis_date_is_day_month_year() {
        let date = analysis_date_today();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[2..3], "/");
        assert_eq!(&date[5..6], "/");
    }
}
