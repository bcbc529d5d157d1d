use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{CaseRecord, TrainingInsights};

/// One History Store row. Field order is the column order on disk.
///
/// Rows written before the trailing columns existed load with empty
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRow {
    #[serde(rename = "data_analise")]
    pub analysis_date: String,
    #[serde(rename = "servidor_uniseci")]
    pub analyst: String,
    #[serde(rename = "num_decisao")]
    pub decision_number: String,
    #[serde(rename = "data_decisao")]
    pub decision_date: String,
    #[serde(rename = "num_processo_tce")]
    pub process_number: String,
    #[serde(rename = "num_ppci")]
    pub ppci_number: String,
    #[serde(rename = "num_recomendacao")]
    pub recommendation_number: String,
    #[serde(rename = "cod_responsavel")]
    pub responsible_code: String,
    #[serde(rename = "orgao_decisao")]
    pub issuing_body: String,
    #[serde(rename = "gestor")]
    pub manager: String,
    #[serde(rename = "recomendacao")]
    pub recommendation: String,
    #[serde(rename = "acao_gestor")]
    pub manager_action: String,
    #[serde(rename = "status_conformidade")]
    pub compliance_status: String,
    #[serde(rename = "status_acao")]
    pub action_status: String,
    #[serde(rename = "data_implementacao_gestor")]
    pub implementation_date: String,
    #[serde(rename = "relatorio_tecnico")]
    pub technical_report: String,
    #[serde(rename = "analise_contextual")]
    pub contextual_assessment: String,
    #[serde(rename = "classificacao_final")]
    pub final_classification: String,
    /// JSON object with the three insight lists.
    #[serde(rename = "insights_capacitacao")]
    pub training_insights: String,
    #[serde(rename = "dano_erario", deserialize_with = "lenient_bool")]
    pub treasury_damage: bool,
    #[serde(rename = "dano_erario_descricao")]
    pub treasury_damage_description: String,
    #[serde(rename = "dano_erario_fundamentacao")]
    pub treasury_damage_basis: String,
    #[serde(rename = "observacoes_memoria")]
    pub memory_remarks: String,
}

impl HistoryRow {
    /// Column names in on-disk order.
    pub const COLUMNS: [&'static str; 23] = [
        "data_analise",
        "servidor_uniseci",
        "num_decisao",
        "data_decisao",
        "num_processo_tce",
        "num_ppci",
        "num_recomendacao",
        "cod_responsavel",
        "orgao_decisao",
        "gestor",
        "recomendacao",
        "acao_gestor",
        "status_conformidade",
        "status_acao",
        "data_implementacao_gestor",
        "relatorio_tecnico",
        "analise_contextual",
        "classificacao_final",
        "insights_capacitacao",
        "dano_erario",
        "dano_erario_descricao",
        "dano_erario_fundamentacao",
        "observacoes_memoria",
    ];

    /// Flatten a finalized record. Recommendation and action text are
    /// truncated here and nowhere else.
    pub fn from_record(record: &CaseRecord) -> Self {
        let analysis = &record.analysis;
        Self {
            analysis_date: record.analysis_date.clone(),
            analyst: record.analyst.clone(),
            decision_number: record.decision_number.clone(),
            decision_date: record.decision_date.clone(),
            process_number: record.process_number.clone(),
            ppci_number: record.ppci_number.clone(),
            recommendation_number: record.recommendation_number.clone(),
            responsible_code: record.responsible_code.clone(),
            issuing_body: record.issuing_body.clone(),
            manager: record.manager.clone(),
            recommendation: record.stored_recommendation(),
            manager_action: record.stored_manager_action(),
            compliance_status: analysis.classification.as_str().to_string(),
            action_status: record.action_status.as_str().to_string(),
            implementation_date: record.implementation_date.clone(),
            technical_report: analysis.technical_report.clone(),
            contextual_assessment: analysis.contextual_assessment.clone(),
            final_classification: analysis.classification.display_label(),
            training_insights: insights_json(&analysis.training_insights),
            treasury_damage: analysis.treasury_damage.indicated,
            treasury_damage_description: analysis.treasury_damage.description.clone(),
            treasury_damage_basis: analysis.treasury_damage.legal_basis.clone(),
            memory_remarks: analysis.memory_remarks.clone(),
        }
    }
}

fn insights_json(insights: &TrainingInsights) -> String {
    serde_json::json!({
        "padroes_identificados": insights.identified_patterns,
        "sugestoes_prevencao": insights.prevention_suggestions,
        "modus_operandi": insights.modus_operandi,
    })
    .to_string()
}

/// Accepts `true/false`, `True/False` (older files), `1/0`, `sim/não`; an
/// empty cell is `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "1" | "sim" | "yes"
    ))
}
