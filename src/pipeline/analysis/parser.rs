use serde::Deserialize;
use serde_json::Value;

use super::classify::classify_label;
use super::AnalysisError;
use crate::models::{
    CaseAnalysis, ComplianceClassification, TrainingInsights, TreasuryDamage, NOT_AVAILABLE,
};

const JSON_FENCE: &str = "```json";
const CLOSING_FENCE: &str = "```";

/// Locate the structured payload of a model reply.
///
/// A ```` ```json ```` fenced block wins; otherwise a trimmed reply that
/// opens with `{` is taken whole. An unclosed fence yields nothing.
pub fn locate_structured_payload(reply: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `reply`.
    let lowered = reply.to_ascii_lowercase();
    if let Some(start) = lowered.find(JSON_FENCE) {
        let content_start = start + JSON_FENCE.len();
        let end = reply[content_start..].find(CLOSING_FENCE)?;
        return Some(reply[content_start..content_start + end].trim());
    }

    let trimmed = reply.trim();
    if trimmed.starts_with('{') {
        return Some(trimmed);
    }
    None
}

/// Parse the general-analysis reply into a `CaseAnalysis`.
///
/// Missing fields fall back to placeholders; only an absent payload or
/// invalid JSON is an error.
pub fn parse_analysis_reply(reply: &str) -> Result<CaseAnalysis, AnalysisError> {
    let payload = locate_structured_payload(reply).ok_or(AnalysisError::NoStructuredPayload)?;

    let value: Value =
        serde_json::from_str(payload).map_err(|e| AnalysisError::JsonParsing(e.to_string()))?;
    if !value.is_object() {
        return Err(AnalysisError::JsonParsing(
            "structured payload is not an object".into(),
        ));
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct RawAnalysis {
        relatorio_tecnico: Option<Value>,
        analise_contextual: Option<Value>,
        classificacao_final: Option<Value>,
        insights_capacitacao: Option<Value>,
        dano_erario: Option<Value>,
        observacoes_memoria: Option<Value>,
    }

    let raw: RawAnalysis =
        serde_json::from_value(value).map_err(|e| AnalysisError::JsonParsing(e.to_string()))?;

    let classification = text_field(raw.classificacao_final.as_ref())
        .map(|label| classify_label(&label))
        .unwrap_or(ComplianceClassification::Unclassified);

    Ok(CaseAnalysis {
        technical_report: text_or_placeholder(raw.relatorio_tecnico.as_ref()),
        contextual_assessment: text_or_placeholder(raw.analise_contextual.as_ref()),
        classification,
        training_insights: parse_insights(raw.insights_capacitacao.as_ref()),
        treasury_damage: parse_damage(raw.dano_erario.as_ref()),
        memory_remarks: text_or_placeholder(raw.observacoes_memoria.as_ref()),
    })
}

/// Non-empty text from a string, number or bool value.
fn text_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn text_or_placeholder(value: Option<&Value>) -> String {
    text_field(value).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Lenient list: an array keeps its textual items, a lone string becomes
/// a one-item list.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text_field(Some(v))).collect(),
        other => text_field(other).into_iter().collect(),
    }
}

fn parse_insights(value: Option<&Value>) -> TrainingInsights {
    let Some(Value::Object(map)) = value else {
        return TrainingInsights::default();
    };
    TrainingInsights {
        identified_patterns: string_list(map.get("padroes_identificados")),
        prevention_suggestions: string_list(map.get("sugestoes_prevencao")),
        modus_operandi: string_list(map.get("modus_operandi")),
    }
}

fn parse_damage(value: Option<&Value>) -> TreasuryDamage {
    let Some(Value::Object(map)) = value else {
        return TreasuryDamage::default();
    };
    TreasuryDamage {
        indicated: map.get("houve_dano").is_some_and(truthy),
        description: text_or_placeholder(map.get("descricao")),
        legal_basis: text_or_placeholder(map.get("fundamentacao_legal")),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "sim" | "true" | "yes" | "s"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EXTRACTION_FAILED;

    const FULL_OBJECT: &str = r#"{
  "relatorio_tecnico": "Sumário: a SES-MT contratou sistema de estoque.",
  "analise_contextual": "Viável com a equipe atual.",
  "classificacao_final": "⚠️ Parcialmente Compatível",
  "insights_capacitacao": {
    "padroes_identificados": ["Atraso recorrente"],
    "sugestoes_prevencao": ["Cronograma com marcos"],
    "modus_operandi": []
  },
  "dano_erario": {
    "houve_dano": true,
    "descricao": "Perda de medicamentos vencidos",
    "fundamentacao_legal": "Lei 8.429/1992"
  },
  "observacoes_memoria": "Acompanhar no próximo ciclo."
}"#;

    fn assert_full_object(analysis: &CaseAnalysis) {
        assert_eq!(
            analysis.technical_report,
            "Sumário: a SES-MT contratou sistema de estoque."
        );
        assert_eq!(analysis.contextual_assessment, "Viável com a equipe atual.");
        assert_eq!(
            analysis.classification,
            ComplianceClassification::PartiallyCompatible
        );
        assert_eq!(
            analysis.training_insights.identified_patterns,
            vec!["Atraso recorrente"]
        );
        assert_eq!(
            analysis.training_insights.prevention_suggestions,
            vec!["Cronograma com marcos"]
        );
        assert!(analysis.training_insights.modus_operandi.is_empty());
        assert!(analysis.treasury_damage.indicated);
        assert_eq!(analysis.treasury_damage.legal_basis, "Lei 8.429/1992");
        assert_eq!(analysis.memory_remarks, "Acompanhar no próximo ciclo.");
    }

    #[test]
    fn parses_fenced_block_with_surrounding_text() {
        let reply = format!("Segue a análise:\n\n```json\n{FULL_OBJECT}\n```\nFim.");
        let analysis = parse_analysis_reply(&reply).unwrap();
        assert_full_object(&analysis);
    }

    #[test]
    fn parses_bare_object() {
        let reply = format!("\n  {FULL_OBJECT}  \n");
        let analysis = parse_analysis_reply(&reply).unwrap();
        assert_full_object(&analysis);
    }

    #[test]
    fn fence_tag_is_case_insensitive() {
        let reply = "```JSON\n{\"relatorio_tecnico\": \"ok\"}\n```";
        assert_eq!(locate_structured_payload(reply), Some("{\"relatorio_tecnico\": \"ok\"}"));
    }

    #[test]
    fn prose_without_payload_is_not_recoverable() {
        let err = parse_analysis_reply("Não foi possível analisar os documentos.").unwrap_err();
        assert!(matches!(err, AnalysisError::NoStructuredPayload));
    }

    #[test]
    fn unclosed_fence_is_not_recoverable() {
        assert_eq!(locate_structured_payload("```json\n{\"a\": 1}"), None);
    }

    #[test]
    fn object_after_prose_without_fence_is_not_recoverable() {
        assert_eq!(locate_structured_payload("Resultado: {\"a\": 1}"), None);
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = parse_analysis_reply("{\"relatorio_tecnico\": ").unwrap_err();
        assert!(matches!(err, AnalysisError::JsonParsing(_)));
    }

    #[test]
    fn missing_fields_default_to_placeholders() {
        let analysis = parse_analysis_reply("{}").unwrap();
        assert_eq!(analysis.technical_report, NOT_AVAILABLE);
        assert_eq!(analysis.contextual_assessment, NOT_AVAILABLE);
        assert_eq!(analysis.memory_remarks, NOT_AVAILABLE);
        assert_eq!(analysis.classification, ComplianceClassification::Unclassified);
        assert!(analysis.training_insights.is_empty());
        assert_eq!(analysis.treasury_damage, TreasuryDamage::default());
        assert_ne!(analysis.technical_report, EXTRACTION_FAILED);
    }

    #[test]
    fn null_and_blank_values_default_to_placeholders() {
        let analysis = parse_analysis_reply(
            r#"{"relatorio_tecnico": null, "analise_contextual": "  ", "classificacao_final": null}"#,
        )
        .unwrap();
        assert_eq!(analysis.technical_report, NOT_AVAILABLE);
        assert_eq!(analysis.contextual_assessment, NOT_AVAILABLE);
        assert_eq!(analysis.classification, ComplianceClassification::Unclassified);
    }

    #[test]
    fn lenient_lists_and_damage_flag() {
        let analysis = parse_analysis_reply(
            r#"{
                "insights_capacitacao": {"padroes_identificados": "Único padrão", "modus_operandi": [1, null, "x"]},
                "dano_erario": {"houve_dano": "Sim"}
            }"#,
        )
        .unwrap();
        assert_eq!(analysis.training_insights.identified_patterns, vec!["Único padrão"]);
        assert_eq!(analysis.training_insights.modus_operandi, vec!["1", "x"]);
        assert!(analysis.treasury_damage.indicated);
        assert_eq!(analysis.treasury_damage.description, NOT_AVAILABLE);
    }

    #[test]
    fn array_payload_is_rejected() {
        let err = parse_analysis_reply("```json\n[1, 2]\n```").unwrap_err();
        assert!(matches!(err, AnalysisError::JsonParsing(_)));
    }
}
