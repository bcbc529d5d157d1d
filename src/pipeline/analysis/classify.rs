//! Final-classification reading.
//!
//! The reconciliation reply is asked to end with a closed-enumeration line
//! (`CLASSIFICACAO: <CODE>`). Older prompts and non-compliant replies only
//! carry glyph-prefixed phrases, so a marker scan remains as a fallback.
//! The marker scan is fragile by nature: first match in fixed priority order
//! wins, regardless of where each phrase appears in the reply.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ComplianceClassification;

static CONTRACT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_`>]*classifica(?:ç|c)(?:ã|a)o[\s*_`]*:[\s*_`]*([\p{L}_ ]+?)[\s*_`.]*$")
        .unwrap()
});

/// Marker phrases in priority order. Stored lowercased and without the
/// U+FE0F variation selector, matching the normalized reply.
const MARKERS: [(&str, ComplianceClassification); 4] = [
    ("✅ compatível", ComplianceClassification::Compatible),
    ("⚠ parcialmente", ComplianceClassification::PartiallyCompatible),
    ("❌ incompatível", ComplianceClassification::Incompatible),
    ("🚫 não aplicável", ComplianceClassification::NotApplicable),
];

/// Read the closed-enumeration line, if the reply has one with a known code.
/// The contract line closes the reply, so the last known code wins over
/// any earlier heading in the same shape.
pub fn classify_from_contract(reply: &str) -> Option<ComplianceClassification> {
    CONTRACT_LINE
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .filter_map(|code| ComplianceClassification::from_code(code.as_str()))
        .last()
}

/// Scan free text for the glyph-prefixed marker phrases, in priority order.
pub fn classify_by_markers(reply: &str) -> ComplianceClassification {
    let normalized = reply.replace('\u{FE0F}', "").to_lowercase();
    MARKERS
        .iter()
        .find(|(marker, _)| normalized.contains(marker))
        .map(|(_, classification)| *classification)
        .unwrap_or(ComplianceClassification::Unclassified)
}

/// Final classification from the reconciliation reply: contract line first,
/// marker scan as the compatibility fallback.
pub fn classify_reconciliation_reply(reply: &str) -> ComplianceClassification {
    match classify_from_contract(reply) {
        Some(classification) => classification,
        None => {
            let classification = classify_by_markers(reply);
            tracing::debug!(
                classification = classification.as_str(),
                "Reconciliation reply without contract line, used marker scan"
            );
            classification
        }
    }
}

/// Map the `classificacao_final` string of the general-analysis call.
pub fn classify_label(value: &str) -> ComplianceClassification {
    ComplianceClassification::from_label(value).unwrap_or_else(|| classify_by_markers(value))
}
