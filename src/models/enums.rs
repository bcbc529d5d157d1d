use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: '{value}'")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(ActionStatus {
    Implemented => "Implementada",
    InProgress => "Em Implementação",
});

/// Choice shown by the case form before a status is picked.
pub const ACTION_STATUS_PLACEHOLDER: &str = "Selecione...";

impl ActionStatus {
    /// Parse the form's single-choice value. Accepts the labels without
    /// regard to case or accents; the placeholder and anything else is `None`.
    pub fn from_form(value: &str) -> Option<Self> {
        match fold_accents(value.trim()).to_lowercase().as_str() {
            "implementada" | "implemented" => Some(Self::Implemented),
            "em implementacao" | "in progress" => Some(Self::InProgress),
            _ => None,
        }
    }
}

str_enum!(ComplianceClassification {
    Compatible => "Compatível",
    PartiallyCompatible => "Parcialmente Compatível",
    Incompatible => "Incompatível",
    NotApplicable => "Não Aplicável",
    Unclassified => "Não classificado",
});

impl ComplianceClassification {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Compatible => "✅",
            Self::PartiallyCompatible => "⚠️",
            Self::Incompatible => "❌",
            Self::NotApplicable => "🚫",
            Self::Unclassified => "❔",
        }
    }

    /// Label with its status glyph, as shown to the analyst.
    pub fn display_label(&self) -> String {
        format!("{} {}", self.glyph(), self.as_str())
    }

    /// Closed-enumeration code used in the reconciliation contract.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Compatible => "COMPATIVEL",
            Self::PartiallyCompatible => "PARCIALMENTE_COMPATIVEL",
            Self::Incompatible => "INCOMPATIVEL",
            Self::NotApplicable => "NAO_APLICAVEL",
            Self::Unclassified => "NAO_CLASSIFICADO",
        }
    }

    /// Parse a contract code, tolerating accents, case and spaces for underscores.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = fold_accents(code.trim()).to_uppercase().replace([' ', '-'], "_");
        [
            Self::Compatible,
            Self::PartiallyCompatible,
            Self::Incompatible,
            Self::NotApplicable,
        ]
        .into_iter()
        .find(|c| c.code() == normalized)
    }

    /// Match a bare label (glyphs stripped, accent/case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let cleaned: String = label
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        let wanted = fold_accents(cleaned.trim()).to_lowercase();
        [
            Self::Compatible,
            Self::PartiallyCompatible,
            Self::Incompatible,
            Self::NotApplicable,
            Self::Unclassified,
        ]
        .into_iter()
        .find(|c| fold_accents(c.as_str()).to_lowercase() == wanted)
    }
}

/// Replace the Portuguese accented letters with their base letter.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' => 'A',
            'é' | 'ê' => 'e',
            'É' | 'Ê' => 'E',
            'í' => 'i',
            'Í' => 'I',
            'ó' | 'ô' | 'õ' => 'o',
            'Ó' | 'Ô' | 'Õ' => 'O',
            'ú' | 'ü' => 'u',
            'Ú' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn action_status_round_trips_labels() {
        for status in [ActionStatus::Implemented, ActionStatus::InProgress] {
            assert_eq!(ActionStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn action_status_from_form_rejects_placeholder() {
        assert_eq!(ActionStatus::from_form(ACTION_STATUS_PLACEHOLDER), None);
        assert_eq!(ActionStatus::from_form(""), None);
        assert_eq!(ActionStatus::from_form("Talvez"), None);
    }

    #[test]
    fn action_status_from_form_is_lenient() {
        assert_eq!(
            ActionStatus::from_form(" em implementacao "),
            Some(ActionStatus::InProgress)
        );
        assert_eq!(
            ActionStatus::from_form("IMPLEMENTADA"),
            Some(ActionStatus::Implemented)
        );
    }

    #[test]
    fn invalid_enum_names_field() {
        let err = ComplianceClassification::from_str("Talvez").unwrap_err();
        assert_eq!(err.field, "ComplianceClassification");
        assert!(err.to_string().contains("Talvez"));
    }

    #[test]
    fn classification_codes_parse_with_accents() {
        assert_eq!(
            ComplianceClassification::from_code("NÃO_APLICÁVEL"),
            Some(ComplianceClassification::NotApplicable)
        );
        assert_eq!(
            ComplianceClassification::from_code("parcialmente compatível"),
            Some(ComplianceClassification::PartiallyCompatible)
        );
        assert_eq!(ComplianceClassification::from_code("NAO_CLASSIFICADO"), None);
    }

    #[test]
    fn classification_from_label_strips_glyphs() {
        assert_eq!(
            ComplianceClassification::from_label("✅ Compatível"),
            Some(ComplianceClassification::Compatible)
        );
        assert_eq!(
            ComplianceClassification::from_label("❌ incompativel"),
            Some(ComplianceClassification::Incompatible)
        );
        assert_eq!(ComplianceClassification::from_label("Sem parecer"), None);
    }

    #[test]
    fn display_label_carries_glyph() {
        assert_eq!(
            ComplianceClassification::Compatible.display_label(),
            "✅ Compatível"
        );
    }
}
