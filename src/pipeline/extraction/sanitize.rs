/// Sanitize extracted text before passing downstream.
/// Strips control characters and replacement glyphs, trims lines, drops blank lines.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .filter(|c| !matches!(c, '\u{FFFD}' | '\u{FEFF}' | '\u{200B}'))
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_null_bytes() {
        let raw = "Processo\x00 123/2025";
        let clean = sanitize_extracted_text(raw);
        assert!(!clean.contains('\x00'));
        assert_eq!(clean, "Processo 123/2025");
    }

    #[test]
    fn strips_control_characters_keeps_lines() {
        let raw = "Acórdão 1234/2025\x01\x02\r\nData: 15/03/2025";
        let clean = sanitize_extracted_text(raw);
        assert_eq!(clean, "Acórdão 1234/2025\nData: 15/03/2025");
    }

    #[test]
    fn preserves_legal_symbols_and_accents() {
        let raw = "Art. 37, § 1º da Lei nº 8.666/93 – ação em implementação";
        assert_eq!(sanitize_extracted_text(raw), raw);
    }

    #[test]
    fn drops_blank_lines_and_trims() {
        let raw = "   Relatório  \n\n   \n  Conclusão ";
        assert_eq!(sanitize_extracted_text(raw), "Relatório\nConclusão");
    }

    #[test]
    fn removes_replacement_characters() {
        let raw = "Secretaria\u{FFFD} de Sa\u{FEFF}úde";
        assert_eq!(sanitize_extracted_text(raw), "Secretaria de Saúde");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_extracted_text(""), "");
        assert_eq!(sanitize_extracted_text(" \n\t\n "), "");
    }
}
