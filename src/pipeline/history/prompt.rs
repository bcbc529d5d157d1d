/// Fixed reply when the history holds nothing relevant. No model call is
/// made in that case.
pub const NOTHING_FOUND: &str =
    "Nenhuma análise anterior encontrada no histórico para esta pergunta.";

pub const LOOKUP_INSTRUCTIONS: &str = r#"
Você é a memória institucional da equipe de controle interno da SES-MT.
Responda à pergunta usando SOMENTE os registros de análises anteriores listados abaixo.
Cite o número da decisão de cada registro usado. Se os registros não respondem à pergunta,
diga isso claramente. Não invente decisões, recomendações ou datas.
"#;

/// Lookup request: instructions, matched history lines, then the question.
pub fn build_lookup_prompt(question: &str, context: &str) -> String {
    format!(
        "{LOOKUP_INSTRUCTIONS}
<historico>
{context}
</historico>

Pergunta: {question}
"
    )
}
