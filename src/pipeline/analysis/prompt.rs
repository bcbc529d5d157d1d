use crate::models::{ActionStatus, CaseFields};

pub const ANALYSIS_INSTRUCTIONS: &str = r#"
Você é um analista especializado em recomendações do Tribunal de Contas do Estado de Mato Grosso (TCE-MT),
com dupla experiência: técnico de controle externo e especialista em controle interno da Secretaria de
Estado de Saúde (SES-MT).

OBJETIVO PRINCIPAL:
Verificar se a ação do gestor é compatível com a recomendação, com base APENAS nos documentos do processo.

ETAPAS:
1. Analise o relatório, o parecer do MPC, a decisão e a resposta do gestor.
2. Compare a ação informada com a recomendação.
3. Classifique: ✅ Compatível, ⚠️ Parcialmente, ❌ Incompatível ou 🚫 Não Aplicável.
4. Justifique com trechos e páginas dos documentos.

ANÁLISE POR STATUS DA AÇÃO:
- Se a ação está "Em Implementação":
  → Avalie o potencial de eficácia: a ação, se realizada conforme planejado, corrige o problema?
  → Verifique se o prazo informado é coerente, factível e razoável.
  → Se a recomendação não fixa prazo, avalie se o prazo apresentado é adequado.
  → Considere os riscos de não conclusão.
- Se a ação está "Implementada":
  → Verifique se há evidência documental da execução.
  → Avalie se a ação de fato implementou a recomendação.
  → Confira se a evidência apresentada comprova o que foi afirmado.

ANÁLISE CONTEXTUAL (SES-MT):
Avalie a viabilidade prática da ação considerando a estrutura da SES-MT, os recursos humanos e os
sistemas de informação disponíveis.

DANO AO ERÁRIO:
Indique se os documentos apontam dano ao erário, descreva-o e cite a fundamentação legal.

REGRAS ABSOLUTAS:
1. NUNCA invente fatos, datas, valores, números de processo ou documentos.
2. Se uma informação não consta dos documentos, escreva "não consta nos documentos".
3. Não presuma execução de ação sem evidência documental.
4. Cite o documento e a página de cada afirmação relevante.

SAÍDA:
Retorne APENAS um objeto JSON, sem texto antes ou depois, com a forma:
{
  "relatorio_tecnico": "Texto completo com sumário, análise e conclusão.",
  "analise_contextual": "Avaliação da viabilidade dentro da SES-MT.",
  "classificacao_final": "✅ Compatível | ⚠️ Parcialmente Compatível | ❌ Incompatível | 🚫 Não Aplicável",
  "insights_capacitacao": {
    "padroes_identificados": ["..."],
    "sugestoes_prevencao": ["..."],
    "modus_operandi": ["..."]
  },
  "dano_erario": {
    "houve_dano": false,
    "descricao": "...",
    "fundamentacao_legal": "..."
  },
  "observacoes_memoria": "Observações para a memória institucional."
}
"#;

pub const RECONCILIATION_INSTRUCTIONS: &str = r#"
Você é um auditor do TCE-MT. Avalie SOMENTE se a ação do gestor atende à recomendação abaixo,
considerando o status informado. Não use outras fontes e não invente fatos.

Responda em texto corrido, em no máximo dois parágrafos, começando pela classificação com o símbolo
correspondente (✅ Compatível, ⚠️ Parcialmente Compatível, ❌ Incompatível ou 🚫 Não Aplicável).
Na última linha escreva exatamente uma das opções abaixo:
CLASSIFICACAO: COMPATIVEL
CLASSIFICACAO: PARCIALMENTE_COMPATIVEL
CLASSIFICACAO: INCOMPATIVEL
CLASSIFICACAO: NAO_APLICAVEL
"#;

/// Assemble the general-analysis request: instructions, decision metadata,
/// recommendation, status/action fields, then the extracted document text.
pub fn build_analysis_prompt(
    fields: &CaseFields,
    status: ActionStatus,
    documents_text: &str,
) -> String {
    format!(
        "{ANALYSIS_INSTRUCTIONS}
Número da Decisão: {decision}
Data da Decisão: {decision_date}
Processo: {process}
PPCI: {ppci}
Número da Recomendação: {recommendation_number}
Código do Responsável: {responsible}
Órgão: {body}
Gestor: {manager}
Recomendação: {recommendation}
Status da Ação: {status}
Data de Implementação (Gestor): {implementation_date}
Ação do Gestor: {action}

<documentos>
{documents_text}
</documentos>
",
        decision = fields.decision_number.trim(),
        decision_date = fields.decision_date.trim(),
        process = fields.process_number.trim(),
        ppci = fields.ppci_number.trim(),
        recommendation_number = fields.recommendation_number.trim(),
        responsible = fields.responsible_code.trim(),
        body = fields.issuing_body_or_default(),
        manager = fields.manager.trim(),
        recommendation = fields.recommendation,
        status = status,
        implementation_date = fields.implementation_date.trim(),
        action = fields.manager_action,
    )
}

/// Assemble the narrow reconciliation request. Document text is left out
/// on purpose: the call judges only recommendation against action.
pub fn build_reconciliation_prompt(
    recommendation: &str,
    manager_action: &str,
    status: ActionStatus,
) -> String {
    format!(
        "{RECONCILIATION_INSTRUCTIONS}
Recomendação: {recommendation}
Status da Ação: {status}
Ação do Gestor: {manager_action}
"
    )
}
