use std::sync::Arc;

use serde::Serialize;

use super::prompt::{build_lookup_prompt, NOTHING_FOUND};
use super::store::HistoryStore;
use super::types::HistoryRow;
use super::HistoryError;
use crate::models::{truncate_chars, STORED_TEXT_LIMIT};
use crate::pipeline::analysis::LlmClient;

/// How an empty cell in a searched column is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullFieldPolicy {
    /// An empty cell matches every question (historical behaviour).
    MatchAll,
    /// An empty cell never matches.
    NeverMatch,
}

impl NullFieldPolicy {
    pub fn from_flag(null_matches: bool) -> Self {
        if null_matches {
            Self::MatchAll
        } else {
            Self::NeverMatch
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupAnswer {
    pub answer: String,
    /// Number of history rows used as context.
    pub matched: usize,
    pub model_called: bool,
}

impl LookupAnswer {
    fn nothing_found() -> Self {
        Self {
            answer: NOTHING_FOUND.to_string(),
            matched: 0,
            model_called: false,
        }
    }
}

/// Rows whose decision number, recommendation or manager contains the
/// question, case-insensitively. `question` must already be lowercased.
pub fn find_matches<'a>(
    rows: &'a [HistoryRow],
    question: &str,
    policy: NullFieldPolicy,
) -> Vec<&'a HistoryRow> {
    let field_matches = |value: &str| {
        let value = value.trim();
        if value.is_empty() {
            policy == NullFieldPolicy::MatchAll
        } else {
            value.to_lowercase().contains(question)
        }
    };
    rows.iter()
        .filter(|row| {
            field_matches(&row.decision_number)
                || field_matches(&row.recommendation)
                || field_matches(&row.manager)
        })
        .collect()
}

/// One `- <decision>: <recommendation>` line per matched row.
pub fn build_lookup_context(rows: &[&HistoryRow]) -> String {
    rows.iter()
        .map(|row| {
            format!(
                "- {}: {}",
                row.decision_number,
                truncate_chars(&row.recommendation, STORED_TEXT_LIMIT)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answers free-text questions from the History Store.
pub struct LookupResponder {
    store: HistoryStore,
    llm: Arc<dyn LlmClient + Send + Sync>,
    policy: NullFieldPolicy,
}

impl LookupResponder {
    pub fn new(
        store: HistoryStore,
        llm: Arc<dyn LlmClient + Send + Sync>,
        policy: NullFieldPolicy,
    ) -> Self {
        Self { store, llm, policy }
    }

    pub fn policy(&self) -> NullFieldPolicy {
        self.policy
    }

    pub fn ask(&self, question: &str) -> Result<LookupAnswer, HistoryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(HistoryError::EmptyQuestion);
        }

        let rows = self.store.load_lenient();
        if rows.is_empty() {
            tracing::debug!("History empty, skipping model call");
            return Ok(LookupAnswer::nothing_found());
        }

        let needle = question.to_lowercase();
        let matches = find_matches(&rows, &needle, self.policy);
        tracing::info!(rows = rows.len(), matched = matches.len(), "History lookup");
        if matches.is_empty() {
            return Ok(LookupAnswer::nothing_found());
        }

        let context = build_lookup_context(&matches);
        let answer = self.llm.generate(&build_lookup_prompt(question, &context))?;

        Ok(LookupAnswer {
            answer,
            matched: matches.len(),
            model_called: true,
        })
    }
}
