//! Per-session result context.
//!
//! The presentation layer redraws from this object instead of from
//! process-wide state: `analyze` stores its outcome here, a redraw reads
//! it back, and a new session starts empty.

use uuid::Uuid;

use crate::pipeline::history::LookupAnswer;
use crate::service::AnalysisOutcome;

#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: LookupAnswer,
}

#[derive(Debug)]
pub struct ReviewSession {
    id: Uuid,
    last_analysis: Option<AnalysisOutcome>,
    last_question: Option<AnsweredQuestion>,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            last_analysis: None,
            last_question: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn last_analysis(&self) -> Option<&AnalysisOutcome> {
        self.last_analysis.as_ref()
    }

    pub fn last_question(&self) -> Option<&AnsweredQuestion> {
        self.last_question.as_ref()
    }

    pub(crate) fn set_analysis(&mut self, outcome: AnalysisOutcome) {
        self.last_analysis = Some(outcome);
    }

    pub(crate) fn set_answer(&mut self, question: &str, answer: LookupAnswer) {
        self.last_question = Some(AnsweredQuestion {
            question: question.trim().to_string(),
            answer,
        });
    }

    /// Drop cached results and start over under a fresh id.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
