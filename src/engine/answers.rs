// src/engine/answers.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Answers captured during one attempt, keyed by question id.
/// Lives only until the attempt is scored; never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(HashMap<i64, String>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the answer for a question.
    pub fn record(&mut self, question_id: i64, answer: impl Into<String>) {
        self.0.insert(question_id, answer.into());
    }

    /// Drops the answer for a question, if any.
    pub fn clear(&mut self, question_id: i64) -> Option<String> {
        self.0.remove(&question_id)
    }

    /// The submitted answer, or `""` when the question was left unanswered.
    pub fn answer_for(&self, question_id: i64) -> &str {
        self.0.get(&question_id).map(String::as_str).unwrap_or("")
    }

    pub fn is_answered(&self, question_id: i64) -> bool {
        self.0.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<i64, String>> for AnswerSet {
    fn from(map: HashMap<i64, String>) -> Self {
        Self(map)
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, a)| (id, a.into())).collect())
    }
}
