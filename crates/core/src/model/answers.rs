use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::QuestionId;

/// Map of question id to the selected option string.
///
/// Backed by a `BTreeMap` so the serialized form is deterministic: persisted
/// snapshots can be compared byte-for-byte across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(BTreeMap<QuestionId, String>);

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or replaces) the selected option for a question.
    pub fn set(&mut self, question: QuestionId, option: impl Into<String>) {
        self.0.insert(question, option.into());
    }

    /// The selected option for a question, if any.
    #[must_use]
    pub fn selected(&self, question: QuestionId) -> Option<&str> {
        self.0.get(&question).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
