use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::answers::AssessmentAnswers;
use crate::step::Step;

/// Snapshot pushed before every forward transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The step that was left
    pub step: Step,
    /// Answers as they stood when the step was left
    pub answers: AssessmentAnswers,
    pub recorded_at: DateTime<Utc>,
}

/// LIFO stack of left steps. Depth equals the number of forward transitions
/// since the last reset; only back-navigation pops.
#[derive(Debug, Default, Clone)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step, answers: &AssessmentAnswers) {
        self.entries.push(HistoryEntry {
            step,
            answers: answers.clone(),
            recorded_at: Utc::now(),
        });
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
