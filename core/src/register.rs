//! Per-session state. All step changes go through [`StateRegister::advance`],
//! [`StateRegister::retreat`] or [`StateRegister::reset`], each of which consults
//! the transition table first.

use serde::Serialize;

use crate::answers::AssessmentAnswers;
use crate::catalog::{AssessmentField, Category, Event};
use crate::error::TransitionError;
use crate::guard::EventSelectionGuard;
use crate::history::{HistoryEntry, HistoryStack};
use crate::lock::ProcessLock;
use crate::step::Step;
use crate::transitions;

/// Event and category the current assessment is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessedEvent {
    pub event_code: String,
    pub category: String,
}

#[derive(Debug)]
pub struct StateRegister {
    step: Step,
    category: Option<Category>,
    events: Vec<Event>,
    pub(crate) guard: EventSelectionGuard,
    pub(crate) answers: AssessmentAnswers,
    fields: Vec<AssessmentField>,
    assessed: Option<AssessedEvent>,
    history: HistoryStack,
    pub(crate) lock: ProcessLock,
}

impl StateRegister {
    pub fn new(lock: ProcessLock) -> Self {
        Self {
            step: Step::Idle,
            category: None,
            events: Vec::new(),
            guard: EventSelectionGuard::default(),
            answers: AssessmentAnswers::default(),
            fields: Vec::new(),
            assessed: None,
            history: HistoryStack::new(),
            lock,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn guard(&self) -> &EventSelectionGuard {
        &self.guard
    }

    pub fn answers(&self) -> &AssessmentAnswers {
        &self.answers
    }

    pub fn fields(&self) -> &[AssessmentField] {
        &self.fields
    }

    pub fn assessed(&self) -> Option<&AssessedEvent> {
        self.assessed.as_ref()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn lock(&self) -> &ProcessLock {
        &self.lock
    }

    /// Ask the table whether `to` is reachable from here, without moving.
    pub fn ensure(&self, to: Step) -> Result<(), TransitionError> {
        transitions::check(self.step, to)
    }

    /// Forward move: snapshot the step being left, then move.
    pub fn advance(&mut self, to: Step) -> Result<Step, TransitionError> {
        transitions::check(self.step, to)?;
        let from = self.step;
        self.history.push(from, &self.answers);
        self.step = to;
        tracing::info!(from = %from, to = %to, depth = self.history.depth(), "step advanced");
        Ok(from)
    }

    /// Backward move onto the most recent history entry, restoring its answers.
    /// The top entry must be exactly `to`.
    pub fn retreat(&mut self, to: Step) -> Result<HistoryEntry, TransitionError> {
        let denied = TransitionError::Denied {
            from: self.step,
            to,
        };
        if self.history.peek().map(|e| e.step) != Some(to) {
            return Err(denied);
        }
        transitions::check(self.step, to)?;
        let entry = self.history.pop().ok_or(denied)?;
        self.answers = entry.answers.clone();
        self.step = to;
        tracing::info!(to = %to, depth = self.history.depth(), "step retreated");
        Ok(entry)
    }

    /// Back to Idle with everything cleared: answers, selection, history, lock.
    ///
    /// A malformed current step is logged and reset anyway.
    pub fn reset(&mut self) {
        if self.step != Step::Idle {
            if let Err(err) = transitions::check(self.step, Step::Idle) {
                tracing::error!(error = %err, "resetting from a step the table rejects");
            }
        }
        self.step = Step::Idle;
        self.category = None;
        self.events.clear();
        self.guard.clear();
        self.answers.clear();
        self.fields.clear();
        self.assessed = None;
        self.history.clear();
        self.lock.release();
    }

    pub(crate) fn set_category(&mut self, category: Category, events: Vec<Event>) {
        self.category = Some(category);
        self.events = events;
        self.guard.clear();
    }

    pub(crate) fn set_fields(&mut self, fields: Vec<AssessmentField>) {
        self.fields = fields;
    }

    pub(crate) fn set_assessed(&mut self, assessed: AssessedEvent) {
        self.assessed = Some(assessed);
    }
}
