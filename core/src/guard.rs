use crate::catalog::Event;

/// What to do with a freshly resolved event pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Nothing selected yet: go straight to the description.
    Proceed,
    /// Same event picked again: no confirmation needed.
    Reselect,
    /// A different event would replace the committed one: ask first.
    ConfirmChange,
}

/// Keeps a committed event selection from being silently overwritten.
///
/// `pending` only exists while a change confirmation is open; both accept and
/// decline clear it.
#[derive(Debug, Default, Clone)]
pub struct EventSelectionGuard {
    selected: Option<Event>,
    pending: Option<Event>,
}

impl EventSelectionGuard {
    pub fn selected(&self) -> Option<&Event> {
        self.selected.as_ref()
    }

    pub fn pending(&self) -> Option<&Event> {
        self.pending.as_ref()
    }

    pub fn decide(&self, candidate: &Event) -> GuardDecision {
        match &self.selected {
            None => GuardDecision::Proceed,
            Some(current) if current.code == candidate.code => GuardDecision::Reselect,
            Some(_) => GuardDecision::ConfirmChange,
        }
    }

    pub fn stage(&mut self, candidate: Event) {
        self.pending = Some(candidate);
    }

    /// Promote the pending candidate to the committed selection.
    pub fn accept(&mut self) -> Option<Event> {
        let accepted = self.pending.take()?;
        self.selected = Some(accepted.clone());
        Some(accepted)
    }

    /// Drop the pending candidate, keeping the committed selection.
    pub fn decline(&mut self) -> Option<Event> {
        self.pending.take()
    }

    pub fn commit(&mut self, event: Event) {
        self.pending = None;
        self.selected = Some(event);
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.pending = None;
    }
}
