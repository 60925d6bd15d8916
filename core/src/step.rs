use std::fmt;

use serde::{Deserialize, Serialize};

/// Slots on the wizard progress scale.
pub const PROGRESS_SLOTS: usize = 10;

/// Where a session currently is in the interview. Exactly one is active per session.
///
/// The assessment battery is a single parametrised variant: `index` is the 1-based
/// question number and `total` the number of interactive fields the catalog declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Idle,
    WaitingCategory,
    WaitingEvent,
    WaitingEventChangeConfirmation,
    WaitingChoice,
    Assessment { index: usize, total: usize },
    AssessmentComplete,
    Completed,
}

/// Discriminant of [`Step`] used to key the static transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Idle,
    WaitingCategory,
    WaitingEvent,
    WaitingEventChangeConfirmation,
    WaitingChoice,
    Assessment,
    AssessmentComplete,
    Completed,
}

impl StepKind {
    pub const ALL: [StepKind; 8] = [
        StepKind::Idle,
        StepKind::WaitingCategory,
        StepKind::WaitingEvent,
        StepKind::WaitingEventChangeConfirmation,
        StepKind::WaitingChoice,
        StepKind::Assessment,
        StepKind::AssessmentComplete,
        StepKind::Completed,
    ];
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Idle => StepKind::Idle,
            Step::WaitingCategory => StepKind::WaitingCategory,
            Step::WaitingEvent => StepKind::WaitingEvent,
            Step::WaitingEventChangeConfirmation => StepKind::WaitingEventChangeConfirmation,
            Step::WaitingChoice => StepKind::WaitingChoice,
            Step::Assessment { .. } => StepKind::Assessment,
            Step::AssessmentComplete => StepKind::AssessmentComplete,
            Step::Completed => StepKind::Completed,
        }
    }

    pub fn question(index: usize, total: usize) -> Self {
        Step::Assessment { index, total }
    }

    /// `(index, total)` while inside the battery.
    pub fn question_position(&self) -> Option<(usize, usize)> {
        match *self {
            Step::Assessment { index, total } => Some((index, total)),
            _ => None,
        }
    }

    pub fn is_assessment(&self) -> bool {
        matches!(self, Step::Assessment { .. })
    }

    /// An assessment step outside `1..=total` cannot be reached legitimately.
    pub fn is_well_formed(&self) -> bool {
        match *self {
            Step::Assessment { index, total } => total > 0 && index >= 1 && index <= total,
            _ => true,
        }
    }

    /// Whether the presentation layer should offer a "cancel" affordance here.
    ///
    /// Cancelling is withheld during the last two questions. AssessmentComplete
    /// only persists after a failed submission, so abandoning it is allowed.
    /// The transition table does not consult this.
    pub fn cancellation_allowed(&self) -> bool {
        match *self {
            Step::Idle | Step::Completed => false,
            Step::Assessment { index, total } => index + 2 <= total,
            _ => true,
        }
    }

    /// Position on the wizard progress bar, as `(current, PROGRESS_SLOTS)`.
    pub fn progress(&self) -> (usize, usize) {
        let current = match *self {
            Step::Idle | Step::WaitingCategory => 1,
            Step::WaitingEvent => 2,
            Step::WaitingEventChangeConfirmation | Step::WaitingChoice => 3,
            Step::Assessment { index, .. } => (3 + index).min(PROGRESS_SLOTS - 1),
            Step::AssessmentComplete | Step::Completed => PROGRESS_SLOTS,
        };
        (current, PROGRESS_SLOTS)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Idle => f.write_str("idle"),
            Step::WaitingCategory => f.write_str("waiting_category"),
            Step::WaitingEvent => f.write_str("waiting_event"),
            Step::WaitingEventChangeConfirmation => {
                f.write_str("waiting_event_change_confirmation")
            }
            Step::WaitingChoice => f.write_str("waiting_choice"),
            Step::Assessment { index, .. } => write!(f, "assessment_q{index}"),
            Step::AssessmentComplete => f.write_str("assessment_complete"),
            Step::Completed => f.write_str("completed"),
        }
    }
}
