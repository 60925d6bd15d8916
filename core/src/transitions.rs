//! Static table of legal step changes. Every mutation of the current step goes
//! through [`check`]; nothing writes the step without it.

use crate::error::TransitionError;
use crate::step::{Step, StepKind};

/// Adjacency table keyed by step kind. Assessment-to-assessment edges are further
/// constrained by [`assessment_edge_ok`].
pub const VALID_TRANSITIONS: [(StepKind, &[StepKind]); 8] = [
    (StepKind::Idle, &[StepKind::WaitingCategory]),
    (
        StepKind::WaitingCategory,
        &[StepKind::WaitingEvent, StepKind::Idle],
    ),
    (
        StepKind::WaitingEvent,
        &[
            StepKind::WaitingChoice,
            StepKind::WaitingEventChangeConfirmation,
            StepKind::WaitingCategory,
            StepKind::Idle,
        ],
    ),
    (
        StepKind::WaitingEventChangeConfirmation,
        &[
            StepKind::WaitingChoice,
            StepKind::WaitingEvent,
            StepKind::Idle,
        ],
    ),
    (
        StepKind::WaitingChoice,
        &[StepKind::Assessment, StepKind::WaitingEvent, StepKind::Idle],
    ),
    (
        StepKind::Assessment,
        &[
            StepKind::Assessment,
            StepKind::AssessmentComplete,
            StepKind::Idle,
        ],
    ),
    (
        StepKind::AssessmentComplete,
        &[StepKind::Completed, StepKind::Idle],
    ),
    (
        StepKind::Completed,
        &[
            StepKind::WaitingEvent,
            StepKind::WaitingCategory,
            StepKind::Idle,
        ],
    ),
];

pub fn successors(kind: StepKind) -> &'static [StepKind] {
    VALID_TRANSITIONS
        .iter()
        .find(|(from, _)| *from == kind)
        .map(|(_, to)| *to)
        .unwrap_or(&[])
}

/// `true` iff `to` is a legal successor of `from`.
pub fn allowed(from: Step, to: Step) -> bool {
    check(from, to).is_ok()
}

/// Like [`allowed`], but distinguishes a plain denial from a malformed current step.
pub fn check(from: Step, to: Step) -> Result<(), TransitionError> {
    if !from.is_well_formed() {
        return Err(TransitionError::Malformed(from));
    }
    let denied = TransitionError::Denied { from, to };
    if !to.is_well_formed() || !successors(from.kind()).contains(&to.kind()) {
        return Err(denied);
    }
    if assessment_edge_ok(from, to) {
        Ok(())
    } else {
        Err(denied)
    }
}

fn assessment_edge_ok(from: Step, to: Step) -> bool {
    match (from, to) {
        (Step::WaitingChoice, Step::Assessment { index, .. }) => index == 1,
        (
            Step::Assessment { index, total },
            Step::Assessment {
                index: next,
                total: next_total,
            },
        ) => total == next_total && (next == index + 1 || next + 1 == index),
        (Step::Assessment { index, total }, Step::AssessmentComplete) => index == total,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_steps() -> Vec<Step> {
        let mut steps = vec![
            Step::Idle,
            Step::WaitingCategory,
            Step::WaitingEvent,
            Step::WaitingEventChangeConfirmation,
            Step::WaitingChoice,
            Step::AssessmentComplete,
            Step::Completed,
        ];
        for index in 1..=7 {
            steps.push(Step::question(index, 7));
        }
        steps
    }

    fn expected(from: Step, to: Step) -> bool {
        use Step::*;
        match (from, to) {
            (Idle, WaitingCategory) => true,
            (WaitingCategory, WaitingEvent | Idle) => true,
            (
                WaitingEvent,
                WaitingChoice | WaitingEventChangeConfirmation | WaitingCategory | Idle,
            ) => true,
            (WaitingEventChangeConfirmation, WaitingChoice | WaitingEvent | Idle) => true,
            (WaitingChoice, Assessment { index: 1, .. }) => true,
            (WaitingChoice, WaitingEvent | Idle) => true,
            (Assessment { index: a, .. }, Assessment { index: b, .. }) => a + 1 == b || b + 1 == a,
            (Assessment { index: 7, .. }, AssessmentComplete) => true,
            (Assessment { .. }, Idle) => true,
            (AssessmentComplete, Completed | Idle) => true,
            (Completed, WaitingEvent | WaitingCategory | Idle) => true,
            _ => false,
        }
    }

    #[test]
    fn allowed_matches_table_for_every_pair() {
        let steps = sample_steps();
        for &from in &steps {
            for &to in &steps {
                assert_eq!(
                    allowed(from, to),
                    expected(from, to),
                    "mismatch for {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn every_kind_has_a_table_row() {
        for kind in StepKind::ALL {
            assert!(
                VALID_TRANSITIONS.iter().any(|(from, _)| *from == kind),
                "{kind:?} missing from table"
            );
        }
    }

    #[test]
    fn every_cancellable_step_can_abort_to_idle() {
        for kind in StepKind::ALL {
            if kind != StepKind::Idle {
                assert!(successors(kind).contains(&StepKind::Idle), "{kind:?}");
            }
        }
    }

    #[test]
    fn malformed_current_step_is_an_internal_fault() {
        let from = Step::question(9, 7);
        assert_eq!(
            check(from, Step::Idle),
            Err(TransitionError::Malformed(from))
        );
        assert!(!allowed(from, Step::Idle));
    }

    #[test]
    fn assessment_total_cannot_change_mid_battery() {
        assert!(!allowed(Step::question(2, 7), Step::question(3, 8)));
        assert!(!allowed(Step::question(6, 7), Step::AssessmentComplete));
    }
}
