use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::Step;

/// Error codes carried on error cards and in logs
pub mod codes {
    pub const USER_INPUT: &str = "user_input";
    pub const GATEWAY_UNAVAILABLE: &str = "gateway_unavailable";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
    pub const LOCK_CONTENTION: &str = "lock_contention";
    pub const SCORE_SUBMISSION_FAILED: &str = "score_submission_failed";
}

/// Structured notice rendered as an error card.
/// Carries enough context for the presentation layer to show a useful hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// What the user can do next (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorNotice {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: code.to_string(),
            message: message.into(),
            docs_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.docs_hint = Some(hint.into());
        self
    }
}

/// Failure talking to the remote catalog/scoring service.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("catalog request failed: {0}")]
    Transport(String),
    #[error("catalog returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(String),
}

/// Validator verdict for a rejected step change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition {from} -> {to} is not allowed")]
    Denied { from: Step, to: Step },
    /// The current step itself is not a well-formed step (internal fault).
    #[error("step {0} is malformed")]
    Malformed(Step),
}

/// Everything an input handler can end in besides a normal outcome.
///
/// Only `InvalidTransition` is never rendered; all other variants have already
/// produced a card in the transcript by the time they are returned.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("unrecognised input at {step}: {reason}")]
    UserInput { step: Step, reason: String },
    #[error(transparent)]
    GatewayUnavailable(#[from] GatewayError),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("an assessment is already in progress")]
    LockContention,
    #[error("score submission failed: {0}")]
    ScoreSubmission(GatewayError),
}

impl FlowError {
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::UserInput { .. } => codes::USER_INPUT,
            FlowError::GatewayUnavailable(_) => codes::GATEWAY_UNAVAILABLE,
            FlowError::InvalidTransition(_) => codes::INVALID_TRANSITION,
            FlowError::LockContention => codes::LOCK_CONTENTION,
            FlowError::ScoreSubmission(_) => codes::SCORE_SUBMISSION_FAILED,
        }
    }

    /// Whether this error is shown to the end user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, FlowError::InvalidTransition(_))
    }
}
