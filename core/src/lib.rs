pub mod answers;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod input;
pub mod lock;
pub mod register;
mod runner;
pub mod session;
pub mod step;
pub mod transcript;
pub mod transitions;

#[cfg(test)]
pub(crate) mod test_support;

pub use answers::{AssessmentAnswers, ControlDescription, RiskLevel, describe_control};
pub use catalog::{
    AssessmentField, CatalogGateway, Category, DescriptionPayload, Event, EventDescription,
    FieldOption, RawEvent, ScoreResult,
};
pub use config::SessionConfig;
pub use error::{ErrorNotice, FlowError, GatewayError, TransitionError};
pub use guard::{EventSelectionGuard, GuardDecision};
pub use history::{HistoryEntry, HistoryStack};
pub use lock::{InactivityExpired, ProcessLock};
pub use register::{AssessedEvent, StateRegister};
pub use session::{Outcome, Session};
pub use step::{Step, StepKind};
pub use transcript::{Card, CategoryItem, Transcript, TranscriptEntry, TranscriptSink};
