//! Rejected orchestrator operations.
//!
//! Every variant is a programming-level misuse of the state machine. The
//! orchestrator returns it without touching workflow state.

use super::Stage;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("`{operation}` is only valid from {expected}, current stage is {actual}")]
    WrongStage {
        operation: &'static str,
        expected: Stage,
        actual: Stage,
    },

    #[error("an analysis request is already in flight")]
    SubmissionInFlight,

    #[error("observation rejected: {}", .0.join("; "))]
    InvalidObservation(Vec<String>),

    #[error("stage {0} has not finished revealing its result")]
    NotReady(Stage),

    #[error("stage {0} is not an analysis stage")]
    NotAnalysisStage(Stage),

    #[error("stage {0} has not been completed in this run")]
    NotCompleted(Stage),

    #[error("result for {reported} reported while {current} is active")]
    StageMismatch { reported: Stage, current: Stage },

    #[error("not reviewing a stage")]
    NotReviewing,
}
