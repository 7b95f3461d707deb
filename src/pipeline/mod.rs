//! Walkthrough Pipeline Module
//!
//! ## Stage Machine
//!
//! ```text
//! FORM -> RISK -> SCORE -> ACTION -> SUMMARY
//! ```
//!
//! FORM submits the observation to the analysis backend exactly once per
//! run. Each analysis stage reveals its result through a stage animator and
//! waits for the user to continue. SUMMARY can re-enter any completed stage
//! in review mode.
//!
//! CRITICAL GUARANTEE: a cancelled reveal never reports a result.

mod error;
mod orchestrator;
mod stage;
mod state;

pub use error::NavigationError;
pub use orchestrator::{OrchestratorOptions, PipelineOrchestrator, PipelineUpdate};
pub use stage::Stage;
pub use state::WorkflowState;
