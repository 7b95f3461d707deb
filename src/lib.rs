//! Safety Walkthrough: staged analysis of a single safety observation
//!
//! One observation goes through hazard detection, risk scoring, and
//! corrective-action planning. Each stage reveals its result as a short
//! narrative before a final summary.
//!
//! ## Architecture
//!
//! - **Transformation Layer** (`transform`): pure mapping from backend
//!   records to stage view-models, with fixed fallbacks
//! - **Stage Animators** (`animator`): scripted or immediate reveal per
//!   stage, cancelable as a unit
//! - **Pipeline Orchestrator** (`pipeline`): stage machine, single writer of
//!   the workflow state
//! - **Analysis Backend** (`backend`): remote HTTP service or the offline
//!   rule-based analyzer

pub mod animator;
pub mod backend;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod transform;
pub mod types;

// Re-export configuration
pub use config::AppConfig;

// Re-export the orchestrator surface
pub use pipeline::{
    NavigationError, OrchestratorOptions, PipelineOrchestrator, PipelineUpdate, Stage,
    WorkflowState,
};

// Re-export backends
pub use backend::{AnalysisBackend, BackendError, HttpBackend, OfflineBackend};

// Re-export commonly used types
pub use types::{
    ActionPlan, ActionView, AnalysisResponse, Hazard, HealthStatus, Observation,
    ObservationPotential, ObservationType, RiskView, ScoreView, ScoredHazard, StageResult,
    SummaryView, Task, TaskView,
};
