//! Shared data structures for the observation walkthrough
//!
//! - Observation: intake record, the single input of a workflow run
//! - Analysis: backend response records (hazards, scores, action plans)
//! - View: normalized per-stage view-models and the summary

mod observation;
mod analysis;
mod view;

pub use observation::*;
pub use analysis::*;
pub use view::*;
