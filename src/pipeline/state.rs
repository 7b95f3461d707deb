//! Workflow State
//!
//! Everything one walkthrough run knows about itself. Owned by the
//! [`PipelineOrchestrator`](super::PipelineOrchestrator); readers get a
//! shared reference and all mutation goes through the orchestrator's
//! operations. The mutators here are crate-private helpers for those
//! operations.

use serde::{Deserialize, Serialize};

use super::Stage;
use crate::types::{
    ActionView, AnalysisResponse, Observation, RiskView, ScoreView, StageResult,
};

/// State of a single walkthrough run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Current stage
    pub stage: Stage,

    /// Stages the user has continued past, in completion order, no duplicates
    pub completed: Vec<Stage>,

    /// Observation under analysis (set on submit)
    pub observation: Option<Observation>,

    /// Full backend response (set when the analysis call succeeds)
    pub analysis: Option<AnalysisResponse>,

    /// Settled RISK view-model
    pub risk: Option<RiskView>,

    /// Settled SCORE view-model
    pub score: Option<ScoreView>,

    /// Settled ACTION view-model (flattened task list)
    pub actions: Option<ActionView>,

    /// Stage whose result is on screen and may be continued from
    pub ready: Option<Stage>,

    /// Viewing a completed stage from SUMMARY
    pub review_mode: bool,

    /// An analysis request is outstanding
    pub submitting: bool,

    /// User-facing message from the last failed submit
    pub last_error: Option<String>,
}

impl WorkflowState {
    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    /// Whether the current stage's result has settled.
    pub fn is_ready(&self) -> bool {
        self.ready == Some(self.stage)
    }

    /// Settled result for an analysis stage, if any.
    pub fn result_for(&self, stage: Stage) -> Option<StageResult> {
        match stage {
            Stage::Risk => self.risk.clone().map(StageResult::Risk),
            Stage::Score => self.score.clone().map(StageResult::Score),
            Stage::Action => self.actions.clone().map(StageResult::Action),
            Stage::Form | Stage::Summary => None,
        }
    }

    /// Append to completed history unless already present.
    pub(crate) fn mark_completed(&mut self, stage: Stage) {
        if !self.completed.contains(&stage) {
            self.completed.push(stage);
        }
    }

    pub(crate) fn store_result(&mut self, result: StageResult) {
        match result {
            StageResult::Risk(view) => self.risk = Some(view),
            StageResult::Score(view) => self.score = Some(view),
            StageResult::Action(view) => self.actions = Some(view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform;

    #[test]
    fn test_default_state_is_form() {
        let state = WorkflowState::default();

        assert_eq!(state.stage, Stage::Form);
        assert!(state.completed.is_empty());
        assert!(!state.review_mode);
        assert!(!state.submitting);
        assert!(state.analysis.is_none());
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut state = WorkflowState::default();
        state.mark_completed(Stage::Risk);
        state.mark_completed(Stage::Score);
        state.mark_completed(Stage::Risk);

        assert_eq!(state.completed, vec![Stage::Risk, Stage::Score]);
    }

    #[test]
    fn test_store_and_read_back_result() {
        let mut state = WorkflowState::default();
        state.store_result(StageResult::Score(transform::default_score_view()));

        assert!(state.result_for(Stage::Risk).is_none());
        assert_eq!(
            state.result_for(Stage::Score),
            Some(StageResult::Score(transform::default_score_view()))
        );
    }
}
