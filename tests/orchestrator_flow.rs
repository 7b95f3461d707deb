//! Orchestrator Flow Tests
//!
//! Drives the stage machine end to end against a scripted in-memory backend.
//! Reveal timers run on a paused tokio clock, so every phase interval elapses
//! deterministically and instantly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use safety_walkthrough::animator::AnimationTiming;
use safety_walkthrough::transform;
use safety_walkthrough::{
    ActionPlan, AnalysisBackend, AnalysisResponse, BackendError, Hazard, HealthStatus,
    NavigationError, Observation, ObservationPotential, ObservationType, OrchestratorOptions,
    PipelineOrchestrator, PipelineUpdate, ScoredHazard, Stage, StageResult, Task,
};

// ============================================================================
// Scripted Backend
// ============================================================================

/// Replies with queued results in order, after an optional delay.
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<AnalysisResponse, BackendError>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<AnalysisResponse, BackendError>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: Vec<Result<AnalysisResponse, BackendError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn analyze(&self, _observation: &Observation) -> Result<AnalysisResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Transport("no scripted reply".into())));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        reply
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus { status: "healthy".into(), version: "test".into() })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn scaffold_observation() -> Observation {
    Observation::new(
        "Building A - 3rd Floor",
        ObservationPotential::Hazard,
        ObservationType::UnsafeCondition,
        "worker on unguarded scaffold",
    )
}

fn scaffold_hazard() -> Hazard {
    Hazard {
        hazard_id: "haz-1".into(),
        hazard_type: "fall_from_height".into(),
        taxonomy_ref: "HAZ-FALL-001".into(),
        description: "Unguarded scaffold edge".into(),
        area: None,
        confidence: 0.92,
    }
}

fn critical_score() -> ScoredHazard {
    ScoredHazard {
        hazard_id: "haz-1".into(),
        severity: 5,
        likelihood: 5,
        rpn: None,
        priority: Some("CRITICAL".into()),
        due_by: None,
        culture_score_delta: None,
        likelihood_adjustment_reason: None,
    }
}

fn guardrail_plan() -> ActionPlan {
    ActionPlan {
        plan_id: "plan-1".into(),
        hazard_id: "haz-1".into(),
        standards_refs: vec!["OSHA 1926.451 - Scaffolding".into()],
        cost_estimate_usd: Some(410.0),
        lead_time_days: Some(2),
        tasks: vec![Task {
            title: "Install guardrails".into(),
            description: "Fit guardrails to open edges".into(),
            control_type: "ENGINEERING".into(),
            responsible_role: "scaffolder".into(),
            duration_minutes: 120,
            material_requirements: vec!["toe_boards".into()],
            acceptance_criteria: Some("Guardrails inspected".into()),
        }],
    }
}

fn full_response() -> AnalysisResponse {
    AnalysisResponse {
        hazards: vec![scaffold_hazard()],
        scored_hazards: vec![critical_score()],
        action_plans: vec![guardrail_plan()],
        success: true,
        error: None,
    }
}

fn empty_response() -> AnalysisResponse {
    AnalysisResponse { success: true, ..Default::default() }
}

fn scripted_options() -> OrchestratorOptions {
    OrchestratorOptions {
        timing: AnimationTiming {
            phase_interval: Duration::from_millis(1_000),
            settle_delay: Duration::from_millis(500),
        },
        skip_animation: false,
    }
}

fn orchestrator(backend: Arc<ScriptedBackend>) -> PipelineOrchestrator {
    PipelineOrchestrator::new(backend, scripted_options())
}

/// Submit and deliver everything up to the RISK result.
async fn submit_and_reveal_risk(orch: &mut PipelineOrchestrator) {
    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(orch.run_until_idle().await, None);
    assert_eq!(orch.state().stage, Stage::Risk);
    assert!(orch.state().is_ready());
}

/// From a ready RISK stage, continue through to SUMMARY.
async fn walk_to_summary(orch: &mut PipelineOrchestrator) {
    for expected in [Stage::Score, Stage::Action, Stage::Summary] {
        assert_eq!(orch.continue_to_next(), Ok(expected));
        orch.run_until_idle().await;
    }
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_submit_success_moves_to_risk() {
    let backend = ScriptedBackend::new(vec![Ok(full_response())]);
    let mut orch = orchestrator(backend.clone());

    orch.submit(scaffold_observation()).unwrap();
    assert!(orch.state().submitting);

    assert_eq!(orch.step().await, Some(PipelineUpdate::Analyzed));
    let state = orch.state();
    assert_eq!(state.stage, Stage::Risk);
    assert!(!state.submitting);
    assert!(state.last_error.is_none());
    assert_eq!(state.analysis.as_ref(), Some(&full_response()));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_surfaces_backend_detail() {
    let backend = ScriptedBackend::new(vec![Err(BackendError::Status {
        status: 503,
        detail: Some("Model quota exceeded".into()),
    })]);
    let mut orch = orchestrator(backend);

    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(
        orch.step().await,
        Some(PipelineUpdate::SubmitFailed { message: "Model quota exceeded".into() })
    );

    let state = orch.state();
    assert_eq!(state.stage, Stage::Form);
    assert!(!state.submitting);
    assert_eq!(state.last_error.as_deref(), Some("Model quota exceeded"));
    assert!(state.analysis.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failure_without_detail_uses_generic_message() {
    let backend = ScriptedBackend::new(vec![Err(BackendError::Transport("connection refused".into()))]);
    let mut orch = orchestrator(backend);

    orch.submit(scaffold_observation()).unwrap();
    orch.step().await;

    assert_eq!(orch.state().stage, Stage::Form);
    assert_eq!(
        orch.state().last_error.as_deref(),
        Some("Failed to analyze observation. Please try again.")
    );
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_submit_is_rejected_while_in_flight() {
    let backend = ScriptedBackend::with_delay(vec![Ok(full_response())], Duration::from_secs(3));
    let mut orch = orchestrator(backend.clone());

    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(
        orch.submit(scaffold_observation()),
        Err(NavigationError::SubmissionInFlight)
    );

    assert_eq!(orch.step().await, Some(PipelineUpdate::Analyzed));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resubmit_after_failure_clears_error() {
    let backend = ScriptedBackend::new(vec![
        Err(BackendError::RequestFailed(Some("Pipeline timed out".into()))),
        Ok(full_response()),
    ]);
    let mut orch = orchestrator(backend.clone());

    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(orch.run_until_idle().await.as_deref(), Some("Pipeline timed out"));

    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(orch.step().await, Some(PipelineUpdate::Analyzed));
    assert!(orch.state().last_error.is_none());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_submit_outside_form_is_rejected() {
    let backend = ScriptedBackend::new(vec![Ok(full_response())]);
    let mut orch = orchestrator(backend.clone());
    submit_and_reveal_risk(&mut orch).await;

    assert!(matches!(
        orch.submit(scaffold_observation()),
        Err(NavigationError::WrongStage { expected: Stage::Form, actual: Stage::Risk, .. })
    ));
    assert_eq!(backend.calls(), 1);
}

// ============================================================================
// Reveal sequencing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_scripted_reveal_reports_phases_then_ready() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(orch.step().await, Some(PipelineUpdate::Analyzed));

    let mut phases = Vec::new();
    loop {
        match orch.step().await {
            Some(PipelineUpdate::Phase { stage, phase, .. }) => {
                assert_eq!(stage, Stage::Risk);
                phases.push(phase.name);
            }
            Some(PipelineUpdate::Ready(stage)) => {
                assert_eq!(stage, Stage::Risk);
                break;
            }
            other => panic!("unexpected update {other:?}"),
        }
    }
    assert_eq!(phases, vec!["scanning", "analyzing", "complete"]);
    assert!(orch.state().is_ready());
    assert!(orch.state().completed.is_empty(), "ready must not mark completed");
    assert_eq!(orch.step().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_continue_before_ready_is_rejected() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    orch.submit(scaffold_observation()).unwrap();
    orch.step().await;

    assert_eq!(orch.continue_to_next(), Err(NavigationError::NotReady(Stage::Risk)));
    assert_eq!(orch.state().stage, Stage::Risk);
    assert!(orch.state().completed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_skip_reveal_settles_immediately() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    orch.submit(scaffold_observation()).unwrap();
    orch.step().await;
    assert!(!orch.state().is_ready());

    orch.skip_reveal().unwrap();
    assert!(orch.state().is_ready());
    assert_eq!(orch.state().risk.as_ref().map(|r| r.confidence), Some(92));

    // The cancelled scripted activation must not report again.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(orch.step().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_risk_reveal_before_complete() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(orch.step().await, Some(PipelineUpdate::Analyzed));
    assert!(matches!(
        orch.step().await,
        Some(PipelineUpdate::Phase { stage: Stage::Risk, index: 0, .. })
    ));

    orch.reset();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(orch.step().await, None);
    let state = orch.state();
    assert_eq!(state.stage, Stage::Form);
    assert!(state.risk.is_none());
    assert!(state.ready.is_none());
    assert!(state.analysis.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reset_discards_late_analysis_reply() {
    let backend = ScriptedBackend::with_delay(
        vec![Ok(full_response()), Ok(empty_response())],
        Duration::from_secs(5),
    );
    let mut orch = orchestrator(backend.clone());

    orch.submit(scaffold_observation()).unwrap();
    // Let the first call start and take its reply before abandoning it.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(backend.calls(), 1);
    orch.reset();
    assert!(!orch.state().submitting);
    assert_eq!(orch.step().await, None);

    orch.submit(scaffold_observation()).unwrap();
    assert_eq!(orch.step().await, Some(PipelineUpdate::Analyzed));
    assert_eq!(orch.state().analysis.as_ref(), Some(&empty_response()));
    assert_eq!(backend.calls(), 2);
}

// ============================================================================
// Results and fallbacks
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_scaffold_scenario_risk_view() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;

    let risk = orch.state().risk.clone().unwrap();
    assert_eq!(risk.hazard, "Unguarded scaffold edge");
    assert_eq!(risk.category, "Fall Protection / Scaffolding");
    assert_eq!(risk.confidence, 92);
    assert!(risk.keywords.contains(&"scaffolding".to_string()), "{:?}", risk.keywords);
}

#[tokio::test(start_paused = true)]
async fn test_missing_rpn_is_recomputed() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;
    orch.continue_to_next().unwrap();
    orch.run_until_idle().await;

    let score = orch.state().score.clone().unwrap();
    assert_eq!(score.risk_score, 25);
    assert_eq!(score.category, "Critical");
}

#[tokio::test(start_paused = true)]
async fn test_empty_response_uses_every_fallback() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(empty_response())]));
    submit_and_reveal_risk(&mut orch).await;
    walk_to_summary(&mut orch).await;

    let state = orch.state();
    let score = state.score.clone().unwrap();
    assert_eq!((score.severity, score.likelihood, score.risk_score), (4, 3, 12));
    assert_eq!(score.category, "High");
    assert_eq!(state.actions.as_ref(), Some(&transform::default_action_view()));

    let summary = orch.summary().unwrap();
    assert_eq!(summary.hazards_identified, 1);
}

#[tokio::test(start_paused = true)]
async fn test_backend_data_supersedes_animator_proposal() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;

    let proposal = StageResult::Risk(transform::default_risk_view(&scaffold_observation()));
    orch.stage_result_ready(Stage::Risk, proposal).unwrap();

    assert_eq!(orch.state().risk.as_ref().map(|r| r.hazard.as_str()), Some("Unguarded scaffold edge"));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_result_ready_does_not_touch_history() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;
    orch.continue_to_next().unwrap();
    orch.run_until_idle().await;

    let before = orch.state().completed.clone();
    let result = orch.state().result_for(Stage::Score).unwrap();
    orch.stage_result_ready(Stage::Score, result.clone()).unwrap();
    orch.stage_result_ready(Stage::Score, result).unwrap();

    assert_eq!(orch.state().completed, before);
    assert_eq!(orch.state().completed, vec![Stage::Risk]);
}

// ============================================================================
// Review navigation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_review_round_trip_leaves_state_unchanged() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;
    walk_to_summary(&mut orch).await;

    let before = orch.state().clone();
    assert_eq!(before.completed, Stage::ANALYSIS.to_vec());

    orch.view_stage(Stage::Risk).unwrap();
    assert_eq!(orch.state().stage, Stage::Risk);
    assert!(orch.state().review_mode);
    assert!(orch.state().is_ready(), "review re-entry must be ready at once");

    orch.return_to_summary().unwrap();
    let after = orch.state();
    assert_eq!(after.stage, Stage::Summary);
    assert!(!after.review_mode);
    assert_eq!(after.completed, before.completed);
    assert_eq!(after.risk, before.risk);
    assert_eq!(after.score, before.score);
    assert_eq!(after.actions, before.actions);
}

#[tokio::test(start_paused = true)]
async fn test_continue_from_risk_always_yields_score() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;
    walk_to_summary(&mut orch).await;

    for _ in 0..3 {
        orch.view_stage(Stage::Action).unwrap();
        orch.return_to_summary().unwrap();
    }
    orch.view_stage(Stage::Risk).unwrap();
    assert_eq!(orch.continue_to_next(), Ok(Stage::Score));
    assert!(orch.state().is_ready(), "review mode continues without a reveal");
    assert_eq!(orch.continue_to_next(), Ok(Stage::Action));
    assert_eq!(orch.continue_to_next(), Ok(Stage::Summary));
    assert!(!orch.state().review_mode);
    assert_eq!(orch.state().completed, Stage::ANALYSIS.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_view_stage_guards() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;

    assert!(matches!(
        orch.view_stage(Stage::Risk),
        Err(NavigationError::WrongStage { expected: Stage::Summary, .. })
    ));
    assert_eq!(orch.return_to_summary(), Err(NavigationError::NotReviewing));

    walk_to_summary(&mut orch).await;
    assert_eq!(orch.view_stage(Stage::Form), Err(NavigationError::NotAnalysisStage(Stage::Form)));
    assert_eq!(orch.state().stage, Stage::Summary);
    assert!(!orch.state().review_mode);
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_summary_returns_to_form() {
    let mut orch = orchestrator(ScriptedBackend::new(vec![Ok(full_response())]));
    submit_and_reveal_risk(&mut orch).await;
    walk_to_summary(&mut orch).await;

    orch.reset();
    let state = orch.state();
    assert_eq!(state.stage, Stage::Form);
    assert!(state.completed.is_empty());
    assert!(state.observation.is_none());
    assert!(state.risk.is_none() && state.score.is_none() && state.actions.is_none());
    assert!(orch.summary().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_pending_work() {
    let backend = ScriptedBackend::with_delay(vec![Ok(full_response())], Duration::from_secs(60));
    let mut orch = orchestrator(backend);
    orch.submit(scaffold_observation()).unwrap();

    orch.shutdown();
    assert!(orch.is_shut_down());
    assert_eq!(orch.step().await, None);
    assert_eq!(orch.state().stage, Stage::Form);
}
