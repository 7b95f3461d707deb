//! Pipeline Orchestrator
//!
//! Single writer of [`WorkflowState`]. Sequences the analysis call and the
//! three stage animators:
//!
//! ```text
//! FORM --submit ok--> RISK --continue--> SCORE --continue--> ACTION --continue--> SUMMARY
//!   ^                                                                                |
//!   +-------------------------------------reset---------------------------------------+
//!                         SUMMARY --view_stage--> RISK|SCORE|ACTION (review)
//!                         (review) --return_to_summary--> SUMMARY
//! ```
//!
//! Navigation operations are synchronous and return [`NavigationError`] on
//! misuse without touching state. Asynchronous progress (the backend reply,
//! reveal phases, settled results) is delivered by [`step`], which the
//! presenter awaits in a loop.
//!
//! [`step`]: PipelineOrchestrator::step

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{NavigationError, Stage, WorkflowState};
use crate::animator::{
    Activation, ActivationId, AnimationTiming, AnimatorEvent, AnimatorMode, Phase, StageAnimator,
    StageInputs,
};
use crate::backend::{AnalysisBackend, BackendError};
use crate::config::defaults::ANIMATOR_CHANNEL_CAPACITY;
use crate::config::AnimationConfig;
use crate::transform;
use crate::types::{AnalysisResponse, Observation, StageResult, SummaryView};

// ============================================================================
// Options and Updates
// ============================================================================

/// Reveal behaviour for every activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrchestratorOptions {
    pub timing: AnimationTiming,
    /// Reveal every stage immediately instead of playing its script
    pub skip_animation: bool,
}

impl OrchestratorOptions {
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self {
            timing: config.timing(),
            skip_animation: config.skip,
        }
    }
}

/// Progress reported by [`PipelineOrchestrator::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineUpdate {
    /// Analysis stored; the workflow moved to RISK
    Analyzed,
    /// Analysis call failed; still on FORM with this message recorded
    SubmitFailed { message: String },
    /// A reveal entered a new phase
    Phase {
        stage: Stage,
        index: usize,
        phase: Phase,
    },
    /// The stage's result settled and it may be continued from
    Ready(Stage),
}

/// Result of the one backend call of a run.
struct SubmitOutcome {
    run: u64,
    result: Result<AnalysisResponse, BackendError>,
}

enum Incoming {
    Submit(SubmitOutcome),
    Animator(AnimatorEvent),
    Shutdown,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct PipelineOrchestrator {
    backend: Arc<dyn AnalysisBackend>,
    options: OrchestratorOptions,
    state: WorkflowState,

    /// RISK, SCORE, ACTION in order
    animators: [StageAnimator; 3],
    /// Activation whose events are currently accepted
    current_activation: Option<ActivationId>,
    next_activation: ActivationId,

    animator_tx: mpsc::Sender<AnimatorEvent>,
    animator_rx: mpsc::Receiver<AnimatorEvent>,
    submit_tx: mpsc::Sender<SubmitOutcome>,
    submit_rx: mpsc::Receiver<SubmitOutcome>,

    /// Parent of every spawned task; cancelled on shutdown
    root: CancellationToken,
    /// Cancels the in-flight backend call
    submission: Option<CancellationToken>,
    /// Bumped on every submit and reset so late replies are recognised
    run_id: u64,
}

impl PipelineOrchestrator {
    pub fn new(backend: Arc<dyn AnalysisBackend>, options: OrchestratorOptions) -> Self {
        let (animator_tx, animator_rx) = mpsc::channel(ANIMATOR_CHANNEL_CAPACITY);
        let (submit_tx, submit_rx) = mpsc::channel(1);
        Self {
            backend,
            options,
            state: WorkflowState::default(),
            animators: Stage::ANALYSIS.map(|stage| StageAnimator::new(stage, options.timing)),
            current_activation: None,
            next_activation: 0,
            animator_tx,
            animator_rx,
            submit_tx,
            submit_rx,
            root: CancellationToken::new(),
            submission: None,
            run_id: 0,
        }
    }

    /// Tie the orchestrator's lifetime to an outer token (e.g. Ctrl-C).
    pub fn with_shutdown(mut self, parent: &CancellationToken) -> Self {
        self.root = parent.child_token();
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn options(&self) -> OrchestratorOptions {
        self.options
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancel the in-flight call and every pending animator timer.
    pub fn shutdown(&mut self) {
        info!("Orchestrator shutting down");
        self.root.cancel();
        self.cancel_submission();
        for animator in &mut self.animators {
            animator.deactivate();
        }
        self.current_activation = None;
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Start the analysis of `observation`. Valid only from FORM with no
    /// call outstanding; the outcome arrives through [`step`](Self::step).
    ///
    /// Must be called within a tokio runtime.
    pub fn submit(&mut self, observation: Observation) -> Result<(), NavigationError> {
        if self.state.submitting {
            return self.reject(NavigationError::SubmissionInFlight);
        }
        if self.state.stage != Stage::Form {
            return self.reject(NavigationError::WrongStage {
                operation: "submit",
                expected: Stage::Form,
                actual: self.state.stage,
            });
        }
        if let Err(problems) = observation.validate() {
            return self.reject(NavigationError::InvalidObservation(problems));
        }

        self.run_id += 1;
        let run = self.run_id;
        let token = self.root.child_token();
        self.submission = Some(token.clone());
        self.state.submitting = true;
        self.state.observation = Some(observation.clone());

        info!(
            run,
            observation = %observation.id,
            site = %observation.site,
            backend = self.backend.name(),
            "Submitting observation for analysis"
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.submit_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(run, "Analysis call cancelled");
                    return;
                }
                result = backend.analyze(&observation) => result,
            };
            if tx.send(SubmitOutcome { run, result }).await.is_err() {
                debug!(run, "Orchestrator gone before analysis reply");
            }
        });
        Ok(())
    }

    /// Accept the settled result of the current analysis stage.
    ///
    /// Backend-derived data for the stage supersedes `result`. Marks the
    /// stage ready; completed-stage history is not touched.
    pub fn stage_result_ready(
        &mut self,
        stage: Stage,
        result: StageResult,
    ) -> Result<(), NavigationError> {
        if !stage.is_analysis() {
            return self.reject(NavigationError::NotAnalysisStage(stage));
        }
        if stage != self.state.stage || result.stage() != stage {
            return self.reject(NavigationError::StageMismatch {
                reported: result.stage(),
                current: self.state.stage,
            });
        }
        let Some(observation) = self.state.observation.as_ref() else {
            return self.reject(NavigationError::NotReady(stage));
        };

        let result = transform::reconcile(result, self.state.analysis.as_ref(), observation);
        self.animators[animator_index(stage)].settle(result.clone());
        self.state.store_result(result);
        self.state.ready = Some(stage);
        self.current_activation = None;
        info!(%stage, review = self.state.review_mode, "Stage result ready");
        Ok(())
    }

    /// Leave a ready analysis stage for the next one in fixed order.
    ///
    /// Returns the stage moved to.
    pub fn continue_to_next(&mut self) -> Result<Stage, NavigationError> {
        let current = self.state.stage;
        if !current.is_analysis() {
            return self.reject(NavigationError::NotAnalysisStage(current));
        }
        if !self.state.is_ready() {
            return self.reject(NavigationError::NotReady(current));
        }
        let Some(next) = current.next() else {
            return self.reject(NavigationError::NotAnalysisStage(current));
        };

        self.animators[animator_index(current)].deactivate();
        self.state.mark_completed(current);
        self.state.ready = None;
        self.state.stage = next;
        info!(from = %current, to = %next, "Stage advanced");

        if next == Stage::Summary {
            if self.state.review_mode {
                debug!("Review finished at summary");
            }
            self.state.review_mode = false;
            self.current_activation = None;
        } else {
            self.activate(next, self.reveal_mode());
        }
        Ok(next)
    }

    /// Review a completed stage from SUMMARY. The stage is ready at once with
    /// the result it settled on the first time.
    pub fn view_stage(&mut self, stage: Stage) -> Result<(), NavigationError> {
        if self.state.stage != Stage::Summary {
            return self.reject(NavigationError::WrongStage {
                operation: "view_stage",
                expected: Stage::Summary,
                actual: self.state.stage,
            });
        }
        if !stage.is_analysis() {
            return self.reject(NavigationError::NotAnalysisStage(stage));
        }
        if !self.state.is_completed(stage) {
            return self.reject(NavigationError::NotCompleted(stage));
        }

        self.state.review_mode = true;
        self.state.stage = stage;
        self.state.ready = None;
        info!(%stage, "Reviewing stage");
        self.activate(stage, AnimatorMode::Immediate);
        Ok(())
    }

    /// Leave review mode for SUMMARY. History and results are unchanged.
    pub fn return_to_summary(&mut self) -> Result<(), NavigationError> {
        if !self.state.review_mode {
            return self.reject(NavigationError::NotReviewing);
        }
        if self.state.stage.is_analysis() {
            self.animators[animator_index(self.state.stage)].deactivate();
        }
        self.current_activation = None;
        self.state.review_mode = false;
        self.state.ready = None;
        self.state.stage = Stage::Summary;
        info!("Returned to summary");
        Ok(())
    }

    /// Finish the current reveal now instead of waiting for its script.
    ///
    /// No-op when the stage is already ready.
    pub fn skip_reveal(&mut self) -> Result<(), NavigationError> {
        let stage = self.state.stage;
        if !stage.is_analysis() {
            return self.reject(NavigationError::NotAnalysisStage(stage));
        }
        if self.state.is_ready() {
            return Ok(());
        }
        debug!(%stage, "Skipping reveal");
        self.activate(stage, AnimatorMode::Immediate);
        Ok(())
    }

    /// Discard everything and return to FORM. Valid from any state.
    pub fn reset(&mut self) {
        self.cancel_submission();
        for animator in &mut self.animators {
            animator.reset();
        }
        self.current_activation = None;
        self.run_id += 1;
        self.state = WorkflowState::default();
        info!(run = self.run_id, "Workflow reset");
    }

    /// Summary of the settled results, once all three exist.
    pub fn summary(&self) -> Option<SummaryView> {
        let observation = self.state.observation.as_ref()?;
        Some(transform::summary_view(
            self.state.analysis.as_ref(),
            observation,
            self.state.risk.as_ref()?,
            self.state.score.as_ref()?,
            self.state.actions.as_ref()?,
        ))
    }

    // ========================================================================
    // Event Pump
    // ========================================================================

    /// Whether anything is still expected to arrive.
    pub fn has_pending_work(&self) -> bool {
        !self.root.is_cancelled()
            && (self.state.submitting || (self.state.stage.is_analysis() && !self.state.is_ready()))
    }

    /// Wait for the next piece of progress.
    ///
    /// Returns `None` when nothing is pending (the caller should act) or
    /// after shutdown. Stale events from cancelled activations or earlier
    /// runs are swallowed.
    pub async fn step(&mut self) -> Option<PipelineUpdate> {
        loop {
            if self.root.is_cancelled() {
                return None;
            }
            if !self.has_pending_work() {
                // Drain anything left over from superseded activations.
                while let Ok(event) = self.animator_rx.try_recv() {
                    trace!(activation = event.activation(), "Discarding idle animator event");
                }
                return None;
            }

            let incoming = tokio::select! {
                biased;
                () = self.root.cancelled() => Incoming::Shutdown,
                Some(outcome) = self.submit_rx.recv() => Incoming::Submit(outcome),
                Some(event) = self.animator_rx.recv() => Incoming::Animator(event),
                else => Incoming::Shutdown,
            };

            let update = match incoming {
                Incoming::Submit(outcome) => self.on_submit_outcome(outcome),
                Incoming::Animator(event) => self.on_animator_event(event),
                Incoming::Shutdown => {
                    self.shutdown();
                    return None;
                }
            };
            if update.is_some() {
                return update;
            }
        }
    }

    /// Step until the current stage is ready or nothing more can happen,
    /// discarding phase updates. Returns the last failure message, if the
    /// pending work was a submit that failed.
    pub async fn run_until_idle(&mut self) -> Option<String> {
        while let Some(update) = self.step().await {
            if let PipelineUpdate::SubmitFailed { message } = update {
                return Some(message);
            }
        }
        None
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn on_submit_outcome(&mut self, outcome: SubmitOutcome) -> Option<PipelineUpdate> {
        if outcome.run != self.run_id || !self.state.submitting {
            debug!(run = outcome.run, current = self.run_id, "Ignoring stale analysis reply");
            return None;
        }
        self.state.submitting = false;
        self.submission = None;

        match outcome.result {
            Ok(response) => {
                info!(
                    hazards = response.hazards.len(),
                    scored = response.scored_hazards.len(),
                    plans = response.action_plans.len(),
                    "Analysis stored"
                );
                self.state.analysis = Some(response);
                self.state.last_error = None;
                self.state.stage = Stage::Risk;
                self.activate(Stage::Risk, self.reveal_mode());
                Some(PipelineUpdate::Analyzed)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(error = %e, "Analysis failed, staying on form");
                self.state.last_error = Some(message.clone());
                Some(PipelineUpdate::SubmitFailed { message })
            }
        }
    }

    fn on_animator_event(&mut self, event: AnimatorEvent) -> Option<PipelineUpdate> {
        if Some(event.activation()) != self.current_activation || event.stage() != self.state.stage {
            trace!(
                activation = event.activation(),
                stage = %event.stage(),
                "Dropping stale animator event"
            );
            return None;
        }

        match event {
            AnimatorEvent::PhaseEntered { stage, index, phase, .. } => {
                debug!(%stage, phase = phase.name, "Phase entered");
                Some(PipelineUpdate::Phase { stage, index, phase })
            }
            AnimatorEvent::ResultReady { stage, result, .. } => {
                self.stage_result_ready(stage, result).ok()?;
                Some(PipelineUpdate::Ready(stage))
            }
        }
    }

    fn reveal_mode(&self) -> AnimatorMode {
        if self.options.skip_animation || self.state.review_mode {
            AnimatorMode::Immediate
        } else {
            AnimatorMode::Scripted
        }
    }

    /// Activate the animator for `stage`. Immediate activations settle
    /// before this returns.
    fn activate(&mut self, stage: Stage, mode: AnimatorMode) {
        let Some(observation) = self.state.observation.clone() else {
            warn!(%stage, "No observation to animate");
            return;
        };
        let inputs = StageInputs {
            observation,
            analysis: self.state.analysis.clone(),
        };

        self.next_activation += 1;
        let id = self.next_activation;
        self.current_activation = Some(id);

        let activation = self.animators[animator_index(stage)].activate(
            id,
            mode,
            &inputs,
            &self.root,
            &self.animator_tx,
        );
        if let Activation::Immediate(_, result) = activation {
            if let Err(e) = self.stage_result_ready(stage, result) {
                warn!(%stage, error = %e, "Immediate activation was not accepted");
            }
        }
    }

    fn cancel_submission(&mut self) {
        if let Some(token) = self.submission.take() {
            token.cancel();
        }
        self.state.submitting = false;
    }

    fn reject<T>(&self, err: NavigationError) -> Result<T, NavigationError> {
        warn!(stage = %self.state.stage, error = %err, "Navigation rejected");
        Err(err)
    }
}

impl Drop for PipelineOrchestrator {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

fn animator_index(stage: Stage) -> usize {
    match stage {
        Stage::Risk => 0,
        Stage::Score => 1,
        // FORM and SUMMARY never reach an animator
        Stage::Action | Stage::Form | Stage::Summary => 2,
    }
}
