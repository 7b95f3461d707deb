//! Stage Animator
//!
//! One animator per analysis stage (RISK, SCORE, ACTION). Each activation
//! runs in one of two modes:
//!
//! - **Scripted**: plays the stage's phase script on a [`Timeline`]. Each
//!   phase is announced with [`AnimatorEvent::PhaseEntered`]; entering
//!   `complete` computes the result through the transformation layer and,
//!   after the settle delay, a single [`AnimatorEvent::ResultReady`] is sent.
//! - **Immediate**: no narration and no delay. The result is returned from
//!   [`StageAnimator::activate`] directly.
//!
//! ## Cancellation
//!
//! Every scripted activation owns a child [`CancellationToken`]. Deactivating
//! the animator cancels it, which stops the remaining schedule as a unit; a
//! cancelled activation never sends `ResultReady`. Events also carry their
//! [`ActivationId`] so the orchestrator can drop anything queued before the
//! cancellation landed.

pub mod script;
pub mod timeline;

pub use script::{script, Phase};
pub use timeline::{AnimationTiming, Scheduled, Step, Timeline};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::pipeline::Stage;
use crate::transform;
use crate::types::{AnalysisResponse, Observation, StageResult};

/// Identifies one activation of one animator. Unique within an orchestrator.
pub type ActivationId = u64;

/// How an activation reveals its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorMode {
    Scripted,
    Immediate,
}

/// Messages from a running scripted activation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorEvent {
    PhaseEntered {
        stage: Stage,
        activation: ActivationId,
        index: usize,
        phase: Phase,
    },
    ResultReady {
        stage: Stage,
        activation: ActivationId,
        result: StageResult,
    },
}

impl AnimatorEvent {
    pub fn activation(&self) -> ActivationId {
        match self {
            AnimatorEvent::PhaseEntered { activation, .. }
            | AnimatorEvent::ResultReady { activation, .. } => *activation,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            AnimatorEvent::PhaseEntered { stage, .. } | AnimatorEvent::ResultReady { stage, .. } => {
                *stage
            }
        }
    }
}

/// Data an activation computes its result from.
#[derive(Debug, Clone)]
pub struct StageInputs {
    pub observation: Observation,
    pub analysis: Option<AnalysisResponse>,
}

/// Outcome of [`StageAnimator::activate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Running; the result will arrive as an event
    Scripted(ActivationId),
    /// Already settled with this result
    Immediate(ActivationId, StageResult),
}

struct Running {
    id: ActivationId,
    token: CancellationToken,
}

/// Reveal controller for one analysis stage.
pub struct StageAnimator {
    stage: Stage,
    timing: AnimationTiming,
    /// Result recorded when the stage last settled; replayed in immediate mode
    settled: Option<StageResult>,
    running: Option<Running>,
}

impl StageAnimator {
    pub fn new(stage: Stage, timing: AnimationTiming) -> Self {
        debug_assert!(stage.is_analysis(), "animators exist only for analysis stages");
        Self {
            stage,
            timing,
            settled: None,
            running: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether a scripted activation is still playing.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.token.is_cancelled())
    }

    pub fn settled(&self) -> Option<&StageResult> {
        self.settled.as_ref()
    }

    /// Start an activation. Any previous activation is cancelled first.
    ///
    /// Scripted mode spawns the timeline on the current tokio runtime and
    /// reports through `events`. Immediate mode returns the cached result if
    /// the stage has settled before, otherwise computes it now.
    pub fn activate(
        &mut self,
        id: ActivationId,
        mode: AnimatorMode,
        inputs: &StageInputs,
        parent: &CancellationToken,
        events: &mpsc::Sender<AnimatorEvent>,
    ) -> Activation {
        self.deactivate();

        match mode {
            AnimatorMode::Immediate => {
                let result = match &self.settled {
                    Some(cached) => cached.clone(),
                    None => self.compute(inputs),
                };
                debug!(stage = %self.stage, activation = id, "Animator settled immediately");
                Activation::Immediate(id, result)
            }
            AnimatorMode::Scripted => {
                let token = parent.child_token();
                let timeline = Timeline::build(script(self.stage), self.timing);
                debug!(
                    stage = %self.stage,
                    activation = id,
                    steps = timeline.len(),
                    "Animator reveal started"
                );
                tokio::spawn(play(
                    self.stage,
                    id,
                    timeline,
                    inputs.clone(),
                    token.clone(),
                    events.clone(),
                ));
                self.running = Some(Running { id, token });
                Activation::Scripted(id)
            }
        }
    }

    /// Cancel the running activation, if any. Pending phase timers are
    /// dropped and no result will be reported for it.
    pub fn deactivate(&mut self) {
        if let Some(running) = self.running.take() {
            if !running.token.is_cancelled() {
                debug!(stage = %self.stage, activation = running.id, "Animator reveal cancelled");
            }
            running.token.cancel();
        }
    }

    /// Record the reconciled result once the orchestrator accepts it.
    ///
    /// Ends the running activation without logging it as a cancellation; its
    /// timeline has already delivered or been superseded.
    pub fn settle(&mut self, result: StageResult) {
        self.settled = Some(result);
        if let Some(running) = self.running.take() {
            running.token.cancel();
        }
    }

    /// Cancel and forget everything, ready for a new run.
    pub fn reset(&mut self) {
        self.deactivate();
        self.settled = None;
    }

    fn compute(&self, inputs: &StageInputs) -> StageResult {
        compute_result(self.stage, inputs)
    }
}

impl Drop for StageAnimator {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn compute_result(stage: Stage, inputs: &StageInputs) -> StageResult {
    match transform::stage_view(stage, inputs.analysis.as_ref(), &inputs.observation) {
        Some(result) => result,
        // Unreachable for analysis stages; keep the ACTION fallback as a total answer.
        None => StageResult::Action(transform::default_action_view()),
    }
}

/// Play a timeline until it settles or the token is cancelled.
async fn play(
    stage: Stage,
    activation: ActivationId,
    timeline: Timeline,
    inputs: StageInputs,
    token: CancellationToken,
    events: mpsc::Sender<AnimatorEvent>,
) {
    let phases = script(stage);
    let start = Instant::now();
    let mut result: Option<StageResult> = None;

    for scheduled in timeline.steps() {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                trace!(%stage, activation, "Reveal stopped before {:?}", scheduled.step);
                return;
            }
            () = tokio::time::sleep_until(start + scheduled.at) => {}
        }

        let event = match scheduled.step {
            Step::Enter(index) => {
                let phase = phases[index];
                if phase.is_complete() {
                    result = Some(compute_result(stage, &inputs));
                }
                AnimatorEvent::PhaseEntered { stage, activation, index, phase }
            }
            Step::Settle => {
                let result = result
                    .take()
                    .unwrap_or_else(|| compute_result(stage, &inputs));
                AnimatorEvent::ResultReady { stage, activation, result }
            }
        };

        if !send_unless_cancelled(&token, &events, event).await {
            return;
        }
    }
}

/// Send `event` unless the token is (or becomes) cancelled first.
///
/// Returns `false` when the event was not delivered.
async fn send_unless_cancelled(
    token: &CancellationToken,
    events: &mpsc::Sender<AnimatorEvent>,
    event: AnimatorEvent,
) -> bool {
    if token.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}
