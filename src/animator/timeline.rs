//! Reveal timeline: the schedule of phase advances for one activation.
//!
//! A timeline is built up-front from a script and the configured timings,
//! then played by a single task. Cancelling the activation's token stops the
//! whole remaining schedule at once.

use std::time::Duration;

use super::script::Phase;

/// What happens at a scheduled instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Enter the phase at this script index
    Enter(usize),
    /// Report the settled result
    Settle,
}

/// A step and its offset from activation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub at: Duration,
    pub step: Step,
}

/// Fixed reveal timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTiming {
    /// Time spent in each phase before the next one starts
    pub phase_interval: Duration,
    /// Pause after entering `complete` before the result is reported
    pub settle_delay: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            phase_interval: Duration::from_millis(crate::config::defaults::PHASE_INTERVAL_MS),
            settle_delay: Duration::from_millis(crate::config::defaults::SETTLE_DELAY_MS),
        }
    }
}

/// Ordered schedule for one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    steps: Vec<Scheduled>,
}

impl Timeline {
    /// Phase `i` starts at `i × phase_interval`; the settle step follows the
    /// last phase after `settle_delay`.
    pub fn build(phases: &[Phase], timing: AnimationTiming) -> Self {
        let mut steps = Vec::with_capacity(phases.len() + 1);
        let mut at = Duration::ZERO;
        for index in 0..phases.len() {
            if index > 0 {
                at += timing.phase_interval;
            }
            steps.push(Scheduled { at, step: Step::Enter(index) });
        }
        if !phases.is_empty() {
            steps.push(Scheduled { at: at + timing.settle_delay, step: Step::Settle });
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[Scheduled] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::script::script;
    use crate::pipeline::Stage;

    fn timing() -> AnimationTiming {
        AnimationTiming {
            phase_interval: Duration::from_millis(1000),
            settle_delay: Duration::from_millis(250),
        }
    }

    #[test]
    fn test_hazard_timeline() {
        let timeline = Timeline::build(script(Stage::Risk), timing());
        let steps: Vec<(u128, Step)> = timeline
            .steps()
            .iter()
            .map(|s| (s.at.as_millis(), s.step))
            .collect();

        assert_eq!(
            steps,
            vec![
                (0, Step::Enter(0)),
                (1000, Step::Enter(1)),
                (2000, Step::Enter(2)),
                (2250, Step::Settle),
            ]
        );
    }

    #[test]
    fn test_steps_are_monotonic_and_settle_last() {
        for stage in Stage::ANALYSIS {
            let timeline = Timeline::build(script(stage), timing());
            assert!(timeline.steps().windows(2).all(|w| w[0].at <= w[1].at));
            assert_eq!(timeline.steps().last().map(|s| s.step), Some(Step::Settle));
            assert_eq!(
                timeline.steps().iter().filter(|s| s.step == Step::Settle).count(),
                1
            );
        }
    }

    #[test]
    fn test_empty_script_has_no_steps() {
        assert!(Timeline::build(&[], timing()).is_empty());
    }
}
