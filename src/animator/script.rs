//! Scripted reveal phases per stage.

use serde::Serialize;

use crate::pipeline::Stage;

/// One named step of a reveal sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: &'static str,
    /// Progress line shown while the phase is active
    pub narration: &'static str,
}

/// Name of the last phase of every script.
pub const COMPLETE: &str = "complete";

impl Phase {
    pub fn is_complete(&self) -> bool {
        self.name == COMPLETE
    }
}

const HAZARD_SCRIPT: [Phase; 3] = [
    Phase { name: "scanning", narration: "Scanning observation for hazard indicators" },
    Phase { name: "analyzing", narration: "Matching findings against the hazard taxonomy" },
    Phase { name: COMPLETE, narration: "Hazard identified" },
];

const SCORE_SCRIPT: [Phase; 4] = [
    Phase { name: "assessing", narration: "Assessing potential severity" },
    Phase { name: "weighing", narration: "Weighing likelihood against incident history" },
    Phase { name: "calculating", narration: "Calculating risk priority number" },
    Phase { name: COMPLETE, narration: "Risk scored" },
];

const ACTION_SCRIPT: [Phase; 4] = [
    Phase { name: "reviewing", narration: "Reviewing applicable standards" },
    Phase { name: "planning", narration: "Planning controls by hierarchy of controls" },
    Phase { name: "assigning", narration: "Assigning owners and materials" },
    Phase { name: COMPLETE, narration: "Corrective actions ready" },
];

/// Ordered phases for an analysis stage; empty for FORM and SUMMARY.
///
/// Every non-empty script ends with the `complete` phase.
pub fn script(stage: Stage) -> &'static [Phase] {
    match stage {
        Stage::Risk => &HAZARD_SCRIPT,
        Stage::Score => &SCORE_SCRIPT,
        Stage::Action => &ACTION_SCRIPT,
        Stage::Form | Stage::Summary => &[],
    }
}
