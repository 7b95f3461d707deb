//! Workflow stages and their fixed ordering.

use serde::{Deserialize, Serialize};

/// One step of the walkthrough.
///
/// ```text
/// FORM ──submit──▶ RISK ──▶ SCORE ──▶ ACTION ──▶ SUMMARY
///   ▲                ▲         ▲          ▲          │
///   │                └─────────┴──review──┴──────────┤
///   └──────────────────────reset─────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Form,
    Risk,
    Score,
    Action,
    Summary,
}

impl Stage {
    /// The three stages that run an animator and produce a result.
    pub const ANALYSIS: [Stage; 3] = [Stage::Risk, Stage::Score, Stage::Action];

    /// Next stage in the forward sequence RISK → SCORE → ACTION → SUMMARY.
    ///
    /// FORM only leaves through a submission and SUMMARY only through
    /// review or reset, so both return `None`.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Risk => Some(Stage::Score),
            Stage::Score => Some(Stage::Action),
            Stage::Action => Some(Stage::Summary),
            Stage::Form | Stage::Summary => None,
        }
    }

    pub fn is_analysis(self) -> bool {
        matches!(self, Stage::Risk | Stage::Score | Stage::Action)
    }

    /// Lowercase stage name, e.g. `risk`
    pub fn name(self) -> &'static str {
        match self {
            Stage::Form => "form",
            Stage::Risk => "risk",
            Stage::Score => "score",
            Stage::Action => "action",
            Stage::Summary => "summary",
        }
    }

    /// Heading shown above the stage in the narrative.
    pub fn title(self) -> &'static str {
        match self {
            Stage::Form => "Observation",
            Stage::Risk => "Hazard Detection",
            Stage::Score => "Risk Scoring",
            Stage::Action => "Corrective Actions",
            Stage::Summary => "Summary",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(Stage::Form),
            "risk" | "hazard" => Ok(Stage::Risk),
            "score" => Ok(Stage::Score),
            "action" | "actions" => Ok(Stage::Action),
            "summary" => Ok(Stage::Summary),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}
