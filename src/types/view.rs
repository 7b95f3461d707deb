//! Stage view-models
//!
//! Normalized shapes consumed by the stage renderers. They are produced only
//! by the transformation layer and stored by the orchestrator once a stage
//! settles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::Stage;
use crate::transform::{ActionUrgency, ControlType, RiskPriority};

/// RISK stage result: the headline hazard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskView {
    pub hazard: String,
    /// Human-readable taxonomy category
    pub category: String,
    /// Confidence as a whole percentage, 0 - 100
    pub confidence: u8,
    /// Between three and five safety terms
    pub keywords: Vec<String>,
    pub area: Option<String>,
}

/// SCORE stage result: severity × likelihood scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreView {
    pub severity: u8,
    pub likelihood: u8,
    /// Risk priority number (1 - 25)
    pub risk_score: u32,
    pub priority: RiskPriority,
    /// Display category, e.g. "High"
    pub category: String,
    /// Display color name, e.g. "orange"
    pub color: String,
    pub due_by: Option<DateTime<Utc>>,
    pub culture_score_delta: Option<f64>,
    pub adjustment_reason: Option<String>,
}

/// One row of the flattened ACTION stage task list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskView {
    /// `<plan id>-<task index>`
    pub id: String,
    pub title: String,
    pub description: String,
    /// `None` when the backend sent an unrecognized control code
    pub control: Option<ControlType>,
    pub control_label: String,
    pub urgency: ActionUrgency,
    pub icon: String,
    pub responsible: String,
    pub duration_minutes: u32,
    pub materials: Vec<String>,
    pub standards: Vec<String>,
    pub acceptance_criteria: Option<String>,
}

/// ACTION stage result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionView {
    pub tasks: Vec<TaskView>,
    /// Sum of plan cost estimates, `None` if no plan carried one
    pub total_cost_usd: Option<f64>,
    /// Longest plan lead time, `None` if no plan carried one
    pub lead_time_days: Option<u32>,
}

impl ActionView {
    /// Number of tasks that must happen immediately.
    pub fn immediate_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.urgency == ActionUrgency::Immediate)
            .count()
    }

    /// Distinct standards references across all tasks, in first-seen order.
    pub fn standards(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for reference in self.tasks.iter().flat_map(|t| t.standards.iter()) {
            if !seen.contains(reference) {
                seen.push(reference.clone());
            }
        }
        seen
    }
}

/// The value a stage animator reports when its reveal settles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", content = "result", rename_all = "lowercase")]
pub enum StageResult {
    Risk(RiskView),
    Score(ScoreView),
    Action(ActionView),
}

impl StageResult {
    /// Stage this result belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            StageResult::Risk(_) => Stage::Risk,
            StageResult::Score(_) => Stage::Score,
            StageResult::Action(_) => Stage::Action,
        }
    }
}

/// Final overview shown on the SUMMARY stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryView {
    pub site: String,
    /// `max(1, hazards.len())`
    pub hazards_identified: usize,
    pub headline_hazard: String,
    pub hazard_category: String,
    pub risk_score: u32,
    pub risk_category: String,
    pub task_count: usize,
    pub immediate_actions: usize,
    pub total_cost_usd: Option<f64>,
    pub lead_time_days: Option<u32>,
    pub standards: Vec<String>,
}
