//! Transformation Layer
//!
//! Pure, deterministic mappings from backend records to stage view-models.
//! Every function here takes the backend payload (or `None`) plus the
//! observation and returns a view-model; none of them mutate their inputs.
//!
//! ## Precedence
//!
//! Backend data always wins over a stage's built-in fallback. The rule lives
//! in one place, [`reconcile`], which the orchestrator applies to every
//! result an animator reports.
//!
//! ## Fallbacks
//!
//! | Stage  | Backend data used            | Fallback when absent                  |
//! |--------|------------------------------|---------------------------------------|
//! | RISK   | `hazards[0]`                 | [`default_risk_view`]                 |
//! | SCORE  | `scored_hazards[0]`          | severity 4, likelihood 3, score 12, High |
//! | ACTION | every task of every plan     | [`default_action_view`]               |

mod controls;
mod keywords;
mod taxonomy;

pub use controls::{
    control_icon, control_label, control_owner, role_label, urgency, ActionUrgency, ControlType,
};
pub use keywords::{extract_keywords, FALLBACK_KEYWORDS};
pub use taxonomy::TaxonomyRef;

use serde::{Deserialize, Serialize};

use crate::pipeline::Stage;
use crate::types::{
    ActionPlan, ActionView, AnalysisResponse, Hazard, Observation, RiskView, ScoreView,
    ScoredHazard, StageResult, SummaryView, TaskView,
};

// ============================================================================
// Risk Priority
// ============================================================================

/// Remediation priority of a scored hazard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskPriority {
    /// Parse a backend priority code. Absent or unrecognized codes are
    /// treated as MEDIUM.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_ascii_uppercase()).as_deref() {
            Some("CRITICAL") => RiskPriority::Critical,
            Some("HIGH") => RiskPriority::High,
            Some("LOW") => RiskPriority::Low,
            Some("MEDIUM") | Some(_) | None => RiskPriority::Medium,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RiskPriority::Critical => "CRITICAL",
            RiskPriority::High => "HIGH",
            RiskPriority::Medium => "MEDIUM",
            RiskPriority::Low => "LOW",
        }
    }

    /// Display category on the SCORE stage.
    pub fn category(&self) -> &'static str {
        match self {
            RiskPriority::Critical => "Critical",
            RiskPriority::High => "High",
            RiskPriority::Medium => "Medium",
            RiskPriority::Low => "Low",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskPriority::Critical => "red",
            RiskPriority::High => "orange",
            RiskPriority::Medium => "yellow",
            RiskPriority::Low => "green",
        }
    }
}

impl std::fmt::Display for RiskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.category())
    }
}

/// 5×5 risk matrix.
///
/// CRITICAL when severity is 5 or RPN >= 16, HIGH when RPN >= 10, MEDIUM
/// when RPN >= 5, otherwise LOW. Inputs are clamped to 1 - 5.
pub fn risk_matrix_priority(severity: u8, likelihood: u8) -> RiskPriority {
    let severity = severity.clamp(1, 5);
    let rpn = u32::from(severity) * u32::from(likelihood.clamp(1, 5));
    if severity == 5 || rpn >= 16 {
        RiskPriority::Critical
    } else if rpn >= 10 {
        RiskPriority::High
    } else if rpn >= 5 {
        RiskPriority::Medium
    } else {
        RiskPriority::Low
    }
}

// ============================================================================
// RISK stage
// ============================================================================

/// Fallback confidence for the built-in RISK result.
const DEFAULT_RISK_CONFIDENCE: u8 = 85;

/// Built-in RISK result used when the backend found no hazard.
pub fn default_risk_view(observation: &Observation) -> RiskView {
    RiskView {
        hazard: "Unprotected work at height".to_string(),
        category: TaxonomyRef::FallFromHeight.category().to_string(),
        confidence: DEFAULT_RISK_CONFIDENCE,
        keywords: extract_keywords(&[&observation.description]),
        area: None,
    }
}

/// Build the RISK view-model from the primary hazard.
pub fn risk_view(hazard: Option<&Hazard>, observation: &Observation) -> RiskView {
    let Some(hazard) = hazard else {
        return default_risk_view(observation);
    };
    RiskView {
        hazard: hazard.description.clone(),
        category: TaxonomyRef::from_code(&hazard.taxonomy_ref).category().to_string(),
        confidence: confidence_percent(hazard.confidence),
        keywords: extract_keywords(&[&hazard.description, &observation.description]),
        area: hazard.area.clone(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn confidence_percent(confidence: f64) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

// ============================================================================
// SCORE stage
// ============================================================================

/// Built-in SCORE result used when the backend scored nothing.
pub fn default_score_view() -> ScoreView {
    let priority = RiskPriority::High;
    ScoreView {
        severity: 4,
        likelihood: 3,
        risk_score: 12,
        priority,
        category: priority.category().to_string(),
        color: priority.color().to_string(),
        due_by: None,
        culture_score_delta: None,
        adjustment_reason: None,
    }
}

/// Build the SCORE view-model from the primary scored hazard.
///
/// A missing `rpn` is recomputed as severity × likelihood; a missing or
/// unknown priority is MEDIUM.
pub fn score_view(scored: Option<&ScoredHazard>) -> ScoreView {
    let Some(scored) = scored else {
        return default_score_view();
    };
    let severity = scored.severity.clamp(1, 5);
    let likelihood = scored.likelihood.clamp(1, 5);
    let priority = RiskPriority::from_code(scored.priority.as_deref());
    ScoreView {
        severity,
        likelihood,
        risk_score: scored
            .rpn
            .unwrap_or_else(|| u32::from(severity) * u32::from(likelihood)),
        priority,
        category: priority.category().to_string(),
        color: priority.color().to_string(),
        due_by: scored.due_by,
        culture_score_delta: scored.culture_score_delta,
        adjustment_reason: scored.likelihood_adjustment_reason.clone(),
    }
}

// ============================================================================
// ACTION stage
// ============================================================================

/// Built-in ACTION result used when the backend planned nothing.
pub fn default_action_view() -> ActionView {
    let task = |n: usize, title: &str, description: &str, control: ControlType, role: &str, minutes: u32, materials: &[&str]| {
        let control = Some(control);
        TaskView {
            id: format!("default-{n}"),
            title: title.to_string(),
            description: description.to_string(),
            control,
            control_label: control_label(control).to_string(),
            urgency: urgency(control),
            icon: control_icon(control).to_string(),
            responsible: role_label(role, control),
            duration_minutes: minutes,
            materials: materials.iter().map(|m| (*m).to_string()).collect(),
            standards: Vec::new(),
            acceptance_criteria: None,
        }
    };

    ActionView {
        tasks: vec![
            task(
                0,
                "Implement physical controls",
                "Install appropriate barriers or safety devices to control the hazard.",
                ControlType::Engineering,
                "safety_engineer",
                120,
                &["safety_barriers", "warning_signs"],
            ),
            task(
                1,
                "Verify protective equipment",
                "Check that crews in the area carry and use the required PPE.",
                ControlType::Ppe,
                "supervisor",
                30,
                &["ppe_checklist"],
            ),
            task(
                2,
                "Conduct safety assessment",
                "Perform detailed safety assessment of the hazard area and document findings.",
                ControlType::Administrative,
                "safety_officer",
                60,
                &["training_materials"],
            ),
        ],
        total_cost_usd: None,
        lead_time_days: None,
    }
}

/// Flatten every plan's tasks, in plan order then task order.
///
/// When the plans contain no task at all the built-in result is used.
pub fn action_view(plans: &[ActionPlan]) -> ActionView {
    let tasks: Vec<TaskView> = plans
        .iter()
        .enumerate()
        .flat_map(|(plan_index, plan)| {
            let plan_id = if plan.plan_id.is_empty() {
                format!("plan-{plan_index}")
            } else {
                plan.plan_id.clone()
            };
            plan.tasks.iter().enumerate().map(move |(i, task)| {
                let control = ControlType::from_code(&task.control_type);
                TaskView {
                    id: format!("{plan_id}-{i}"),
                    title: task.title.clone(),
                    description: task.description.clone(),
                    control,
                    control_label: control_label(control).to_string(),
                    urgency: urgency(control),
                    icon: control_icon(control).to_string(),
                    responsible: role_label(&task.responsible_role, control),
                    duration_minutes: task.duration_minutes,
                    materials: task.material_requirements.clone(),
                    standards: plan.standards_refs.clone(),
                    acceptance_criteria: task.acceptance_criteria.clone(),
                }
            })
        })
        .collect();

    if tasks.is_empty() {
        return default_action_view();
    }

    let costs: Vec<f64> = plans.iter().filter_map(|p| p.cost_estimate_usd).collect();
    ActionView {
        tasks,
        total_cost_usd: (!costs.is_empty()).then(|| costs.iter().sum()),
        lead_time_days: plans.iter().filter_map(|p| p.lead_time_days).max(),
    }
}

// ============================================================================
// Stage dispatch and reconciliation
// ============================================================================

/// Whether the backend response carries data for `stage`.
pub fn has_backend_data(stage: Stage, analysis: Option<&AnalysisResponse>) -> bool {
    let Some(analysis) = analysis else {
        return false;
    };
    match stage {
        Stage::Risk => !analysis.hazards.is_empty(),
        Stage::Score => !analysis.scored_hazards.is_empty(),
        Stage::Action => analysis.task_count() > 0,
        Stage::Form | Stage::Summary => false,
    }
}

/// View-model for an analysis stage, from backend data or the fallback.
///
/// Returns `None` for FORM and SUMMARY, which have no stage result.
pub fn stage_view(
    stage: Stage,
    analysis: Option<&AnalysisResponse>,
    observation: &Observation,
) -> Option<StageResult> {
    match stage {
        Stage::Risk => Some(StageResult::Risk(risk_view(
            analysis.and_then(AnalysisResponse::primary_hazard),
            observation,
        ))),
        Stage::Score => Some(StageResult::Score(score_view(
            analysis.and_then(AnalysisResponse::primary_score),
        ))),
        Stage::Action => Some(StageResult::Action(action_view(
            analysis.map_or(&[][..], |a| a.action_plans.as_slice()),
        ))),
        Stage::Form | Stage::Summary => None,
    }
}

/// Apply the precedence rule: backend-derived data supersedes whatever an
/// animator proposed; without backend data the proposal stands.
pub fn reconcile(
    proposed: StageResult,
    analysis: Option<&AnalysisResponse>,
    observation: &Observation,
) -> StageResult {
    let stage = proposed.stage();
    if has_backend_data(stage, analysis) {
        if let Some(from_backend) = stage_view(stage, analysis, observation) {
            return from_backend;
        }
    }
    proposed
}

// ============================================================================
// Summary
// ============================================================================

/// Build the SUMMARY view from the settled stage results.
pub fn summary_view(
    analysis: Option<&AnalysisResponse>,
    observation: &Observation,
    risk: &RiskView,
    score: &ScoreView,
    actions: &ActionView,
) -> SummaryView {
    SummaryView {
        site: observation.site.clone(),
        hazards_identified: analysis.map_or(0, |a| a.hazards.len()).max(1),
        headline_hazard: risk.hazard.clone(),
        hazard_category: risk.category.clone(),
        risk_score: score.risk_score,
        risk_category: score.category.clone(),
        task_count: actions.tasks.len(),
        immediate_actions: actions.immediate_count(),
        total_cost_usd: actions.total_cost_usd,
        lead_time_days: actions.lead_time_days,
        standards: actions.standards(),
    }
}
