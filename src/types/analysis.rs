//! Analysis backend response records
//!
//! These mirror the JSON returned by `POST /api/observations/analyze`. Codes
//! that the client interprets (taxonomy references, priorities, control types)
//! are kept as raw strings here; the transformation layer maps them through
//! closed enums with explicit defaults, so an unfamiliar code never fails
//! deserialization.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A hazard detected in the observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hazard {
    #[serde(default)]
    pub hazard_id: String,

    /// Raw hazard type before taxonomy normalization, e.g. `fall_from_height`
    #[serde(default, rename = "type")]
    pub hazard_type: String,

    /// Taxonomy code, e.g. `HAZ-FALL-001`
    #[serde(default)]
    pub taxonomy_ref: String,

    pub description: String,

    #[serde(default)]
    pub area: Option<String>,

    /// Detection confidence, 0.0 - 1.0
    #[serde(default)]
    pub confidence: f64,
}

/// A hazard with its risk scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredHazard {
    #[serde(default)]
    pub hazard_id: String,

    /// 1 (negligible) - 5 (catastrophic)
    pub severity: u8,

    /// 1 (rare) - 5 (almost certain)
    pub likelihood: u8,

    /// Risk priority number; recomputed as severity × likelihood when absent
    #[serde(default)]
    pub rpn: Option<u32>,

    /// `CRITICAL` | `HIGH` | `MEDIUM` | `LOW`
    #[serde(default)]
    pub priority: Option<String>,

    /// Close-out deadline; a timestamp without an offset is read as UTC
    #[serde(default, deserialize_with = "utc_or_naive")]
    pub due_by: Option<DateTime<Utc>>,

    #[serde(default)]
    pub culture_score_delta: Option<f64>,

    #[serde(default)]
    pub likelihood_adjustment_reason: Option<String>,
}

/// One corrective task inside an action plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// `ELIMINATION` | `SUBSTITUTION` | `ENGINEERING` | `ADMINISTRATIVE` | `PPE`
    #[serde(default)]
    pub control_type: String,

    /// Role code, e.g. `safety_engineer`
    #[serde(default)]
    pub responsible_role: String,

    #[serde(default)]
    pub duration_minutes: u32,

    #[serde(default)]
    pub material_requirements: Vec<String>,

    #[serde(default)]
    pub acceptance_criteria: Option<String>,
}

/// Corrective action plan for one scored hazard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionPlan {
    #[serde(default)]
    pub plan_id: String,

    #[serde(default)]
    pub hazard_id: String,

    #[serde(default)]
    pub standards_refs: Vec<String>,

    #[serde(default)]
    pub cost_estimate_usd: Option<f64>,

    #[serde(default)]
    pub lead_time_days: Option<u32>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Full analysis result for one observation.
///
/// The RISK and SCORE stages read index `[0]` of `hazards` and
/// `scored_hazards`; the ACTION stage reads every plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub hazards: Vec<Hazard>,

    #[serde(default)]
    pub scored_hazards: Vec<ScoredHazard>,

    #[serde(default)]
    pub action_plans: Vec<ActionPlan>,

    /// Pipeline status flag; absent means success
    #[serde(default = "default_success")]
    pub success: bool,

    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Accept RFC 3339 timestamps and offset-less ones such as
/// `2025-11-25T17:00:00.123456`. Null or blank is `None`.
fn utc_or_naive<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}

impl AnalysisResponse {
    /// Hazard shown in the RISK stage, if the backend produced one.
    pub fn primary_hazard(&self) -> Option<&Hazard> {
        self.hazards.first()
    }

    /// Scored hazard shown in the SCORE stage, if the backend produced one.
    pub fn primary_score(&self) -> Option<&ScoredHazard> {
        self.scored_hazards.first()
    }

    /// Total task count across every plan.
    pub fn task_count(&self) -> usize {
        self.action_plans.iter().map(|p| p.tasks.len()).sum()
    }
}

/// Liveness response from `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}
