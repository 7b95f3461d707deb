//! Observation record handed over by intake, plus its two classification enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Classification Enums
// ============================================================================

/// Potential outcome classification chosen by the observer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationPotential {
    NearMiss,
    SafePractice,
    AtRiskBehavior,
    Hazard,
    Other,
}

impl ObservationPotential {
    /// Wire code, e.g. `NEAR_MISS`
    pub fn code(&self) -> &'static str {
        match self {
            ObservationPotential::NearMiss => "NEAR_MISS",
            ObservationPotential::SafePractice => "SAFE_PRACTICE",
            ObservationPotential::AtRiskBehavior => "AT_RISK_BEHAVIOR",
            ObservationPotential::Hazard => "HAZARD",
            ObservationPotential::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for ObservationPotential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservationPotential::NearMiss => write!(f, "Near Miss"),
            ObservationPotential::SafePractice => write!(f, "Safe Practice"),
            ObservationPotential::AtRiskBehavior => write!(f, "At-Risk Behavior"),
            ObservationPotential::Hazard => write!(f, "Hazard"),
            ObservationPotential::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for ObservationPotential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "NEAR_MISS" => Ok(ObservationPotential::NearMiss),
            "SAFE_PRACTICE" => Ok(ObservationPotential::SafePractice),
            "AT_RISK_BEHAVIOR" => Ok(ObservationPotential::AtRiskBehavior),
            "HAZARD" => Ok(ObservationPotential::Hazard),
            "OTHER" => Ok(ObservationPotential::Other),
            other => Err(format!("unknown observation potential: {other}")),
        }
    }
}

/// What kind of observation was made.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationType {
    AreaForImprovement,
    PositiveObservation,
    UnsafeCondition,
    UnsafeAct,
}

impl ObservationType {
    /// Wire code, e.g. `UNSAFE_CONDITION`
    pub fn code(&self) -> &'static str {
        match self {
            ObservationType::AreaForImprovement => "AREA_FOR_IMPROVEMENT",
            ObservationType::PositiveObservation => "POSITIVE_OBSERVATION",
            ObservationType::UnsafeCondition => "UNSAFE_CONDITION",
            ObservationType::UnsafeAct => "UNSAFE_ACT",
        }
    }
}

impl std::fmt::Display for ObservationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservationType::AreaForImprovement => write!(f, "Area for Improvement"),
            ObservationType::PositiveObservation => write!(f, "Positive Observation"),
            ObservationType::UnsafeCondition => write!(f, "Unsafe Condition"),
            ObservationType::UnsafeAct => write!(f, "Unsafe Act"),
        }
    }
}

impl std::str::FromStr for ObservationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "AREA_FOR_IMPROVEMENT" => Ok(ObservationType::AreaForImprovement),
            "POSITIVE_OBSERVATION" => Ok(ObservationType::PositiveObservation),
            "UNSAFE_CONDITION" => Ok(ObservationType::UnsafeCondition),
            "UNSAFE_ACT" => Ok(ObservationType::UnsafeAct),
            other => Err(format!("unknown observation type: {other}")),
        }
    }
}

// ============================================================================
// Observation
// ============================================================================

/// A single safety observation.
///
/// Built once per submission and never mutated afterwards; the orchestrator
/// owns it for the lifetime of one workflow run. Serializes to the request
/// body expected by `POST /api/observations/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Client-side identifier, used for log correlation only
    #[serde(skip_serializing, default = "new_observation_id")]
    pub id: String,

    /// Site or location, e.g. "Building A - 3rd Floor"
    pub site: String,

    pub potential: ObservationPotential,

    #[serde(rename = "type")]
    pub observation_type: ObservationType,

    /// Free-text description (never empty)
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_category_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_partner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_id: Option<String>,

    /// When the observation was made (ISO-8601 on the wire)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

fn new_observation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Observation {
    /// Build an observation stamped with a fresh id and the current time.
    pub fn new(
        site: impl Into<String>,
        potential: ObservationPotential,
        observation_type: ObservationType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: new_observation_id(),
            site: site.into(),
            potential,
            observation_type,
            description: description.into(),
            trade_category_id: None,
            trade_partner_id: None,
            photo_id: None,
            observed_at: Some(Utc::now()),
        }
    }

    pub fn with_trade_category(mut self, id: impl Into<String>) -> Self {
        self.trade_category_id = Some(id.into());
        self
    }

    pub fn with_trade_partner(mut self, id: impl Into<String>) -> Self {
        self.trade_partner_id = Some(id.into());
        self
    }

    pub fn with_photo(mut self, id: impl Into<String>) -> Self {
        self.photo_id = Some(id.into());
        self
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }

    /// Check the record-level invariants intake is expected to uphold.
    ///
    /// Returns one message per violated rule.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.site.trim().is_empty() {
            errors.push("site must not be empty".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("description must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
