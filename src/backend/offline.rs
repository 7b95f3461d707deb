//! Offline analyzer
//!
//! A deterministic, rule-based stand-in for the remote analysis service.
//! Produces one hazard, one scored hazard, and one action plan per
//! observation from fixed tables:
//!
//! 1. **Classification**: description keywords to a hazard label, then the
//!    label to a taxonomy code
//! 2. **Scoring**: severity per taxonomy entry, likelihood from the
//!    observation's potential raised by recent similar incidents at the
//!    site, priority from the risk matrix, due date from the priority SLA
//! 3. **Planning**: hierarchy-of-controls tasks, labour and material costs,
//!    procurement lead times, and standards references per taxonomy entry

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tracing::debug;

use super::{AnalysisBackend, BackendError};
use crate::config::defaults::{
    BASE_LEAD_TIME_DAYS, DEFAULT_LABOR_RATE_USD_PER_HOUR, DEFAULT_MATERIAL_COST_USD,
    DEFAULT_MATERIAL_LEAD_TIME_DAYS, INCIDENT_WINDOW_DAYS, MAX_INCIDENT_UPLIFT,
    MAX_STANDARDS_PER_PLAN, WORKDAY_MINUTES,
};
use crate::transform::{risk_matrix_priority, ControlType, RiskPriority, TaxonomyRef};
use crate::types::{
    ActionPlan, AnalysisResponse, Hazard, HealthStatus, Observation, ObservationPotential,
    ObservationType, ScoredHazard, Task,
};

/// Rule-based analyzer that needs no network.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    pub fn new() -> Self {
        Self
    }

    /// Run the full rule pipeline synchronously.
    pub fn analyze_now(&self, observation: &Observation) -> AnalysisResponse {
        let hazard = classify(observation);
        let scored = score(&hazard, observation);
        let plan = plan(&hazard, &scored);

        debug!(
            observation = %observation.id,
            taxonomy = %hazard.taxonomy_ref,
            severity = scored.severity,
            likelihood = scored.likelihood,
            tasks = plan.tasks.len(),
            "Offline analysis complete"
        );

        AnalysisResponse {
            hazards: vec![hazard],
            scored_hazards: vec![scored],
            action_plans: vec![plan],
            success: true,
            error: None,
        }
    }
}

#[async_trait]
impl AnalysisBackend for OfflineBackend {
    async fn analyze(&self, observation: &Observation) -> Result<AnalysisResponse, BackendError> {
        Ok(self.analyze_now(observation))
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            version: format!("offline-{}", env!("CARGO_PKG_VERSION")),
        })
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Description substrings to hazard label and headline, checked in order.
const CLASSIFIER: &[(&[&str], &str, &str)] = &[
    (&["arc flash", "arc-flash"], "arc_flash", "Arc flash exposure"),
    (&["explosion", "explosive", "gas leak"], "explosion", "Explosion risk"),
    (&["scaffold", "ladder", "roof", "height", "edge", "fall"], "fall_from_height", "Fall from height"),
    (&["dropped", "falling object", "overhead load"], "falling_object", "Falling object"),
    (&["wire", "wiring", "electrical", "cable", "panel"], "electrical", "Exposed electrical hazard"),
    (&["fume", "vapor", "vapour", "dust", "smoke"], "toxic_fumes", "Airborne contaminant exposure"),
    (&["chemical", "spill", "solvent", "acid"], "chemical_exposure", "Chemical exposure"),
    (&["forklift", "crane", "excavator", "vehicle", "struck"], "struck_by", "Struck by moving equipment"),
    (&["pinch", "caught", "rotating", "conveyor", "unguarded machine"], "caught_in", "Caught in or between machinery"),
    (&["lifting", "carry", "manual handling", "heavy"], "manual_handling", "Manual handling strain"),
    (&["repetitive"], "repetitive_motion", "Repetitive motion strain"),
    (&["welding", "hot work", "spark", "fire", "flammable"], "fire", "Fire or hot work hazard"),
    (&["slip", "trip", "wet floor", "uneven"], "slip_trip", "Slip or trip hazard"),
    (&["housekeeping", "debris", "clutter", "obstructed"], "housekeeping", "Poor housekeeping"),
];

fn classify(observation: &Observation) -> Hazard {
    let text = observation.description.to_lowercase();
    let matched = CLASSIFIER
        .iter()
        .find(|(needles, _, _)| needles.iter().any(|n| text.contains(n)));

    let (label, headline, confidence) = match matched {
        Some((_, label, headline)) => (*label, (*headline).to_string(), 0.85),
        None => ("general_safety", "General safety concern".to_string(), 0.5),
    };
    let taxonomy = TaxonomyRef::from_label(label);

    Hazard {
        hazard_id: format!("{}-h1", short_id(&observation.id)),
        hazard_type: label.to_string(),
        taxonomy_ref: taxonomy.code().to_string(),
        description: headline,
        area: Some(observation.site.clone()),
        confidence,
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

// ============================================================================
// Scoring
// ============================================================================

/// Worst realistic outcome per taxonomy entry, 1 - 5.
fn base_severity(taxonomy: TaxonomyRef) -> u8 {
    match taxonomy {
        TaxonomyRef::ArcFlash | TaxonomyRef::Explosion => 5,
        TaxonomyRef::FallFromHeight
        | TaxonomyRef::Electrical
        | TaxonomyRef::StruckBy
        | TaxonomyRef::CaughtIn
        | TaxonomyRef::Fire => 4,
        TaxonomyRef::ChemicalExposure | TaxonomyRef::ToxicFumes | TaxonomyRef::GeneralSafety => 3,
        TaxonomyRef::SlipTrip
        | TaxonomyRef::ManualHandling
        | TaxonomyRef::RepetitiveMotion
        | TaxonomyRef::Housekeeping => 2,
    }
}

fn likelihood(observation: &Observation) -> u8 {
    if observation.observation_type == ObservationType::PositiveObservation {
        return 1;
    }
    match observation.potential {
        ObservationPotential::NearMiss => 4,
        ObservationPotential::AtRiskBehavior | ObservationPotential::Hazard => 3,
        ObservationPotential::Other => 2,
        ObservationPotential::SafePractice => 1,
    }
}

/// Recorded incidents: site, taxonomy code, days before the observation.
const INCIDENTS: &[(&str, &str, i64)] = &[
    ("Building A - 3rd floor", "HAZ-FALL-001", 4),
    ("Building A - 3rd floor", "HAZ-FALL-001", 9),
    ("Building A - 2nd floor", "HAZ-ELEC-001", 2),
    ("Building B", "HAZ-CHEM-001", 24),
    ("Building A - 3rd floor", "HAZ-FALL-001", 41),
];

/// Incidents of the same taxonomy inside the window at a matching site.
/// Sites match when either name contains the other, ignoring case.
fn incident_count(site: &str, taxonomy_ref: &str) -> usize {
    let site = site.trim().to_lowercase();
    if site.is_empty() {
        return 0;
    }
    INCIDENTS
        .iter()
        .filter(|(recorded, code, days_ago)| {
            let recorded = recorded.to_lowercase();
            *code == taxonomy_ref
                && *days_ago <= INCIDENT_WINDOW_DAYS
                && (recorded.contains(&site) || site.contains(&recorded))
        })
        .count()
}

/// Raise likelihood by one per incident, capped, and say why.
fn adjust_likelihood(likelihood: u8, incidents: usize) -> (u8, Option<String>) {
    let uplift = u8::try_from(incidents).unwrap_or(u8::MAX).min(MAX_INCIDENT_UPLIFT);
    let adjusted = likelihood.saturating_add(uplift).min(5);
    if adjusted == likelihood {
        return (likelihood, None);
    }
    let reason = format!(
        "Increased from {likelihood} to {adjusted} due to {incidents} similar incidents in past {INCIDENT_WINDOW_DAYS} days"
    );
    (adjusted, Some(reason))
}

/// Days allowed to close out a hazard of each priority.
fn sla_days(priority: RiskPriority) -> i64 {
    match priority {
        RiskPriority::Critical => 0,
        RiskPriority::High => 1,
        RiskPriority::Medium => 7,
        RiskPriority::Low => 30,
    }
}

/// Reporting always earns +1; serious findings cost culture points and a
/// clear, high-confidence report earns a little back.
fn culture_delta(priority: RiskPriority, confidence: f64) -> f64 {
    let mut delta = 1.0;
    match priority {
        RiskPriority::Critical => delta -= 3.0,
        RiskPriority::High => delta -= 1.5,
        RiskPriority::Medium | RiskPriority::Low => {}
    }
    if confidence > 0.8 {
        delta += 0.5;
    }
    delta
}

fn score(hazard: &Hazard, observation: &Observation) -> ScoredHazard {
    let taxonomy = TaxonomyRef::from_code(&hazard.taxonomy_ref);
    let severity = base_severity(taxonomy);
    let site = hazard.area.as_deref().unwrap_or(&observation.site);
    let incidents = incident_count(site, &hazard.taxonomy_ref);
    let (likelihood, adjustment_reason) = adjust_likelihood(likelihood(observation), incidents);
    let priority = risk_matrix_priority(severity, likelihood);
    let reported = observation.observed_at.unwrap_or_else(Utc::now);

    ScoredHazard {
        hazard_id: hazard.hazard_id.clone(),
        severity,
        likelihood,
        rpn: Some(u32::from(severity) * u32::from(likelihood)),
        priority: Some(priority.code().to_string()),
        due_by: Some(reported + ChronoDuration::days(sla_days(priority))),
        culture_score_delta: Some(culture_delta(priority, hazard.confidence)),
        likelihood_adjustment_reason: adjustment_reason,
    }
}

// ============================================================================
// Planning
// ============================================================================

fn labor_rate(role: &str) -> f64 {
    match role {
        "safety_engineer" => 75.0,
        "safety_officer" => 55.0,
        "supervisor" | "site_supervisor" => 45.0,
        "scaffolder" => 50.0,
        "electrician" => 65.0,
        "contractor" => 85.0,
        "general_worker" => 35.0,
        _ => DEFAULT_LABOR_RATE_USD_PER_HOUR,
    }
}

/// Unit cost (USD) and procurement lead time (days) for a material.
fn material(name: &str) -> (f64, u32) {
    match name {
        "safety_barriers" => (150.0, 2),
        "warning_signs" => (25.0, 1),
        "toe_boards" => (80.0, 2),
        "fixings" => (15.0, 1),
        "training_materials" => (50.0, 1),
        "ppe_checklist" => (5.0, 0),
        "hard_hat" => (30.0, 1),
        "safety_glasses" => (15.0, 1),
        "safety_harness" => (200.0, 3),
        "fire_extinguisher" => (75.0, 2),
        "first_aid_kit" => (45.0, 1),
        "lockout_tagout_kit" => (120.0, 3),
        "respirator" => (85.0, 2),
        "chemical_gloves" => (20.0, 1),
        "spill_kit" => (150.0, 2),
        _ => (DEFAULT_MATERIAL_COST_USD, DEFAULT_MATERIAL_LEAD_TIME_DAYS),
    }
}

/// Cost (USD, rounded to cents) and lead time (days) for one task.
///
/// Lead time is material procurement, at least one day, plus any extra
/// full workdays the task itself needs.
pub(crate) fn estimate(task: &Task) -> (f64, u32) {
    let labor = f64::from(task.duration_minutes) / 60.0 * labor_rate(&task.responsible_role);
    let (material_cost, procurement) = task
        .material_requirements
        .iter()
        .map(|m| material(m))
        .fold((0.0, 0), |(cost, days), (c, d)| (cost + c, days.max(d)));

    let task_days = (task.duration_minutes / WORKDAY_MINUTES).max(1);
    let lead_time = BASE_LEAD_TIME_DAYS.max(procurement) + task_days - 1;
    (((labor + material_cost) * 100.0).round() / 100.0, lead_time)
}

fn standards_for(taxonomy: TaxonomyRef) -> &'static [&'static str] {
    match taxonomy {
        TaxonomyRef::FallFromHeight => &[
            "OSHA 1926.451 - Scaffolding",
            "OSHA 1926.502 - Fall protection systems",
            "OSHA 1926.503 - Fall protection training",
            "ISO 45001:2018 6.1.2 - Hazard identification",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
        ],
        TaxonomyRef::SlipTrip => &[
            "OSHA 1926.25 - Housekeeping",
            "OSHA 1910.22 - Walking-working surfaces",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
        ],
        TaxonomyRef::Electrical => &[
            "OSHA 1926.405 - Wiring methods",
            "OSHA 1926.416 - General electrical safety",
            "OSHA 1926.417 - Lockout/tagout",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
            "ISO 45001:2018 8.2 - Emergency preparedness",
        ],
        TaxonomyRef::ArcFlash => &[
            "OSHA 1910.269 - Electric power generation",
            "NFPA 70E - Electrical Safety in the Workplace",
            "ISO 45001:2018 8.2 - Emergency preparedness",
        ],
        TaxonomyRef::ChemicalExposure => &[
            "OSHA 1926.55 - Gases, vapors, fumes",
            "OSHA 1910.1200 - Hazard Communication",
            "OSHA 1926.59 - Hazard Communication (construction)",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
            "ISO 45001:2018 7.4 - Communication",
        ],
        TaxonomyRef::ToxicFumes => &[
            "OSHA 1910.134 - Respiratory Protection",
            "OSHA 1926.103 - Respiratory protection (construction)",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
        ],
        TaxonomyRef::StruckBy => &[
            "OSHA 1926.600 - Equipment (general)",
            "OSHA 1926.602 - Material handling equipment",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
        ],
        TaxonomyRef::CaughtIn => &[
            "OSHA 1910.212 - Machine guarding",
            "OSHA 1910.147 - Control of hazardous energy",
            "ISO 45001:2018 8.1.2 - Eliminating hazards",
        ],
        TaxonomyRef::ManualHandling | TaxonomyRef::RepetitiveMotion => &[
            "OSHA General Duty Clause 5(a)(1)",
            "NIOSH Lifting Equation",
            "ISO 45001:2018 6.1.2 - Hazard identification",
            "ISO 11228 - Ergonomics - Manual handling",
        ],
        TaxonomyRef::Fire | TaxonomyRef::Explosion => &[
            "OSHA 1926.352 - Fire prevention",
            "OSHA 1910.39 - Fire prevention plans",
            "ISO 45001:2018 8.2 - Emergency preparedness",
        ],
        TaxonomyRef::Housekeeping => &[
            "OSHA 1926.25 - Housekeeping",
            "ISO 45001:2018 8.1 - Operational planning and control",
        ],
        TaxonomyRef::GeneralSafety => &[
            "OSHA General Duty Clause 5(a)(1)",
            "OSHA 1926.20 - General safety and health provisions",
            "ISO 45001:2018 6.1 - Actions to address risks",
            "ISO 45001:2018 8.1 - Operational planning and control",
        ],
    }
}

fn task(
    title: &str,
    description: &str,
    control: ControlType,
    role: &str,
    duration_minutes: u32,
    materials: &[&str],
    acceptance: &str,
) -> Task {
    Task {
        title: title.to_string(),
        description: description.to_string(),
        control_type: control.code().to_string(),
        responsible_role: role.to_string(),
        duration_minutes,
        material_requirements: materials.iter().map(|m| (*m).to_string()).collect(),
        acceptance_criteria: Some(acceptance.to_string()),
    }
}

/// Tasks in hierarchy-of-controls order. Every plan gets an assessment;
/// severity 3+ adds physical controls; CRITICAL adds an immediate stop.
fn tasks_for(taxonomy: TaxonomyRef, scored: &ScoredHazard) -> Vec<Task> {
    let priority = RiskPriority::from_code(scored.priority.as_deref());
    let mut tasks = Vec::new();

    if priority == RiskPriority::Critical {
        tasks.push(task(
            "Stop work and isolate the area",
            "Halt the affected activity and barricade the area until controls are in place.",
            ControlType::Elimination,
            "supervisor",
            30,
            &["safety_barriers", "warning_signs"],
            "Area isolated and work stopped",
        ));
    }

    if scored.severity >= 3 {
        let (title, description, role, materials): (&str, &str, &str, &[&str]) = match taxonomy {
            TaxonomyRef::FallFromHeight => (
                "Install guardrails and toe boards",
                "Fit guardrails and toe boards to every open edge of the working platform.",
                "scaffolder",
                &["toe_boards", "fixings", "safety_barriers"],
            ),
            TaxonomyRef::Electrical | TaxonomyRef::ArcFlash => (
                "De-energize and lock out the circuit",
                "Isolate the circuit, apply lockout/tagout, and make exposed conductors safe.",
                "electrician",
                &["lockout_tagout_kit", "warning_signs"],
            ),
            TaxonomyRef::ChemicalExposure | TaxonomyRef::ToxicFumes => (
                "Contain the release and ventilate",
                "Contain the spill or source and provide local exhaust ventilation.",
                "safety_engineer",
                &["spill_kit", "respirator"],
            ),
            TaxonomyRef::Fire | TaxonomyRef::Explosion => (
                "Establish hot work controls",
                "Remove combustibles, post a fire watch, and stage extinguishers.",
                "safety_officer",
                &["fire_extinguisher", "warning_signs"],
            ),
            _ => (
                "Implement physical controls",
                "Install appropriate barriers or safety devices to control the hazard.",
                "safety_engineer",
                &["safety_barriers", "warning_signs"],
            ),
        };
        tasks.push(task(
            title,
            description,
            ControlType::Engineering,
            role,
            120,
            materials,
            "Physical controls installed and tested",
        ));
    }

    tasks.push(task(
        "Conduct safety assessment",
        "Perform detailed safety assessment of the hazard area and document findings.",
        ControlType::Administrative,
        "safety_officer",
        60,
        &["training_materials"],
        "Assessment report completed and reviewed",
    ));

    tasks
}

fn plan(hazard: &Hazard, scored: &ScoredHazard) -> ActionPlan {
    let taxonomy = TaxonomyRef::from_code(&hazard.taxonomy_ref);
    let tasks = tasks_for(taxonomy, scored);

    let (cost, lead_time) = tasks
        .iter()
        .map(estimate)
        .fold((0.0, 0), |(cost, days), (c, d)| (cost + c, days.max(d)));

    ActionPlan {
        plan_id: format!("{}-p1", hazard.hazard_id),
        hazard_id: hazard.hazard_id.clone(),
        standards_refs: standards_for(taxonomy)
            .iter()
            .take(MAX_STANDARDS_PER_PLAN)
            .map(|s| (*s).to_string())
            .collect(),
        cost_estimate_usd: Some((cost * 100.0_f64).round() / 100.0),
        lead_time_days: Some(lead_time),
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform;

    fn scaffold() -> Observation {
        Observation::new(
            "Building A - 3rd Floor",
            ObservationPotential::Hazard,
            ObservationType::UnsafeCondition,
            "worker on unguarded scaffold",
        )
    }

    #[test]
    fn test_scaffold_classified_as_fall() {
        let response = OfflineBackend::new().analyze_now(&scaffold());

        let hazard = &response.hazards[0];
        assert_eq!(hazard.taxonomy_ref, "HAZ-FALL-001");
        assert_eq!(hazard.area.as_deref(), Some("Building A - 3rd Floor"));

        let risk = transform::risk_view(Some(hazard), &scaffold());
        assert_eq!(risk.category, "Fall Protection / Scaffolding");
        assert_eq!(risk.confidence, 85);
    }

    #[test]
    fn test_scoring_uses_risk_matrix() {
        let obs = Observation { site: "Building C - Roof".to_string(), ..scaffold() };
        let response = OfflineBackend::new().analyze_now(&obs);
        let scored = &response.scored_hazards[0];

        assert_eq!((scored.severity, scored.likelihood), (4, 3));
        assert_eq!(scored.rpn, Some(12));
        assert_eq!(scored.priority.as_deref(), Some("HIGH"));
        assert_eq!(scored.culture_score_delta, Some(0.0));
        assert_eq!(scored.likelihood_adjustment_reason, None);
    }

    #[test]
    fn test_recent_incidents_raise_likelihood() {
        let response = OfflineBackend::new().analyze_now(&scaffold());
        let scored = &response.scored_hazards[0];

        // Two fall incidents on the 3rd floor inside the window; the third is older
        assert_eq!((scored.severity, scored.likelihood), (4, 5));
        assert_eq!(scored.rpn, Some(20));
        assert_eq!(scored.priority.as_deref(), Some("CRITICAL"));
        assert_eq!(
            scored.likelihood_adjustment_reason.as_deref(),
            Some("Increased from 3 to 5 due to 2 similar incidents in past 30 days")
        );
    }

    #[test]
    fn test_incident_matching() {
        assert_eq!(incident_count("building a", "HAZ-FALL-001"), 2);
        assert_eq!(incident_count("BUILDING A - 2ND FLOOR", "HAZ-ELEC-001"), 1);
        assert_eq!(incident_count("Building A - 3rd Floor", "HAZ-ELEC-001"), 0);
        assert_eq!(incident_count("", "HAZ-FALL-001"), 0);
    }

    #[test]
    fn test_likelihood_adjustment_is_capped() {
        assert_eq!(adjust_likelihood(3, 0), (3, None));
        assert_eq!(adjust_likelihood(2, 7).0, 4);
        assert_eq!(adjust_likelihood(4, 2).0, 5);
        assert_eq!(adjust_likelihood(5, 1), (5, None));
        assert!(adjust_likelihood(1, 1).1.is_some_and(|r| r.contains("from 1 to 2")));
    }

    #[test]
    fn test_critical_plan_starts_with_elimination() {
        let obs = Observation::new(
            "Substation",
            ObservationPotential::NearMiss,
            ObservationType::UnsafeAct,
            "arc flash while racking breaker",
        );
        let response = OfflineBackend::new().analyze_now(&obs);
        assert_eq!(response.scored_hazards[0].priority.as_deref(), Some("CRITICAL"));

        let tasks = &response.action_plans[0].tasks;
        assert_eq!(tasks[0].control_type, "ELIMINATION");
        assert_eq!(tasks.last().map(|t| t.control_type.as_str()), Some("ADMINISTRATIVE"));
    }

    #[test]
    fn test_unmatched_description_is_general_safety() {
        let obs = Observation::new(
            "Yard",
            ObservationPotential::Other,
            ObservationType::AreaForImprovement,
            "signage could be clearer",
        );
        let response = OfflineBackend::new().analyze_now(&obs);

        assert_eq!(response.hazards[0].taxonomy_ref, "HAZ-GEN-001");
        assert!((response.hazards[0].confidence - 0.5).abs() < f64::EPSILON);
        assert!(response.action_plans[0].standards_refs.len() <= MAX_STANDARDS_PER_PLAN);
    }

    #[test]
    fn test_estimate_matches_rate_tables() {
        let t = task(
            "Implement physical controls",
            "",
            ControlType::Engineering,
            "safety_engineer",
            120,
            &["safety_barriers", "warning_signs"],
            "",
        );
        // 2h × $75 + $150 + $25; barriers take two days to arrive
        assert_eq!(estimate(&t), (325.0, 2));

        let long = Task { duration_minutes: 3 * WORKDAY_MINUTES, material_requirements: vec![], ..t };
        assert_eq!(estimate(&long).1, 3);
    }

    #[test]
    fn test_plan_totals() {
        let response = OfflineBackend::new().analyze_now(&scaffold());
        let plan = &response.action_plans[0];

        let expected: f64 = plan.tasks.iter().map(|t| estimate(t).0).sum();
        assert!((plan.cost_estimate_usd.unwrap_or_default() - expected).abs() < 0.01);
        assert_eq!(plan.lead_time_days, plan.tasks.iter().map(|t| estimate(t).1).max());
    }

    #[tokio::test]
    async fn test_health_is_always_up() {
        let health = OfflineBackend::new().health().await.unwrap();
        assert_eq!(health.status, "healthy");
    }
}
