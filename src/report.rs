//! Terminal narrative
//!
//! Plain-text rendering of each stage for the CLI. Every function returns a
//! `String` so the binary decides where it goes and tests can inspect it.

use std::fmt::Write as _;

use crate::animator::Phase;
use crate::pipeline::{Stage, WorkflowState};
use crate::types::{ActionView, Observation, RiskView, ScoreView, StageResult, SummaryView};

const RULE: &str = "──────────────────────────────────────────────────────────────";

/// Stage heading with a review marker when re-entered from SUMMARY.
pub fn heading(stage: Stage, review: bool) -> String {
    let marker = if review { "  (review)" } else { "" };
    format!("\n{RULE}\n  {}{marker}\n{RULE}", stage.title())
}

/// Observation echo printed before submission.
pub fn observation(obs: &Observation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Site:        {}", obs.site);
    let _ = writeln!(out, "  Potential:   {}", obs.potential);
    let _ = writeln!(out, "  Type:        {}", obs.observation_type);
    let _ = writeln!(out, "  Description: {}", obs.description);
    if let Some(at) = obs.observed_at {
        let _ = writeln!(out, "  Observed:    {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    for (label, value) in [
        ("Trade cat.", &obs.trade_category_id),
        ("Partner", &obs.trade_partner_id),
        ("Photo", &obs.photo_id),
    ] {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label:<12} {value}");
        }
    }
    out
}

/// One progress line for a scripted phase.
pub fn phase(phase: &Phase) -> String {
    if phase.is_complete() {
        format!("  ✔ {}", phase.narration)
    } else {
        format!("  … {}", phase.narration)
    }
}

pub fn risk(view: &RiskView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Hazard:      {}", view.hazard);
    let _ = writeln!(out, "  Category:    {}", view.category);
    let _ = writeln!(out, "  Confidence:  {}%", view.confidence);
    if let Some(area) = &view.area {
        let _ = writeln!(out, "  Area:        {area}");
    }
    let _ = writeln!(out, "  Keywords:    {}", view.keywords.join(", "));
    out
}

pub fn score(view: &ScoreView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  Severity {} × Likelihood {} = Risk score {}",
        view.severity, view.likelihood, view.risk_score
    );
    let _ = writeln!(out, "  Priority:    {} ({})", view.category, view.color);
    if let Some(due) = view.due_by {
        let _ = writeln!(out, "  Due by:      {}", due.format("%Y-%m-%d"));
    }
    if let Some(delta) = view.culture_score_delta {
        let _ = writeln!(out, "  Culture:     {delta:+.1}");
    }
    if let Some(reason) = &view.adjustment_reason {
        let _ = writeln!(out, "  Adjusted:    {reason}");
    }
    out
}

pub fn actions(view: &ActionView) -> String {
    let mut out = String::new();
    for (i, task) in view.tasks.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. [{}] {}  ({}, {})",
            i + 1,
            task.urgency,
            task.title,
            task.control_label,
            task.icon
        );
        if !task.description.is_empty() {
            let _ = writeln!(out, "     {}", task.description);
        }
        let _ = writeln!(
            out,
            "     Owner: {} · {} min",
            task.responsible, task.duration_minutes
        );
        if !task.materials.is_empty() {
            let _ = writeln!(out, "     Materials: {}", task.materials.join(", "));
        }
        if let Some(criteria) = &task.acceptance_criteria {
            let _ = writeln!(out, "     Done when: {criteria}");
        }
    }
    if let Some(cost) = view.total_cost_usd {
        let _ = writeln!(out, "  Estimated cost: ${cost:.2}");
    }
    if let Some(days) = view.lead_time_days {
        let _ = writeln!(out, "  Lead time:      {days} day(s)");
    }
    out
}

pub fn stage_result(result: &StageResult) -> String {
    match result {
        StageResult::Risk(view) => risk(view),
        StageResult::Score(view) => score(view),
        StageResult::Action(view) => actions(view),
    }
}

pub fn summary(view: &SummaryView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Site:              {}", view.site);
    let _ = writeln!(out, "  Hazards found:     {}", view.hazards_identified);
    let _ = writeln!(
        out,
        "  Headline hazard:   {} ({})",
        view.headline_hazard, view.hazard_category
    );
    let _ = writeln!(
        out,
        "  Risk:              {} ({})",
        view.risk_score, view.risk_category
    );
    let _ = writeln!(
        out,
        "  Tasks:             {} ({} immediate)",
        view.task_count, view.immediate_actions
    );
    if let Some(cost) = view.total_cost_usd {
        let _ = writeln!(out, "  Estimated cost:    ${cost:.2}");
    }
    if let Some(days) = view.lead_time_days {
        let _ = writeln!(out, "  Lead time:         {days} day(s)");
    }
    if !view.standards.is_empty() {
        let _ = writeln!(out, "  Standards:");
        for reference in &view.standards {
            let _ = writeln!(out, "    - {reference}");
        }
    }
    out
}

/// Prompt describing what the user can do from the current state.
pub fn prompt(state: &WorkflowState) -> &'static str {
    match state.stage {
        Stage::Summary => "[risk|score|action] review · [new] start over · [quit]",
        _ if state.review_mode && state.stage == Stage::Action => {
            "[Enter] summary · [back] summary · [quit]"
        }
        _ if state.review_mode => "[Enter] next stage · [back] summary · [quit]",
        stage if stage.is_analysis() && state.is_ready() => "[Enter] continue · [quit]",
        stage if stage.is_analysis() => "[s] skip · [quit]",
        _ => "[quit]",
    }
}

/// Failure shown on the FORM stage.
pub fn submit_error(message: &str) -> String {
    format!("  ✖ {message}")
}
