//! Hierarchy-of-controls lookups for corrective tasks.

use serde::{Deserialize, Serialize};

/// Hazard-control strategy, most to least effective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlType {
    Elimination,
    Substitution,
    Engineering,
    Administrative,
    Ppe,
}

impl ControlType {
    /// Parse a backend control code. Unrecognized codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ELIMINATION" => Some(ControlType::Elimination),
            "SUBSTITUTION" => Some(ControlType::Substitution),
            "ENGINEERING" => Some(ControlType::Engineering),
            "ADMINISTRATIVE" => Some(ControlType::Administrative),
            "PPE" => Some(ControlType::Ppe),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ControlType::Elimination => "ELIMINATION",
            ControlType::Substitution => "SUBSTITUTION",
            ControlType::Engineering => "ENGINEERING",
            ControlType::Administrative => "ADMINISTRATIVE",
            ControlType::Ppe => "PPE",
        }
    }
}

impl std::fmt::Display for ControlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", control_label(Some(*self)))
    }
}

/// When a task has to be carried out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionUrgency {
    Immediate,
    BeforeNextShift,
    Daily,
}

impl std::fmt::Display for ActionUrgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionUrgency::Immediate => write!(f, "Immediate"),
            ActionUrgency::BeforeNextShift => write!(f, "Before Next Shift"),
            ActionUrgency::Daily => write!(f, "Daily"),
        }
    }
}

pub fn urgency(control: Option<ControlType>) -> ActionUrgency {
    match control {
        Some(ControlType::Elimination | ControlType::Substitution) => ActionUrgency::Immediate,
        Some(ControlType::Engineering | ControlType::Ppe) => ActionUrgency::BeforeNextShift,
        Some(ControlType::Administrative) | None => ActionUrgency::Daily,
    }
}

pub fn control_label(control: Option<ControlType>) -> &'static str {
    match control {
        Some(ControlType::Elimination) => "Elimination",
        Some(ControlType::Substitution) => "Substitution",
        Some(ControlType::Engineering) => "Engineering Control",
        Some(ControlType::Ppe) => "Personal Protective Equipment",
        Some(ControlType::Administrative) | None => "Administrative Control",
    }
}

/// Icon name used by renderers.
pub fn control_icon(control: Option<ControlType>) -> &'static str {
    match control {
        Some(ControlType::Elimination) => "ban",
        Some(ControlType::Substitution) => "swap",
        Some(ControlType::Engineering) => "wrench",
        Some(ControlType::Ppe) => "hard-hat",
        Some(ControlType::Administrative) | None => "clipboard",
    }
}

/// Role that owns a control type when the task names no one.
pub fn control_owner(control: Option<ControlType>) -> &'static str {
    match control {
        Some(ControlType::Elimination | ControlType::Substitution) => "Project Manager",
        Some(ControlType::Engineering) => "Safety Engineer",
        Some(ControlType::Ppe) => "Safety Officer",
        Some(ControlType::Administrative) | None => "Site Supervisor",
    }
}

/// Display label for a responsible-role code.
///
/// Known codes get their canonical label; anything else is title-cased
/// (`site_lead` -> "Site Lead"). A blank code falls back to the control's
/// owner.
pub fn role_label(role: &str, control: Option<ControlType>) -> String {
    let code = role.trim().to_ascii_lowercase();
    let known = match code.as_str() {
        "" => return control_owner(control).to_string(),
        "safety_engineer" => "Safety Engineer",
        "safety_officer" => "Safety Officer",
        "supervisor" => "Site Supervisor",
        "scaffolder" => "Scaffolder",
        "electrician" => "Electrician",
        "general_worker" => "General Worker",
        "contractor" => "Contractor",
        _ => return title_case(&code),
    };
    known.to_string()
}

fn title_case(code: &str) -> String {
    code.split(['_', ' ', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
