//! Hazard taxonomy codes and their display categories.

use serde::{Deserialize, Serialize};

/// Controlled hazard taxonomy.
///
/// Any code outside the table resolves to [`TaxonomyRef::GeneralSafety`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TaxonomyRef {
    /// HAZ-FALL-001
    FallFromHeight,
    /// HAZ-FALL-002
    SlipTrip,
    /// HAZ-ELEC-001
    Electrical,
    /// HAZ-ELEC-002
    ArcFlash,
    /// HAZ-CHEM-001
    ChemicalExposure,
    /// HAZ-CHEM-002
    ToxicFumes,
    /// HAZ-MECH-001
    StruckBy,
    /// HAZ-MECH-002
    CaughtIn,
    /// HAZ-ERGO-001
    ManualHandling,
    /// HAZ-ERGO-002
    RepetitiveMotion,
    /// HAZ-FIRE-001
    Fire,
    /// HAZ-FIRE-002
    Explosion,
    /// HAZ-GEN-001
    #[default]
    GeneralSafety,
    /// HAZ-GEN-002
    Housekeeping,
}

impl TaxonomyRef {
    /// Resolve a backend taxonomy code. Matching ignores case and
    /// surrounding whitespace.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "HAZ-FALL-001" => TaxonomyRef::FallFromHeight,
            "HAZ-FALL-002" => TaxonomyRef::SlipTrip,
            "HAZ-ELEC-001" => TaxonomyRef::Electrical,
            "HAZ-ELEC-002" => TaxonomyRef::ArcFlash,
            "HAZ-CHEM-001" => TaxonomyRef::ChemicalExposure,
            "HAZ-CHEM-002" => TaxonomyRef::ToxicFumes,
            "HAZ-MECH-001" => TaxonomyRef::StruckBy,
            "HAZ-MECH-002" => TaxonomyRef::CaughtIn,
            "HAZ-ERGO-001" => TaxonomyRef::ManualHandling,
            "HAZ-ERGO-002" => TaxonomyRef::RepetitiveMotion,
            "HAZ-FIRE-001" => TaxonomyRef::Fire,
            "HAZ-FIRE-002" => TaxonomyRef::Explosion,
            "HAZ-GEN-002" => TaxonomyRef::Housekeeping,
            _ => TaxonomyRef::GeneralSafety,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TaxonomyRef::FallFromHeight => "HAZ-FALL-001",
            TaxonomyRef::SlipTrip => "HAZ-FALL-002",
            TaxonomyRef::Electrical => "HAZ-ELEC-001",
            TaxonomyRef::ArcFlash => "HAZ-ELEC-002",
            TaxonomyRef::ChemicalExposure => "HAZ-CHEM-001",
            TaxonomyRef::ToxicFumes => "HAZ-CHEM-002",
            TaxonomyRef::StruckBy => "HAZ-MECH-001",
            TaxonomyRef::CaughtIn => "HAZ-MECH-002",
            TaxonomyRef::ManualHandling => "HAZ-ERGO-001",
            TaxonomyRef::RepetitiveMotion => "HAZ-ERGO-002",
            TaxonomyRef::Fire => "HAZ-FIRE-001",
            TaxonomyRef::Explosion => "HAZ-FIRE-002",
            TaxonomyRef::GeneralSafety => "HAZ-GEN-001",
            TaxonomyRef::Housekeeping => "HAZ-GEN-002",
        }
    }

    /// Display category shown on the RISK stage.
    pub fn category(&self) -> &'static str {
        match self {
            TaxonomyRef::FallFromHeight => "Fall Protection / Scaffolding",
            TaxonomyRef::SlipTrip => "Slips, Trips & Falls",
            TaxonomyRef::Electrical => "Electrical Safety",
            TaxonomyRef::ArcFlash => "Arc Flash",
            TaxonomyRef::ChemicalExposure => "Chemical Exposure",
            TaxonomyRef::ToxicFumes => "Air Quality / Toxic Fumes",
            TaxonomyRef::StruckBy => "Struck-By / Moving Equipment",
            TaxonomyRef::CaughtIn => "Caught-In / Between",
            TaxonomyRef::ManualHandling => "Ergonomics / Manual Handling",
            TaxonomyRef::RepetitiveMotion => "Ergonomics / Repetitive Motion",
            TaxonomyRef::Fire => "Fire / Hot Work",
            TaxonomyRef::Explosion => "Fire / Explosion",
            TaxonomyRef::GeneralSafety => "General Safety",
            TaxonomyRef::Housekeeping => "Housekeeping",
        }
    }

    /// Map a free-form hazard label (`"fall from height"`, `"arc_flash"`) to
    /// its taxonomy entry.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "falling_object" | "fall_from_height" | "fall" | "dropped_object" => {
                TaxonomyRef::FallFromHeight
            }
            "slip" | "trip" | "slip_trip" => TaxonomyRef::SlipTrip,
            "electrical" | "electric_shock" | "exposed_wiring" => TaxonomyRef::Electrical,
            "arc_flash" => TaxonomyRef::ArcFlash,
            "chemical_exposure" | "chemical" | "spill" => TaxonomyRef::ChemicalExposure,
            "toxic_fumes" | "fumes" => TaxonomyRef::ToxicFumes,
            "struck_by" | "machinery" | "moving_equipment" => TaxonomyRef::StruckBy,
            "caught_in" => TaxonomyRef::CaughtIn,
            "ergonomic" | "manual_handling" => TaxonomyRef::ManualHandling,
            "repetitive_motion" => TaxonomyRef::RepetitiveMotion,
            "fire" | "hot_work" => TaxonomyRef::Fire,
            "explosion" => TaxonomyRef::Explosion,
            "housekeeping" => TaxonomyRef::Housekeeping,
            _ => TaxonomyRef::GeneralSafety,
        }
    }
}

impl std::fmt::Display for TaxonomyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaxonomyRef; 14] = [
        TaxonomyRef::FallFromHeight,
        TaxonomyRef::SlipTrip,
        TaxonomyRef::Electrical,
        TaxonomyRef::ArcFlash,
        TaxonomyRef::ChemicalExposure,
        TaxonomyRef::ToxicFumes,
        TaxonomyRef::StruckBy,
        TaxonomyRef::CaughtIn,
        TaxonomyRef::ManualHandling,
        TaxonomyRef::RepetitiveMotion,
        TaxonomyRef::Fire,
        TaxonomyRef::Explosion,
        TaxonomyRef::GeneralSafety,
        TaxonomyRef::Housekeeping,
    ];

    #[test]
    fn test_code_round_trips_through_lookup() {
        for t in ALL {
            assert_eq!(TaxonomyRef::from_code(t.code()), t);
        }
    }

    #[test]
    fn test_scaffold_code_maps_to_fall_protection() {
        assert_eq!(
            TaxonomyRef::from_code("HAZ-FALL-001").category(),
            "Fall Protection / Scaffolding"
        );
        assert_eq!(TaxonomyRef::from_code(" haz-fall-001 ").category(), "Fall Protection / Scaffolding");
    }

    #[test]
    fn test_unknown_codes_fall_into_general_safety() {
        for code in ["", "HAZ-NOISE-009", "not a code", "HAZ-FALL-1"] {
            let t = TaxonomyRef::from_code(code);
            assert_eq!(t, TaxonomyRef::GeneralSafety);
            assert_eq!(t.category(), "General Safety");
        }
    }

    #[test]
    fn test_label_lookup_normalizes_spacing() {
        assert_eq!(TaxonomyRef::from_label("Fall From Height"), TaxonomyRef::FallFromHeight);
        assert_eq!(TaxonomyRef::from_label("arc-flash"), TaxonomyRef::ArcFlash);
        assert_eq!(TaxonomyRef::from_label("radiation"), TaxonomyRef::GeneralSafety);
    }
}
