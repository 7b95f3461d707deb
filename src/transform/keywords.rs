//! Safety keyword extraction for the RISK stage.

/// Fixed vocabulary: `(stem searched for, keyword shown)`.
///
/// Order matters: matches are reported in vocabulary order.
const VOCABULARY: &[(&str, &str)] = &[
    ("scaffold", "scaffolding"),
    ("guard", "guardrail"),
    ("edge", "edge protection"),
    ("harness", "harness"),
    ("fall", "fall hazard"),
    ("height", "working at height"),
    ("ladder", "ladder"),
    ("toe board", "toe boards"),
    ("electric", "electrical"),
    ("wiring", "exposed wiring"),
    ("lockout", "lockout/tagout"),
    ("chemical", "chemical"),
    ("spill", "spill"),
    ("fume", "fumes"),
    ("fire", "fire"),
    ("hot work", "hot work"),
    ("forklift", "forklift"),
    ("crane", "crane"),
    ("machine", "machinery"),
    ("struck", "struck-by"),
    ("trench", "excavation"),
    ("excavat", "excavation"),
    ("slip", "slip"),
    ("trip", "trip"),
    ("housekeeping", "housekeeping"),
    ("lift", "manual handling"),
    ("ppe", "PPE"),
    ("helmet", "hard hat"),
    ("hard hat", "hard hat"),
    ("glove", "gloves"),
];

/// Returned when nothing in the vocabulary matches.
pub const FALLBACK_KEYWORDS: [&str; 3] = ["safety", "hazard", "inspection"];

const MIN_KEYWORDS: usize = 3;
const MAX_KEYWORDS: usize = 5;

/// Extract between three and five safety keywords from `texts`.
///
/// Matching is a case-insensitive substring search for each vocabulary stem
/// across all texts. Duplicate keywords are reported once. With no match the
/// fallback set is returned; one or two matches are topped up from it.
pub fn extract_keywords(texts: &[&str]) -> Vec<String> {
    let haystack = texts
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut keywords: Vec<String> = Vec::with_capacity(MAX_KEYWORDS);
    for (stem, keyword) in VOCABULARY {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if haystack.contains(stem) && !keywords.iter().any(|k| k == keyword) {
            keywords.push((*keyword).to_string());
        }
    }

    for filler in FALLBACK_KEYWORDS {
        if keywords.len() >= MIN_KEYWORDS {
            break;
        }
        if !keywords.iter().any(|k| k == filler) {
            keywords.push(filler.to_string());
        }
    }

    keywords
}
