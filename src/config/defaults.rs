//! System-wide default constants.
//!
//! Grouped by subsystem. Every value here is also the serde default of the
//! matching `walkthrough.toml` key.

// ============================================================================
// Analysis Backend
// ============================================================================

/// Base URL of the analysis service.
pub const BACKEND_BASE_URL: &str = "http://localhost:8000";

/// Whole-request timeout for the analysis call (seconds).
///
/// The remote pipeline runs several model calls in sequence, so this is long.
pub const BACKEND_TIMEOUT_SECS: u64 = 120;

/// Automatic retries of a failed analysis call (transport failures only).
pub const BACKEND_MAX_RETRIES: u32 = 0;

/// Upper bound accepted for `max_retries`.
pub const BACKEND_MAX_RETRIES_LIMIT: u32 = 5;

/// Linear backoff step between retries (ms). Attempt `n` waits `n × step`.
pub const BACKEND_RETRY_BACKOFF_MS: u64 = 500;

/// Path of the analysis endpoint, relative to the base URL.
pub const ANALYZE_PATH: &str = "/api/observations/analyze";

/// Path of the liveness endpoint, relative to the base URL.
pub const HEALTH_PATH: &str = "/api/health";

/// Message shown when a failed analysis call carries no `detail`.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to analyze observation. Please try again.";

// ============================================================================
// Stage Animation
// ============================================================================

/// Time each scripted phase stays on screen before the next one (ms).
pub const PHASE_INTERVAL_MS: u64 = 1_200;

/// Pause after the `complete` phase before the result is reported (ms).
pub const SETTLE_DELAY_MS: u64 = 600;

// ============================================================================
// Orchestrator
// ============================================================================

/// Capacity of the animator event channel.
///
/// One reveal emits at most five events; a handful of activations fit.
pub const ANIMATOR_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// Offline Analyzer
// ============================================================================

/// Labour rate for roles missing from the rate table (USD per hour).
pub const DEFAULT_LABOR_RATE_USD_PER_HOUR: f64 = 35.0;

/// Cost of a material missing from the price table (USD).
pub const DEFAULT_MATERIAL_COST_USD: f64 = 50.0;

/// Procurement time for a material missing from the lead-time table (days).
pub const DEFAULT_MATERIAL_LEAD_TIME_DAYS: u32 = 1;

/// Minimum lead time for any task (days).
pub const BASE_LEAD_TIME_DAYS: u32 = 1;

/// Working minutes in one day, for converting task duration to days.
pub const WORKDAY_MINUTES: u32 = 8 * 60;

/// Standards references kept per offline action plan.
pub const MAX_STANDARDS_PER_PLAN: usize = 5;

/// Look-back window for similar incidents when adjusting likelihood (days).
pub const INCIDENT_WINDOW_DAYS: i64 = 30;

/// Most the likelihood can rise from incident history.
pub const MAX_INCIDENT_UPLIFT: u8 = 2;
