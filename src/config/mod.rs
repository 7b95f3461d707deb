//! Walkthrough Configuration Module
//!
//! Backend connection and reveal timings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `SAFETY_WALKTHROUGH_CONFIG` environment variable (path to TOML file)
//! 2. `walkthrough.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(AppConfig::load());
//!
//! // Anywhere else:
//! let timeout = config::get().backend.request_timeout_secs;
//! ```

mod app_config;
pub mod defaults;

pub use app_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: AppConfig) {
    if APP_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global configuration.
///
/// Falls back to built-in defaults when `init()` was never called, which is
/// the normal case for library users and tests.
pub fn get() -> &'static AppConfig {
    APP_CONFIG.get_or_init(AppConfig::default)
}
