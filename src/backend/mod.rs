//! Analysis Backend
//!
//! The external service that turns one observation into hazards, scored
//! hazards, and action plans. The orchestrator only knows the
//! [`AnalysisBackend`] contract; two implementations ship with the crate:
//!
//! - [`HttpBackend`]: the remote analysis service over HTTP
//! - [`OfflineBackend`]: a deterministic rule-based analyzer for running
//!   without the service

pub mod http;
pub mod offline;

pub use http::HttpBackend;
pub use offline::OfflineBackend;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::defaults::GENERIC_FAILURE_MESSAGE;
use crate::types::{AnalysisResponse, HealthStatus, Observation};

/// One analysis call per observation, plus an independent liveness probe.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyze one observation.
    async fn analyze(&self, observation: &Observation) -> Result<AnalysisResponse, BackendError>;

    /// Liveness check. Not part of the walkthrough state machine.
    async fn health(&self) -> Result<HealthStatus, BackendError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Failed backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout, or the request never completed
    #[error("backend unavailable: {0}")]
    Transport(String),

    /// Non-2xx response; `detail` is the service's error message when present
    #[error("backend returned HTTP {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },

    /// 2xx response whose pipeline reported `success: false`
    #[error("analysis failed{}", .0.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    RequestFailed(Option<String>),

    /// Body did not match the response schema
    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Message shown to the user on the FORM stage: the backend's own
    /// message when it sent one, otherwise the generic failure text.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Status { detail: Some(detail), .. }
            | BackendError::RequestFailed(Some(detail))
                if !detail.trim().is_empty() =>
            {
                detail.clone()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_detail() {
        let err = BackendError::Status {
            status: 503,
            detail: Some("LLM provider unavailable".to_string()),
        };
        assert_eq!(err.user_message(), "LLM provider unavailable");

        let err = BackendError::RequestFailed(Some("Pipeline timed out".to_string()));
        assert_eq!(err.user_message(), "Pipeline timed out");
    }

    #[test]
    fn test_user_message_generic_fallback() {
        for err in [
            BackendError::Status { status: 500, detail: None },
            BackendError::Status { status: 500, detail: Some("   ".to_string()) },
            BackendError::RequestFailed(None),
            BackendError::Transport("connection refused".to_string()),
            BackendError::Decode("missing field".to_string()),
        ] {
            assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE, "{err:?}");
        }
    }

    #[test]
    fn test_only_transport_is_transient() {
        assert!(BackendError::Transport("timeout".into()).is_transient());
        assert!(!BackendError::Status { status: 502, detail: None }.is_transient());
        assert!(!BackendError::Decode(String::new()).is_transient());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = BackendError::Status { status: 422, detail: Some("bad type".into()) };
        assert_eq!(err.to_string(), "backend returned HTTP 422: bad type");
        let err = BackendError::Status { status: 500, detail: None };
        assert_eq!(err.to_string(), "backend returned HTTP 500");
    }
}
