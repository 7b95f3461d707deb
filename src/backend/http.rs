//! HTTP client for the remote analysis service.
//!
//! - `POST {base}/api/observations/analyze` with the observation as JSON
//! - `GET {base}/api/health`
//!
//! Non-2xx bodies are parsed for a `detail` field. Transport failures may be
//! retried with linear backoff; HTTP errors never are.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{AnalysisBackend, BackendError};
use crate::config::defaults::{ANALYZE_PATH, HEALTH_PATH};
use crate::config::BackendConfig;
use crate::types::{AnalysisResponse, HealthStatus, Observation};

/// Remote analysis service client.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        })
    }

    /// Client for the globally configured service.
    pub fn from_config() -> Result<Self, BackendError> {
        Self::new(&crate::config::get().backend)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn analyze_once(&self, observation: &Observation) -> Result<AnalysisResponse, BackendError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, ANALYZE_PATH))
            .json(observation)
            .send()
            .await
            .map_err(transport)?;

        let response: AnalysisResponse = decode(resp).await?;
        if !response.success {
            return Err(BackendError::RequestFailed(response.error));
        }
        Ok(response)
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze(&self, observation: &Observation) -> Result<AnalysisResponse, BackendError> {
        let mut attempt: u32 = 0;
        loop {
            debug!(observation = %observation.id, attempt, "Sending analysis request");
            match self.analyze_once(observation).await {
                Ok(response) => {
                    info!(
                        observation = %observation.id,
                        hazards = response.hazards.len(),
                        plans = response.action_plans.len(),
                        "Analysis received"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let wait = self.retry_backoff * attempt;
                    warn!(
                        observation = %observation.id,
                        attempt,
                        max_retries = self.max_retries,
                        wait_ms = wait.as_millis(),
                        error = %e,
                        "Analysis request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    warn!(observation = %observation.id, error = %e, "Analysis request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, HEALTH_PATH))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

/// Read a response body, mapping non-2xx statuses through the error contract.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(transport)?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Extract the `detail` message from an error body.
///
/// A string detail is returned as-is; structured details (validation error
/// lists) are returned as compact JSON. Anything unparseable yields `None`.
pub(crate) fn error_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
