//! Request/response calls to the agent: the verification report and the
//! health check. Neither touches the event stream.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::artifacts::{ReportEnvelope, VerificationReport};
use crate::errors::FetchError;

const USER_AGENT: &str = concat!("testpilot/", env!("CARGO_PKG_VERSION"));

/// What the agent's `/health` endpoint returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub metrics: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ReportClient {
    client: reqwest::Client,
    report_url: String,
    health_url: String,
}

impl ReportClient {
    pub fn new(report_url: impl Into<String>, health_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            report_url: report_url.into(),
            health_url: health_url.into(),
        }
    }

    pub fn report_url(&self) -> &str {
        &self.report_url
    }

    /// GET the verification report. Any non-2xx status is an error.
    pub async fn fetch_report(&self) -> Result<VerificationReport, FetchError> {
        debug!(url = %self.report_url, "fetching verification report");
        let envelope = self
            .client
            .get(&self.report_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json::<ReportEnvelope>()
            .await?;
        Ok(envelope.into())
    }

    /// GET the agent's health status.
    pub async fn health(&self) -> Result<HealthStatus, FetchError> {
        debug!(url = %self.health_url, "probing agent health");
        let status = self
            .client
            .get(&self.health_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .json::<HealthStatus>()
            .await?;
        Ok(status)
    }
}
