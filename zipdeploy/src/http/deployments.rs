//! Deployment status API

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::errors::DeployError;
use crate::http::client::KuduClient;
use crate::models::deployment::StatusReport;

/// Source of deployment status observations, for testability.
///
/// A non-200 answer is an in-progress report; transport failures and
/// unreadable 200 bodies are errors.
#[async_trait]
pub trait DeploymentStatusSource: Send + Sync {
    /// Fetch the status of the latest deployment
    async fn latest_deployment(&self) -> Result<StatusReport, DeployError>;
}

#[async_trait]
impl DeploymentStatusSource for KuduClient {
    async fn latest_deployment(&self) -> Result<StatusReport, DeployError> {
        let url = self.latest_deployment_url()?;
        debug!("GET {}", url);

        let response = self.authorize(self.http().get(url)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            debug!("Status endpoint answered {}", status);
            return Ok(StatusReport::in_progress(serde_json::Value::String(body)));
        }

        let payload: serde_json::Value = serde_json::from_str(&body)?;
        Ok(StatusReport::from_payload(payload))
    }
}
