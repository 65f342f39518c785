//! HTTP client for the Kudu deployment API

use reqwest::{header, Client, StatusCode};
use secrecy::ExposeSecret;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::profile::PublishProfile;

/// Path of the zip deploy endpoint
pub const ZIP_DEPLOY_PATH: &str = "api/zipdeploy";

/// Path of the latest deployment status endpoint
pub const LATEST_DEPLOYMENT_PATH: &str = "api/deployments/latest";

/// Authenticated client for one site's deployment API
pub struct KuduClient {
    client: Client,
    base_url: Url,
    profile: PublishProfile,
}

impl KuduClient {
    /// Create a client for the site named by the profile's publish URL
    pub fn new(profile: PublishProfile) -> Result<Self, DeployError> {
        let host = profile.host();
        if host.is_empty() {
            return Err(DeployError::InvalidProfile(format!(
                "publishUrl '{}' has no host",
                profile.publish_url
            )));
        }
        let base_url = format!("https://{}", host);
        Self::with_base_url(&base_url, profile)
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(base_url: &str, profile: PublishProfile) -> Result<Self, DeployError> {
        // A trailing slash makes `join` append rather than replace the last segment
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url,
            profile,
        })
    }

    /// URL of the zip deploy endpoint
    pub fn zip_deploy_url(&self) -> Result<Url, DeployError> {
        Ok(self.base_url.join(ZIP_DEPLOY_PATH)?)
    }

    /// URL of the latest deployment status endpoint
    pub fn latest_deployment_url(&self) -> Result<Url, DeployError> {
        Ok(self.base_url.join(LATEST_DEPLOYMENT_PATH)?)
    }

    /// Attach basic auth credentials from the profile
    pub(crate) fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(
            &self.profile.user_name,
            Some(self.profile.user_pwd.expose_secret()),
        )
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Upload a zip archive to the zip deploy endpoint.
    ///
    /// 200 and 202 both mean the archive was accepted; the deployment itself
    /// is tracked through the status endpoint.
    pub async fn upload_zip(&self, archive: &File) -> Result<StatusCode, DeployError> {
        let url = self.zip_deploy_url()?;
        let body = archive.read_bytes().await?;
        info!("Uploading zip to {} ...", url);
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .authorize(self.client.post(url))
            .header(header::CONTENT_TYPE, "application/zip")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::ACCEPTED {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Could not read zip deploy error response: {}", e);
                    format!("<unreadable response body: {}>", e)
                }
            };
            error!("Zip deploy failed: {} - {}", status, body);
            return Err(DeployError::UploadRejected { status, body });
        }

        info!("Upload accepted with status {}", status);
        Ok(status)
    }
}
