//! Deployment run options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::poller;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::profile::ZIP_DEPLOY_PUBLISH_METHOD;

/// Environment variable holding the publish profile XML
pub const PUBLISH_PROFILE_ENV: &str = "AZURE_PUBLISH_PROFILE";

/// Main run options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Directory to archive and deploy
    pub source_dir: PathBuf,

    /// Where the publish profile comes from
    pub profile: ProfileSource,

    /// Archive location, a fresh temp file if unset
    pub zip_output: Option<PathBuf>,

    /// Profile publish method to take credentials from
    pub publish_method: String,

    /// Deployment API base URL, derived from the profile when unset
    pub base_url: Option<String>,

    /// Status poller options
    pub poller: poller::Options,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("api"),
            profile: ProfileSource::Missing,
            zip_output: None,
            publish_method: ZIP_DEPLOY_PUBLISH_METHOD.to_string(),
            base_url: None,
            poller: poller::Options::default(),
        }
    }
}

impl DeployOptions {
    /// Set the poll timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.poller.timeout = timeout;
        self
    }
}

/// Origin of the publish profile document
#[derive(Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Read from a file
    Path(PathBuf),

    /// Inline XML, e.g. from the environment
    Inline(String),

    /// Neither was provided
    Missing,
}

impl ProfileSource {
    /// Pick the profile source: an explicit path wins over the environment
    /// value, and an empty environment value counts as unset.
    pub fn resolve(explicit_path: Option<PathBuf>, env_value: Option<String>) -> Self {
        match (explicit_path, env_value) {
            (Some(path), _) => ProfileSource::Path(path),
            (None, Some(xml)) if !xml.trim().is_empty() => ProfileSource::Inline(xml),
            _ => ProfileSource::Missing,
        }
    }

    /// Resolve using the process environment
    pub fn from_env(explicit_path: Option<PathBuf>) -> Self {
        Self::resolve(explicit_path, std::env::var(PUBLISH_PROFILE_ENV).ok())
    }

    /// Load the profile XML
    pub async fn load(&self) -> Result<String, DeployError> {
        match self {
            ProfileSource::Path(path) => {
                let file = File::new(path);
                if !file.exists().await {
                    return Err(DeployError::PublishProfileNotFound(path.clone()));
                }
                file.read_string().await
            }
            ProfileSource::Inline(xml) => Ok(xml.clone()),
            ProfileSource::Missing => Err(DeployError::MissingPublishProfile),
        }
    }
}

// Inline XML holds credentials, keep it out of logs
impl std::fmt::Debug for ProfileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ProfileSource::Inline(_) => f.write_str("Inline(<redacted>)"),
            ProfileSource::Missing => f.write_str("Missing"),
        }
    }
}
