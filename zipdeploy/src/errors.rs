//! Error types for zipdeploy

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Exit code for bad input (missing source directory, missing profile)
pub const EXIT_INPUT_ERROR: i32 = 2;

/// Exit code for every other failure
pub const EXIT_FAILURE: i32 = 1;

/// Main error type for a deployment run
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Source directory not found: {}", .0.display())]
    SourceDirNotFound(PathBuf),

    #[error(
        "Need publish profile: pass --publish-profile or set AZURE_PUBLISH_PROFILE with the XML contents"
    )]
    MissingPublishProfile,

    #[error("Publish profile not found: {}", .0.display())]
    PublishProfileNotFound(PathBuf),

    #[error("Invalid publish profile: {0}")]
    InvalidProfile(String),

    #[error("No publishProfile with publishMethod=\"{0}\" found in profile XML")]
    NoMatchingProfile(String),

    #[error("Zip deploy failed: {status} {body}")]
    UploadRejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Deployment failed: {payload}")]
    DeploymentFailed { payload: serde_json::Value },

    #[error("Deployment status polling timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("Deployment cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Whether the run was rejected before any work started
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DeployError::SourceDirNotFound(_)
                | DeployError::MissingPublishProfile
                | DeployError::PublishProfileNotFound(_)
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_input_error() {
            EXIT_INPUT_ERROR
        } else {
            EXIT_FAILURE
        }
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Internal(err.to_string())
    }
}
