//! Deployment models

/// State of the latest deployment as reported by the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentStatus {
    /// Queued, not started
    Pending,

    /// Build step running
    Building,

    /// Files being copied into place
    Deploying,

    /// Deployment failed
    Failed,

    /// Deployment succeeded
    Success,

    /// Code outside the documented range
    Unknown(i64),
}

impl DeploymentStatus {
    pub const PENDING: i64 = 0;
    pub const BUILDING: i64 = 1;
    pub const DEPLOYING: i64 = 2;
    pub const FAILED: i64 = 3;
    pub const SUCCESS: i64 = 4;

    /// Map a raw status code
    pub fn from_code(code: i64) -> Self {
        match code {
            Self::PENDING => DeploymentStatus::Pending,
            Self::BUILDING => DeploymentStatus::Building,
            Self::DEPLOYING => DeploymentStatus::Deploying,
            Self::FAILED => DeploymentStatus::Failed,
            Self::SUCCESS => DeploymentStatus::Success,
            other => DeploymentStatus::Unknown(other),
        }
    }

    /// Whether polling should stop at this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Success | DeploymentStatus::Failed)
    }
}

/// One observation of the status endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Parsed status, `None` if the endpoint gave no usable status
    pub status: Option<DeploymentStatus>,

    /// Raw response body, JSON if it parsed, otherwise a JSON string
    pub payload: serde_json::Value,
}

impl StatusReport {
    /// Build a report from a status endpoint JSON body
    pub fn from_payload(payload: serde_json::Value) -> Self {
        let status = payload
            .get("status")
            .and_then(serde_json::Value::as_i64)
            .map(DeploymentStatus::from_code);
        Self { status, payload }
    }

    /// Report for a response that carried no status
    pub fn in_progress(payload: serde_json::Value) -> Self {
        Self {
            status: None,
            payload,
        }
    }
}
