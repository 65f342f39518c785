//! Deployment API client

pub mod client;
pub mod deployments;
