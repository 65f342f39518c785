//! zipdeploy Library
//!
//! Packages a directory as a zip, pushes it to a Kudu `zipdeploy` endpoint
//! with credentials from a publish profile, and waits for the deployment to
//! finish.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod profile;
pub mod utils;
