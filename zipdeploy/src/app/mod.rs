//! Deployment orchestration

pub mod options;
pub mod run;
