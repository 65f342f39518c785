//! Deployment status poller

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::deploy::fsm::{PollEvent, PollFsm, PollState};
use crate::errors::DeployError;
use crate::http::deployments::DeploymentStatusSource;
use crate::models::deployment::{DeploymentStatus, StatusReport};

/// Cap on the poll window; larger timeouts would overflow the clock
const MAX_POLL_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between status checks
    pub interval: Duration,

    /// Give up if no terminal status is seen within this window
    pub timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Result of a successful poll
#[derive(Debug, Clone)]
pub struct PollSummary {
    /// The report that carried the success status
    pub report: StatusReport,

    /// Number of status fetches made
    pub polls: u32,

    /// Time spent polling
    pub elapsed: Duration,
}

/// Poll `source` until the latest deployment succeeds or fails.
///
/// Each fetch is bounded by the overall deadline. Answers without a
/// terminal status count as "still in progress"; a fetch that fails
/// outright ends the poll with its error.
pub async fn poll_deployment<S>(
    source: &S,
    options: &Options,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<PollSummary, DeployError>
where
    S: DeploymentStatusSource + ?Sized,
{
    info!(
        "Polling deployment status every {:?} for up to {:?}",
        options.interval, options.timeout
    );

    let started = Instant::now();
    let deadline = started + options.timeout.min(MAX_POLL_WINDOW);
    let mut fsm = PollFsm::new();
    let mut unexpected_codes = HashSet::new();

    loop {
        if Instant::now() >= deadline {
            transition(&mut fsm, PollEvent::DeadlineElapsed)?;
            return Err(DeployError::Timeout {
                timeout: options.timeout,
            });
        }

        let fetched = tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                transition(&mut fsm, PollEvent::ShutdownRequested)?;
                return Err(DeployError::Cancelled);
            }
            result = tokio::time::timeout_at(deadline, source.latest_deployment()) => result,
        };

        let report = match fetched {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!("Deployment status check failed: {}", e);
                transition(&mut fsm, PollEvent::FetchFailed)?;
                return Err(e);
            }
            Err(_) => {
                transition(&mut fsm, PollEvent::DeadlineElapsed)?;
                return Err(DeployError::Timeout {
                    timeout: options.timeout,
                });
            }
        };

        if let Some(DeploymentStatus::Unknown(code)) = report.status {
            if unexpected_codes.insert(code) {
                warn!("Unexpected deployment status code {}, still waiting", code);
            }
        }

        match transition(&mut fsm, PollEvent::StatusObserved(report.status))? {
            PollState::Succeeded => {
                info!("Deployment succeeded");
                return Ok(PollSummary {
                    report,
                    polls: fsm.polls(),
                    elapsed: started.elapsed(),
                });
            }
            PollState::Failed => {
                return Err(DeployError::DeploymentFailed {
                    payload: report.payload,
                });
            }
            _ => {
                debug!(
                    "Deployment in progress (poll {}, status {:?})",
                    fsm.polls(),
                    report.status
                );
            }
        }

        tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                transition(&mut fsm, PollEvent::ShutdownRequested)?;
                return Err(DeployError::Cancelled);
            }
            _ = tokio::time::sleep(options.interval) => {}
        }
    }
}

fn transition(fsm: &mut PollFsm, event: PollEvent) -> Result<PollState, DeployError> {
    fsm.process(event).map_err(DeployError::Internal)
}
