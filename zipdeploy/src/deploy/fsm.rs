//! Finite State Machine for deployment status polling

use crate::models::deployment::DeploymentStatus;

/// Poll state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for a terminal status
    Polling,

    /// Deployment reported success
    Succeeded,

    /// Deployment reported failure
    Failed,

    /// No terminal status before the deadline
    TimedOut,

    /// The status endpoint could not be read
    Errored,

    /// Shutdown requested while polling
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling)
    }
}

/// Poll event
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A status was fetched; `None` when the endpoint gave no usable status
    StatusObserved(Option<DeploymentStatus>),

    /// The status fetch itself failed
    FetchFailed,

    /// The poll timeout elapsed
    DeadlineElapsed,

    /// Shutdown signal received
    ShutdownRequested,
}

/// Poll FSM
#[derive(Debug, Clone)]
pub struct PollFsm {
    state: PollState,
    polls: u32,
    last_status: Option<DeploymentStatus>,
}

impl PollFsm {
    /// Create a new FSM in polling state
    pub fn new() -> Self {
        Self {
            state: PollState::Polling,
            polls: 0,
            last_status: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Number of status observations processed
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Last status seen, if any
    pub fn last_status(&self) -> Option<DeploymentStatus> {
        self.last_status
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PollEvent) -> Result<PollState, String> {
        let new_state = match (self.state, &event) {
            (PollState::Polling, PollEvent::StatusObserved(status)) => {
                self.polls += 1;
                if status.is_some() {
                    self.last_status = *status;
                }
                match status {
                    Some(DeploymentStatus::Success) => PollState::Succeeded,
                    Some(DeploymentStatus::Failed) => PollState::Failed,
                    _ => PollState::Polling,
                }
            }
            (PollState::Polling, PollEvent::FetchFailed) => PollState::Errored,
            (PollState::Polling, PollEvent::DeadlineElapsed) => PollState::TimedOut,
            (PollState::Polling, PollEvent::ShutdownRequested) => PollState::Cancelled,

            // Terminal states accept nothing
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(new_state)
    }
}

impl Default for PollFsm {
    fn default() -> Self {
        Self::new()
    }
}
