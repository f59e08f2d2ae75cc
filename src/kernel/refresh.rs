use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::platform::{HostError, PlayerHost};
use crate::store::StatusFanout;

use super::clock::SharedClock;
use super::session::TransportCommand;

/// Settle delays between steps, letting the player's internal state catch
/// up before the next command is issued.
const PAUSE_SETTLE: Duration = Duration::from_millis(1000);
const SKIP_SETTLE: Duration = Duration::from_millis(1500);
const LAUNCH_SETTLE: Duration = Duration::from_millis(2000);

/// Ordered steps of one deep-refresh run. Terminal on `Completed` or
/// `Failed`; a failed run is not retried, it starts fresh at the next
/// scheduled cycle or manual trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStep {
    Searching,
    Pausing,
    SkippingNext,
    Resuming,
    Launching,
    Completed,
    Failed(String),
}

impl RefreshStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefreshStep::Completed | RefreshStep::Failed(_))
    }

    /// Settle delay applied after the step's command, before the next
    /// step. No delay after `Resuming`.
    fn settle(&self) -> Option<Duration> {
        match self {
            RefreshStep::Pausing => Some(PAUSE_SETTLE),
            RefreshStep::SkippingNext => Some(SKIP_SETTLE),
            RefreshStep::Launching => Some(LAUNCH_SETTLE),
            _ => None,
        }
    }
}

/// Pure transition table: (current step, session present) -> next step.
pub fn advance(current: &RefreshStep, session_present: bool) -> RefreshStep {
    use RefreshStep::*;

    match current {
        Searching => {
            if session_present {
                Pausing
            } else {
                Launching
            }
        }
        Pausing => SkippingNext,
        SkippingNext => Resuming,
        Resuming => Completed,
        Launching => Completed,
        Completed => Completed,
        Failed(reason) => Failed(reason.clone()),
    }
}

/// What put a run on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCause {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub run: Uuid,
    pub cause: RefreshCause,
    /// Transition log, in execution order, ending in a terminal step.
    pub steps: Vec<RefreshStep>,
}

impl RefreshOutcome {
    pub fn failed(&self) -> bool {
        matches!(self.steps.last(), Some(RefreshStep::Failed(_)))
    }
}

/// Forced-disruption recovery: a session can report `Playing` while making
/// no real progress, indistinguishable from healthy through state alone.
/// Pausing, skipping and resuming unsticks it. Runs are serialized by the
/// supervisor's worker; this type only knows how to execute one.
pub struct RefreshSequencer {
    host: Arc<dyn PlayerHost>,
    target: String,
    fanout: StatusFanout,
    clock: SharedClock,
}

impl RefreshSequencer {
    pub fn new(
        host: Arc<dyn PlayerHost>,
        target: impl Into<String>,
        fanout: StatusFanout,
        clock: SharedClock,
    ) -> Self {
        Self {
            host,
            target: target.into(),
            fanout,
            clock,
        }
    }

    /// Runs one full sequence. Never returns an error: a failing step
    /// terminates the run in `Failed`, remaining steps are skipped, and
    /// the clock still advances so the countdown does not stall.
    pub async fn run(&self, cause: RefreshCause) -> RefreshOutcome {
        let run = Uuid::new_v4();
        info!(%run, ?cause, player = %self.target, "deep refresh starting");

        let mut steps = Vec::new();
        let mut step = RefreshStep::Searching;
        let mut session_present = false;

        loop {
            self.fanout.publish_status(&self.status_line(&step));
            steps.push(step.clone());
            if step.is_terminal() {
                break;
            }

            match self.perform(&step) {
                Ok(Some(present)) => session_present = present,
                Ok(None) => {}
                Err(e) => {
                    warn!(%run, ?step, "refresh step failed: {}", e);
                    step = RefreshStep::Failed(e.to_string());
                    continue;
                }
            }

            if let Some(delay) = step.settle() {
                sleep(delay).await;
            }
            step = advance(&step, session_present);
        }

        // Terminal either way: the countdown reference advances even for
        // a failed run.
        self.clock.lock().unwrap().last_refresh_at = Instant::now();

        info!(%run, steps = steps.len(), "deep refresh finished");
        RefreshOutcome { run, cause, steps }
    }

    /// Executes the step's platform call. `Ok(Some(_))` reports whether a
    /// session was found (only `Searching` produces it).
    fn perform(&self, step: &RefreshStep) -> Result<Option<bool>, HostError> {
        match step {
            RefreshStep::Searching => {
                let snapshot = self.host.query_session(&self.target)?;
                Ok(Some(snapshot.is_some()))
            }
            RefreshStep::Pausing => {
                self.host.issue(TransportCommand::Pause)?;
                Ok(None)
            }
            RefreshStep::SkippingNext => {
                self.host.issue(TransportCommand::SkipNext)?;
                Ok(None)
            }
            RefreshStep::Resuming => {
                self.host.issue(TransportCommand::Play)?;
                Ok(None)
            }
            RefreshStep::Launching => {
                if !self.host.launch(&self.target)? {
                    warn!(player = %self.target, "launch rejected, is the player installed?");
                    self.fanout
                        .publish_status("Launch rejected, is the player installed?");
                }
                Ok(None)
            }
            RefreshStep::Completed | RefreshStep::Failed(_) => Ok(None),
        }
    }

    fn status_line(&self, step: &RefreshStep) -> String {
        match step {
            RefreshStep::Searching => format!("Searching for {} session...", self.target),
            RefreshStep::Pausing => "Pausing playback...".to_string(),
            RefreshStep::SkippingNext => "Skipping to the next track...".to_string(),
            RefreshStep::Resuming => "Resuming playback...".to_string(),
            RefreshStep::Launching => {
                format!("No active session, launching {}...", self.target)
            }
            RefreshStep::Completed => "Refresh completed".to_string(),
            RefreshStep::Failed(reason) => format!("Refresh failed: {}", reason),
        }
    }
}
