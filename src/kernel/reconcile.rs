use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::platform::PlayerHost;

use super::policy::{CorrectiveAction, PlaybackPolicy};
use super::session::{SessionObserver, TransportCommand};

/// The short-interval check-and-correct cycle: observe the session, apply
/// the policy table, issue the chosen correction. Command errors are
/// logged and swallowed; the next tick retries naturally, with no retry
/// or backoff beyond the fixed cadence.
pub struct Reconciler {
    observer: SessionObserver,
    host: Arc<dyn PlayerHost>,
    target: String,
}

impl Reconciler {
    pub fn new(host: Arc<dyn PlayerHost>, target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            observer: SessionObserver::new(host.clone(), target.clone()),
            host,
            target,
        }
    }

    /// One cycle. Returns the decided action so callers can inspect it.
    pub fn tick(&self) -> CorrectiveAction {
        let snapshot = self.observer.observe();
        let action = PlaybackPolicy::decide(snapshot.as_ref());

        match action {
            CorrectiveAction::None => {
                debug!(player = %self.target, "playback healthy, no action");
            }
            CorrectiveAction::Resume => {
                info!(player = %self.target, "playback not progressing, sending play");
                if let Err(e) = self.host.issue(TransportCommand::Play) {
                    warn!(player = %self.target, "resume failed: {}", e);
                }
            }
            CorrectiveAction::Launch => {
                info!(player = %self.target, "no active session, requesting launch");
                match self.host.launch(&self.target) {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(player = %self.target, "launch rejected, is the player installed?");
                    }
                    Err(e) => warn!(player = %self.target, "launch failed: {}", e),
                }
            }
        }

        action
    }

    /// Interval driver. The first tick fires immediately; the loop ends
    /// when the supervising context disconnects.
    pub async fn run(self, check_interval: Duration, cancel: CancellationToken) {
        let mut cadence = tokio::time::interval(check_interval);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {
                    self.tick();
                }
            }
        }
    }
}
