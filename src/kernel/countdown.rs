use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::store::StatusFanout;

use super::clock::{remaining_seconds, SharedClock};

const TICK: Duration = Duration::from_millis(1000);

/// Compact badge encoding whole minutes remaining, the stand-in for the
/// platform's dynamic indicator. Presentation-only.
pub fn minute_badge(remaining_secs: u64) -> String {
    format!("[{}m]", remaining_secs / 60)
}

pub fn format_mm_ss(remaining_secs: u64) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

/// Publishes the time remaining until the next deep refresh, once per
/// second while connected. Reads the clock the refresh worker writes;
/// never writes it.
pub struct CountdownTicker {
    clock: SharedClock,
    fanout: StatusFanout,
    refresh_interval: Duration,
}

impl CountdownTicker {
    pub fn new(clock: SharedClock, fanout: StatusFanout, refresh_interval: Duration) -> Self {
        Self {
            clock,
            fanout,
            refresh_interval,
        }
    }

    /// Computes and publishes one countdown sample. Clamped at zero once
    /// overdue, never negative.
    pub fn tick(&self) -> u64 {
        let (elapsed, status) = {
            let clock = self.clock.lock().unwrap();
            (
                clock.last_refresh_at.elapsed(),
                clock.last_status_message.clone(),
            )
        };
        let remaining = remaining_seconds(elapsed, self.refresh_interval);
        self.fanout.publish_countdown(remaining);
        debug!(
            remaining,
            badge = %minute_badge(remaining),
            status = %status,
            "countdown updated"
        );
        remaining
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut cadence = tokio::time::interval(TICK);
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
