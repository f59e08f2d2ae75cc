use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Shared clock/status record. Written only by the refresh worker (the
/// sequencer on termination, the status fanout for the message field),
/// read by the countdown ticker.
#[derive(Debug, Clone)]
pub struct WatchdogClock {
    pub last_refresh_at: Instant,
    pub last_status_message: String,
}

pub type SharedClock = Arc<Mutex<WatchdogClock>>;

impl WatchdogClock {
    pub fn starting_now() -> SharedClock {
        Arc::new(Mutex::new(Self {
            last_refresh_at: Instant::now(),
            last_status_message: String::new(),
        }))
    }
}

/// Remaining time until the next refresh, in whole seconds, clamped at
/// zero once overdue. The countdown never goes negative.
pub fn remaining_seconds(elapsed: Duration, refresh_interval: Duration) -> u64 {
    refresh_interval.saturating_sub(elapsed).as_secs()
}

/// Wall-clock milliseconds since the epoch, for the persisted timestamps.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
