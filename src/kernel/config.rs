use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_TARGET: &str = "com.apple.android.music";
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 900_000;

/// Identity the watchdog reports for its own background work, so the
/// reclaimer never evicts it.
pub const OWN_WORK_ID: &str = "vigil.watchdog";

/// Immutable runtime configuration. Set at startup, never mutated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Identifier of the supervised player process.
    pub target_id: String,
    /// Reconciliation cadence.
    pub check_interval_ms: u64,
    /// Deep refresh cadence; also the countdown's full span.
    pub refresh_interval_ms: u64,
    /// Locally owned cache directory pruned during reclamation.
    pub cache_dir: Option<PathBuf>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            target_id: DEFAULT_TARGET.to_string(),
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            cache_dir: None,
        }
    }
}

impl WatchdogConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
