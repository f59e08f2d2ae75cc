use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::platform::{MemoryHost, MemoryStats, WorkUnit};

/// Work at or below this importance is fair game for eviction.
pub const RECLAIMABLE_IMPORTANCE: u32 = 100;

/// Cache files older than this are pruned.
const CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const MIB: u64 = 1024 * 1024;

/// Decides which background work units may be evicted. Standalone so the
/// filtering rule is testable without a live host: never the target
/// process, never the watchdog itself, never core-platform work.
#[derive(Debug, Clone)]
pub struct ReclaimPolicy {
    target_id: String,
    own_id: String,
    protected_prefixes: Vec<String>,
    importance_floor: u32,
}

impl ReclaimPolicy {
    pub fn new(target_id: impl Into<String>, own_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            own_id: own_id.into(),
            protected_prefixes: ["com.android", "android", "com.google"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            importance_floor: RECLAIMABLE_IMPORTANCE,
        }
    }

    pub fn with_protected_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.protected_prefixes = prefixes;
        self
    }

    pub fn is_reclaimable(&self, unit: &WorkUnit) -> bool {
        unit.importance <= self.importance_floor
            && unit.name != self.target_id
            && unit.name != self.own_id
            && !self
                .protected_prefixes
                .iter()
                .any(|prefix| unit.name.starts_with(prefix.as_str()))
    }
}

/// What one reclamation pass did. Logged, never acted on.
#[derive(Debug, Clone, Default)]
pub struct ReclaimReport {
    pub before: Option<MemoryStats>,
    pub after: Option<MemoryStats>,
    pub evicted: u32,
    pub eviction_failures: u32,
    pub pruned_files: u32,
    pub still_low: bool,
}

/// Opportunistic, best-effort resource reclamation. Runs after every deep
/// refresh and on manual trigger. Every step tolerates failure; nothing
/// here propagates outward or blocks the rest of the system.
pub struct MemoryReclaimer {
    host: Arc<dyn MemoryHost>,
    policy: ReclaimPolicy,
    cache_dir: Option<PathBuf>,
}

impl MemoryReclaimer {
    pub fn new(host: Arc<dyn MemoryHost>, policy: ReclaimPolicy, cache_dir: Option<PathBuf>) -> Self {
        Self {
            host,
            policy,
            cache_dir,
        }
    }

    pub fn run(&self) -> ReclaimReport {
        let mut report = ReclaimReport::default();

        report.before = match self.host.memory_stats() {
            Ok(stats) => {
                info!(
                    total_mb = stats.total_bytes / MIB,
                    available_mb = stats.available_bytes / MIB,
                    used_mb = stats.used_bytes() / MIB,
                    "memory before reclaim"
                );
                Some(stats)
            }
            Err(e) => {
                debug!("memory stats unavailable: {}", e);
                None
            }
        };

        match self.host.background_work() {
            Ok(units) => {
                for unit in &units {
                    if !self.policy.is_reclaimable(unit) {
                        continue;
                    }
                    match self.host.evict(unit) {
                        Ok(()) => {
                            report.evicted += 1;
                            debug!(unit = %unit.name, "evicted");
                        }
                        Err(e) => {
                            report.eviction_failures += 1;
                            debug!(unit = %unit.name, "eviction failed, skipping: {}", e);
                        }
                    }
                }
            }
            Err(e) => debug!("background work enumeration failed: {}", e),
        }

        self.host.advise_gc();

        if let Some(dir) = self.cache_dir.as_deref() {
            report.pruned_files = prune_cache(dir);
        }

        report.after = self.host.memory_stats().ok();
        report.still_low = report.after.map(|s| s.low_memory).unwrap_or(false);

        if let (Some(before), Some(after)) = (&report.before, &report.after) {
            let freed = after.available_bytes as i64 - before.available_bytes as i64;
            info!(
                freed_mb = freed / MIB as i64,
                evicted = report.evicted,
                pruned = report.pruned_files,
                "reclaim pass finished"
            );
        }
        if report.still_low {
            warn!("system remains under memory pressure");
        }

        report
    }
}

/// Removes cache files older than 24 hours. Per-file failures are logged
/// and skipped; an unreadable or missing directory is a no-op.
fn prune_cache(dir: &Path) -> u32 {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), "cache dir unreadable: {}", e);
            return 0;
        }
    };

    let cutoff = SystemTime::now() - CACHE_MAX_AGE;
    let mut pruned = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => pruned += 1,
                Err(e) => debug!(file = %path.display(), "cache prune failed: {}", e),
            }
        }
    }

    pruned
}
