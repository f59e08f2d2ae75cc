pub mod scripted;

use thiserror::Error;

use crate::kernel::session::{PlaybackSnapshot, TransportCommand};

/// Errors raised by the platform boundary. None of these are fatal to the
/// watchdog; callers log them and either retry on the next tick or surface
/// them as status text.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("session query failed: {0}")]
    Query(String),
    #[error("transport command rejected: {0}")]
    Command(String),
    #[error("launch failed: {0}")]
    Launch(String),
    #[error("memory operation failed: {0}")]
    Memory(String),
}

/// The platform surface the watchdog supervises through: a read-only
/// session query plus the two write paths (transport commands, relaunch).
pub trait PlayerHost: Send + Sync {
    /// Snapshot of the target's current playback session. `Ok(None)` when
    /// the target has no discoverable active session.
    fn query_session(&self, target: &str) -> Result<Option<PlaybackSnapshot>, HostError>;

    /// Fire-and-forget transport command against the current session.
    fn issue(&self, command: TransportCommand) -> Result<(), HostError>;

    /// Best-effort process start. `Ok(false)` when the target is not
    /// installed or the platform rejected the launch.
    fn launch(&self, target: &str) -> Result<bool, HostError>;
}

/// System memory pressure as reported by the host.
#[derive(Debug, Clone, Copy)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub low_memory: bool,
}

impl MemoryStats {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }
}

/// A background work unit the host can evict. Lower importance = less
/// important; see `ReclaimPolicy` for the eviction rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub name: String,
    pub importance: u32,
}

impl WorkUnit {
    pub fn new(name: impl Into<String>, importance: u32) -> Self {
        Self {
            name: name.into(),
            importance,
        }
    }
}

/// Resource-pressure side of the platform, consumed only by the reclaimer.
pub trait MemoryHost: Send + Sync {
    fn memory_stats(&self) -> Result<MemoryStats, HostError>;

    fn background_work(&self) -> Result<Vec<WorkUnit>, HostError>;

    fn evict(&self, unit: &WorkUnit) -> Result<(), HostError>;

    /// Advisory garbage-collection request. The runtime may ignore it.
    fn advise_gc(&self);
}
