use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use crate::kernel::clock::{epoch_millis, SharedClock};

/// How long a persisted countdown sample stays valid for an external
/// reader. Older samples mean the watchdog is not running (or not yet
/// publishing) and the display should show its initializing placeholder.
pub const COUNTDOWN_STALE_AFTER_MS: u64 = 5_000;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The flat key-value record an external display reads. Overwritten whole
/// on every write; not versioned, no migration format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub last_status: String,
    pub last_status_time: u64,
    pub countdown_seconds: u64,
    pub last_update: u64,
}

/// Durable key-value persistence for status and countdown.
pub trait StateStore: Send + Sync {
    fn put_status(&self, message: &str, at_ms: u64) -> Result<(), StoreError>;
    fn put_countdown(&self, seconds: u64, at_ms: u64) -> Result<(), StoreError>;
    fn load(&self) -> Result<PersistedState, StoreError>;
}

/// Staleness-aware countdown read. `None` means the reader should show
/// its "initializing" placeholder instead of a stale number.
pub fn read_countdown(store: &dyn StateStore, now_ms: u64) -> Option<u64> {
    let state = store.load().ok()?;
    if now_ms.saturating_sub(state.last_update) < COUNTDOWN_STALE_AFTER_MS {
        Some(state.countdown_seconds)
    } else {
        None
    }
}

/// In-memory store, used by tests and as a sink when durability is not
/// wanted.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<PersistedState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn put_status(&self, message: &str, at_ms: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.last_status = message.to_string();
        state.last_status_time = at_ms;
        Ok(())
    }

    fn put_countdown(&self, seconds: u64, at_ms: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.countdown_seconds = seconds;
        state.last_update = at_ms;
        Ok(())
    }

    fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.state.lock().unwrap().clone())
    }
}

/// File-backed store: the whole record is rewritten as JSON on every put.
pub struct FileStateStore {
    path: PathBuf,
    state: Mutex<PersistedState>,
}

impl FileStateStore {
    /// Opens the store, loading the previous record if one exists.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let state = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            PersistedState::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn put_status(&self, message: &str, at_ms: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.last_status = message.to_string();
        state.last_status_time = at_ms;
        self.save(&state)
    }

    fn put_countdown(&self, seconds: u64, at_ms: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.countdown_seconds = seconds;
        state.last_update = at_ms;
        self.save(&state)
    }

    fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.state.lock().unwrap().clone())
    }
}

/// Events mirrored to live listeners alongside each persisted write.
#[derive(Debug, Clone)]
pub enum WatchdogEvent {
    Status { message: String, at_ms: u64 },
    Countdown { seconds: u64, status: String, at_ms: u64 },
}

/// Status broadcast plus durable persistence, shared by the sequencer,
/// the manual trigger path and the countdown ticker. Store failures are
/// logged and swallowed; publishing is best-effort like everything else
/// here.
#[derive(Clone)]
pub struct StatusFanout {
    store: Arc<dyn StateStore>,
    events: broadcast::Sender<WatchdogEvent>,
    clock: SharedClock,
}

impl StatusFanout {
    pub fn new(store: Arc<dyn StateStore>, clock: SharedClock) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            events,
            clock,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchdogEvent> {
        self.events.subscribe()
    }

    pub fn publish_status(&self, message: &str) {
        let at_ms = epoch_millis();
        self.clock.lock().unwrap().last_status_message = message.to_string();
        if let Err(e) = self.store.put_status(message, at_ms) {
            warn!("failed to persist status: {}", e);
        }
        let _ = self.events.send(WatchdogEvent::Status {
            message: message.to_string(),
            at_ms,
        });
    }

    pub fn publish_countdown(&self, seconds: u64) {
        let at_ms = epoch_millis();
        let status = self.clock.lock().unwrap().last_status_message.clone();
        if let Err(e) = self.store.put_countdown(seconds, at_ms) {
            warn!("failed to persist countdown: {}", e);
        }
        let _ = self.events.send(WatchdogEvent::Countdown {
            seconds,
            status,
            at_ms,
        });
    }
}
