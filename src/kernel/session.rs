use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::platform::PlayerHost;

/// The playback states a session can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackStateKind {
    Playing,
    Paused,
    Stopped,
    /// Session exists but carries no playback state at all.
    NoState,
    Buffering,
    Error,
    Connecting,
    /// Fast-forward, rewind and skip-in-progress variants. All treated
    /// identically: a benign in-flight transition.
    Transitioning,
    Unknown,
}

/// Transport commands accepted by the session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportCommand {
    Play,
    Pause,
    SkipNext,
}

/// One observation of the target's session. Produced fresh on every tick,
/// never persisted, owned by the tick that created it.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSnapshot {
    pub state: PlaybackStateKind,
    pub observed_at: Instant,
}

impl PlaybackSnapshot {
    pub fn now(state: PlaybackStateKind) -> Self {
        Self {
            state,
            observed_at: Instant::now(),
        }
    }
}

/// Read-only view over the target's session. A failed platform query maps
/// to "absent": the caller cannot distinguish "not running" from "query
/// failed", and the corrective action is identical either way.
pub struct SessionObserver {
    host: Arc<dyn PlayerHost>,
    target: String,
}

impl SessionObserver {
    pub fn new(host: Arc<dyn PlayerHost>, target: impl Into<String>) -> Self {
        Self {
            host,
            target: target.into(),
        }
    }

    pub fn observe(&self) -> Option<PlaybackSnapshot> {
        match self.host.query_session(&self.target) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(player = %self.target, "session query failed, treating as absent: {}", e);
                None
            }
        }
    }
}
