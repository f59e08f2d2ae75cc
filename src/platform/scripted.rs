use std::collections::VecDeque;
use std::sync::Mutex;

use crate::kernel::session::{PlaybackSnapshot, PlaybackStateKind, TransportCommand};

use super::{HostError, MemoryHost, MemoryStats, PlayerHost, WorkUnit};

/// One scripted answer to a session query.
#[derive(Debug, Clone)]
pub enum ScriptedSession {
    Absent,
    State(PlaybackStateKind),
    QueryFails(String),
}

/// In-process player + memory host driven by a script. Queued entries are
/// consumed one per query; once the queue drains, the steady entry
/// repeats. Issued commands, launches and evictions are recorded for
/// inspection. Used by the tests and the demo harness.
pub struct ScriptedHost {
    queue: Mutex<VecDeque<ScriptedSession>>,
    steady: Mutex<ScriptedSession>,
    issued: Mutex<Vec<TransportCommand>>,
    launches: Mutex<Vec<String>>,
    launch_ok: Mutex<bool>,
    failing_command: Mutex<Option<(TransportCommand, String)>>,
    work: Mutex<Vec<WorkUnit>>,
    evicted: Mutex<Vec<String>>,
    failing_evictions: Mutex<Vec<String>>,
    stats: Mutex<VecDeque<MemoryStats>>,
    fail_stats: Mutex<bool>,
    gc_requests: Mutex<u32>,
}

impl ScriptedHost {
    pub fn new(steady: ScriptedSession) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            steady: Mutex::new(steady),
            issued: Mutex::new(Vec::new()),
            launches: Mutex::new(Vec::new()),
            launch_ok: Mutex::new(true),
            failing_command: Mutex::new(None),
            work: Mutex::new(Vec::new()),
            evicted: Mutex::new(Vec::new()),
            failing_evictions: Mutex::new(Vec::new()),
            stats: Mutex::new(VecDeque::from([MemoryStats {
                total_bytes: 4 * 1024 * 1024 * 1024,
                available_bytes: 1024 * 1024 * 1024,
                low_memory: false,
            }])),
            fail_stats: Mutex::new(false),
            gc_requests: Mutex::new(0),
        }
    }

    pub fn steady(state: PlaybackStateKind) -> Self {
        Self::new(ScriptedSession::State(state))
    }

    pub fn absent() -> Self {
        Self::new(ScriptedSession::Absent)
    }

    pub fn enqueue(&self, session: ScriptedSession) {
        self.queue.lock().unwrap().push_back(session);
    }

    pub fn set_steady(&self, session: ScriptedSession) {
        *self.steady.lock().unwrap() = session;
    }

    /// Makes the given transport command fail from now on.
    pub fn fail_command(&self, command: TransportCommand, reason: &str) {
        *self.failing_command.lock().unwrap() = Some((command, reason.to_string()));
    }

    pub fn set_launch_ok(&self, ok: bool) {
        *self.launch_ok.lock().unwrap() = ok;
    }

    pub fn set_background_work(&self, units: Vec<WorkUnit>) {
        *self.work.lock().unwrap() = units;
    }

    pub fn fail_eviction_of(&self, name: &str) {
        self.failing_evictions.lock().unwrap().push(name.to_string());
    }

    /// Stats are consumed in order; the last entry repeats.
    pub fn push_memory_stats(&self, stats: MemoryStats) {
        self.stats.lock().unwrap().push_back(stats);
    }

    /// Replaces the whole stats script, discarding the default entry.
    pub fn set_memory_stats(&self, stats: Vec<MemoryStats>) {
        *self.stats.lock().unwrap() = stats.into();
    }

    pub fn set_stats_failing(&self, failing: bool) {
        *self.fail_stats.lock().unwrap() = failing;
    }

    pub fn issued(&self) -> Vec<TransportCommand> {
        self.issued.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }

    pub fn evicted(&self) -> Vec<String> {
        self.evicted.lock().unwrap().clone()
    }

    pub fn gc_requests(&self) -> u32 {
        *self.gc_requests.lock().unwrap()
    }

    fn next_session(&self) -> ScriptedSession {
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        self.steady.lock().unwrap().clone()
    }
}

impl PlayerHost for ScriptedHost {
    fn query_session(&self, _target: &str) -> Result<Option<PlaybackSnapshot>, HostError> {
        match self.next_session() {
            ScriptedSession::Absent => Ok(None),
            ScriptedSession::State(state) => Ok(Some(PlaybackSnapshot::now(state))),
            ScriptedSession::QueryFails(reason) => Err(HostError::Query(reason)),
        }
    }

    fn issue(&self, command: TransportCommand) -> Result<(), HostError> {
        if let Some((failing, reason)) = self.failing_command.lock().unwrap().as_ref() {
            if *failing == command {
                return Err(HostError::Command(reason.clone()));
            }
        }
        self.issued.lock().unwrap().push(command);
        Ok(())
    }

    fn launch(&self, target: &str) -> Result<bool, HostError> {
        self.launches.lock().unwrap().push(target.to_string());
        Ok(*self.launch_ok.lock().unwrap())
    }
}

impl MemoryHost for ScriptedHost {
    fn memory_stats(&self) -> Result<MemoryStats, HostError> {
        if *self.fail_stats.lock().unwrap() {
            return Err(HostError::Memory("stats unavailable".to_string()));
        }
        let mut stats = self.stats.lock().unwrap();
        if stats.len() > 1 {
            Ok(stats.pop_front().unwrap())
        } else {
            stats
                .front()
                .copied()
                .ok_or_else(|| HostError::Memory("no stats scripted".to_string()))
        }
    }

    fn background_work(&self) -> Result<Vec<WorkUnit>, HostError> {
        Ok(self.work.lock().unwrap().clone())
    }

    fn evict(&self, unit: &WorkUnit) -> Result<(), HostError> {
        if self
            .failing_evictions
            .lock()
            .unwrap()
            .iter()
            .any(|name| name == &unit.name)
        {
            return Err(HostError::Memory(format!("cannot evict {}", unit.name)));
        }
        self.evicted.lock().unwrap().push(unit.name.clone());
        Ok(())
    }

    fn advise_gc(&self) {
        *self.gc_requests.lock().unwrap() += 1;
    }
}
