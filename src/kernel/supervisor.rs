use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::platform::{MemoryHost, PlayerHost};
use crate::store::{StateStore, StatusFanout, WatchdogEvent};

use super::clock::{SharedClock, WatchdogClock};
use super::config::{WatchdogConfig, OWN_WORK_ID};
use super::countdown::CountdownTicker;
use super::reclaim::{MemoryReclaimer, ReclaimPolicy};
use super::reconcile::Reconciler;
use super::refresh::{RefreshCause, RefreshSequencer};

/// Capacity of the refresh queue. One in-flight run plus a few deferred
/// causes; a manual trigger on a full queue is rejected, not dropped
/// silently.
const REFRESH_QUEUE_CAPACITY: usize = 4;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("watchdog is not enabled")]
    NotConnected,
    #[error("refresh queue is full")]
    Busy,
}

struct Connection {
    cancel: CancellationToken,
    refresh_tx: mpsc::Sender<RefreshCause>,
}

/// Owns the watchdog's periodic tasks and their shared state. `connect`
/// arms everything under one cancellation token; `disconnect` cancels
/// them all at once - there is no partial teardown.
pub struct Supervisor {
    config: WatchdogConfig,
    player: Arc<dyn PlayerHost>,
    memory: Arc<dyn MemoryHost>,
    clock: SharedClock,
    fanout: StatusFanout,
    connection: Mutex<Option<Connection>>,
}

impl Supervisor {
    pub fn new(
        config: WatchdogConfig,
        player: Arc<dyn PlayerHost>,
        memory: Arc<dyn MemoryHost>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let clock = WatchdogClock::starting_now();
        let fanout = StatusFanout::new(store, clock.clone());
        Self {
            config,
            player,
            memory,
            clock,
            fanout,
            connection: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchdogEvent> {
        self.fanout.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock().unwrap().is_some()
    }

    /// Arms all periodic tasks. Reconnecting while connected tears the
    /// previous set down first.
    pub fn connect(&self) {
        self.disconnect();

        let cancel = CancellationToken::new();
        let (refresh_tx, mut refresh_rx) = mpsc::channel::<RefreshCause>(REFRESH_QUEUE_CAPACITY);

        self.clock.lock().unwrap().last_refresh_at = Instant::now();

        // Reconciliation loop, first tick immediate.
        let reconciler = Reconciler::new(self.player.clone(), self.config.target_id.clone());
        tokio::spawn(reconciler.run(self.config.check_interval(), cancel.clone()));

        // Refresh cadence: feeds the worker queue on its own timer,
        // independent of manual triggers. First tick fires immediately.
        let cadence_tx = refresh_tx.clone();
        let cadence_cancel = cancel.clone();
        let refresh_interval = self.config.refresh_interval();
        tokio::spawn(async move {
            let mut cadence = tokio::time::interval(refresh_interval);
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cadence_cancel.cancelled() => break,
                    _ = cadence.tick() => {
                        if cadence_tx.send(RefreshCause::Scheduled).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // Refresh worker: the queue's only consumer, so runs are strictly
        // serialized. A manual trigger arriving mid-run waits its turn.
        let sequencer = RefreshSequencer::new(
            self.player.clone(),
            self.config.target_id.clone(),
            self.fanout.clone(),
            self.clock.clone(),
        );
        let reclaimer = MemoryReclaimer::new(
            self.memory.clone(),
            ReclaimPolicy::new(self.config.target_id.clone(), OWN_WORK_ID),
            self.config.cache_dir.clone(),
        );
        let worker_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_cancel.cancelled() => break,
                    cause = refresh_rx.recv() => {
                        let Some(cause) = cause else { break };
                        let outcome = sequencer.run(cause).await;
                        if outcome.failed() {
                            warn!(run = %outcome.run, "deep refresh failed, next cycle will retry");
                        }
                        reclaimer.run();
                    }
                }
            }
        });

        // Countdown ticker.
        let ticker = CountdownTicker::new(self.clock.clone(), self.fanout.clone(), refresh_interval);
        tokio::spawn(ticker.run(cancel.clone()));

        *self.connection.lock().unwrap() = Some(Connection { cancel, refresh_tx });
        info!(player = %self.config.target_id, "watchdog connected, supervision armed");
    }

    /// Cancels every periodic task together. All-or-nothing.
    pub fn disconnect(&self) {
        if let Some(connection) = self.connection.lock().unwrap().take() {
            connection.cancel.cancel();
            info!("watchdog disconnected, supervision stopped");
        }
    }

    /// External one-shot refresh request, outside the regular cadence.
    /// Does not touch the automatic timer; a manual and a scheduled run
    /// may land back to back.
    pub fn trigger_refresh(&self) -> Result<(), TriggerError> {
        let guard = self.connection.lock().unwrap();
        let connection = guard.as_ref().ok_or(TriggerError::NotConnected)?;
        self.fanout.publish_status("Manual refresh requested...");
        connection
            .refresh_tx
            .try_send(RefreshCause::Manual)
            .map_err(|_| TriggerError::Busy)
    }
}
