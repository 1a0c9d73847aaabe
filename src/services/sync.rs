//! Sync service: debounced, single-flight mirroring to the remote store.
//!
//! DESIGN
//! ======
//! One background task owns all automatic pushes for a session. Edits call
//! `SyncHandle::schedule`, which (re)arms a single deadline `delay` in the
//! future; a burst of edits therefore produces one push once the burst goes
//! quiet. Pushes run inline in the worker loop, so at most one is in flight
//! and schedules that arrive meanwhile queue up into exactly one follow-up.
//!
//! `cancel` is acknowledged by the worker loop itself, so it also waits out
//! a push that is already in flight. Destructive actions call it first and
//! their own request is never overtaken by a stale auto-sync.
//!
//! Each push snapshots `FeatureStore::merged_view` at fire time, so it
//! always carries the latest local state rather than the state at
//! schedule time.
//!
//! ERROR HANDLING
//! ==============
//! Local storage is the source of truth. A failed push is logged and
//! published as `SyncStatus::Failed`; there is no retry until the next
//! edit schedules another sync.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::services::remote::RemoteStore;
use crate::services::store::FeatureStore;

const SYNC_COMMAND_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing scheduled and nothing pushed yet.
    Idle,
    /// A push is armed and waiting out the debounce delay.
    Scheduled,
    InFlight,
    /// The last push was accepted with this many features.
    Synced { count: usize },
    /// The last armed push found nothing stored locally.
    Skipped,
    Failed(String),
}

enum SyncCommand {
    Schedule,
    Cancel(oneshot::Sender<bool>),
    Flush(oneshot::Sender<SyncStatus>),
}

/// Cheap, cloneable handle to the session's sync worker.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncCommand>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Arm (or re-arm) the debounced push.
    ///
    /// Uses `try_send`: a full queue already holds a pending schedule, which
    /// coalesces with this one.
    pub fn schedule(&self) {
        match self.tx.try_send(SyncCommand::Schedule) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("sync worker stopped; dropping schedule request");
            }
        }
    }

    /// Drop an armed push and wait until no push is in flight.
    ///
    /// The worker answers commands between pushes, so once this returns any
    /// push that was already running has finished and nothing else will
    /// start until the next `schedule`. Returns whether an armed push was
    /// dropped.
    pub async fn cancel(&self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SyncCommand::Cancel(ack_tx)).await.is_err() {
            warn!("sync worker stopped; cancel ignored");
            return false;
        }
        ack_rx.await.unwrap_or(false)
    }

    /// Run any armed push now and wait for the worker to settle.
    pub async fn flush(&self) -> SyncStatus {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(SyncCommand::Flush(ack_tx)).await.is_err() {
            return self.status();
        }
        ack_rx.await.unwrap_or_else(|_| self.status())
    }

    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }
}

/// Spawn the sync worker. The worker exits once every handle is dropped,
/// running an armed push first.
#[must_use]
pub fn spawn_sync_worker(
    store: FeatureStore,
    remote: Arc<dyn RemoteStore>,
    delay: Duration,
) -> (SyncHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(SYNC_COMMAND_QUEUE_CAPACITY);
    let (status_tx, status_rx) = watch::channel(SyncStatus::Idle);

    info!(site_id = %store.site(), delay_ms = delay.as_millis(), "sync worker started");
    let worker = SyncWorker { store, remote, delay, status: status_tx };
    let task = tokio::spawn(worker.run(rx));

    (SyncHandle { tx, status: status_rx }, task)
}

struct SyncWorker {
    store: FeatureStore,
    remote: Arc<dyn RemoteStore>,
    delay: Duration,
    status: watch::Sender<SyncStatus>,
}

impl SyncWorker {
    async fn run(self, mut rx: mpsc::Receiver<SyncCommand>) {
        let mut deadline: Option<Instant> = None;

        loop {
            let command = match deadline {
                Some(at) => {
                    tokio::select! {
                        command = rx.recv() => command,
                        () = tokio::time::sleep_until(at) => {
                            deadline = None;
                            self.push_now().await;
                            continue;
                        }
                    }
                }
                None => rx.recv().await,
            };

            let Some(command) = command else {
                // EDGE: session ended with a push still armed.
                if deadline.take().is_some() {
                    self.push_now().await;
                }
                break;
            };

            match command {
                SyncCommand::Schedule => {
                    deadline = Some(Instant::now() + self.delay);
                    self.status.send_replace(SyncStatus::Scheduled);
                }
                SyncCommand::Cancel(ack) => {
                    let armed = deadline.take().is_some();
                    if armed {
                        debug!(site_id = %self.store.site(), "armed sync cancelled");
                        self.status.send_replace(SyncStatus::Idle);
                    }
                    let _ = ack.send(armed);
                }
                SyncCommand::Flush(ack) => {
                    if deadline.take().is_some() {
                        self.push_now().await;
                    }
                    let _ = ack.send(self.status.borrow().clone());
                }
            }
        }

        debug!(site_id = %self.store.site(), "sync worker stopped");
    }

    async fn push_now(&self) {
        let site = self.store.site();
        let snapshot = match self.store.merged_view() {
            Ok(Some(collection)) => collection,
            Ok(None) => {
                debug!(site_id = %site, "nothing stored; sync skipped");
                self.status.send_replace(SyncStatus::Skipped);
                return;
            }
            Err(e) => {
                warn!(site_id = %site, error = %e, "sync snapshot failed");
                self.status.send_replace(SyncStatus::Failed(e.to_string()));
                return;
            }
        };

        self.status.send_replace(SyncStatus::InFlight);
        match self.remote.push(site, &snapshot).await {
            Ok(()) => {
                info!(site_id = %site, count = snapshot.len(), "features synced");
                self.status.send_replace(SyncStatus::Synced { count: snapshot.len() });
            }
            Err(e) => {
                warn!(site_id = %site, error = %e, count = snapshot.len(), "sync push failed; local copy kept");
                self.status.send_replace(SyncStatus::Failed(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
