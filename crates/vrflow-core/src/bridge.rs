// ── Cross-thread update bridge ──
//
// The push listener runs on a plain OS thread; consumers live on the
// tokio runtime. The bridge carries updates across that boundary over
// an unbounded channel (the producer must never block on a socket
// read path) and fans them out to registered callbacks from a single
// async drain task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::DeviceRecord;

/// Boxed error returned by subscriber callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Arc<dyn Fn(&DeviceRecord) -> Result<(), CallbackError> + Send + Sync>;

/// Handle for removing a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A message crossing the listener-thread/runtime boundary.
#[derive(Debug, Clone)]
pub enum BridgeMessage {
    Update(DeviceRecord),
    /// Terminates the drain task during orderly shutdown. Queued
    /// updates ahead of it are still delivered.
    Shutdown,
}

pub struct UpdateBridge {
    tx: mpsc::UnboundedSender<BridgeMessage>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<BridgeMessage>>>,
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

impl UpdateBridge {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Producer handle for the listener thread. Sends never block.
    pub fn sender(&self) -> mpsc::UnboundedSender<BridgeMessage> {
        self.tx.clone()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceRecord) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write_subscribers().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.write_subscribers();
        let before = subs.len();
        subs.retain(|(sub_id, _)| *sub_id != id);
        subs.len() != before
    }

    /// Deliver one record to every subscriber.
    ///
    /// Callbacks run on the drain task; the subscriber list is cloned
    /// first so a callback can subscribe or unsubscribe reentrantly.
    pub fn notify(&self, record: &DeviceRecord) {
        let subs: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in subs {
            if let Err(e) = callback(record) {
                warn!(key = %record.key(), error = %e, "subscriber callback failed");
            }
        }
    }

    // ── Drain task ───────────────────────────────────────────────────

    /// Spawn the task that moves messages from the channel to the
    /// subscribers. Runs until a [`BridgeMessage::Shutdown`] arrives,
    /// the cancel token fires, or all senders are dropped.
    ///
    /// The receiver can be taken once; later calls return `None`.
    pub fn spawn_drain(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let mut rx = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        let bridge = Arc::clone(self);

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("update drain cancelled");
                        break;
                    }
                    msg = rx.recv() => match msg {
                        Some(BridgeMessage::Update(record)) => bridge.notify(&record),
                        Some(BridgeMessage::Shutdown) | None => {
                            debug!("update drain finished");
                            break;
                        }
                    },
                }
            }
        }))
    }

    fn write_subscribers(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Vec<(SubscriptionId, Callback)>> {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for UpdateBridge {
    fn default() -> Self {
        Self::new()
    }
}
