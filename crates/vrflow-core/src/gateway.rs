// ── Gateway abstraction ──
//
// Full lifecycle management for one ZhongHong gateway connection:
// initial discovery over HTTP, the background push listener thread,
// update fan-out, command routing, and orderly shutdown.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vrflow_api::{GatewayClient, GatewayInfo, PushListener};

use crate::bridge::{BridgeMessage, CallbackError, SubscriptionId, UpdateBridge};
use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::model::{DeviceRecord, MAX_TEMP_SET, MIN_TEMP_SET};
use crate::store::DeviceStore;

// ── Gateway ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Owns the HTTP client, the device
/// store, the push listener thread, and the drain task that fans
/// updates out to subscribers.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    config: GatewayConfig,
    client: GatewayClient,
    store: DeviceStore,
    bridge: Arc<UpdateBridge>,
    info: StdMutex<Option<GatewayInfo>>,
    // Taken once by connect() and moved into the listener thread.
    push_connected_tx: StdMutex<Option<watch::Sender<bool>>>,
    push_connected_rx: watch::Receiver<bool>,
    listener: StdMutex<Option<PushListener>>,
    drain: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Gateway {
    /// Create a new Gateway from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to discover devices and start
    /// the push listener.
    pub fn new(config: GatewayConfig) -> Result<Self, CoreError> {
        let client = GatewayClient::new(
            config.host.clone(),
            config.username.clone(),
            config.password.clone(),
            config.http_timeout,
        )?
        .with_http_port(config.http_port);

        let (push_connected_tx, push_connected_rx) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(GatewayInner {
                config,
                client,
                store: DeviceStore::new(),
                bridge: Arc::new(UpdateBridge::new()),
                info: StdMutex::new(None),
                push_connected_tx: StdMutex::new(Some(push_connected_tx)),
                push_connected_rx,
                listener: StdMutex::new(None),
                drain: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the gateway.
    ///
    /// Runs an initial device discovery, caches catalog metadata, and
    /// spawns the push listener thread plus the update drain task. The
    /// discovery must succeed; the push stream connects in the
    /// background and reconnects on its own.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let connected_tx = self
            .inner
            .push_connected_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| CoreError::Internal("gateway already connected".into()))?;

        // A failed discovery must leave the gateway reconnectable, so
        // the sender goes back into its slot before the error surfaces.
        let count = match self.refresh().await {
            Ok(count) => count,
            Err(e) => {
                *self
                    .inner
                    .push_connected_tx
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(connected_tx);
                return Err(e);
            }
        };
        info!(host = %self.inner.config.host, devices = count, "gateway connected");

        let info = self.inner.client.fetch_gateway_info().await;
        debug!(manufacturer = %info.manufacturer, model = %info.model, "gateway catalog");
        *self
            .inner
            .info
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(info);

        // Push frames land on the listener thread; fold them into the
        // store there and hand applied records to the async side.
        let store_handle = self.clone();
        let update_tx = self.inner.bridge.sender();
        let listener = PushListener::spawn(
            self.inner.config.host.clone(),
            self.inner.config.push_port,
            connected_tx,
            move |update| {
                if let Some(record) = store_handle.inner.store.apply_push_update(&update) {
                    let _ = update_tx.send(BridgeMessage::Update(record));
                }
            },
        );
        *self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);

        let drain = self.inner.bridge.spawn_drain(self.inner.cancel.clone());
        *self.inner.drain.lock().await = drain;

        Ok(())
    }

    /// Re-discover all devices over HTTP and fold the snapshot into
    /// the store. Returns the total device count.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let units = self.inner.client.fetch_all_devices().await?;
        let applied = self.inner.store.apply_poll_snapshot(&units);

        // Route through the bridge so poll- and push-sourced updates
        // reach subscribers in one ordered stream.
        let tx = self.inner.bridge.sender();
        for record in applied {
            let _ = tx.send(BridgeMessage::Update(record));
        }

        Ok(self.inner.store.len())
    }

    /// Orderly shutdown: stop the listener thread, let queued updates
    /// drain, then tear down the drain task and clear the store.
    pub async fn shutdown(&self) {
        let listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            // stop() joins the OS thread; keep that off the runtime.
            let joined = tokio::task::spawn_blocking(move || listener.stop()).await;
            if let Err(e) = joined {
                warn!(error = %e, "push listener stop task failed");
            }
        }

        // Producers are gone; the sentinel lets the drain task flush
        // whatever is still queued before exiting.
        let _ = self.inner.bridge.sender().send(BridgeMessage::Shutdown);

        if let Some(drain) = self.inner.drain.lock().await.take() {
            if let Err(e) = drain.await {
                warn!(error = %e, "update drain task failed");
            }
        }
        self.inner.cancel.cancel();

        self.inner.store.clear();
        info!(host = %self.inner.config.host, "gateway shut down");
    }

    // ── State access ─────────────────────────────────────────────────

    /// All known devices, sorted by address.
    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.inner.store.snapshot()
    }

    /// Look up one device by its `"{oa}_{ia}"` key.
    pub fn device(&self, key: &str) -> Result<DeviceRecord, CoreError> {
        self.inner
            .store
            .get(key)
            .ok_or_else(|| CoreError::DeviceNotFound { key: key.into() })
    }

    /// Catalog metadata cached at connect time.
    pub fn gateway_info(&self) -> Option<GatewayInfo> {
        self.inner
            .info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the push stream is currently connected.
    pub fn is_push_connected(&self) -> bool {
        *self.inner.push_connected_rx.borrow()
    }

    /// Watch push-stream connectivity changes.
    pub fn connectivity(&self) -> watch::Receiver<bool> {
        self.inner.push_connected_rx.clone()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a callback invoked for every applied device update,
    /// whether it arrived by push frame, poll refresh, or an
    /// acknowledged command.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceRecord) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.inner.bridge.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.bridge.unsubscribe(id)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Send a control command to one unit.
    ///
    /// `None` fields keep the unit's current value. On acknowledgement
    /// the store is updated immediately rather than waiting for the
    /// gateway to echo the change on the push stream; the returned
    /// record is that optimistic state.
    pub async fn set_unit(
        &self,
        key: &str,
        on: Option<bool>,
        mode: Option<u8>,
        temp_set: Option<u8>,
        fan: Option<u8>,
    ) -> Result<DeviceRecord, CoreError> {
        if let Some(requested) = temp_set {
            if !(MIN_TEMP_SET..=MAX_TEMP_SET).contains(&requested) {
                return Err(CoreError::InvalidCommand {
                    message: format!(
                        "target temperature {requested} outside {MIN_TEMP_SET}-{MAX_TEMP_SET}"
                    ),
                });
            }
        }

        let current = self.device(key)?;

        let on = on.map_or(current.on, u8::from);
        let mode = mode.unwrap_or(current.mode);
        let temp_set = temp_set.unwrap_or(current.temp_set);
        let fan = fan.unwrap_or(current.fan);

        let acknowledged = self
            .inner
            .client
            .send_control(current.idx, on, mode, temp_set, fan)
            .await?;
        if !acknowledged {
            return Err(CoreError::Rejected {
                message: format!("control command for {key} was not acknowledged"),
            });
        }

        let record = self
            .inner
            .store
            .apply_control(current.oa, current.ia, on, mode, temp_set, fan)
            .ok_or_else(|| CoreError::DeviceNotFound { key: key.into() })?;
        let _ = self
            .inner
            .bridge
            .sender()
            .send(BridgeMessage::Update(record.clone()));

        Ok(record)
    }
}
