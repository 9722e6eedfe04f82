// ── Versioned device store ──
//
// One mutex over the whole device map. Writers come from two worlds:
// async poll/control paths and the blocking push-listener thread, so
// the lock is a std::sync::Mutex held only for short map operations,
// never across an await.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use vrflow_api::{PollUnit, PushUpdate};

use crate::model::{DeviceRecord, Merge, device_key};

struct Inner {
    devices: HashMap<String, DeviceRecord>,
    /// Monotonic counter, bumped once per applied update.
    version: u64,
}

/// Thread-safe store of the last known state of every discovered unit.
///
/// Records are keyed by `"{oa}_{ia}"`. Only poll snapshots create
/// entries; push updates for unknown keys are dropped, since the push
/// stream carries no control index and a record built from it could
/// never be commanded.
pub struct DeviceStore {
    inner: Mutex<Inner>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                devices: HashMap::new(),
                version: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned map is still structurally sound; keep serving it
        // rather than taking the whole gateway down.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ── Writers ──────────────────────────────────────────────────────

    /// Fold a full discovery snapshot into the store.
    ///
    /// Creates records for new keys and merges into existing ones.
    /// Every unit is restamped with the next version, identical field
    /// values included, and returned in arrival order.
    pub fn apply_poll_snapshot(&self, units: &[PollUnit]) -> Vec<DeviceRecord> {
        let mut inner = self.lock();
        let mut applied = Vec::with_capacity(units.len());

        for unit in units {
            let key = unit.key();
            inner.version += 1;
            let record = match inner.devices.get(&key) {
                Some(existing) => {
                    let mut record = existing.clone();
                    unit.merge_into(&mut record);
                    record.version = inner.version;
                    record
                }
                None => {
                    let record = DeviceRecord::from_poll(unit, inner.version);
                    debug!(key = %record.key(), "discovered unit");
                    record
                }
            };
            inner.devices.insert(key, record.clone());
            applied.push(record);
        }

        applied
    }

    /// Fold one push frame into the store.
    ///
    /// Known keys are always restamped with the next version and
    /// returned, even when the frame repeats the current state.
    /// Returns `None` only when the key is unknown.
    pub fn apply_push_update(&self, update: &PushUpdate) -> Option<DeviceRecord> {
        let mut inner = self.lock();
        let key = update.key();

        let Some(existing) = inner.devices.get(&key) else {
            debug!(%key, "push update for unknown unit, dropping");
            return None;
        };

        let mut record = existing.clone();
        update.merge_into(&mut record);

        inner.version += 1;
        record.version = inner.version;
        inner.devices.insert(key, record.clone());
        Some(record)
    }

    /// Optimistically apply an acknowledged control command.
    ///
    /// The gateway echoes accepted commands on the push stream too, but
    /// callers see the new state immediately instead of waiting for
    /// that round trip. Returns the updated record.
    pub fn apply_control(
        &self,
        oa: u8,
        ia: u8,
        on: u8,
        mode: u8,
        temp_set: u8,
        fan: u8,
    ) -> Option<DeviceRecord> {
        let mut inner = self.lock();
        let key = device_key(oa, ia);

        let existing = inner.devices.get(&key)?;
        let mut record = existing.clone();
        record.on = on;
        record.mode = mode;
        record.temp_set = temp_set;
        record.fan = fan;

        inner.version += 1;
        record.version = inner.version;
        inner.devices.insert(key, record.clone());
        Some(record)
    }

    pub fn clear(&self) {
        self.lock().devices.clear();
    }

    // ── Readers ──────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<DeviceRecord> {
        self.lock().devices.get(key).cloned()
    }

    /// All records, sorted by key for stable presentation.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        let inner = self.lock();
        let mut records: Vec<_> = inner.devices.values().cloned().collect();
        records.sort_by(|a, b| (a.oa, a.ia).cmp(&(b.oa, b.ia)));
        records
    }

    pub fn len(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().devices.is_empty()
    }

    /// Current store version (0 before any update).
    pub fn version(&self) -> u64 {
        self.lock().version
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── VersionGate ──────────────────────────────────────────────────────

/// Per-consumer staleness filter over record versions.
///
/// Updates can reach a consumer out of order once they cross thread and
/// channel boundaries. A gate admits a record when its version is at
/// least the newest one seen so far; ties pass so that a redelivered
/// current state is still applied.
#[derive(Debug, Default)]
pub struct VersionGate {
    newest: u64,
}

impl VersionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `version`, returning `false` for stale updates.
    pub fn admit(&mut self, version: u64) -> bool {
        if version < self.newest {
            return false;
        }
        self.newest = version;
        true
    }
}
