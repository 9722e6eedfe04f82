// ── Device model ──
//
// In-memory representation of one indoor unit, plus the raw register
// values the gateway speaks. Mode and fan are bit values straight off
// the wire; helpers map them to display names.

use serde::Serialize;

use vrflow_api::{PollUnit, PushUpdate};

// ── Operating mode registers ─────────────────────────────────────────

pub const MODE_OFF: u8 = 0;
pub const MODE_COOL: u8 = 1;
pub const MODE_DRY: u8 = 2;
pub const MODE_FAN_ONLY: u8 = 4;
pub const MODE_HEAT: u8 = 8;

// ── Fan speed registers ──────────────────────────────────────────────

pub const FAN_AUTO: u8 = 0;
pub const FAN_HIGH: u8 = 1;
pub const FAN_MEDIUM: u8 = 2;
pub const FAN_LOW: u8 = 4;

/// Lowest settable target temperature (degrees C).
pub const MIN_TEMP_SET: u8 = 16;
/// Highest settable target temperature (degrees C).
pub const MAX_TEMP_SET: u8 = 30;

/// Display name for a mode register value.
pub fn mode_name(mode: u8) -> &'static str {
    match mode {
        MODE_OFF => "off",
        MODE_COOL => "cool",
        MODE_DRY => "dry",
        MODE_FAN_ONLY => "fan_only",
        MODE_HEAT => "heat",
        _ => "unknown",
    }
}

/// Display name for a fan register value.
pub fn fan_name(fan: u8) -> &'static str {
    match fan {
        FAN_AUTO => "auto",
        FAN_HIGH => "high",
        FAN_MEDIUM => "medium",
        FAN_LOW => "low",
        _ => "unknown",
    }
}

/// Canonical identity for a unit: outdoor address + indoor address.
///
/// The group byte is deliberately excluded — it describes zoning, not
/// identity, and the push stream and poll pages agree on `oa`/`ia`.
pub fn device_key(oa: u8, ia: u8) -> String {
    format!("{oa}_{ia}")
}

// ── DeviceRecord ─────────────────────────────────────────────────────

/// Last known state of one indoor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    /// Group/zone byte as reported by the gateway.
    pub grp: u8,
    /// Outdoor (compressor) address.
    pub oa: u8,
    /// Indoor unit address.
    pub ia: u8,
    /// Control index used by the command interface. Only discovery
    /// pages carry it; push frames leave it untouched.
    pub idx: u32,
    /// Power register (0 = off, nonzero = on).
    pub on: u8,
    /// Operating mode register.
    pub mode: u8,
    /// Fan speed register.
    pub fan: u8,
    /// Target temperature, degrees C.
    pub temp_set: u8,
    /// Measured room temperature, degrees C.
    pub temp_in: u8,
    /// Alarm register (0 = none).
    pub alarm: u8,
    /// Store version stamped when this record was last applied.
    pub version: u64,
}

impl DeviceRecord {
    pub fn key(&self) -> String {
        device_key(self.oa, self.ia)
    }

    pub fn is_on(&self) -> bool {
        self.on != 0
    }

    pub fn from_poll(unit: &PollUnit, version: u64) -> Self {
        Self {
            grp: unit.grp,
            oa: unit.oa,
            ia: unit.ia,
            idx: unit.idx,
            on: unit.on,
            mode: unit.mode,
            fan: unit.fan,
            temp_set: unit.temp_set,
            temp_in: unit.temp_in,
            alarm: unit.alarm,
            version,
        }
    }
}

// ── Merging updates into records ─────────────────────────────────────

/// An update that can be folded into an existing [`DeviceRecord`].
///
/// Merging is unconditional: the store restamps the record's version
/// on every applied update, even when the field values are identical.
pub trait Merge {
    fn merge_into(&self, record: &mut DeviceRecord);
}

impl Merge for PushUpdate {
    fn merge_into(&self, record: &mut DeviceRecord) {
        record.grp = self.grp;
        record.on = self.on;
        record.mode = self.mode;
        record.fan = self.fan;
        record.temp_set = self.temp_set;
        record.temp_in = self.temp_in;
        record.alarm = self.alarm;
    }
}

impl Merge for PollUnit {
    fn merge_into(&self, record: &mut DeviceRecord) {
        record.grp = self.grp;
        record.idx = self.idx;
        record.on = self.on;
        record.mode = self.mode;
        record.fan = self.fan;
        record.temp_set = self.temp_set;
        record.temp_in = self.temp_in;
        record.alarm = self.alarm;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record() -> DeviceRecord {
        DeviceRecord {
            grp: 0,
            oa: 1,
            ia: 2,
            idx: 102,
            on: 1,
            mode: MODE_COOL,
            fan: FAN_AUTO,
            temp_set: 24,
            temp_in: 26,
            alarm: 0,
            version: 1,
        }
    }

    #[test]
    fn key_is_oa_underscore_ia() {
        assert_eq!(record().key(), "1_2");
        assert_eq!(device_key(10, 3), "10_3");
    }

    #[test]
    fn push_merge_overwrites_state_fields() {
        let mut rec = record();
        let update = PushUpdate {
            grp: 0,
            oa: 1,
            ia: 2,
            on: 1,
            mode: MODE_HEAT,
            fan: FAN_AUTO,
            temp_set: 24,
            temp_in: 26,
            alarm: 0,
        };
        update.merge_into(&mut rec);
        assert_eq!(rec.mode, MODE_HEAT);
        assert_eq!(rec.temp_set, 24);
    }

    #[test]
    fn push_merge_preserves_idx() {
        let mut rec = record();
        let update = PushUpdate {
            grp: 0,
            oa: 1,
            ia: 2,
            on: 0,
            mode: MODE_OFF,
            fan: FAN_AUTO,
            temp_set: 24,
            temp_in: 26,
            alarm: 0,
        };
        update.merge_into(&mut rec);
        assert_eq!(rec.idx, 102);
    }

    #[test]
    fn register_names() {
        assert_eq!(mode_name(MODE_FAN_ONLY), "fan_only");
        assert_eq!(mode_name(3), "unknown");
        assert_eq!(fan_name(FAN_LOW), "low");
        assert_eq!(fan_name(9), "unknown");
    }
}
