//! Binary frame codec for the gateway's TCP push stream.
//!
//! The gateway pushes unsolicited state-change frames: fixed 25-byte
//! messages with a magic header, a 15-byte payload carrying device
//! state at fixed offsets, and two integrity checks (CRC-16/MODBUS over
//! the first 23 bytes, plus a sum-mod-256 checksum inside the payload).
//!
//! Frames arrive at arbitrary byte offsets within TCP segments, so
//! [`scan`] slides a window over every offset of a receive buffer
//! rather than assuming alignment. Everything here is pure and
//! stateless; the push listener drives it, and tests use it directly.

/// Total frame length on the wire.
pub const FRAME_LEN: usize = 25;

/// Fixed magic header opening every frame.
pub const MAGIC: [u8; 8] = [0x55, 0xAA, 0x00, 0x04, 0x02, 0x01, 0x00, 0x0F];

/// Payload length (bytes 8..23 of the frame).
pub const PAYLOAD_LEN: usize = 15;

/// A decoded state-change candidate from one push frame.
///
/// Field names mirror the vendor protocol. This is a *candidate*
/// update: the store decides whether the device exists and what the
/// merged record looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushUpdate {
    pub grp: u8,
    pub oa: u8,
    pub ia: u8,
    pub on: u8,
    pub temp_set: u8,
    pub mode: u8,
    pub fan: u8,
    pub temp_in: u8,
    pub alarm: u8,
}

impl PushUpdate {
    /// Merge key shared with poll-sourced records: `"{oa}_{ia}"`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.oa, self.ia)
    }
}

/// CRC-16/MODBUS: initial register 0xFFFF, polynomial 0xA001 applied
/// LSB-first, one bit at a time per byte.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Validate one frame and decode its payload.
///
/// Returns `None` unless all of the following hold: the slice is
/// exactly [`FRAME_LEN`] bytes, the magic header matches, the CRC over
/// bytes `[0..23]` equals bytes `[23..25]` (little-endian), and the
/// payload checksum (sum of payload bytes `[0..14]` mod 256) equals the
/// payload's last byte.
pub fn validate(frame: &[u8]) -> Option<PushUpdate> {
    if frame.len() != FRAME_LEN {
        return None;
    }
    if frame[..8] != MAGIC {
        return None;
    }

    let crc = crc16_modbus(&frame[..23]);
    if crc.to_le_bytes() != frame[23..25] {
        return None;
    }

    let payload = &frame[8..8 + PAYLOAD_LEN];
    let sum: u32 = payload[..PAYLOAD_LEN - 1].iter().map(|&b| u32::from(b)).sum();
    if (sum & 0xFF) as u8 != payload[PAYLOAD_LEN - 1] {
        return None;
    }

    Some(decode(payload))
}

/// Map fixed payload offsets to fields. Vendor protocol knowledge --
/// do not reorder.
fn decode(payload: &[u8]) -> PushUpdate {
    PushUpdate {
        grp: payload[0],
        oa: payload[4],
        ia: payload[5],
        on: payload[6],
        temp_set: payload[7],
        mode: payload[8],
        fan: payload[9],
        temp_in: payload[10],
        alarm: payload[11],
    }
}

/// Scan a receive buffer for valid frames at every byte offset.
///
/// Frame boundaries are not aligned to read boundaries and do not
/// necessarily start at offset 0, so each window position is tried
/// independently. Invalid windows are skipped silently.
pub fn scan(buf: &[u8]) -> Vec<PushUpdate> {
    let mut updates = Vec::new();
    if buf.len() < FRAME_LEN {
        return updates;
    }
    for offset in 0..=buf.len() - FRAME_LEN {
        if let Some(update) = validate(&buf[offset..offset + FRAME_LEN]) {
            updates.push(update);
        }
    }
    updates
}

/// Encode a [`PushUpdate`] into a valid wire frame.
///
/// The inverse of [`validate`]; used by test harnesses and gateway
/// simulators. Payload offsets not covered by the update are zero.
pub fn encode(update: &PushUpdate) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..8].copy_from_slice(&MAGIC);

    frame[8] = update.grp;
    frame[12] = update.oa;
    frame[13] = update.ia;
    frame[14] = update.on;
    frame[15] = update.temp_set;
    frame[16] = update.mode;
    frame[17] = update.fan;
    frame[18] = update.temp_in;
    frame[19] = update.alarm;

    let sum: u32 = frame[8..22].iter().map(|&b| u32::from(b)).sum();
    frame[22] = (sum & 0xFF) as u8;

    let crc = crc16_modbus(&frame[..23]);
    frame[23..25].copy_from_slice(&crc.to_le_bytes());
    frame
}
