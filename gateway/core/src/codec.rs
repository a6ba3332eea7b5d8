// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire formats for the two radio links (§3, §6 of the gateway
//! specification).
//!
//! Both formats are fixed-layout, little-endian, and reject any payload that
//! is not exactly the declared length — there is no framing or length
//! prefix, so a wrong-size buffer is the only signal a receiver has that
//! something upstream went wrong.

use crate::error::Error;

/// Length in bytes of a primary-radio (long-range, high-priority) packet.
pub const PRIMARY_PACKET_LEN: usize = 20;

/// Length in bytes of a scout-radio (short-range, low-priority) packet.
pub const SCOUT_PACKET_LEN: usize = 5;

/// A decoded primary-radio packet.
///
/// Wire layout: `(u16 node_id, u8 reserved, u32 bin1, u32 bin2, u32 bin3,
/// f32 reserved, f32 reserved, u8 reserved)`, little-endian, 20 bytes total.
/// Only `node_id`, `bin1`, `bin2`, `bin3` are meaningful to the core; the
/// remaining fields are reserved and discarded on decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryPacket {
    pub node_id: u16,
    pub bin_1_cycles: u32,
    pub bin_2_cycles: u32,
    pub bin_3_cycles: u32,
}

impl PrimaryPacket {
    /// Decodes a 20-byte primary-radio payload.
    ///
    /// Returns [`Error::MalformedPacket`] for any length other than
    /// [`PRIMARY_PACKET_LEN`].
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() != PRIMARY_PACKET_LEN {
            return Err(Error::MalformedPacket {
                radio: "primary",
                detail: format!("expected {PRIMARY_PACKET_LEN} bytes, got {}", buf.len()),
            });
        }
        let node_id = u16::from_le_bytes([buf[0], buf[1]]);
        // buf[2] is the reserved tag byte.
        let bin_1_cycles = u32::from_le_bytes(buf[3..7].try_into().unwrap());
        let bin_2_cycles = u32::from_le_bytes(buf[7..11].try_into().unwrap());
        let bin_3_cycles = u32::from_le_bytes(buf[11..15].try_into().unwrap());
        // buf[15..19] are the two reserved f32 fields, buf[19] the trailing
        // reserved byte.
        Ok(PrimaryPacket {
            node_id,
            bin_1_cycles,
            bin_2_cycles,
            bin_3_cycles,
        })
    }

    /// Encodes back to the 20-byte wire format, zeroing all reserved fields.
    ///
    /// Used by tests to exercise the decode(encode(x)) == x round-trip law.
    pub fn encode(&self) -> [u8; PRIMARY_PACKET_LEN] {
        let mut out = [0u8; PRIMARY_PACKET_LEN];
        out[0..2].copy_from_slice(&self.node_id.to_le_bytes());
        out[3..7].copy_from_slice(&self.bin_1_cycles.to_le_bytes());
        out[7..11].copy_from_slice(&self.bin_2_cycles.to_le_bytes());
        out[11..15].copy_from_slice(&self.bin_3_cycles.to_le_bytes());
        out
    }

    /// Returns the value of one of the three cycle bins by field name, for
    /// alert-rule evaluation. `None` if the name doesn't match a known bin.
    pub fn field(&self, name: &str) -> Option<u32> {
        match name {
            "bin_1_cycles" => Some(self.bin_1_cycles),
            "bin_2_cycles" => Some(self.bin_2_cycles),
            "bin_3_cycles" => Some(self.bin_3_cycles),
            _ => None,
        }
    }
}

/// A decoded scout-radio packet.
///
/// Wire layout: `(u8 node_id, i16 temp_centi_c, u16 humidity_centi_pct)`,
/// little-endian, 5 bytes total. Both scaled fields are divided by 100 on
/// decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoutPacket {
    pub node_id: u8,
    pub temperature_c: f32,
    pub humidity_rh: f32,
}

impl ScoutPacket {
    /// Decodes a 5-byte scout-radio payload.
    ///
    /// Returns [`Error::MalformedPacket`] for any length other than
    /// [`SCOUT_PACKET_LEN`].
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() != SCOUT_PACKET_LEN {
            return Err(Error::MalformedPacket {
                radio: "scout",
                detail: format!("expected {SCOUT_PACKET_LEN} bytes, got {}", buf.len()),
            });
        }
        let node_id = buf[0];
        let temp_scaled = i16::from_le_bytes([buf[1], buf[2]]);
        let humidity_scaled = u16::from_le_bytes([buf[3], buf[4]]);
        Ok(ScoutPacket {
            node_id,
            temperature_c: f32::from(temp_scaled) / 100.0,
            humidity_rh: f32::from(humidity_scaled) / 100.0,
        })
    }

    /// Encodes back to the 5-byte wire format at the same 1/100 scale.
    pub fn encode(&self) -> [u8; SCOUT_PACKET_LEN] {
        let mut out = [0u8; SCOUT_PACKET_LEN];
        out[0] = self.node_id;
        let temp_scaled = (self.temperature_c * 100.0).round() as i16;
        let humidity_scaled = (self.humidity_rh * 100.0).round() as u16;
        out[1..3].copy_from_slice(&temp_scaled.to_le_bytes());
        out[3..5].copy_from_slice(&humidity_scaled.to_le_bytes());
        out
    }
}
