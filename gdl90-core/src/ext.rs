//! ForeFlight extended messages (message type 101).
//!
//! - Sub-type 0: device identification (serial, names, capability mask)
//! - Sub-type 1: AHRS (roll, pitch, heading, IAS, TAS)
//!
//! Payload slices passed here start after the sub-type byte.

use crate::crc;
use crate::types::{
    Ahrs, DeviceInfo, Gdl90Error, Heading, MessageEnvelope, Result, Tenths,
};

pub const DEVICE_INFO_VERSION: u8 = 1;
pub const SERIAL_LEN: usize = 8;
pub const NAME_LEN: usize = 8;
pub const LONG_NAME_LEN: usize = 16;

const ANGLE_INVALID: u16 = 0x7FFF;
const HEADING_INVALID: u16 = 0xFFFF;
const AIRSPEED_INVALID: u16 = 0xFFFF;
const SERIAL_INVALID: u64 = u64::MAX;

// ---------------------------------------------------------------------------
// Device info
// ---------------------------------------------------------------------------

/// Serial number byte convention: codes 0-9 are digits, anything else is
/// taken as the character with that code point.
pub fn serial_char(code: u8) -> char {
    if code <= 9 {
        (b'0' + code) as char
    } else {
        code as char
    }
}

fn decode_name(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Decode the 37 bytes following the device-info sub-type.
pub fn decode_device_info(p: &[u8; 37]) -> DeviceInfo {
    let serial_bytes = &p[1..1 + SERIAL_LEN];
    let mut serial_be = [0u8; SERIAL_LEN];
    serial_be.copy_from_slice(serial_bytes);
    let serial_raw = u64::from_be_bytes(serial_be);

    let name_start = 1 + SERIAL_LEN;
    let long_start = name_start + NAME_LEN;
    let caps_start = long_start + LONG_NAME_LEN;

    DeviceInfo {
        version: p[0],
        serial: serial_bytes.iter().map(|&b| serial_char(b)).collect(),
        serial_number: if serial_raw == SERIAL_INVALID {
            None
        } else {
            Some(serial_raw)
        },
        name: decode_name(&p[name_start..long_start]),
        long_name: decode_name(&p[long_start..caps_start]),
        capabilities: u32::from_be_bytes([
            p[caps_start],
            p[caps_start + 1],
            p[caps_start + 2],
            p[caps_start + 3],
        ]),
    }
}

/// Secondary checks on a decoded device-info message.
///
/// Recomputes the checksum over type, sub-type and payload when the envelope
/// carries the received one, then checks the message version.
pub fn verify_device_info(env: &MessageEnvelope, device: &DeviceInfo) -> Result<()> {
    if let Some(received) = env.checksum {
        let computed = crc::crc16(&env.wire_bytes());
        if computed != received {
            return Err(Gdl90Error::DeviceInfoChecksum { computed, received });
        }
    }
    if device.version != DEVICE_INFO_VERSION {
        return Err(Gdl90Error::DeviceInfoVersion(device.version));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// AHRS
// ---------------------------------------------------------------------------

/// Roll or pitch in tenths of a degree, 0x7FFF invalid.
pub fn decode_attitude_angle(raw: u16) -> Option<Tenths> {
    if raw == ANGLE_INVALID {
        return None;
    }
    Some(Tenths(raw as i16))
}

/// Heading word: bit 15 selects magnetic, bits 14-0 are tenths of a degree.
/// 0xFFFF invalid.
pub fn decode_heading(raw: u16) -> Option<Heading> {
    if raw == HEADING_INVALID {
        return None;
    }
    Some(Heading {
        magnetic: raw & 0x8000 != 0,
        tenths: raw & 0x7FFF,
    })
}

pub fn decode_airspeed(raw: u16) -> Option<u16> {
    if raw == AIRSPEED_INVALID {
        None
    } else {
        Some(raw)
    }
}

/// Decode the 10 bytes following the AHRS sub-type.
pub fn decode_ahrs(p: &[u8; 10]) -> Ahrs {
    let word = |i: usize| u16::from_be_bytes([p[i], p[i + 1]]);
    Ahrs {
        roll: decode_attitude_angle(word(0)),
        pitch: decode_attitude_angle(word(2)),
        heading: decode_heading(word(4)),
        indicated_airspeed_kts: decode_airspeed(word(6)),
        true_airspeed_kts: decode_airspeed(word(8)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
