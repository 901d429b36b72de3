//! CRC-16-CCITT frame check for GDL90 messages.
//!
//! Polynomial x^16 + x^12 + x^5 + 1 (0x1021), initial value 0, no final XOR.
//! The checksum covers the message type and payload and is appended low byte
//! first, before byte stuffing.

const GENERATOR: u16 = 0x1021;

// ---------------------------------------------------------------------------
// CRC lookup table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ GENERATOR;
            } else {
                crc <<= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u16; 256] = build_crc_table();

// ---------------------------------------------------------------------------
// Core CRC functions
// ---------------------------------------------------------------------------

/// CRC-16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc = CRC_TABLE[(crc >> 8) as usize] ^ (crc << 8) ^ byte as u16;
    }
    crc
}

/// Checksum bytes as they appear on the wire (low byte first).
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}

/// Received checksum of an unescaped frame (last two bytes, low byte first).
pub fn frame_checksum(frame: &[u8]) -> Option<u16> {
    match frame {
        [.., lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// CRC over everything preceding the trailing checksum.
pub fn frame_crc(frame: &[u8]) -> Option<u16> {
    if frame.len() < 2 {
        return None;
    }
    Some(crc16(&frame[..frame.len() - 2]))
}

/// True when the trailing checksum matches the bytes before it.
pub fn verify(frame: &[u8]) -> bool {
    match (frame_crc(frame), frame_checksum(frame)) {
        (Some(computed), Some(received)) => computed == received,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
