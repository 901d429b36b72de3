//! Decode validated GDL90 envelopes into typed messages.
//!
//! Routes on message type, then on sub-type for extended messages:
//! - 0:   Heartbeat (status flags, UTC time stamp, message counts)
//! - 7:   Uplink data (time of reception + opaque UAT uplink payload)
//! - 10:  Ownship report
//! - 11:  Ownship geometric altitude
//! - 20:  Traffic report
//! - 101: ForeFlight extended (sub-type 0 device info, 1 AHRS), see `ext`
//!
//! Payload length is checked against `MSG_TABLE` before any field is read.

use crate::config::DecoderConfig;
use crate::enums::*;
use crate::ext;
use crate::frame;
use crate::types::*;

/// Degrees per LSB of the 24-bit latitude/longitude fields (180 / 2^23).
pub const LATLON_RESOLUTION: f64 = 180.0 / 8_388_608.0;

/// Degrees per LSB of the 8-bit track/heading field.
pub const TRACK_RESOLUTION: f64 = 360.0 / 256.0;

const ALTITUDE_INVALID: u16 = 0xFFF;
const HORIZONTAL_VELOCITY_INVALID: u16 = 0xFFF;
const VERTICAL_VELOCITY_INVALID: u16 = 0x800;
const VFOM_INVALID: u16 = 0x7FFF;
const TOR_INVALID: u32 = 0xFF_FFFF;

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn be_u16(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

/// Sign-extend a 24-bit big-endian two's complement value.
pub fn be_i24(bytes: [u8; 3]) -> i32 {
    let raw = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0]);
    raw >> 8
}

/// Convert a 24-bit lat/lon value to degrees.
pub fn decode_latlon(raw: i32) -> f64 {
    raw as f64 * LATLON_RESOLUTION
}

/// Decode 12-bit pressure altitude: 25-ft steps from -1000 ft, 0xFFF invalid.
pub fn decode_pressure_altitude(code: u16) -> Option<i32> {
    let code = code & 0x0FFF;
    if code == ALTITUDE_INVALID {
        return None;
    }
    Some(code as i32 * 25 - 1000)
}

/// Decode 12-bit horizontal velocity in knots, 0xFFF unavailable.
/// 0xFFE means 4094 kt or more and is kept as 4094.
pub fn decode_horizontal_velocity(code: u16) -> Option<u16> {
    let code = code & 0x0FFF;
    if code == HORIZONTAL_VELOCITY_INVALID {
        return None;
    }
    Some(code)
}

/// Decode 12-bit signed vertical velocity in 64 fpm units, 0x800 unavailable.
pub fn decode_vertical_velocity(code: u16) -> Option<i32> {
    let code = code & 0x0FFF;
    if code == VERTICAL_VELOCITY_INVALID {
        return None;
    }
    let signed = ((code << 4) as i16) >> 4;
    Some(signed as i32 * 64)
}

/// Decode an 8-byte callsign from the restricted set (0-9, A-Z, space).
///
/// Trailing spaces and NULs are trimmed. Bytes outside printable ASCII
/// render as `?`.
pub fn decode_callsign(bytes: &[u8]) -> String {
    let s: String = bytes
        .iter()
        .map(|&b| match b {
            0 => ' ',
            0x20..=0x7E => b as char,
            _ => '?',
        })
        .collect();
    s.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Base message decoders
// ---------------------------------------------------------------------------

/// Message type 0: heartbeat.
///
/// The 17-bit time stamp is split: bit 16 lives in status byte 2, bits 15-0
/// follow LS byte first.
pub fn decode_heartbeat(p: &[u8; 6]) -> Heartbeat {
    let status1 = p[0];
    let status2 = p[1];
    let ts_high = ((status2 >> 7) & 0x01) as u32;
    let timestamp_s = (ts_high << 16) | u16::from_le_bytes([p[2], p[3]]) as u32;

    Heartbeat {
        gps_position_valid: status1 & 0x80 != 0,
        maintenance_required: status1 & 0x40 != 0,
        ident: status1 & 0x20 != 0,
        address_talkback: status1 & 0x10 != 0,
        gps_battery_low: status1 & 0x08 != 0,
        ratcs: status1 & 0x04 != 0,
        uat_initialized: status1 & 0x01 != 0,
        csa_requested: status2 & 0x40 != 0,
        csa_not_available: status2 & 0x20 != 0,
        utc_ok: status2 & 0x01 != 0,
        timestamp_s,
        uplink_count: p[4] >> 3,
        basic_long_count: (((p[4] & 0x03) as u16) << 8) | p[5] as u16,
    }
}

/// Message types 10 and 20: ownship / traffic report.
pub fn decode_traffic_report(p: &[u8; 27]) -> TrafficReport {
    let alert_status = AlertStatus::from_code(p[0] >> 4);
    let address_type = AddressType::from_code(p[0] & 0x0F);
    let address = u32::from_be_bytes([0, p[1], p[2], p[3]]);

    let lat_raw = be_i24([p[4], p[5], p[6]]);
    let lon_raw = be_i24([p[7], p[8], p[9]]);

    // dd dm: 12-bit altitude, then 4-bit misc
    let altitude_code = ((p[10] as u16) << 4) | (p[11] >> 4) as u16;
    let misc = p[11] & 0x0F;
    let airborne = misc & 0x08 != 0;
    let report_type = ReportType::from_code((misc >> 2) & 0x01);
    let track_type = TrackType::from_code(misc & 0x03);

    let nic_code = p[12] >> 4;
    let nic = Nic::from_code(nic_code);
    let nacp = Nacp::from_code(p[12] & 0x0F);

    // hh hv vv: 12-bit horizontal, 12-bit vertical velocity
    let h_code = ((p[13] as u16) << 4) | (p[14] >> 4) as u16;
    let v_code = (((p[14] & 0x0F) as u16) << 8) | p[15] as u16;

    let position = if lat_raw == 0 && lon_raw == 0 && nic_code == 0 {
        None
    } else {
        Some(Position {
            lat_deg: decode_latlon(lat_raw),
            lon_deg: decode_latlon(lon_raw),
        })
    };

    let track_deg = match track_type {
        TrackType::Invalid => None,
        _ => Some(p[16] as f64 * TRACK_RESOLUTION),
    };

    TrafficReport {
        alert_status,
        address_type,
        address,
        position,
        pressure_altitude_ft: decode_pressure_altitude(altitude_code),
        airborne,
        report_type,
        track_type,
        nic,
        nacp,
        horizontal_velocity_kts: decode_horizontal_velocity(h_code),
        vertical_velocity_fpm: decode_vertical_velocity(v_code),
        track_deg,
        emitter_category: EmitterCategory::from_code(p[17]),
        callsign: decode_callsign(&p[18..26]),
        emergency: EmergencyCode::from_code(p[26] >> 4),
    }
}

/// Message type 11: ownship geometric altitude (5-ft resolution, signed).
pub fn decode_geo_altitude(p: &[u8; 4]) -> GeoAltitude {
    let altitude = be_u16(p[0], p[1]) as i16;
    let metrics = be_u16(p[2], p[3]);
    let vfom = metrics & 0x7FFF;

    GeoAltitude {
        geo_altitude_ft: altitude as i32 * 5,
        vertical_warning: metrics & 0x8000 != 0,
        vfom_m: if vfom == VFOM_INVALID { None } else { Some(vfom) },
    }
}

/// Message type 7: uplink. Time of reception is 24 bits, LS byte first.
pub fn decode_uplink(p: &[u8; 435]) -> Uplink {
    let tor = u32::from_le_bytes([p[0], p[1], p[2], 0]);
    Uplink {
        time_of_reception: if tor == TOR_INVALID { None } else { Some(tor) },
        payload: p[3..].to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

fn malformed(env: &MessageEnvelope, kind: &'static str, expected: usize) -> Gdl90Error {
    Gdl90Error::MalformedPayload {
        message_type: env.message_type,
        sub_type: env.sub_type,
        kind,
        expected,
        actual: env.payload.len(),
    }
}

fn fixed<'a, const N: usize>(env: &'a MessageEnvelope, info: &MsgInfo) -> Result<&'a [u8; N]> {
    env.payload
        .as_slice()
        .try_into()
        .map_err(|_| malformed(env, info.name, info.payload_len))
}

/// Decode an envelope with default options.
pub fn decode(env: &MessageEnvelope) -> Result<Decoded> {
    decode_with(env, &DecoderConfig::default())
}

/// Decode an envelope into a message, an unsupported-kind outcome, or a fault.
///
/// With `config.best_effort`, a failed secondary validation (device-info
/// embedded checksum or version) still returns the decoded fields as
/// `Decoded::Suspect`.
pub fn decode_with(env: &MessageEnvelope, config: &DecoderConfig) -> Result<Decoded> {
    if env.message_type == MSG_TYPE_EXTENDED && env.sub_type.is_none() {
        return Err(malformed(env, "extended message", 1));
    }

    let Some(info) = msg_info(env.message_type, env.sub_type) else {
        return Ok(Decoded::Unsupported {
            unsupported: Unsupported {
                message_type: env.message_type,
                sub_type: env.sub_type,
                payload_len: env.payload.len(),
            },
        });
    };

    if env.payload.len() != info.payload_len {
        return Err(malformed(env, info.name, info.payload_len));
    }

    let message = match info.kind {
        MessageKind::Heartbeat => Message::Heartbeat(decode_heartbeat(fixed(env, info)?)),
        MessageKind::Uplink => Message::Uplink(decode_uplink(fixed(env, info)?)),
        MessageKind::Ownship => Message::Ownship(decode_traffic_report(fixed(env, info)?)),
        MessageKind::OwnshipGeoAltitude => {
            Message::OwnshipGeoAltitude(decode_geo_altitude(fixed(env, info)?))
        }
        MessageKind::Traffic => Message::Traffic(decode_traffic_report(fixed(env, info)?)),
        MessageKind::Ahrs => Message::Ahrs(ext::decode_ahrs(fixed(env, info)?)),
        MessageKind::DeviceInfo => {
            let device = ext::decode_device_info(fixed(env, info)?);
            if let Err(fault) = ext::verify_device_info(env, &device) {
                if !config.best_effort {
                    return Err(fault);
                }
                return Ok(Decoded::Suspect {
                    message: Message::DeviceInfo(device),
                    fault,
                });
            }
            Message::DeviceInfo(device)
        }
    };

    Ok(Decoded::Message { message })
}

/// Validate and decode one frame (flags optional, still byte-stuffed).
pub fn decode_frame(data: &[u8]) -> Result<Decoded> {
    decode_frame_with(data, &DecoderConfig::default())
}

pub fn decode_frame_with(data: &[u8], config: &DecoderConfig) -> Result<Decoded> {
    let raw = frame::parse_frame(data)?;
    let env = if config.verify_checksum {
        raw.validate()?
    } else {
        raw.into_envelope_unchecked()?
    };
    decode_with(&env, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc;

    /// Traffic report example from the public ICD (message type byte removed).
    const ICD_TRAFFIC: [u8; 27] = [
        0x00, 0xAB, 0x45, 0x49, 0x1F, 0xEF, 0x15, 0xA8, 0x89, 0x78, 0x0F, 0x09, 0xA9, 0x07, 0xB0,
        0x01, 0x20, 0x01, 0x4E, 0x38, 0x32, 0x35, 0x56, 0x20, 0x20, 0x20, 0x00,
    ];

    fn message(env: &MessageEnvelope) -> Message {
        decode(env).unwrap().into_message().unwrap()
    }

    #[test]
    fn test_be_i24() {
        assert_eq!(be_i24([0x00, 0x00, 0x01]), 1);
        assert_eq!(be_i24([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(be_i24([0x80, 0x00, 0x00]), -8_388_608);
        assert_eq!(be_i24([0x7F, 0xFF, 0xFF]), 8_388_607);
    }

    #[test]
    fn test_pressure_altitude() {
        assert_eq!(decode_pressure_altitude(0x000), Some(-1000));
        assert_eq!(decode_pressure_altitude(0x0F0), Some(5000));
        assert_eq!(decode_pressure_altitude(0xFFE), Some(101_350));
        assert_eq!(decode_pressure_altitude(0xFFF), None);
    }

    #[test]
    fn test_vertical_velocity() {
        assert_eq!(decode_vertical_velocity(0x001), Some(64));
        assert_eq!(decode_vertical_velocity(0xFFF), Some(-64));
        assert_eq!(decode_vertical_velocity(0x000), Some(0));
        assert_eq!(decode_vertical_velocity(0x800), None);
    }

    #[test]
    fn test_horizontal_velocity() {
        assert_eq!(decode_horizontal_velocity(123), Some(123));
        assert_eq!(decode_horizontal_velocity(0xFFE), Some(4094));
        assert_eq!(decode_horizontal_velocity(0xFFF), None);
    }

    #[test]
    fn test_callsign() {
        assert_eq!(decode_callsign(b"N825V   "), "N825V");
        assert_eq!(decode_callsign(&[b'A', b'B', 0x00, 0x00]), "AB");
        assert_eq!(decode_callsign(&[b'A', 0x01, b'B']), "A?B");
    }

    #[test]
    fn test_icd_heartbeat() {
        let hb = decode_heartbeat(&[0x81, 0x41, 0xDB, 0xD0, 0x08, 0x02]);
        assert!(hb.gps_position_valid);
        assert!(hb.uat_initialized);
        assert!(!hb.maintenance_required);
        assert!(hb.csa_requested);
        assert!(hb.utc_ok);
        assert_eq!(hb.timestamp_s, 0xD0DB);
        assert_eq!(hb.uplink_count, 1);
        assert_eq!(hb.basic_long_count, 2);
    }

    #[test]
    fn test_heartbeat_timestamp_bit16() {
        let hb = decode_heartbeat(&[0x00, 0x80, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(hb.timestamp_s, 0x1_0001);
    }

    #[test]
    fn test_heartbeat_sample_end_to_end() {
        // Status byte 1 = 0x01: only "UAT initialized".
        let env = MessageEnvelope::new(MSG_TYPE_HEARTBEAT, &[0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        match message(&env) {
            Message::Heartbeat(hb) => {
                assert!(!hb.gps_position_valid);
                assert!(!hb.maintenance_required);
                assert!(hb.uat_initialized);
                assert_eq!(hb.timestamp_s, 0);
            }
            other => panic!("expected heartbeat, got {other:?}"),
        }

        // Checksum validation over type + payload.
        let mut frame = vec![0x7E, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        frame.extend_from_slice(&crc::crc16_bytes(&frame[1..]));
        frame.push(0x7E);
        assert!(matches!(
            decode_frame(&frame).unwrap().message(),
            Some(Message::Heartbeat(_))
        ));
    }

    #[test]
    fn test_heartbeat_capture_checksum_rejected() {
        // Captured with 0xB4 mangled to 0xFD: the frame must be dropped.
        let frame = [0x7E, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x76, 0x7E];
        match decode_frame(&frame) {
            Err(Gdl90Error::ChecksumMismatch {
                message_type,
                computed,
                received,
                ..
            }) => {
                assert_eq!(message_type, 0);
                assert_eq!(computed, 0x76B4);
                assert_eq!(received, 0x76FD);
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_icd_traffic_report() {
        let r = decode_traffic_report(&ICD_TRAFFIC);
        assert_eq!(r.alert_status, AlertStatus::NoAlert);
        assert_eq!(r.address_type, AddressType::AdsbIcao);
        assert_eq!(r.address, 0xAB4549);
        assert_eq!(r.address_hex(), "AB4549");
        let pos = r.position.unwrap();
        assert!((pos.lat_deg - 44.90708).abs() < 1e-4, "lat {}", pos.lat_deg);
        assert!((pos.lon_deg + 122.99488).abs() < 1e-4, "lon {}", pos.lon_deg);
        assert_eq!(r.pressure_altitude_ft, Some(5000));
        assert!(r.airborne);
        assert_eq!(r.report_type, ReportType::Updated);
        assert_eq!(r.track_type, TrackType::TrueTrack);
        assert_eq!(r.nic, Nic::Hpl25mVpl37m);
        assert_eq!(r.nacp, Nacp::Hfom30mVfom45m);
        assert_eq!(r.horizontal_velocity_kts, Some(123));
        assert_eq!(r.vertical_velocity_fpm, Some(64));
        assert_eq!(r.track_deg, Some(45.0));
        assert_eq!(r.emitter_category, EmitterCategory::Light);
        assert_eq!(r.callsign, "N825V");
        assert_eq!(r.emergency, EmergencyCode::None);
    }

    #[test]
    fn test_traffic_packed_nibbles() {
        let mut p = ICD_TRAFFIC;
        p[0] = 0x13; // alert, TIS-B track file ID
        p[11] = 0x06; // on ground, extrapolated, magnetic heading
        p[12] = 0x5B; // NIC 5, NACp 11
        p[26] = 0x4A; // emergency 4, spare 0xA
        let r = decode_traffic_report(&p);
        assert_eq!(r.alert_status, AlertStatus::TrafficAlert);
        assert_eq!(r.address_type, AddressType::TisbTrackId);
        assert!(!r.airborne);
        assert_eq!(r.report_type, ReportType::Extrapolated);
        assert_eq!(r.track_type, TrackType::MagneticHeading);
        assert_eq!(r.nic, Nic::Less1Nm);
        assert_eq!(r.nacp, Nacp::Hfom3mVfom4m);
        assert_eq!(r.emergency, EmergencyCode::NoComm);
        // altitude high nibble from byte 11 is 0 -> code 0x0F0
        assert_eq!(r.pressure_altitude_ft, Some(5000));
    }

    #[test]
    fn test_traffic_sentinels() {
        let mut p = ICD_TRAFFIC;
        p[10] = 0xFF;
        p[11] = 0xF8; // altitude 0xFFF, airborne, track invalid
        p[13] = 0xFF;
        p[14] = 0xF8;
        p[15] = 0x00; // horizontal 0xFFF, vertical 0x800
        let r = decode_traffic_report(&p);
        assert_eq!(r.pressure_altitude_ft, None);
        assert_eq!(r.track_type, TrackType::Invalid);
        assert_eq!(r.track_deg, None);
        assert_eq!(r.horizontal_velocity_kts, None);
        assert_eq!(r.vertical_velocity_fpm, None);
    }

    #[test]
    fn test_traffic_no_position() {
        let mut p = ICD_TRAFFIC;
        p[4..10].fill(0);
        p[12] = 0x09; // NIC 0
        assert_eq!(decode_traffic_report(&p).position, None);

        // Zero lat/lon with a non-zero NIC is a real position.
        p[12] = 0x19;
        let pos = decode_traffic_report(&p).position.unwrap();
        assert_eq!(pos.lat_deg, 0.0);
    }

    #[test]
    fn test_southern_western_hemisphere() {
        let mut p = ICD_TRAFFIC;
        p[4..7].copy_from_slice(&[0xE0, 0x00, 0x00]); // -2^21 -> -45 deg
        let pos = decode_traffic_report(&p).position.unwrap();
        assert!((pos.lat_deg + 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_ownship_and_traffic_dispatch() {
        let env = MessageEnvelope::new(MSG_TYPE_OWNSHIP, &ICD_TRAFFIC);
        assert!(matches!(message(&env), Message::Ownship(_)));
        let env = MessageEnvelope::new(MSG_TYPE_TRAFFIC, &ICD_TRAFFIC);
        assert!(matches!(message(&env), Message::Traffic(_)));
    }

    #[test]
    fn test_geo_altitude() {
        let g = decode_geo_altitude(&[0x00, 0xC8, 0x00, 0x0A]);
        assert_eq!(g.geo_altitude_ft, 1000);
        assert!(!g.vertical_warning);
        assert_eq!(g.vfom_m, Some(10));

        let g = decode_geo_altitude(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(g.geo_altitude_ft, -5);
        assert!(g.vertical_warning);
        assert_eq!(g.vfom_m, None);
    }

    #[test]
    fn test_uplink() {
        let mut p = [0u8; 435];
        p[0] = 0x10;
        p[1] = 0x27;
        p[3] = 0xAA;
        let u = decode_uplink(&p);
        assert_eq!(u.time_of_reception, Some(10_000));
        assert_eq!(u.time_of_reception_ns(), Some(800_000));
        assert_eq!(u.payload.len(), 432);
        assert_eq!(u.payload[0], 0xAA);

        p[0..3].fill(0xFF);
        assert_eq!(decode_uplink(&p).time_of_reception, None);
    }

    #[test]
    fn test_unknown_message_type_unsupported() {
        let env = MessageEnvelope::new(42, &[1, 2, 3]);
        match decode(&env).unwrap() {
            Decoded::Unsupported { unsupported } => {
                assert_eq!(unsupported.message_type, 42);
                assert_eq!(unsupported.sub_type, None);
                assert_eq!(unsupported.payload_len, 3);
            }
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_extended_subtype_unsupported() {
        let env = MessageEnvelope::new(MSG_TYPE_EXTENDED, &[99, 0x00, 0x01]);
        match decode(&env).unwrap() {
            Decoded::Unsupported { unsupported } => {
                assert_eq!(unsupported.message_type, 101);
                assert_eq!(unsupported.sub_type, Some(99));
            }
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn test_extended_without_subtype_is_malformed() {
        let env = MessageEnvelope::new(MSG_TYPE_EXTENDED, &[]);
        let err = decode(&env).unwrap_err();
        assert_eq!(err.kind(), FaultKind::Length);
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let env = MessageEnvelope::new(MSG_TYPE_TRAFFIC, &ICD_TRAFFIC[..20]);
        match decode(&env) {
            Err(Gdl90Error::MalformedPayload {
                message_type,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(message_type, 20);
                assert_eq!(expected, 27);
                assert_eq!(actual, 20);
            }
            other => panic!("expected malformed payload, got {other:?}"),
        }

        let env = MessageEnvelope::new(MSG_TYPE_HEARTBEAT, &[0; 7]);
        assert!(decode(&env).is_err());
    }

    #[test]
    fn test_decode_frame_unchecked() {
        let frame = [0x7E, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFD, 0x76, 0x7E];
        let config = DecoderConfig {
            verify_checksum: false,
            ..DecoderConfig::default()
        };
        assert!(matches!(
            decode_frame_with(&frame, &config).unwrap().message(),
            Some(Message::Heartbeat(_))
        ));
    }
}
