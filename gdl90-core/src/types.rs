//! Shared types, error enum, and decoded message types for gdl90-core.

use serde::Serialize;
use thiserror::Error;

use crate::enums::{
    AddressType, AlertStatus, EmergencyCode, EmitterCategory, Nacp, Nic, ReportType, TrackType,
};

/// All errors produced by gdl90-core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Gdl90Error {
    #[error("incomplete escape sequence, discarded {discarded} byte partial frame")]
    IncompleteEscape { discarded: usize },
    #[error("stream ended mid-frame, discarded {discarded} bytes")]
    TruncatedFrame { discarded: usize },
    #[error("frame exceeds {max} bytes without a closing flag")]
    OversizedFrame { max: usize },
    #[error("frame too short: {len} bytes")]
    FrameTooShort { len: usize },
    #[error(
        "checksum mismatch on message type {message_type}: computed {computed:#06X}, received {received:#06X}"
    )]
    ChecksumMismatch {
        message_type: u8,
        computed: u16,
        received: u16,
        raw: Vec<u8>,
    },
    #[error("malformed {kind} payload (type {message_type}): expected {expected} bytes, got {actual}")]
    MalformedPayload {
        message_type: u8,
        sub_type: Option<u8>,
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("device-info checksum invalid: computed {computed:#06X}, received {received:#06X}")]
    DeviceInfoChecksum { computed: u16, received: u16 },
    #[error("device-info version {0} not supported")]
    DeviceInfoVersion(u8),
    #[error("IO error: {0}")]
    Io(String),
    #[error("config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for Gdl90Error {
    fn from(e: std::io::Error) -> Self {
        Gdl90Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Gdl90Error>;

/// Fault category, used for counting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Framing,
    Integrity,
    Length,
    Field,
    Io,
    Config,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Framing => "framing",
            FaultKind::Integrity => "integrity",
            FaultKind::Length => "length",
            FaultKind::Field => "field",
            FaultKind::Io => "io",
            FaultKind::Config => "config",
        }
    }
}

impl Gdl90Error {
    pub fn kind(&self) -> FaultKind {
        match self {
            Gdl90Error::IncompleteEscape { .. }
            | Gdl90Error::TruncatedFrame { .. }
            | Gdl90Error::OversizedFrame { .. } => FaultKind::Framing,
            Gdl90Error::FrameTooShort { .. } | Gdl90Error::ChecksumMismatch { .. } => {
                FaultKind::Integrity
            }
            Gdl90Error::MalformedPayload { .. } => FaultKind::Length,
            Gdl90Error::DeviceInfoChecksum { .. } | Gdl90Error::DeviceInfoVersion(_) => {
                FaultKind::Field
            }
            Gdl90Error::Io(_) => FaultKind::Io,
            Gdl90Error::Config(_) => FaultKind::Config,
        }
    }

    /// Message type the fault refers to, when one was known.
    pub fn message_type(&self) -> Option<u8> {
        match self {
            Gdl90Error::ChecksumMismatch { message_type, .. }
            | Gdl90Error::MalformedPayload { message_type, .. } => Some(*message_type),
            Gdl90Error::DeviceInfoChecksum { .. } | Gdl90Error::DeviceInfoVersion(_) => {
                Some(MSG_TYPE_EXTENDED)
            }
            _ => None,
        }
    }

    /// Extended sub-type the fault refers to, when one was known.
    pub fn sub_type(&self) -> Option<u8> {
        match self {
            Gdl90Error::MalformedPayload { sub_type, .. } => *sub_type,
            Gdl90Error::DeviceInfoChecksum { .. } | Gdl90Error::DeviceInfoVersion(_) => {
                Some(SUBTYPE_DEVICE_INFO)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Message type metadata
// ---------------------------------------------------------------------------

pub const MSG_TYPE_HEARTBEAT: u8 = 0;
pub const MSG_TYPE_UPLINK: u8 = 7;
pub const MSG_TYPE_OWNSHIP: u8 = 10;
pub const MSG_TYPE_GEO_ALTITUDE: u8 = 11;
pub const MSG_TYPE_TRAFFIC: u8 = 20;
/// ForeFlight extended message; first payload byte is the sub-type.
pub const MSG_TYPE_EXTENDED: u8 = 101;

pub const SUBTYPE_DEVICE_INFO: u8 = 0;
pub const SUBTYPE_AHRS: u8 = 1;

/// Decodable message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MessageKind {
    Heartbeat,
    Uplink,
    Ownship,
    OwnshipGeoAltitude,
    Traffic,
    DeviceInfo,
    Ahrs,
}

/// Wire metadata for a message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgInfo {
    pub kind: MessageKind,
    pub message_type: u8,
    pub sub_type: Option<u8>,
    pub name: &'static str,
    /// Payload bytes after the message type (and sub-type), before the checksum.
    pub payload_len: usize,
}

/// Known message table.
pub const MSG_TABLE: &[MsgInfo] = &[
    MsgInfo {
        kind: MessageKind::Heartbeat,
        message_type: MSG_TYPE_HEARTBEAT,
        sub_type: None,
        name: "heartbeat",
        payload_len: 6,
    },
    MsgInfo {
        kind: MessageKind::Uplink,
        message_type: MSG_TYPE_UPLINK,
        sub_type: None,
        name: "uplink data",
        payload_len: 435,
    },
    MsgInfo {
        kind: MessageKind::Ownship,
        message_type: MSG_TYPE_OWNSHIP,
        sub_type: None,
        name: "ownship report",
        payload_len: 27,
    },
    MsgInfo {
        kind: MessageKind::OwnshipGeoAltitude,
        message_type: MSG_TYPE_GEO_ALTITUDE,
        sub_type: None,
        name: "ownship geometric altitude",
        payload_len: 4,
    },
    MsgInfo {
        kind: MessageKind::Traffic,
        message_type: MSG_TYPE_TRAFFIC,
        sub_type: None,
        name: "traffic report",
        payload_len: 27,
    },
    MsgInfo {
        kind: MessageKind::DeviceInfo,
        message_type: MSG_TYPE_EXTENDED,
        sub_type: Some(SUBTYPE_DEVICE_INFO),
        name: "device info",
        payload_len: 37,
    },
    MsgInfo {
        kind: MessageKind::Ahrs,
        message_type: MSG_TYPE_EXTENDED,
        sub_type: Some(SUBTYPE_AHRS),
        name: "AHRS",
        payload_len: 10,
    },
];

/// Look up message metadata by type and sub-type. `None` for unsupported kinds.
pub fn msg_info(message_type: u8, sub_type: Option<u8>) -> Option<&'static MsgInfo> {
    MSG_TABLE
        .iter()
        .find(|info| info.message_type == message_type && info.sub_type == sub_type)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A validated (or explicitly unchecked) message split into its routing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub message_type: u8,
    /// Sub-type byte of an extended message.
    pub sub_type: Option<u8>,
    /// Bytes after the message type and sub-type, checksum excluded.
    pub payload: Vec<u8>,
    /// Checksum received with the frame, low byte first on the wire.
    pub checksum: Option<u16>,
}

impl MessageEnvelope {
    /// Build an envelope from a message type and the bytes that follow it.
    ///
    /// For extended messages the first body byte becomes `sub_type`.
    pub fn new(message_type: u8, body: &[u8]) -> Self {
        let (sub_type, payload) = match (message_type, body.split_first()) {
            (MSG_TYPE_EXTENDED, Some((&sub, rest))) => (Some(sub), rest.to_vec()),
            _ => (None, body.to_vec()),
        };
        MessageEnvelope {
            message_type,
            sub_type,
            payload,
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: u16) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Message type, sub-type and payload as they appeared on the wire
    /// (the bytes the frame checksum covers).
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 2);
        out.push(self.message_type);
        if let Some(sub) = self.sub_type {
            out.push(sub);
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive; whitespace is ignored.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for chunk in digits.chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Decoded message types
// ---------------------------------------------------------------------------

/// Message type 0: heartbeat / device status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heartbeat {
    pub gps_position_valid: bool,
    pub maintenance_required: bool,
    pub ident: bool,
    /// Ownship address type talkback (self-assigned address in use).
    pub address_talkback: bool,
    pub gps_battery_low: bool,
    pub ratcs: bool,
    pub uat_initialized: bool,
    pub csa_requested: bool,
    pub csa_not_available: bool,
    pub utc_ok: bool,
    /// Seconds since 0000Z (17 bits).
    pub timestamp_s: u32,
    /// Uplink messages received in the previous second (5 bits).
    pub uplink_count: u8,
    /// Basic and long messages received in the previous second (10 bits).
    pub basic_long_count: u16,
}

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

/// Message types 10 and 20: ownship and traffic reports share one layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficReport {
    pub alert_status: AlertStatus,
    pub address_type: AddressType,
    /// 24-bit participant address.
    pub address: u32,
    /// `None` when latitude, longitude and NIC are all zero.
    pub position: Option<Position>,
    pub pressure_altitude_ft: Option<i32>,
    pub airborne: bool,
    pub report_type: ReportType,
    pub track_type: TrackType,
    pub nic: Nic,
    pub nacp: Nacp,
    pub horizontal_velocity_kts: Option<u16>,
    pub vertical_velocity_fpm: Option<i32>,
    /// `None` when the track type is "not valid".
    pub track_deg: Option<f64>,
    pub emitter_category: EmitterCategory,
    pub callsign: String,
    pub emergency: EmergencyCode,
}

impl TrafficReport {
    /// Address formatted as 6-char uppercase hex.
    pub fn address_hex(&self) -> String {
        format!("{:06X}", self.address & 0xFF_FFFF)
    }
}

/// Message type 11: ownship geometric altitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoAltitude {
    pub geo_altitude_ft: i32,
    pub vertical_warning: bool,
    /// Vertical figure of merit in meters. Saturates at 32766.
    pub vfom_m: Option<u16>,
}

/// Message type 7: UAT uplink, carried opaque.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uplink {
    /// Time of reception in 80 ns ticks since the last second.
    pub time_of_reception: Option<u32>,
    pub payload: Vec<u8>,
}

impl Uplink {
    pub fn time_of_reception_ns(&self) -> Option<u64> {
        self.time_of_reception.map(|t| t as u64 * 80)
    }
}

/// Extended sub-type 0: device identification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub version: u8,
    /// Serial bytes rendered with 0-9 mapped to digits.
    pub serial: String,
    /// Serial as a big-endian integer; `None` when all ones.
    pub serial_number: Option<u64>,
    pub name: String,
    pub long_name: String,
    pub capabilities: u32,
}

impl DeviceInfo {
    /// Capability bit 0: geometric altitude datum is MSL (otherwise WGS-84).
    pub fn geo_altitude_is_msl(&self) -> bool {
        self.capabilities & 0x01 != 0
    }
}

/// Angle in tenths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tenths(pub i16);

impl Tenths {
    pub fn degrees(&self) -> f64 {
        self.0 as f64 / 10.0
    }
}

/// AHRS heading with its true/magnetic discriminator split off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub magnetic: bool,
    /// Magnitude in tenths of a degree (15 bits).
    pub tenths: u16,
}

impl Heading {
    pub fn degrees(&self) -> f64 {
        self.tenths as f64 / 10.0
    }
}

/// Extended sub-type 1: attitude and air data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ahrs {
    /// Positive is right wing down.
    pub roll: Option<Tenths>,
    /// Positive is nose up.
    pub pitch: Option<Tenths>,
    pub heading: Option<Heading>,
    pub indicated_airspeed_kts: Option<u16>,
    pub true_airspeed_kts: Option<u16>,
}

/// Union type for all decoded messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Message {
    Heartbeat(Heartbeat),
    Uplink(Uplink),
    Ownship(TrafficReport),
    OwnshipGeoAltitude(GeoAltitude),
    Traffic(TrafficReport),
    DeviceInfo(DeviceInfo),
    Ahrs(Ahrs),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Heartbeat(_) => MessageKind::Heartbeat,
            Message::Uplink(_) => MessageKind::Uplink,
            Message::Ownship(_) => MessageKind::Ownship,
            Message::OwnshipGeoAltitude(_) => MessageKind::OwnshipGeoAltitude,
            Message::Traffic(_) => MessageKind::Traffic,
            Message::DeviceInfo(_) => MessageKind::DeviceInfo,
            Message::Ahrs(_) => MessageKind::Ahrs,
        }
    }
}

/// A frame whose type or extended sub-type has no decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unsupported {
    pub message_type: u8,
    pub sub_type: Option<u8>,
    pub payload_len: usize,
}

impl std::fmt::Display for Unsupported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sub_type {
            Some(sub) => write!(
                f,
                "unsupported sub-type {sub} of extended message type {}",
                self.message_type
            ),
            None => write!(f, "unsupported message type {}", self.message_type),
        }
    }
}

/// Successful dispatcher outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decoded {
    Message { message: Message },
    /// Best-effort decode whose secondary validation failed.
    Suspect {
        message: Message,
        #[serde(serialize_with = "serialize_display")]
        fault: Gdl90Error,
    },
    Unsupported { unsupported: Unsupported },
}

impl Decoded {
    pub fn message(&self) -> Option<&Message> {
        match self {
            Decoded::Message { message } | Decoded::Suspect { message, .. } => Some(message),
            Decoded::Unsupported { .. } => None,
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Decoded::Message { message } | Decoded::Suspect { message, .. } => Some(message),
            Decoded::Unsupported { .. } => None,
        }
    }
}

fn serialize_display<S: serde::Serializer>(
    value: &Gdl90Error,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_decode() {
        assert_eq!(hex_decode("7E00 81"), Some(vec![0x7E, 0x00, 0x81]));
        assert_eq!(hex_decode("7e0"), None);
        assert_eq!(hex_decode("ZZ"), None);
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x7E, 0x00, 0xB3]), "7E00B3");
    }

    #[test]
    fn test_msg_info() {
        let info = msg_info(MSG_TYPE_EXTENDED, Some(SUBTYPE_DEVICE_INFO)).unwrap();
        assert_eq!(info.payload_len, 37);
        assert_eq!(info.kind, MessageKind::DeviceInfo);
        assert_eq!(msg_info(MSG_TYPE_TRAFFIC, None).unwrap().payload_len, 27);
        assert!(msg_info(MSG_TYPE_EXTENDED, Some(99)).is_none());
        assert!(msg_info(42, None).is_none());
    }

    #[test]
    fn test_envelope_splits_subtype() {
        let env = MessageEnvelope::new(MSG_TYPE_EXTENDED, &[0x01, 0xAA, 0xBB]);
        assert_eq!(env.sub_type, Some(1));
        assert_eq!(env.payload, vec![0xAA, 0xBB]);
        assert_eq!(env.wire_bytes(), vec![101, 0x01, 0xAA, 0xBB]);

        let env = MessageEnvelope::new(MSG_TYPE_HEARTBEAT, &[0x01, 0x00]);
        assert_eq!(env.sub_type, None);
        assert_eq!(env.payload, vec![0x01, 0x00]);
    }

    #[test]
    fn test_empty_extended_has_no_subtype() {
        let env = MessageEnvelope::new(MSG_TYPE_EXTENDED, &[]);
        assert_eq!(env.sub_type, None);
        assert!(env.payload.is_empty());
    }

    #[test]
    fn test_fault_kinds() {
        assert_eq!(
            Gdl90Error::IncompleteEscape { discarded: 3 }.kind(),
            FaultKind::Framing
        );
        assert_eq!(
            Gdl90Error::DeviceInfoChecksum {
                computed: 1,
                received: 2
            }
            .kind(),
            FaultKind::Field
        );
        let err = Gdl90Error::MalformedPayload {
            message_type: 20,
            sub_type: None,
            kind: "traffic report",
            expected: 27,
            actual: 3,
        };
        assert_eq!(err.kind(), FaultKind::Length);
        assert_eq!(err.message_type(), Some(20));
        assert!(err.to_string().contains("expected 27 bytes, got 3"));
    }

    #[test]
    fn test_unsupported_display() {
        let u = Unsupported {
            message_type: 101,
            sub_type: Some(99),
            payload_len: 0,
        };
        assert!(u.to_string().contains("sub-type 99"));
        let u = Unsupported {
            message_type: 42,
            sub_type: None,
            payload_len: 0,
        };
        assert_eq!(u.to_string(), "unsupported message type 42");
    }

    #[test]
    fn test_heading_degrees() {
        let h = Heading {
            magnetic: true,
            tenths: 1234,
        };
        assert!((h.degrees() - 123.4).abs() < 1e-9);
        assert!((Tenths(-15).degrees() + 1.5).abs() < 1e-9);
    }
}
