//! Text and JSON rendering of stream events.

use serde_json::{json, Value};

use gdl90_core::config::OutputFormat;
use gdl90_core::types::*;
use gdl90_core::{StreamEvent, StreamStats};

/// Renders one line (or one JSON object) per event.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub format: OutputFormat,
    /// Include the raw frame bytes.
    pub hex: bool,
}

impl Renderer {
    pub fn new(format: OutputFormat, hex: bool) -> Self {
        Renderer { format, hex }
    }

    pub fn event(&self, event: &StreamEvent) -> String {
        match event {
            StreamEvent::Decoded { decoded, raw } => self.decoded(decoded, Some(raw)),
            StreamEvent::Fault(fault) => self.fault(fault),
        }
    }

    pub fn decoded(&self, decoded: &Decoded, raw: Option<&[u8]>) -> String {
        let raw = raw.filter(|_| self.hex);
        match self.format {
            OutputFormat::Text => {
                let line = match decoded {
                    Decoded::Message { message } => message_line(message),
                    Decoded::Suspect { message, fault } => {
                        format!("SUSPECT({fault}) {}", message_line(message))
                    }
                    Decoded::Unsupported { unsupported } => {
                        format!("UNSUPPORTED {unsupported} ({} bytes)", unsupported.payload_len)
                    }
                };
                match raw {
                    Some(bytes) => format!("{line}\n  raw: {}", hex_encode(bytes)),
                    None => line,
                }
            }
            OutputFormat::Json => {
                let mut value = serde_json::to_value(decoded).unwrap_or(json!({}));
                if let (Some(bytes), Value::Object(map)) = (raw, &mut value) {
                    map.insert("raw".into(), Value::String(hex_encode(bytes)));
                }
                value.to_string()
            }
        }
    }

    pub fn fault(&self, fault: &Gdl90Error) -> String {
        let raw = match fault {
            Gdl90Error::ChecksumMismatch { raw, .. } if self.hex => Some(raw.as_slice()),
            _ => None,
        };
        match self.format {
            OutputFormat::Text => {
                let line = format!("FAULT [{}] {fault}", fault.kind().as_str());
                match raw {
                    Some(bytes) => format!("{line}\n  raw: {}", hex_encode(bytes)),
                    None => line,
                }
            }
            OutputFormat::Json => {
                let mut value = json!({
                    "error": fault.to_string(),
                    "kind": fault.kind(),
                    "message_type": fault.message_type(),
                    "sub_type": fault.sub_type(),
                });
                if let (Some(bytes), Value::Object(map)) = (raw, &mut value) {
                    map.insert("raw".into(), Value::String(hex_encode(bytes)));
                }
                value.to_string()
            }
        }
    }

    /// End-of-run statistics as one JSON object.
    pub fn summary_json(&self, stats: &StreamStats) -> String {
        json!({ "summary": serde_json::to_value(stats).unwrap_or(json!({})) }).to_string()
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or("-".into())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Single-line text form of a decoded message.
pub fn message_line(message: &Message) -> String {
    match message {
        Message::Heartbeat(hb) => heartbeat_line(hb),
        Message::Ownship(r) => format!("OWNSHIP  {}", report_line(r)),
        Message::Traffic(r) => format!("TRAFFIC  {}", report_line(r)),
        Message::OwnshipGeoAltitude(g) => format!(
            "GEO_ALT  alt={}ft vfom={}m warning={}",
            g.geo_altitude_ft,
            opt(g.vfom_m),
            yes_no(g.vertical_warning)
        ),
        Message::Uplink(u) => format!(
            "UPLINK   tor={}ns bytes={}",
            opt(u.time_of_reception_ns()),
            u.payload.len()
        ),
        Message::DeviceInfo(d) => format!(
            "DEVICE   {} ({}) serial={} caps=0x{:08X} geo_alt={}",
            d.name,
            d.long_name,
            d.serial,
            d.capabilities,
            if d.geo_altitude_is_msl() { "MSL" } else { "WGS-84" }
        ),
        Message::Ahrs(a) => format!(
            "AHRS     roll={} pitch={} hdg={} ias={}kt tas={}kt",
            opt(a.roll.map(|r| format!("{:.1}", r.degrees()))),
            opt(a.pitch.map(|p| format!("{:.1}", p.degrees()))),
            opt(a.heading.map(|h| format!(
                "{:.1}{}",
                h.degrees(),
                if h.magnetic { "M" } else { "T" }
            ))),
            opt(a.indicated_airspeed_kts),
            opt(a.true_airspeed_kts)
        ),
    }
}

fn heartbeat_line(hb: &Heartbeat) -> String {
    let mut flags = Vec::new();
    if hb.maintenance_required {
        flags.push("MAINT");
    }
    if hb.ident {
        flags.push("IDENT");
    }
    if hb.address_talkback {
        flags.push("ADDR_TALKBACK");
    }
    if hb.gps_battery_low {
        flags.push("GPS_BATT_LOW");
    }
    if hb.ratcs {
        flags.push("RATCS");
    }
    if hb.csa_requested {
        flags.push("CSA_REQ");
    }
    if hb.csa_not_available {
        flags.push("CSA_NA");
    }

    let mut line = format!(
        "HEARTBEAT gps={} uat_init={} utc={} time={}s uplink={} basic_long={}",
        if hb.gps_position_valid { "valid" } else { "invalid" },
        yes_no(hb.uat_initialized),
        yes_no(hb.utc_ok),
        hb.timestamp_s,
        hb.uplink_count,
        hb.basic_long_count
    );
    if !flags.is_empty() {
        line.push_str(&format!(" [{}]", flags.join(",")));
    }
    line
}

fn report_line(r: &TrafficReport) -> String {
    let callsign = if r.callsign.is_empty() {
        "-"
    } else {
        r.callsign.as_str()
    };
    format!(
        "{} {:<8} alt={}ft pos={} gs={}kt vs={}fpm trk={} {} nic={} nacp={} emitter={} alert={} emergency={}{}",
        r.address_hex(),
        callsign,
        opt(r.pressure_altitude_ft),
        opt(r.position.map(|p| format!("{:.5},{:.5}", p.lat_deg, p.lon_deg))),
        opt(r.horizontal_velocity_kts),
        opt(r.vertical_velocity_fpm.map(|v| format!("{v:+}"))),
        opt(r.track_deg.map(|t| format!("{t:.1}"))),
        r.track_type,
        r.nic,
        r.nacp,
        r.emitter_category,
        r.alert_status,
        r.emergency,
        if r.airborne { "" } else { " ON_GROUND" }
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
