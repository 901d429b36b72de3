//! Categorical field tables from the GDL90 ICD.
//!
//! Each table maps a small integer code to a named variant, a short label and
//! a description. Reserved or unassigned codes decode to `Unknown(code)` so a
//! partially understood report can still be rendered.

use std::fmt;

use serde::{Serialize, Serializer};

/// Defines an enum, its code table, and the lookup/label helpers.
macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident, $table:ident {
            $($code:literal => $variant:ident, $label:literal, $desc:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown(u8),
        }

        pub const $table: &[(u8, $name, &str, &str)] = &[
            $(($code, $name::$variant, $label, $desc),)+
        ];

        impl $name {
            pub fn from_code(code: u8) -> Self {
                $table
                    .iter()
                    .find(|(c, ..)| *c == code)
                    .map(|(_, v, ..)| *v)
                    .unwrap_or($name::Unknown(code))
            }

            pub fn code(&self) -> u8 {
                match self {
                    $($name::$variant => $code,)+
                    $name::Unknown(c) => *c,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Unknown(_))
            }

            pub fn label(&self) -> &'static str {
                self.entry().map(|e| e.2).unwrap_or("UNKNOWN")
            }

            pub fn description(&self) -> &'static str {
                self.entry().map(|e| e.3).unwrap_or("reserved or unassigned code")
            }

            fn entry(&self) -> Option<&'static (u8, $name, &'static str, &'static str)> {
                $table.iter().find(|(_, v, ..)| v == self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $name::Unknown(c) => write!(f, "UNKNOWN({c})"),
                    _ => f.write_str(self.label()),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

code_table! {
    /// Traffic alert status (high nibble of report byte 1).
    AlertStatus, ALERT_STATUS_TABLE {
        0 => NoAlert, "NO_ALERT", "No alert";
        1 => TrafficAlert, "TRAFFIC_ALERT", "Traffic alert active";
    }
}

code_table! {
    /// Participant address type (low nibble of report byte 1).
    AddressType, ADDRESS_TYPE_TABLE {
        0 => AdsbIcao, "ADS_B_WITH_ICAO_ADDRESS", "ADS-B with ICAO address";
        1 => AdsbSelfAssigned, "ADS_B_WITH_SELF_ASSIGNED", "ADS-B with self-assigned address";
        2 => TisbIcao, "TIS_B_WITH_ICAO_ADDRESS", "TIS-B with ICAO address";
        3 => TisbTrackId, "TIS_B_WITH_TRACK_ID", "TIS-B with track file ID";
        4 => SurfaceVehicle, "SURFACE_VEHICLE", "Surface vehicle";
        5 => GroundStationBeacon, "GROUND_STATION_BEACON", "Ground station beacon";
    }
}

code_table! {
    /// Misc bit 2: whether the report was updated or extrapolated.
    ReportType, REPORT_TYPE_TABLE {
        0 => Updated, "REPORT_UPDATED", "Report updated";
        1 => Extrapolated, "REPORT_EXTRAPOLATED", "Report extrapolated";
    }
}

code_table! {
    /// Misc bits 1-0: meaning of the track/heading byte.
    TrackType, TRACK_TYPE_TABLE {
        0 => Invalid, "INVALID", "Track/heading not valid";
        1 => TrueTrack, "TRUE_TRACK", "True track angle";
        2 => MagneticHeading, "MAG_HEADING", "Heading, magnetic";
        3 => TrueHeading, "TRUE_HEADING", "Heading, true";
    }
}

code_table! {
    /// Navigation Integrity Category (containment radius).
    Nic, NIC_TABLE {
        0 => Unknown0, "NIC_UNKNOWN", "Rc unknown";
        1 => Less20Nm, "NIC_LESS_20NM", "Rc < 20 NM";
        2 => Less8Nm, "NIC_LESS_8NM", "Rc < 8 NM";
        3 => Less4Nm, "NIC_LESS_4NM", "Rc < 4 NM";
        4 => Less2Nm, "NIC_LESS_2NM", "Rc < 2 NM";
        5 => Less1Nm, "NIC_LESS_1NM", "Rc < 1 NM";
        6 => Less0_6Nm, "NIC_LESS_0_6NM", "Rc < 0.6 NM";
        7 => Less0_2Nm, "NIC_LESS_0_2NM", "Rc < 0.2 NM";
        8 => Less0_1Nm, "NIC_LESS_0_1NM", "Rc < 0.1 NM";
        9 => Hpl75mVpl112m, "NIC_HPL_75M_AND_VPL_112M", "HPL < 75 m and VPL < 112 m";
        10 => Hpl25mVpl37m, "NIC_HPL_25M_AND_VPL_37M", "HPL < 25 m and VPL < 37.5 m";
        11 => Hpl7mVpl11m, "NIC_HPL_7M_AND_VPL_11M", "HPL < 7.5 m and VPL < 11 m";
    }
}

code_table! {
    /// Navigation Accuracy Category for position (estimated position uncertainty).
    Nacp, NACP_TABLE {
        0 => Unknown0, "NACP_UNKNOWN", "EPU unknown";
        1 => Less10Nm, "NACP_LESS_10NM", "EPU < 10 NM";
        2 => Less4Nm, "NACP_LESS_4NM", "EPU < 4 NM";
        3 => Less2Nm, "NACP_LESS_2NM", "EPU < 2 NM";
        4 => Less1Nm, "NACP_LESS_1NM", "EPU < 1 NM";
        5 => Less0_5Nm, "NACP_LESS_0_5NM", "EPU < 0.5 NM";
        6 => Less0_3Nm, "NACP_LESS_0_3NM", "EPU < 0.3 NM";
        7 => Less0_1Nm, "NACP_LESS_0_1NM", "EPU < 0.1 NM";
        8 => Less0_05Nm, "NACP_LESS_0_05NM", "EPU < 0.05 NM";
        9 => Hfom30mVfom45m, "NACP_HFOM_30M_AND_VFOM_45M", "HFOM < 30 m and VFOM < 45 m";
        10 => Hfom10mVfom15m, "NACP_HFOM_10M_AND_VFOM_15M", "HFOM < 10 m and VFOM < 15 m";
        11 => Hfom3mVfom4m, "NACP_HFOM_3M_AND_VFOM_4M", "HFOM < 3 m and VFOM < 4 m";
    }
}

code_table! {
    /// Emergency/priority code (high nibble of report byte 27).
    EmergencyCode, EMERGENCY_TABLE {
        0 => None, "NONE", "No emergency";
        1 => General, "GENERAL", "General emergency";
        2 => Medical, "MEDICAL", "Medical emergency";
        3 => MinFuel, "MIN_FUEL", "Minimum fuel";
        4 => NoComm, "NO_COMM", "No communication";
        5 => UnlawfulInterference, "UNLAWFUL_INT", "Unlawful interference";
        6 => Downed, "DOWNED", "Downed aircraft";
    }
}

code_table! {
    /// ADS-B emitter category (report byte 18).
    EmitterCategory, EMITTER_TABLE {
        0 => NoInfo, "NO_INFO", "No aircraft type information";
        1 => Light, "LIGHT", "Light (ICAO) < 15,500 lbs";
        2 => Small, "SMALL", "Small 15,500 to 75,000 lbs";
        3 => Large, "LARGE", "Large 75,000 to 300,000 lbs";
        4 => HighVortex, "HIGH_VORTEX", "High vortex large (e.g. B757)";
        5 => Heavy, "HEAVY", "Heavy (ICAO) > 300,000 lbs";
        6 => HighManeuver, "HIGH_MANEUVER", "Highly maneuverable > 5G acceleration";
        7 => Rotorcraft, "ROTORCRAFT", "Rotorcraft";
        9 => Glider, "GLIDER", "Glider or sailplane";
        10 => LighterThanAir, "LIGHTER_THAN_AIR", "Lighter than air";
        11 => Parachutist, "PARACHUTIST", "Parachutist or sky diver";
        12 => UltraLight, "ULTRA_LIGHT", "Ultra light, hang glider or paraglider";
        14 => Uav, "UAV", "Unmanned aerial vehicle";
        15 => Space, "SPACE", "Space or transatmospheric vehicle";
        17 => SurfaceEmergency, "SURFACE_EMERG", "Surface vehicle, emergency";
        18 => SurfaceService, "SURFACE_SERVICE", "Surface vehicle, service";
        19 => PointObstacle, "POINT_OBSTACLE", "Point obstacle (includes tethered balloons)";
        20 => ClusterObstacle, "CLUSTER_OBST", "Cluster obstacle";
        21 => LineObstacle, "LINE_OBSTACLE", "Line obstacle";
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
