//! Telemetry frame codec.
//!
//! One compact frame per control tick, StdId 0x100, 6 data bytes:
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 0-1   | speed in 0.1 km/h units, u16 little-endian |
//! | 2-3   | engine RPM, u16 little-endian              |
//! | 4-5   | coolant in 0.1 degC units, i16 little-endian |

use crate::vehicle::VehicleState;

/// Standard identifier of the telemetry frame.
pub const TELEMETRY_STD_ID: u16 = 0x100;

/// Data length of the telemetry frame.
pub const TELEMETRY_DLC: usize = 6;

/// A decoded telemetry frame, back in engineering units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub speed_kph: f32,
    pub engine_rpm: u16,
    pub coolant_temp_c: f32,
}

pub fn encode(vs: &VehicleState) -> [u8; TELEMETRY_DLC] {
    let speed = (vs.speed_kph * 10.0) as u16;
    let temp = (vs.coolant_temp_c * 10.0) as i16;

    let mut out = [0u8; TELEMETRY_DLC];
    out[0..2].copy_from_slice(&speed.to_le_bytes());
    out[2..4].copy_from_slice(&vs.engine_rpm.to_le_bytes());
    out[4..6].copy_from_slice(&temp.to_le_bytes());
    out
}

/// Decode a telemetry payload. Returns `None` when the payload is shorter
/// than [`TELEMETRY_DLC`]; extra trailing bytes are ignored.
pub fn decode(data: &[u8]) -> Option<Telemetry> {
    if data.len() < TELEMETRY_DLC {
        return None;
    }

    let speed = u16::from_le_bytes([data[0], data[1]]);
    let rpm = u16::from_le_bytes([data[2], data[3]]);
    let temp = i16::from_le_bytes([data[4], data[5]]);

    Some(Telemetry {
        speed_kph: f32::from(speed) / 10.0,
        engine_rpm: rpm,
        coolant_temp_c: f32::from(temp) / 10.0,
    })
}
