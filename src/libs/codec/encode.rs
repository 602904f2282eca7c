//! Outbound command payloads. The legacy transport takes an ASCII hex
//! string with the type and hardware key embedded; the gateway takes a
//! base64 body with the type carried on the LoRaWAN port.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::MessageKind;
use super::field;

/// An outbound command with everything its payload needs. The caller
/// supplies clock and station values so encoding stays deterministic.
#[derive(Clone, Debug)]
pub enum Command {
    /// Push the basestation clock and local UTC offset to a station.
    TimeSync { epoch_utc: i64, offset_hours: i32 },
    /// Push stored position data to a station.
    StationUpdate {
        latitude: f64,
        longitude: f64,
        altitude: i32,
    },
    /// Ask a station to resend its latest readings.
    DataRequest,
    Reboot,
}

impl Command {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::TimeSync { .. } => MessageKind::TimeSync,
            Self::StationUpdate { .. } => MessageKind::StationUpdate,
            Self::DataRequest => MessageKind::DataRequest,
            Self::Reboot => MessageKind::Reboot,
        }
    }
}

/// A gateway downlink body plus the port that names its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Downlink {
    pub port: u8,
    pub payload_b64: String,
}

/// Build the legacy hex payload: type code, hardware key, then the
/// kind-specific fields.
pub fn encode_serial(cmd: &Command, hardware_key: &str) -> String {
    let code = cmd.kind().code();
    match cmd {
        Command::TimeSync {
            epoch_utc,
            offset_hours,
        } => {
            // The epoch rides along so the station sets its clock in one
            // round trip; the offset is hours only, 16-bit on this path.
            format!(
                "{:02x}{}{:08x}{}",
                code,
                hardware_key,
                epoch_utc,
                field::encode_signed_2c(*offset_hours as i64, 16)
            )
        }
        Command::StationUpdate {
            latitude,
            longitude,
            altitude,
        } => format!(
            "{:02x}{}{}{}{}",
            code,
            hardware_key,
            field::encode_coordinate(scale_coordinate(*latitude)),
            field::encode_coordinate(scale_coordinate(*longitude)),
            field::encode_signed_2c(*altitude as i64, 16)
        ),
        // Type code only; these have no body on the legacy path.
        Command::DataRequest | Command::Reboot => format!("{:02x}", code),
    }
}

/// Build the gateway downlink: the type goes on the port, the body is the
/// kind fields base64-encoded. Bodiless commands send a single zero byte
/// placeholder.
pub fn encode_gateway(cmd: &Command) -> Downlink {
    let body: Vec<u8> = match cmd {
        Command::TimeSync { offset_hours, .. } => {
            // Offset only; the station already has network time. The
            // gateway path narrows the field to one byte.
            vec![field::signed_bits(*offset_hours as i64, 8) as u8]
        }
        Command::StationUpdate {
            latitude,
            longitude,
            altitude,
        } => {
            let mut body = Vec::with_capacity(10);
            body.extend_from_slice(&field::coordinate_bits(scale_coordinate(*latitude)).to_be_bytes());
            body.extend_from_slice(&field::coordinate_bits(scale_coordinate(*longitude)).to_be_bytes());
            body.extend_from_slice(&(field::signed_bits(*altitude as i64, 16) as u16).to_be_bytes());
            body
        }
        Command::DataRequest | Command::Reboot => vec![0],
    };

    Downlink {
        port: cmd.kind().code(),
        payload_b64: BASE64.encode(body),
    }
}

/// Five implied decimals, truncated toward zero like the firmware expects.
fn scale_coordinate(degrees: f64) -> i64 {
    (degrees * 100_000.0) as i64
}
