//! Telemetry message codec: typed messages, the two wire layouts, and the
//! dispatch/encode rules that turn transport frames into readings and
//! outbound commands into payloads.
//!
//! The same logical fields travel in two incompatible layouts. The legacy
//! point-to-point frames embed the message type and hardware key in the
//! payload; the gateway (LoRaWAN) frames move the type to the port number
//! and the identity to the envelope's device EUI, and compress time and
//! pressure against baselines.

use thiserror::Error;

pub mod dispatch;
pub mod encode;
pub mod field;
pub mod frame;

/// Marker id for a frame whose originating device matches no known station.
pub const UNKNOWN_STATION_ID: i32 = -99;

/// Which wire layout a frame uses, with its field offset table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireLayout {
    /// Point-to-point RAK811 serial frames.
    Legacy,
    /// LoRaWAN frames relayed over MQTT.
    Gateway,
}

/// Message type discriminators shared by both layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    WeatherReport,
    StationReport,
    TimeSync,
    StationUpdate,
    DataRequest,
    Reboot,
}

impl MessageKind {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            100 => Some(Self::WeatherReport),
            101 => Some(Self::StationReport),
            200 => Some(Self::TimeSync),
            201 => Some(Self::StationUpdate),
            202 => Some(Self::DataRequest),
            203 => Some(Self::Reboot),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::WeatherReport => 100,
            Self::StationReport => 101,
            Self::TimeSync => 200,
            Self::StationUpdate => 201,
            Self::DataRequest => 202,
            Self::Reboot => 203,
        }
    }
}

/// Radio link quality reported alongside a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkQuality {
    pub rssi: i32,
    pub snr: f64,
}

/// Fields every inbound message carries.
#[derive(Clone, Debug)]
pub struct CommonHeader {
    pub station_id: i32,
    /// `%Y-%m-%d %H:%M:%S` plus an explicit UTC offset suffix.
    pub timestamp: String,
    pub utc_offset_hours: i32,
    pub link: LinkQuality,
}

/// One periodic reading from a station's sensor suite.
#[derive(Clone, Debug)]
pub struct WeatherReport {
    pub header: CommonHeader,
    /// Degrees; -1 when the wind vane is disconnected.
    pub wind_direction: i32,
    pub wind_speed: f64,
    pub wind_gust: f64,
    pub wind_gust_dir: i32,
    pub wind_speed_avg2m: f64,
    pub wind_dir_avg2m: i32,
    pub wind_gust_10m: f64,
    pub wind_gust_dir_10m: i32,
    pub humidity: f64,
    pub temperature: f64,
    pub rain_1h: f64,
    pub rain_today: f64,
    pub rain_since_last: f64,
    pub bar_uncorrected: f64,
    pub bar_corrected: f64,
    /// Battery voltage; only the gateway layout carries it.
    pub voltage: Option<f64>,
}

/// A station reporting its own stored position.
#[derive(Clone, Debug)]
pub struct StationReport {
    pub header: CommonHeader,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i32,
}

/// One decoded inbound message.
///
/// Command kinds are normally outbound, but the legacy channel is shared
/// with other basestations so they can arrive inbound too; they carry
/// nothing beyond the common header and are only ever logged.
#[derive(Clone, Debug)]
pub enum Message {
    Weather(WeatherReport),
    Station(StationReport),
    TimeSync(CommonHeader),
    StationUpdate(CommonHeader),
    DataRequest(CommonHeader),
    Reboot(CommonHeader),
    Unrecognized {
        raw: String,
        link: Option<LinkQuality>,
    },
}

/// Hard per-frame failures: input the codec cannot interpret at all.
/// These abort the offending frame, never the session.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("field {field} is not hexadecimal: {text:?}")]
    NotHex { field: &'static str, text: String },
    #[error("payload ends before field {field} ({len} hex chars)")]
    Truncated { field: &'static str, len: usize },
    #[error("epoch {0} is outside the representable time range")]
    TimeRange(i64),
    #[error("uplink envelope is malformed: {0}")]
    Envelope(String),
    #[error("frm_payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}
