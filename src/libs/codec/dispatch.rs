//! Message dispatch: resolve the originating station, decode the common
//! header, then decode kind-specific fields through the layout's offset
//! table. One decode path serves both layouts; only the tables differ.

use chrono::DateTime;

use super::field::{
    self, BASELINE_PRESSURE, BASELINE_TEMPERATURE, BASELINE_TIME, THRESHOLD_ALTITUDE_16,
    THRESHOLD_COORD_32, THRESHOLD_DIR_12, THRESHOLD_SENSOR_16,
};
use super::frame::{GatewayUplink, SerialFrame};
use super::{
    CodecError, CommonHeader, LinkQuality, Message, MessageKind, StationReport, WeatherReport,
    WireLayout, UNKNOWN_STATION_ID,
};
use crate::libs::station::{Station, StationDirectory};

/// Hex-character range of one field within a payload.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Span {
    start: usize,
    end: usize,
}

const fn sp(start: usize, end: usize) -> Span {
    Span { start, end }
}

/// A signed field's width and negative-range threshold.
#[derive(Clone, Copy, Debug)]
struct SignedSpec {
    width_bits: u32,
    threshold: u32,
}

/// A wind-direction field; decoded signed only where the layout says so.
#[derive(Clone, Copy, Debug)]
struct DirField {
    span: Span,
    signed: Option<SignedSpec>,
}

const fn dir(span: Span, signed: Option<SignedSpec>) -> DirField {
    DirField { span, signed }
}

const DIR_12: Option<SignedSpec> = Some(SignedSpec {
    width_bits: 12,
    threshold: THRESHOLD_DIR_12,
});
const DIR_16: Option<SignedSpec> = Some(SignedSpec {
    width_bits: 16,
    threshold: THRESHOLD_SENSOR_16,
});

struct WeatherTable {
    wind_dir: DirField,
    wind_speed: Span,
    wind_gust: Span,
    wind_gust_dir: DirField,
    wind_speed_avg2m: Span,
    wind_dir_avg2m: DirField,
    wind_gust_10m: Span,
    wind_gust_dir_10m: DirField,
    humidity: Span,
    temperature: Span,
    rain_1h: Span,
    rain_today: Span,
    rain_since_last: Span,
    bar_uncorrected: Span,
    bar_corrected: Span,
    voltage: Option<Span>,
}

struct StationTable {
    latitude: Span,
    longitude: Span,
    altitude: Span,
}

/// Everything that differs between the two wire layouts.
struct LayoutTable {
    time: Span,
    timezone: Span,
    /// Legacy decodes the timezone signed; the gateway byte is informational.
    timezone_signed: bool,
    time_baseline: i64,
    pressure_baseline: f64,
    temperature_baseline: f64,
    weather: WeatherTable,
    station: StationTable,
}

/// Legacy serial: type(2) + hardware_key(16) + epoch(8) + timezone(4),
/// kind payload from hex char 30. Only the primary wind direction is
/// sign-treated, over the full 16-bit field.
static LEGACY: LayoutTable = LayoutTable {
    time: sp(18, 26),
    timezone: sp(26, 30),
    timezone_signed: true,
    time_baseline: 0,
    pressure_baseline: 0.0,
    temperature_baseline: 0.0,
    weather: WeatherTable {
        wind_dir: dir(sp(30, 34), DIR_16),
        wind_speed: sp(34, 38),
        wind_gust: sp(38, 42),
        wind_gust_dir: dir(sp(42, 46), None),
        wind_speed_avg2m: sp(46, 50),
        wind_dir_avg2m: dir(sp(50, 54), None),
        wind_gust_10m: sp(54, 58),
        wind_gust_dir_10m: dir(sp(58, 62), None),
        humidity: sp(62, 66),
        temperature: sp(66, 70),
        rain_1h: sp(70, 74),
        rain_today: sp(74, 78),
        rain_since_last: sp(78, 82),
        bar_uncorrected: sp(82, 90),
        bar_corrected: sp(90, 98),
        voltage: None,
    },
    station: StationTable {
        latitude: sp(30, 38),
        longitude: sp(38, 46),
        altitude: sp(46, 50),
    },
};

/// Gateway LoRaWAN: offset_time(8) + timezone(2), kind payload from hex
/// char 10. Direction fields shrink to 12 bits and all four carry the -1
/// disconnected-sensor sentinel.
static GATEWAY: LayoutTable = LayoutTable {
    time: sp(0, 8),
    timezone: sp(8, 10),
    timezone_signed: false,
    time_baseline: BASELINE_TIME,
    pressure_baseline: BASELINE_PRESSURE,
    temperature_baseline: BASELINE_TEMPERATURE,
    weather: WeatherTable {
        wind_dir: dir(sp(10, 13), DIR_12),
        wind_speed: sp(13, 17),
        wind_gust: sp(17, 21),
        wind_gust_dir: dir(sp(21, 24), DIR_12),
        wind_speed_avg2m: sp(24, 28),
        wind_dir_avg2m: dir(sp(28, 31), DIR_12),
        wind_gust_10m: sp(31, 35),
        wind_gust_dir_10m: dir(sp(35, 38), DIR_12),
        humidity: sp(38, 42),
        temperature: sp(42, 46),
        rain_1h: sp(46, 50),
        rain_today: sp(50, 54),
        rain_since_last: sp(54, 58),
        bar_uncorrected: sp(58, 62),
        bar_corrected: sp(62, 66),
        voltage: Some(sp(66, 70)),
    },
    station: StationTable {
        latitude: sp(10, 18),
        longitude: sp(18, 26),
        altitude: sp(26, 30),
    },
};

const MESSAGE_TYPE: Span = sp(0, 2);
const HARDWARE_KEY: Span = sp(2, 18);

impl WireLayout {
    fn table(&self) -> &'static LayoutTable {
        match self {
            WireLayout::Legacy => &LEGACY,
            WireLayout::Gateway => &GATEWAY,
        }
    }
}

/// How the frame's identity resolved against the station directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StationMatch {
    /// The frame belongs to the session's active station (legacy) or a
    /// directory station (gateway).
    Matched(i32),
    /// Legacy frame overheard from another basestation's station.
    Foreign(i32),
    /// No directory entry; carries the sentinel id.
    Unknown,
}

impl StationMatch {
    pub fn station_id(&self) -> i32 {
        match self {
            Self::Matched(id) | Self::Foreign(id) => *id,
            Self::Unknown => UNKNOWN_STATION_ID,
        }
    }
}

/// A dispatched frame: the typed message plus how its station resolved.
/// Resolution is absent when the frame never reached identity handling.
#[derive(Clone, Debug)]
pub struct Dispatch {
    pub message: Message,
    pub resolution: Option<StationMatch>,
}

/// Dispatch one legacy serial frame. The caller-selected active station is
/// trusted, but the embedded hardware key is cross-checked: a mismatch
/// re-resolves against the directory.
pub fn dispatch_serial(
    frame: &SerialFrame,
    active: &Station,
    directory: &StationDirectory,
) -> Result<Dispatch, CodecError> {
    let payload = frame.payload_hex.as_str();

    let code = field::decode_unsigned("message_type", slice(payload, "message_type", MESSAGE_TYPE)?)?;
    let Some(kind) = MessageKind::from_code(code as u32) else {
        return Ok(Dispatch {
            message: Message::Unrecognized {
                raw: payload.to_string(),
                link: Some(frame.link.clone()),
            },
            resolution: None,
        });
    };

    let hardware_key = slice(payload, "hardware_key", HARDWARE_KEY)?;
    let resolution = if hardware_key.eq_ignore_ascii_case(&active.identity_key) {
        StationMatch::Matched(active.id)
    } else {
        resolve(directory, hardware_key)
    };

    let header = common_header(
        payload,
        WireLayout::Legacy,
        resolution.station_id(),
        frame.link.clone(),
    )?;
    Ok(Dispatch {
        message: decode_kind(kind, payload, WireLayout::Legacy, header)?,
        resolution: Some(resolution),
    })
}

/// Dispatch one gateway uplink. Identity comes solely from the envelope's
/// device EUI; the port number is the type discriminator.
pub fn dispatch_gateway(
    uplink: &GatewayUplink,
    directory: &StationDirectory,
) -> Result<Dispatch, CodecError> {
    let payload = uplink.payload_hex.as_str();

    let kind = uplink.port.and_then(MessageKind::from_code);
    let Some(kind) = kind else {
        return Ok(Dispatch {
            message: Message::Unrecognized {
                raw: payload.to_string(),
                link: Some(uplink.link.clone()),
            },
            resolution: None,
        });
    };

    let resolution = match directory.resolve_key(&uplink.device_eui) {
        UNKNOWN_STATION_ID => StationMatch::Unknown,
        id => StationMatch::Matched(id),
    };

    let header = common_header(
        payload,
        WireLayout::Gateway,
        resolution.station_id(),
        uplink.link.clone(),
    )?;
    Ok(Dispatch {
        message: decode_kind(kind, payload, WireLayout::Gateway, header)?,
        resolution: Some(resolution),
    })
}

fn resolve(directory: &StationDirectory, key: &str) -> StationMatch {
    match directory.resolve_key(key) {
        UNKNOWN_STATION_ID => StationMatch::Unknown,
        id => StationMatch::Foreign(id),
    }
}

fn common_header(
    payload: &str,
    layout: WireLayout,
    station_id: i32,
    link: LinkQuality,
) -> Result<CommonHeader, CodecError> {
    let table = layout.table();

    let wire_time = unsigned(payload, "time", table.time)?;
    let epoch = wire_time + table.time_baseline;

    let utc_offset_hours = if table.timezone_signed {
        field::decode_signed_2c(
            "timezone",
            slice(payload, "timezone", table.timezone)?,
            16,
            THRESHOLD_SENSOR_16,
        )? as i32
    } else {
        unsigned(payload, "timezone", table.timezone)? as i32
    };

    Ok(CommonHeader {
        station_id,
        timestamp: render_timestamp(epoch, utc_offset_hours, layout)?,
        utc_offset_hours,
        link,
    })
}

/// `%Y-%m-%d %H:%M:%S` plus an explicit offset. The station RTCs are not
/// timezone-aware, so the suffix is appended manually: the legacy signed
/// whole-hour offset, or `+00:00` for the baseline-corrected gateway time.
fn render_timestamp(epoch: i64, offset_hours: i32, layout: WireLayout) -> Result<String, CodecError> {
    let utc = DateTime::from_timestamp(epoch, 0)
        .ok_or(CodecError::TimeRange(epoch))?
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S");

    match layout {
        WireLayout::Gateway => Ok(format!("{}+00:00", utc)),
        WireLayout::Legacy => {
            let sign = if offset_hours < 0 { '-' } else { '+' };
            Ok(format!("{}{}{:02}:00", utc, sign, offset_hours.abs()))
        }
    }
}

fn decode_kind(
    kind: MessageKind,
    payload: &str,
    layout: WireLayout,
    header: CommonHeader,
) -> Result<Message, CodecError> {
    match kind {
        MessageKind::WeatherReport => {
            Ok(Message::Weather(decode_weather(payload, layout, header)?))
        }
        MessageKind::StationReport => {
            Ok(Message::Station(decode_station(payload, layout, header)?))
        }
        MessageKind::TimeSync => Ok(Message::TimeSync(header)),
        MessageKind::StationUpdate => Ok(Message::StationUpdate(header)),
        MessageKind::DataRequest => Ok(Message::DataRequest(header)),
        MessageKind::Reboot => Ok(Message::Reboot(header)),
    }
}

fn decode_weather(
    payload: &str,
    layout: WireLayout,
    header: CommonHeader,
) -> Result<WeatherReport, CodecError> {
    let table = layout.table();
    let w = &table.weather;

    let temperature_raw = field::decode_signed_2c(
        "temperature",
        slice(payload, "temperature", w.temperature)?,
        16,
        THRESHOLD_SENSOR_16,
    )?;

    Ok(WeatherReport {
        header,
        wind_direction: direction(payload, "wind_direction", &w.wind_dir)?,
        wind_speed: scaled(payload, "wind_speed", w.wind_speed)?,
        wind_gust: scaled(payload, "wind_gust", w.wind_gust)?,
        wind_gust_dir: direction(payload, "wind_gust_dir", &w.wind_gust_dir)?,
        wind_speed_avg2m: scaled(payload, "wind_speed_avg2m", w.wind_speed_avg2m)?,
        wind_dir_avg2m: direction(payload, "wind_dir_avg2m", &w.wind_dir_avg2m)?,
        wind_gust_10m: scaled(payload, "wind_gust_10m", w.wind_gust_10m)?,
        wind_gust_dir_10m: direction(payload, "wind_gust_dir_10m", &w.wind_gust_dir_10m)?,
        humidity: scaled(payload, "humidity", w.humidity)?,
        temperature: field::round2(
            field::scale(temperature_raw, 100) - table.temperature_baseline,
        ),
        rain_1h: scaled(payload, "rain_1h", w.rain_1h)?,
        rain_today: scaled(payload, "rain_today", w.rain_today)?,
        rain_since_last: scaled(payload, "rain_since_last", w.rain_since_last)?,
        bar_uncorrected: scaled(payload, "bar_uncorrected", w.bar_uncorrected)?
            + table.pressure_baseline,
        bar_corrected: field::round2(
            scaled(payload, "bar_corrected", w.bar_corrected)? + table.pressure_baseline,
        ),
        voltage: match w.voltage {
            Some(span) => Some(scaled(payload, "voltage", span)?),
            None => None,
        },
    })
}

fn decode_station(
    payload: &str,
    layout: WireLayout,
    header: CommonHeader,
) -> Result<StationReport, CodecError> {
    let s = &layout.table().station;

    let latitude = field::decode_signed_2c(
        "latitude",
        slice(payload, "latitude", s.latitude)?,
        32,
        THRESHOLD_COORD_32,
    )?;
    let longitude = field::decode_signed_2c(
        "longitude",
        slice(payload, "longitude", s.longitude)?,
        32,
        THRESHOLD_COORD_32,
    )?;
    let altitude = field::decode_signed_2c(
        "altitude",
        slice(payload, "altitude", s.altitude)?,
        16,
        THRESHOLD_ALTITUDE_16,
    )?;

    Ok(StationReport {
        header,
        latitude: field::scale(latitude, 100_000),
        longitude: field::scale(longitude, 100_000),
        altitude: altitude as i32,
    })
}

fn slice<'a>(payload: &'a str, name: &'static str, span: Span) -> Result<&'a str, CodecError> {
    payload
        .get(span.start..span.end)
        .ok_or(CodecError::Truncated {
            field: name,
            len: payload.len(),
        })
}

fn unsigned(payload: &str, name: &'static str, span: Span) -> Result<i64, CodecError> {
    field::decode_unsigned(name, slice(payload, name, span)?)
}

/// Unsigned decode followed by the two-implied-decimal scaling every
/// non-direction sensor field uses.
fn scaled(payload: &str, name: &'static str, span: Span) -> Result<f64, CodecError> {
    Ok(field::scale(unsigned(payload, name, span)?, 100))
}

fn direction(payload: &str, name: &'static str, f: &DirField) -> Result<i32, CodecError> {
    let hex = slice(payload, name, f.span)?;
    let value = match f.signed {
        Some(s) => field::decode_signed_2c(name, hex, s.width_bits, s.threshold)?,
        None => field::decode_unsigned(name, hex)?,
    };
    Ok(value as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::station::tests::{directory, station};

    const ACTIVE_KEY: &'static str = "e6605481db318236";

    fn legacy_frame(payload: &str) -> SerialFrame {
        SerialFrame {
            link: LinkQuality { rssi: -31, snr: 7.0 },
            byte_count: (payload.len() / 2) as i64,
            payload_hex: payload.to_string(),
        }
    }

    fn legacy_weather_payload() -> String {
        [
            "64",               // type 100
            ACTIVE_KEY,         // hardware key
            "61cf9980",         // 2022-01-01 00:00:00 UTC
            "000a",             // +10 hours
            "00b4",             // wind_dir 180
            "04b0",             // wind_speed 12.00
            "05dc",             // wind_gust 15.00
            "00c8",             // wind_gust_dir 200
            "03e8",             // wind_speed_avg2m 10.00
            "00b4",             // wind_dir_avg2m 180
            "0640",             // wind_gust_10m 16.00
            "00d2",             // wind_gust_dir_10m 210
            "1b58",             // humidity 70.00
            "1388",             // temperature 50.00 (no legacy baseline)
            "0000",             // rain_1h 0.00
            "00c8",             // rain_today 2.00
            "0064",             // rain_since_last 1.00
            "00018a88",         // bar_uncorrected 1010.00
            "00018b50",         // bar_corrected 1012.00
        ]
        .concat()
    }

    fn gateway_weather_payload() -> String {
        [
            "01e13380", // offset 31536000 -> 2023-01-01 00:00:00 UTC
            "0a",       // timezone byte (informational)
            "fff",      // wind_dir: vane disconnected
            "04b0",     // wind_speed 12.00
            "05dc",     // wind_gust 15.00
            "fff",      // wind_gust_dir: disconnected
            "03e8",     // wind_speed_avg2m 10.00
            "0b4",      // wind_dir_avg2m 180
            "0640",     // wind_gust_10m 16.00
            "0d2",      // wind_gust_dir_10m 210
            "1b58",     // humidity 70.00
            "1388",     // temperature 0.00 after the -50 baseline
            "0000",     // rain_1h
            "00c8",     // rain_today 2.00
            "0064",     // rain_since_last 1.00
            "2c24",     // bar_uncorrected 113.00 + 900
            "2c92",     // bar_corrected 114.10 + 900
            "0181",     // voltage 3.85
        ]
        .concat()
    }

    fn gateway_uplink(port: Option<u32>, payload: &str, eui: &str) -> GatewayUplink {
        GatewayUplink {
            device_eui: eui.to_string(),
            link: LinkQuality {
                rssi: -107,
                snr: 8.25,
            },
            port,
            payload_hex: payload.to_string(),
        }
    }

    #[test]
    fn legacy_weather_report_decodes_every_field() {
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let active = station(4, ACTIVE_KEY);
        let frame = legacy_frame(&legacy_weather_payload());

        let dispatch = dispatch_serial(&frame, &active, &dir).unwrap();
        assert_eq!(dispatch.resolution, Some(StationMatch::Matched(4)));
        let Message::Weather(report) = dispatch.message else {
            panic!("expected weather report");
        };

        assert_eq!(report.header.station_id, 4);
        assert_eq!(report.header.timestamp, "2022-01-01 00:00:00+10:00");
        assert_eq!(report.wind_direction, 180);
        assert_eq!(report.wind_speed, 12.00);
        assert_eq!(report.wind_gust, 15.00);
        assert_eq!(report.wind_gust_dir, 200);
        assert_eq!(report.wind_speed_avg2m, 10.00);
        assert_eq!(report.wind_dir_avg2m, 180);
        assert_eq!(report.wind_gust_10m, 16.00);
        assert_eq!(report.wind_gust_dir_10m, 210);
        assert_eq!(report.humidity, 70.00);
        assert_eq!(report.temperature, 50.00);
        assert_eq!(report.rain_1h, 0.00);
        assert_eq!(report.rain_today, 2.00);
        assert_eq!(report.rain_since_last, 1.00);
        assert_eq!(report.bar_uncorrected, 1010.00);
        assert_eq!(report.bar_corrected, 1012.00);
        assert_eq!(report.voltage, None);
    }

    #[test]
    fn gateway_weather_report_applies_baselines_and_sentinels() {
        let dir = directory(&[(5, "70B3D57ED0001234")]);
        let uplink = gateway_uplink(Some(100), &gateway_weather_payload(), "70B3D57ED0001234");

        let dispatch = dispatch_gateway(&uplink, &dir).unwrap();
        assert_eq!(dispatch.resolution, Some(StationMatch::Matched(5)));
        let Message::Weather(report) = dispatch.message else {
            panic!("expected weather report");
        };

        assert_eq!(report.header.station_id, 5);
        assert_eq!(report.header.timestamp, "2023-01-01 00:00:00+00:00");
        assert_eq!(report.wind_direction, -1);
        assert_eq!(report.wind_gust_dir, -1);
        assert_eq!(report.wind_dir_avg2m, 180);
        assert_eq!(report.wind_gust_dir_10m, 210);
        assert_eq!(report.temperature, 0.00);
        assert_eq!(report.bar_uncorrected, 113.00 + 900.00);
        assert_eq!(report.bar_corrected, 1014.10);
        assert_eq!(report.voltage, Some(3.85));
    }

    #[test]
    fn legacy_station_report_decodes_position() {
        let payload = [
            "65",
            ACTIVE_KEY,
            "61cf9980",
            "0000",
            "0050fa90", // 53.07024
            "fff79b90", // -5.50000
            "00be",     // 190 m
        ]
        .concat();
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let dispatch = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir).unwrap();

        let Message::Station(report) = dispatch.message else {
            panic!("expected station report");
        };
        assert_eq!(report.latitude, 53.07024);
        assert_eq!(report.longitude, -5.5);
        assert_eq!(report.altitude, 190);
    }

    #[test]
    fn gateway_station_report_decodes_position() {
        let payload = ["01e13380", "00", "0050fa90", "fff79b90", "00be"].concat();
        let dir = directory(&[(5, "AA01")]);
        let dispatch = dispatch_gateway(&gateway_uplink(Some(101), &payload, "AA01"), &dir).unwrap();

        let Message::Station(report) = dispatch.message else {
            panic!("expected station report");
        };
        assert_eq!(report.latitude, 53.07024);
        assert_eq!(report.longitude, -5.5);
        assert_eq!(report.altitude, 190);
    }

    #[test]
    fn negative_legacy_timezone_renders_signed_suffix() {
        let payload = ["c8", ACTIVE_KEY, "61cf9980", "ffff"].concat();
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let dispatch = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir).unwrap();

        let Message::TimeSync(header) = dispatch.message else {
            panic!("expected time sync");
        };
        assert_eq!(header.utc_offset_hours, -1);
        assert_eq!(header.timestamp, "2022-01-01 00:00:00-01:00");
    }

    #[test]
    fn unknown_type_code_is_unrecognized_not_an_error() {
        let payload = ["ff", ACTIVE_KEY, "61cf9980", "0000"].concat();
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let dispatch = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir).unwrap();

        assert!(matches!(dispatch.message, Message::Unrecognized { .. }));
        assert_eq!(dispatch.resolution, None);
    }

    #[test]
    fn foreign_hardware_key_re_resolves_from_the_index() {
        let foreign_key = "aaaaaaaaaaaaaaaa";
        let payload = ["c8", foreign_key, "61cf9980", "0000"].concat();
        let dir = directory(&[(4, ACTIVE_KEY), (7, foreign_key)]);
        let dispatch = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir).unwrap();

        assert_eq!(dispatch.resolution, Some(StationMatch::Foreign(7)));
        let Message::TimeSync(header) = dispatch.message else {
            panic!("expected time sync");
        };
        assert_eq!(header.station_id, 7);
    }

    #[test]
    fn unmatched_hardware_key_yields_sentinel_station() {
        let payload = ["c8", "bbbbbbbbbbbbbbbb", "61cf9980", "0000"].concat();
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let dispatch = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir).unwrap();

        assert_eq!(dispatch.resolution, Some(StationMatch::Unknown));
        let Message::TimeSync(header) = dispatch.message else {
            panic!("expected time sync");
        };
        assert_eq!(header.station_id, UNKNOWN_STATION_ID);
    }

    #[test]
    fn unknown_device_eui_yields_sentinel_station() {
        let dir = directory(&[(5, "AA01")]);
        let dispatch =
            dispatch_gateway(&gateway_uplink(Some(100), &gateway_weather_payload(), "FF99"), &dir)
                .unwrap();

        assert_eq!(dispatch.resolution, Some(StationMatch::Unknown));
        let Message::Weather(report) = dispatch.message else {
            panic!("expected weather report");
        };
        assert_eq!(report.header.station_id, UNKNOWN_STATION_ID);
    }

    #[test]
    fn missing_port_is_unrecognized() {
        let dir = directory(&[(5, "AA01")]);
        let dispatch =
            dispatch_gateway(&gateway_uplink(None, "0011", "AA01"), &dir).unwrap();
        assert!(matches!(dispatch.message, Message::Unrecognized { .. }));
    }

    #[test]
    fn truncated_recognized_frame_is_a_hard_frame_error() {
        let payload = ["64", ACTIVE_KEY, "61cf9980", "000a", "00b4"].concat();
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let result = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir);
        assert!(matches!(result, Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn non_hex_header_field_is_a_hard_frame_error() {
        let payload = ["64", ACTIVE_KEY, "zzzzzzzz", "000a"].concat();
        let dir = directory(&[(4, ACTIVE_KEY)]);
        let result = dispatch_serial(&legacy_frame(&payload), &station(4, ACTIVE_KEY), &dir);
        assert!(matches!(result, Err(CodecError::NotHex { .. })));
    }
}
