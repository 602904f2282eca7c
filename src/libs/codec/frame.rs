//! Transport envelope parsing: one serial AT response line or one MQTT JSON
//! envelope in, a raw hex payload plus link-quality metadata out.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use super::{CodecError, LinkQuality};

/// Largest defined message is 49 bytes; longer serial frames are noise.
pub const MAX_FRAME_BYTES: i64 = 49;

const SERIAL_PREFIX: &'static str = "at+recv=";

/// A legacy serial frame with its envelope stripped.
#[derive(Clone, Debug)]
pub struct SerialFrame {
    pub link: LinkQuality,
    pub byte_count: i64,
    pub payload_hex: String,
}

/// Outcome of parsing one serial line. Anything that does not look like a
/// well-formed receive response is surfaced as unrecognised, never an error.
/// Link quality is kept when the header itself parsed (oversize frames).
#[derive(Clone, Debug)]
pub enum SerialParse {
    Frame(SerialFrame),
    Unrecognized {
        raw: String,
        link: Option<LinkQuality>,
    },
}

/// Parse one `at+recv=<RSSI>,<SNR>,<byte_count>:<HEXPAYLOAD>` line.
pub fn parse_serial_line(line: &str) -> SerialParse {
    let line = line.trim_end_matches(['\r', '\n']);
    let unrecognized = || SerialParse::Unrecognized {
        raw: line.to_string(),
        link: None,
    };

    let Some((header, payload)) = line.split_once(':') else {
        return unrecognized();
    };
    let Some(header) = header.strip_prefix(SERIAL_PREFIX) else {
        return unrecognized();
    };

    let mut fields = header.split(',');
    let (Some(rssi), Some(snr), Some(byte_count), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return unrecognized();
    };
    let (Ok(rssi), Ok(snr), Ok(byte_count)) = (
        rssi.parse::<i32>(),
        snr.parse::<i64>(),
        byte_count.parse::<i64>(),
    ) else {
        return unrecognized();
    };

    if byte_count > MAX_FRAME_BYTES {
        return SerialParse::Unrecognized {
            raw: line.to_string(),
            link: Some(LinkQuality {
                rssi,
                snr: snr as f64,
            }),
        };
    }

    SerialParse::Frame(SerialFrame {
        link: LinkQuality {
            rssi,
            snr: snr as f64,
        },
        byte_count,
        payload_hex: payload.to_string(),
    })
}

/// A gateway uplink with its envelope stripped.
#[derive(Clone, Debug)]
pub struct GatewayUplink {
    /// Device EUI from the envelope, `eui-` prefix stripped and upper-cased.
    pub device_eui: String,
    pub link: LinkQuality,
    /// LoRaWAN port; the message-type discriminator when present.
    pub port: Option<u32>,
    pub payload_hex: String,
}

/// Outcome of parsing one gateway envelope.
#[derive(Clone, Debug)]
pub enum GatewayFrame {
    Uplink(GatewayUplink),
    /// The envelope carried no `frm_payload`. Callers skip these; a bare
    /// envelope is not an error condition.
    NoPayload { device_eui: String },
}

#[derive(Deserialize)]
struct Envelope {
    end_device_ids: EndDeviceIds,
    uplink_message: Option<UplinkMessage>,
}

#[derive(Deserialize)]
struct EndDeviceIds {
    device_id: String,
}

#[derive(Deserialize)]
struct UplinkMessage {
    f_port: Option<u32>,
    frm_payload: Option<String>,
    #[serde(default)]
    rx_metadata: Vec<RxMetadata>,
}

#[derive(Deserialize)]
struct RxMetadata {
    rssi: i32,
    snr: f64,
}

/// Parse one Things Network uplink envelope.
pub fn parse_gateway_envelope(raw: &[u8]) -> Result<GatewayFrame, CodecError> {
    let envelope: Envelope =
        serde_json::from_slice(raw).map_err(|e| CodecError::Envelope(e.to_string()))?;

    let device_eui = device_eui(&envelope.end_device_ids.device_id);

    let Some(uplink) = envelope.uplink_message else {
        return Ok(GatewayFrame::NoPayload { device_eui });
    };
    let Some(frm_payload) = uplink.frm_payload else {
        return Ok(GatewayFrame::NoPayload { device_eui });
    };

    let payload_hex = hex::encode(BASE64.decode(frm_payload.as_bytes())?);

    let Some(rx) = uplink.rx_metadata.first() else {
        return Err(CodecError::Envelope(
            "uplink_message has no rx_metadata".to_string(),
        ));
    };

    Ok(GatewayFrame::Uplink(GatewayUplink {
        device_eui,
        link: LinkQuality {
            rssi: rx.rssi,
            snr: rx.snr,
        },
        port: uplink.f_port,
        payload_hex,
    }))
}

/// `eui-70b3d57ed0001234` becomes `70B3D57ED0001234`. A device id without
/// the prefix yields an empty EUI, which matches no station.
fn device_eui(device_id: &str) -> String {
    match device_id.split_once("eui-") {
        Some((_, eui)) => eui.to_ascii_uppercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_line_splits_header_and_payload() {
        let parsed = parse_serial_line("at+recv=-31,7,49:64e6605481db318236\r\n");
        let SerialParse::Frame(frame) = parsed else {
            panic!("expected frame");
        };
        assert_eq!(frame.link.rssi, -31);
        assert_eq!(frame.link.snr, 7.0);
        assert_eq!(frame.byte_count, 49);
        assert_eq!(frame.payload_hex, "64e6605481db318236");
    }

    #[test]
    fn oversize_serial_frame_is_unrecognized_but_keeps_link() {
        let parsed = parse_serial_line("at+recv=-58,7,60:ff00");
        let SerialParse::Unrecognized { raw, link } = parsed else {
            panic!("expected unrecognised");
        };
        assert_eq!(raw, "at+recv=-58,7,60:ff00");
        assert_eq!(link, Some(LinkQuality { rssi: -58, snr: 7.0 }));
    }

    #[test]
    fn garbage_serial_lines_are_unrecognized_not_errors() {
        for line in ["", "OK", "at+recv=-58,7:aa", "at+recv=x,y,z:aa", "no colon here"] {
            assert!(
                matches!(parse_serial_line(line), SerialParse::Unrecognized { .. }),
                "line {:?} should be unrecognised",
                line
            );
        }
    }

    fn envelope(frm_payload: Option<&str>) -> String {
        let payload = match frm_payload {
            Some(p) => format!(r#""frm_payload": "{}","#, p),
            None => String::new(),
        };
        format!(
            r#"{{
                "end_device_ids": {{ "device_id": "eui-70b3d57ed0001234" }},
                "uplink_message": {{
                    "f_port": 100,
                    {}
                    "rx_metadata": [ {{ "gateway_ids": {{}}, "rssi": -107, "snr": 8.25 }} ]
                }}
            }}"#,
            payload
        )
    }

    #[test]
    fn gateway_envelope_decodes_base64_to_lowercase_hex() {
        // base64 of the bytes 0x01 0x23 0xab
        let parsed = parse_gateway_envelope(envelope(Some("ASOr")).as_bytes()).unwrap();
        let GatewayFrame::Uplink(uplink) = parsed else {
            panic!("expected uplink");
        };
        assert_eq!(uplink.device_eui, "70B3D57ED0001234");
        assert_eq!(uplink.link.rssi, -107);
        assert_eq!(uplink.link.snr, 8.25);
        assert_eq!(uplink.port, Some(100));
        assert_eq!(uplink.payload_hex, "0123ab");
    }

    #[test]
    fn missing_frm_payload_is_the_no_payload_marker() {
        let parsed = parse_gateway_envelope(envelope(None).as_bytes()).unwrap();
        assert!(matches!(
            parsed,
            GatewayFrame::NoPayload { device_eui } if device_eui == "70B3D57ED0001234"
        ));
    }

    #[test]
    fn missing_uplink_message_is_also_no_payload() {
        let raw = r#"{ "end_device_ids": { "device_id": "eui-aa" } }"#;
        assert!(matches!(
            parse_gateway_envelope(raw.as_bytes()).unwrap(),
            GatewayFrame::NoPayload { .. }
        ));
    }

    #[test]
    fn invalid_base64_is_a_hard_frame_error() {
        assert!(parse_gateway_envelope(envelope(Some("!!!")).as_bytes()).is_err());
    }

    #[test]
    fn device_id_without_eui_prefix_yields_empty_eui() {
        assert_eq!(device_eui("plain-device"), "");
        assert_eq!(device_eui("eui-aabb01"), "AABB01");
    }
}
