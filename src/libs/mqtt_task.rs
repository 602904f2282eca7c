//! Gateway transport: The Things Network MQTT broker. Uplinks arrive as
//! JSON envelopes on a wildcard subscription; downlinks are published to a
//! per-device topic. Everything runs at QoS 0, so duplicate or dropped
//! uplinks are expected and every frame is processed independently.

use std::error::Error as StdError;
use std::time::Duration;

use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use serde_json::json;
use tokio::time;

use super::codec::Message;
use super::codec::dispatch;
use super::codec::encode::Downlink;
use super::codec::frame::{self, GatewayFrame};
use super::log_resolution;
use super::station::StationDirectory;
use super::store::ReadingStore;

pub struct Options {
    pub host: String,
    pub port: u16,
    /// Application user; doubles as the tenant in downlink topics.
    pub user: String,
    pub password: String,
    /// Target device for downlink publishes.
    pub device_id: Option<String>,
}

const ERROR_SLEEP_MS: u64 = 1000;
const DOWNLINK_TIMEOUT_MS: u64 = 10_000;

fn connect(opts: &Options, role: &str) -> (AsyncClient, rumqttc::EventLoop) {
    let client_id = format!("basestation-{}-{}", role, std::process::id());
    let mut mqtt_opts = MqttOptions::new(client_id, opts.host.as_str(), opts.port);
    mqtt_opts.set_credentials(opts.user.as_str(), opts.password.as_str());
    mqtt_opts.set_keep_alive(Duration::from_secs(60));
    mqtt_opts.set_transport(Transport::tls_with_default_config());
    AsyncClient::new(mqtt_opts, 10)
}

/// Blocking uplink loop: subscribe to everything the application sees and
/// decode each envelope as it arrives. Connection errors are logged and
/// the broker session re-established; the subscription is renewed on every
/// connection acknowledgement.
pub async fn run_uplink(
    opts: &Options,
    directory: &StationDirectory,
    readings: Option<&dyn ReadingStore>,
) {
    const FN_NAME: &'static str = "mqtt::run_uplink";

    let (client, mut event_loop) = connect(opts, "uplink");
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("[{}] connected", FN_NAME);
                if let Err(e) = client.subscribe("#", QoS::AtMostOnce).await {
                    error!("[{}] subscribe error: {}", FN_NAME, e);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_uplink(publish.payload.as_ref(), directory, readings).await;
            }
            Ok(_) => (),
            Err(e) => {
                error!("[{}] connection error: {}", FN_NAME, e);
                time::sleep(Duration::from_millis(ERROR_SLEEP_MS)).await;
            }
        }
    }
}

async fn handle_uplink(
    payload: &[u8],
    directory: &StationDirectory,
    readings: Option<&dyn ReadingStore>,
) {
    const FN_NAME: &'static str = "mqtt::handle_uplink";

    let uplink = match frame::parse_gateway_envelope(payload) {
        Err(e) => {
            error!("[{}] dropping frame: {}", FN_NAME, e);
            return;
        }
        Ok(GatewayFrame::NoPayload { device_eui }) => {
            info!("[{}] ignoring message with no payload from {}", FN_NAME, device_eui);
            return;
        }
        Ok(GatewayFrame::Uplink(uplink)) => uplink,
    };

    let dispatch = match dispatch::dispatch_gateway(&uplink, directory) {
        Err(e) => {
            error!("[{}] dropping frame: {}", FN_NAME, e);
            return;
        }
        Ok(dispatch) => dispatch,
    };
    log_resolution(FN_NAME, dispatch.resolution);

    match dispatch.message {
        Message::Weather(report) => {
            debug!("[{}] decoded reading: {:?}", FN_NAME, report);
            let Some(store) = readings else {
                return;
            };
            // An unknown station still reaches the store with the sentinel
            // id; the schema decides whether to accept it.
            match store.insert(&report).await {
                Err(e) => error!("[{}] insert reading error: {}", FN_NAME, e),
                Ok(()) => debug!("[{}] reading committed", FN_NAME),
            }
        }
        Message::Station(report) => {
            info!(
                "[{}] station {} reports position {:.5},{:.5} at {}m",
                FN_NAME,
                report.header.station_id,
                report.latitude,
                report.longitude,
                report.altitude
            );
        }
        Message::TimeSync(header)
        | Message::StationUpdate(header)
        | Message::DataRequest(header)
        | Message::Reboot(header) => {
            info!(
                "[{}] ignoring command message from station {} at {}",
                FN_NAME, header.station_id, header.timestamp
            );
        }
        Message::Unrecognized { raw, .. } => {
            warn!("[{}] message is not recognised - stopping parse: {}", FN_NAME, raw);
        }
    }
}

/// Publish one downlink and wait for it to leave the client queue.
pub async fn publish_downlink(
    opts: &Options,
    downlink: &Downlink,
) -> Result<(), Box<dyn StdError>> {
    const FN_NAME: &'static str = "mqtt::publish_downlink";

    let Some(device_id) = opts.device_id.as_ref() else {
        return Err("mqtt.device-id is required for downlinks".into());
    };

    let topic = downlink_topic(opts.user.as_str(), device_id.as_str());
    let body = downlink_envelope(downlink);
    info!("[{}] send {} to topic {}", FN_NAME, body, topic);

    let (client, mut event_loop) = connect(opts, "downlink");
    client
        .publish(topic.as_str(), QoS::AtMostOnce, false, body.into_bytes())
        .await?;

    let wait = time::timeout(Duration::from_millis(DOWNLINK_TIMEOUT_MS), async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Outgoing(rumqttc::Outgoing::Publish(_))) => return Ok(()),
                Ok(_) => (),
                Err(e) => return Err(e),
            }
        }
    })
    .await;

    match wait {
        Err(_) => Err("timed out waiting for downlink publish".into()),
        Ok(Err(e)) => Err(Box::new(e)),
        Ok(Ok(())) => {
            let _ = client.disconnect().await;
            Ok(())
        }
    }
}

/// Per-device downlink push topic.
fn downlink_topic(tenant: &str, device_id: &str) -> String {
    format!("v3/{}/devices/{}/down/push", tenant, device_id)
}

/// The fixed downlink envelope the network server expects.
fn downlink_envelope(downlink: &Downlink) -> String {
    json!({
        "downlinks": [{
            "f_port": downlink.port,
            "frm_payload": downlink.payload_b64,
            "priority": "NORMAL",
        }]
    })
    .to_string()
}
