//! Legacy transport: the RAK811 point-to-point radio on a serial port.
//! Handles the AT-command framing and the half-duplex receive/transmit
//! bracketing; frame decoding is delegated to the codec.

use std::io::Error as IoError;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::time;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::codec::Message;
use super::codec::dispatch::{self, StationMatch};
use super::codec::encode::{self, Command};
use super::codec::frame::{self, SerialParse};
use super::log_resolution;
use super::station::{Station, StationDirectory};
use super::store::ReadingStore;

pub struct Options {
    pub dev_path: String,
    pub baud: u32,
}

const MODE_RECEIVE: &'static str = "at+set_config=lorap2p:transfer_mode:1\r\n";
const MODE_TRANSMIT: &'static str = "at+set_config=lorap2p:transfer_mode:2\r\n";
const REOPEN_SLEEP_MS: u64 = 10_000;

/// One open RAK811 radio link.
pub struct Rak811 {
    reader: BufReader<ReadHalf<SerialStream>>,
    writer: WriteHalf<SerialStream>,
}

impl Rak811 {
    /// Open the serial port. The radio is left in whatever mode it was;
    /// callers enter receive mode explicitly.
    pub fn new(opts: &Options) -> Result<Self, IoError> {
        let port = tokio_serial::new(opts.dev_path.as_str(), opts.baud)
            .timeout(Duration::from_secs(10))
            .open_native_async()?;
        let (reader, writer) = tokio::io::split(port);
        Ok(Rak811 {
            reader: BufReader::new(reader),
            writer,
        })
    }

    pub async fn version(&mut self) -> Result<String, IoError> {
        self.command("at+version\r\n").await
    }

    pub async fn set_receive(&mut self) -> Result<String, IoError> {
        self.command(MODE_RECEIVE).await
    }

    async fn set_transmit(&mut self) -> Result<String, IoError> {
        self.command(MODE_TRANSMIT).await
    }

    /// Transmit one hex payload. The radio is half-duplex: switch to
    /// transmit mode, send, then always return to receive mode.
    pub async fn send_payload(&mut self, payload_hex: &str) -> Result<String, IoError> {
        const FN_NAME: &'static str = "Rak811::send_payload";

        self.set_transmit().await?;
        let response = self.command(send_frame(payload_hex).as_str()).await;
        if let Err(e) = self.set_receive().await {
            error!("[{}] set back receive mode error: {}", FN_NAME, e);
        }
        response
    }

    /// Wait for the next non-empty line from the radio.
    pub async fn read_response(&mut self) -> Result<String, IoError> {
        loop {
            let mut line = String::new();
            let size = self.reader.read_line(&mut line).await?;
            if size == 0 {
                return Err(IoError::other("serial port closed"));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
    }

    async fn command(&mut self, cmd: &str) -> Result<String, IoError> {
        self.writer.write_all(cmd.as_bytes()).await?;
        self.writer.flush().await?;
        self.read_response().await
    }
}

/// The framed transmit command for one payload.
fn send_frame(payload_hex: &str) -> String {
    format!("at+send=lorap2p:{}\r\n", payload_hex)
}

/// Receive loop: read frames until cancelled, decoding each one fully
/// before the next is accepted. A serial failure reopens the port; a bad
/// frame is dropped; neither ends the session.
pub async fn run_listen(
    opts: &Options,
    active: &Station,
    directory: &StationDirectory,
    readings: Option<&dyn ReadingStore>,
) {
    const FN_NAME: &'static str = "serial::run_listen";

    loop {
        let mut port = match open_receiving(opts).await {
            Err(e) => {
                error!("[{}] open port error: {}", FN_NAME, e);
                time::sleep(Duration::from_millis(REOPEN_SLEEP_MS)).await;
                continue;
            }
            Ok(port) => port,
        };

        loop {
            let line = match port.read_response().await {
                Err(e) => {
                    error!("[{}] serial port problem - will reopen: {}", FN_NAME, e);
                    time::sleep(Duration::from_millis(REOPEN_SLEEP_MS)).await;
                    break;
                }
                Ok(line) => line,
            };

            if line.contains("ERROR") {
                error!("[{}] error from radio: {}", FN_NAME, line);
                continue;
            }

            handle_line(line.as_str(), active, directory, readings).await;
        }
    }
}

async fn open_receiving(opts: &Options) -> Result<Rak811, IoError> {
    const FN_NAME: &'static str = "serial::open_receiving";

    let mut port = Rak811::new(opts)?;
    let version = port.version().await?;
    info!("[{}] radio version: {}", FN_NAME, version);
    port.set_receive().await?;
    Ok(port)
}

async fn handle_line(
    line: &str,
    active: &Station,
    directory: &StationDirectory,
    readings: Option<&dyn ReadingStore>,
) {
    const FN_NAME: &'static str = "serial::handle_line";

    let frame = match frame::parse_serial_line(line) {
        SerialParse::Unrecognized { raw, .. } => {
            warn!("[{}] message is not recognised - ignoring: {}", FN_NAME, raw);
            return;
        }
        SerialParse::Frame(frame) => frame,
    };
    debug!(
        "[{}] frame of {} bytes at rssi {}",
        FN_NAME, frame.byte_count, frame.link.rssi
    );

    let dispatch = match dispatch::dispatch_serial(&frame, active, directory) {
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
            // The shared channel carries other basestations' stations;
            // only readings for the active station are committed here.
            if dispatch.resolution != Some(StationMatch::Matched(active.id)) {
                warn!("[{}] not committing data for another basestation", FN_NAME);
                return;
            }
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
            warn!("[{}] message is not recognised - ignoring: {}", FN_NAME, raw);
        }
    }
}

/// Encode and transmit one outbound command, bracketed in transmit mode.
pub async fn send_command(
    opts: &Options,
    cmd: &Command,
    hardware_key: &str,
) -> Result<(), IoError> {
    const FN_NAME: &'static str = "serial::send_command";

    let mut port = open_receiving(opts).await?;
    let payload = encode::encode_serial(cmd, hardware_key);
    debug!("[{}] sending message: {}", FN_NAME, payload);
    let response = port.send_payload(payload.as_str()).await?;
    info!("[{}] radio response: {}", FN_NAME, response);
    Ok(())
}
