//! Weather basestation gateway. Bridges remote weather stations into the
//! reading store over one of two transports: the RAK811 point-to-point
//! serial radio or The Things Network MQTT broker.

use std::{error::Error as StdError, fs};

use chrono::{Local, Utc};
use clap::{Arg as ClapArg, Command};
use log::{error, info, warn};
use serde::Deserialize;
use tokio::signal;

mod libs;

use libs::codec::encode::{self, Command as RadioCommand};
use libs::station::{Station, StationDirectory};
use libs::store::{IdentityColumn, PgStore, ReadingStore, StationStore};
use libs::{Action, Transport, config, logger, mqtt_task, serial_task};

#[derive(Default, Deserialize)]
struct AppConfig {
    #[serde(default)]
    log: logger::Config,
    #[serde(default)]
    basestation: config::Config,
}

const PROJ_NAME: &'static str = env!("CARGO_PKG_NAME");
const PROJ_VER: &'static str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> std::io::Result<()> {
    const FN_NAME: &'static str = "main";

    let (conf, action) = match init_config() {
        Err(e) => {
            logger::init(&logger::Config {
                ..Default::default()
            });
            error!("[{}] read config error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(conf) => conf,
    };
    logger::init(&conf.log);
    info!("[{}] {} {} starting", FN_NAME, PROJ_NAME, PROJ_VER);

    let cfg = config::apply_default(&conf.basestation);
    let transport = match cfg
        .transport
        .as_deref()
        .unwrap_or(config::DEF_TRANSPORT)
        .parse::<Transport>()
    {
        Err(e) => {
            error!("[{}] {}", FN_NAME, e);
            return Ok(());
        }
        Ok(transport) => transport,
    };
    let station_id = cfg.station.unwrap_or(config::DEF_STATION);

    // The station directory is loaded once; edits are picked up on restart.
    let db_url = match cfg.database.as_ref().and_then(|c| c.url.clone()) {
        None => config::DEF_DB_URL.to_string(),
        Some(url) => url,
    };
    let store = match PgStore::connect(db_url.as_str()).await {
        Err(e) => {
            error!("[{}] connect database error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(store) => store,
    };
    let column = match transport {
        Transport::Serial => IdentityColumn::HardwareKey,
        Transport::Mqtt => IdentityColumn::DeviceEui,
    };
    let directory = match store.lookup_all(column).await {
        Err(e) => {
            error!("[{}] load stations error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(stations) => StationDirectory::new(stations),
    };
    // An empty directory is unusual but not fatal: gateway frames still
    // decode with the unknown-station sentinel.
    if directory.is_empty() {
        warn!("[{}] the station store returned no stations", FN_NAME);
    }
    info!("[{}] loaded {} weather stations", FN_NAME, directory.len());

    match transport {
        Transport::Serial => run_serial(&cfg, action, station_id, &directory, &store).await,
        Transport::Mqtt => run_mqtt(&cfg, action, station_id, &directory, &store).await,
    }

    Ok(())
}

async fn run_serial(
    cfg: &config::Config,
    action: Action,
    station_id: i32,
    directory: &StationDirectory,
    store: &PgStore,
) {
    const FN_NAME: &'static str = "run_serial";

    // The serial path always needs the active station: its hardware key
    // frames outbound messages and cross-checks inbound ones.
    let Some(active) = directory.get(station_id) else {
        error!("[{}] station {} is not in the station store", FN_NAME, station_id);
        return;
    };
    info!("[{}] active station {} ({})", FN_NAME, active.id, active.name);

    let serial = cfg.serial.as_ref();
    let opts = serial_task::Options {
        dev_path: match serial.and_then(|c| c.dev_path.clone()) {
            None => config::DEF_DEV_PATH.to_string(),
            Some(path) => path,
        },
        baud: serial.and_then(|c| c.baud).unwrap_or(config::DEF_BAUD),
    };

    match action {
        Action::Listen | Action::Commit => {
            let readings: Option<&dyn ReadingStore> = match action {
                Action::Commit => Some(store),
                _ => None,
            };
            tokio::select! {
                _ = serial_task::run_listen(&opts, active, directory, readings) => (),
                _ = signal::ctrl_c() => {
                    info!("[{}] interrupt received - shutting down", FN_NAME);
                }
            }
        }
        _ => {
            let Some(cmd) = build_command(action, active) else {
                return;
            };
            if let Err(e) = serial_task::send_command(&opts, &cmd, active.identity_key.as_str()).await
            {
                error!("[{}] send error: {}", FN_NAME, e);
            }
        }
    }
}

async fn run_mqtt(
    cfg: &config::Config,
    action: Action,
    station_id: i32,
    directory: &StationDirectory,
    store: &PgStore,
) {
    const FN_NAME: &'static str = "run_mqtt";

    let mqtt = cfg.mqtt.as_ref();
    let (Some(user), Some(password)) = (
        mqtt.and_then(|c| c.user.clone()),
        mqtt.and_then(|c| c.password.clone()),
    ) else {
        error!("[{}] mqtt.user and mqtt.password are required", FN_NAME);
        return;
    };
    let opts = mqtt_task::Options {
        host: match mqtt.and_then(|c| c.host.clone()) {
            None => config::DEF_MQTT_HOST.to_string(),
            Some(host) => host,
        },
        port: mqtt.and_then(|c| c.port).unwrap_or(config::DEF_MQTT_PORT),
        user,
        password,
        device_id: mqtt.and_then(|c| c.device_id.clone()),
    };

    match action {
        Action::Listen | Action::Commit => {
            let readings: Option<&dyn ReadingStore> = match action {
                Action::Commit => Some(store),
                _ => None,
            };
            tokio::select! {
                _ = mqtt_task::run_uplink(&opts, directory, readings) => (),
                _ = signal::ctrl_c() => {
                    info!("[{}] interrupt received - shutting down", FN_NAME);
                }
            }
        }
        Action::UpdateStation => {
            let Some(station) = directory.get(station_id) else {
                error!("[{}] station {} is not in the station store", FN_NAME, station_id);
                return;
            };
            let Some(cmd) = build_command(action, station) else {
                return;
            };
            publish(&opts, &cmd).await;
        }
        Action::SyncTime | Action::DataRequest | Action::Reboot => {
            let cmd = match action {
                Action::SyncTime => time_sync_command(),
                Action::DataRequest => RadioCommand::DataRequest,
                _ => RadioCommand::Reboot,
            };
            publish(&opts, &cmd).await;
        }
    }
}

async fn publish(opts: &mqtt_task::Options, cmd: &RadioCommand) {
    const FN_NAME: &'static str = "publish";

    let downlink = encode::encode_gateway(cmd);
    if let Err(e) = mqtt_task::publish_downlink(opts, &downlink).await {
        error!("[{}] downlink error: {}", FN_NAME, e);
    }
}

/// Commands that need station data; listen modes never reach this.
fn build_command(action: Action, station: &Station) -> Option<RadioCommand> {
    match action {
        Action::SyncTime => Some(time_sync_command()),
        Action::UpdateStation => Some(RadioCommand::StationUpdate {
            latitude: station.latitude,
            longitude: station.longitude,
            altitude: station.altitude,
        }),
        Action::DataRequest => Some(RadioCommand::DataRequest),
        Action::Reboot => Some(RadioCommand::Reboot),
        Action::Listen | Action::Commit => None,
    }
}

/// Snapshot both clocks as close together as possible.
fn time_sync_command() -> RadioCommand {
    let offset_seconds = Local::now().offset().local_minus_utc();
    RadioCommand::TimeSync {
        epoch_utc: Utc::now().timestamp(),
        offset_hours: (offset_seconds as f64 / 3600.0).round() as i32,
    }
}

fn init_config() -> Result<(AppConfig, Action), Box<dyn StdError>> {
    let mut args = Command::new(PROJ_NAME)
        .version(PROJ_VER)
        .arg(
            ClapArg::new("file")
                .short('f')
                .long("file")
                .help("config file")
                .num_args(1),
        )
        .arg(
            ClapArg::new("action")
                .short('a')
                .long("action")
                .help("listen|commit|sync-time|update-station|request-data|reboot")
                .num_args(1)
                .default_value("listen"),
        );
    args = logger::reg_args(args);
    args = config::reg_args(args);
    let args = args.get_matches();

    let action = match args.get_one::<String>("action") {
        None => Action::Listen,
        Some(v) => v.parse::<Action>()?,
    };

    if let Some(v) = args.get_one::<String>("file") {
        let conf_str = fs::read_to_string(v)?;
        let conf: AppConfig = json5::from_str(conf_str.as_str())?;
        return Ok((conf, action));
    }

    Ok((
        AppConfig {
            log: logger::read_args(&args),
            basestation: config::read_args(&args),
        },
        action,
    ))
}
