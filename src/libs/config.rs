//! Program configurations.

use std::env;

use clap::{Arg, ArgMatches, Command};
use serde::Deserialize;

/// Configuration file object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// Active transport, `serial` or `mqtt`.
    pub transport: Option<String>,
    /// Id of this basestation's own weather station.
    pub station: Option<i32>,
    pub serial: Option<SerialConfig>,
    pub mqtt: Option<MqttConfig>,
    pub database: Option<DatabaseConfig>,
}

#[derive(Default, Deserialize)]
pub struct SerialConfig {
    /// Serial port device path such as `/dev/rak811` or `COM1`.
    #[serde(rename = "devPath")]
    pub dev_path: Option<String>,
    pub baud: Option<u32>,
}

#[derive(Default, Deserialize)]
pub struct MqttConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Things Network application user, for example `myapp@ttn`.
    pub user: Option<String>,
    pub password: Option<String>,
    /// Device id used for downlink publishes, for example `eui-70b3d57ed0001234`.
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

pub const DEF_TRANSPORT: &'static str = "serial";
pub const DEF_STATION: i32 = 4;
pub const DEF_STATION_STR: &'static str = "4";
pub const DEF_DEV_PATH: &'static str = "/dev/rak811";
pub const DEF_BAUD: u32 = 115200;
pub const DEF_BAUD_STR: &'static str = "115200";
pub const DEF_MQTT_HOST: &'static str = "eu1.cloud.thethings.network";
pub const DEF_MQTT_PORT: u16 = 8883;
pub const DEF_MQTT_PORT_STR: &'static str = "8883";
pub const DEF_DB_URL: &'static str = "postgres://basestation@localhost/weather";

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("basestation.transport")
            .long("basestation.transport")
            .help("Active transport (serial|mqtt)")
            .num_args(1)
            .default_value(DEF_TRANSPORT),
    )
    .arg(
        Arg::new("basestation.station")
            .long("basestation.station")
            .help("Id of this basestation's weather station")
            .num_args(1)
            .value_parser(clap::value_parser!(i64))
            .default_value(DEF_STATION_STR),
    )
    .arg(
        Arg::new("serial.dev-path")
            .long("serial.dev-path")
            .help("Device path such as `/dev/rak811` or `COM1`")
            .num_args(1)
            .default_value(DEF_DEV_PATH),
    )
    .arg(
        Arg::new("serial.baud")
            .long("serial.baud")
            .help("Serial port baud rate")
            .num_args(1)
            .value_parser(clap::value_parser!(i64))
            .default_value(DEF_BAUD_STR),
    )
    .arg(
        Arg::new("mqtt.host")
            .long("mqtt.host")
            .help("Things Network MQTT host")
            .num_args(1)
            .default_value(DEF_MQTT_HOST),
    )
    .arg(
        Arg::new("mqtt.port")
            .long("mqtt.port")
            .help("Things Network MQTT TLS port")
            .num_args(1)
            .value_parser(clap::value_parser!(i64))
            .default_value(DEF_MQTT_PORT_STR),
    )
    .arg(
        Arg::new("mqtt.user")
            .long("mqtt.user")
            .help("MQTT user name, also the downlink topic tenant")
            .num_args(1),
    )
    .arg(
        Arg::new("mqtt.password")
            .long("mqtt.password")
            .help("MQTT API key")
            .num_args(1),
    )
    .arg(
        Arg::new("mqtt.device-id")
            .long("mqtt.device-id")
            .help("Target device id for downlinks, such as `eui-70b3d57ed0001234`")
            .num_args(1),
    )
    .arg(
        Arg::new("database.url")
            .long("database.url")
            .help("PostgreSQL connection URL")
            .num_args(1)
            .default_value(DEF_DB_URL),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// This function will call [`apply_default()`] to fill missing values so you do not need call it
/// again.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        transport: match args.get_one::<String>("basestation.transport") {
            None => match env::var("BASESTATION_TRANSPORT") {
                Err(_) => None,
                Ok(v) => Some(v),
            },
            Some(v) => Some(v.clone()),
        },
        station: match args.get_one::<i64>("basestation.station") {
            None => match env::var("BASESTATION_STATION") {
                Err(_) => Some(DEF_STATION),
                Ok(v) => match v.parse::<i32>() {
                    Err(_) => Some(DEF_STATION),
                    Ok(v) => Some(v),
                },
            },
            Some(v) => Some(*v as i32),
        },
        serial: Some(SerialConfig {
            dev_path: match args.get_one::<String>("serial.dev-path") {
                None => match env::var("SERIAL_DEV_PATH") {
                    Err(_) => None,
                    Ok(v) => Some(v),
                },
                Some(v) => Some(v.clone()),
            },
            baud: match args.get_one::<i64>("serial.baud") {
                None => match env::var("SERIAL_BAUD") {
                    Err(_) => Some(DEF_BAUD),
                    Ok(v) => match v.parse::<u32>() {
                        Err(_) => Some(DEF_BAUD),
                        Ok(v) => Some(v),
                    },
                },
                Some(v) => Some(*v as u32),
            },
        }),
        mqtt: Some(MqttConfig {
            host: match args.get_one::<String>("mqtt.host") {
                None => match env::var("MQTT_HOST") {
                    Err(_) => None,
                    Ok(v) => Some(v),
                },
                Some(v) => Some(v.clone()),
            },
            port: match args.get_one::<i64>("mqtt.port") {
                None => match env::var("MQTT_PORT") {
                    Err(_) => Some(DEF_MQTT_PORT),
                    Ok(v) => match v.parse::<u16>() {
                        Err(_) => Some(DEF_MQTT_PORT),
                        Ok(v) => Some(v),
                    },
                },
                Some(v) => Some(*v as u16),
            },
            user: match args.get_one::<String>("mqtt.user") {
                None => match env::var("MQTT_USER") {
                    Err(_) => None,
                    Ok(v) => Some(v),
                },
                Some(v) => Some(v.clone()),
            },
            password: match args.get_one::<String>("mqtt.password") {
                None => match env::var("MQTT_PASSWORD") {
                    Err(_) => None,
                    Ok(v) => Some(v),
                },
                Some(v) => Some(v.clone()),
            },
            device_id: match args.get_one::<String>("mqtt.device-id") {
                None => match env::var("MQTT_DEVICE_ID") {
                    Err(_) => None,
                    Ok(v) => Some(v),
                },
                Some(v) => Some(v.clone()),
            },
        }),
        database: Some(DatabaseConfig {
            url: match args.get_one::<String>("database.url") {
                None => match env::var("DATABASE_URL") {
                    Err(_) => None,
                    Ok(v) => Some(v),
                },
                Some(v) => Some(v.clone()),
            },
        }),
    })
}

/// Fill missing configuration with default values.
pub fn apply_default(config: &Config) -> Config {
    let serial = config.serial.as_ref();
    let mqtt = config.mqtt.as_ref();
    let database = config.database.as_ref();

    Config {
        transport: match config.transport.as_ref() {
            None => Some(DEF_TRANSPORT.to_string()),
            Some(transport) => Some(transport.clone()),
        },
        station: match config.station.as_ref() {
            None => Some(DEF_STATION),
            Some(station) => Some(*station),
        },
        serial: Some(SerialConfig {
            dev_path: match serial.and_then(|c| c.dev_path.as_ref()) {
                None => Some(DEF_DEV_PATH.to_string()),
                Some(path) => Some(path.clone()),
            },
            baud: match serial.and_then(|c| c.baud.as_ref()) {
                None => Some(DEF_BAUD),
                Some(baud) => Some(*baud),
            },
        }),
        mqtt: Some(MqttConfig {
            host: match mqtt.and_then(|c| c.host.as_ref()) {
                None => Some(DEF_MQTT_HOST.to_string()),
                Some(host) => Some(host.clone()),
            },
            port: match mqtt.and_then(|c| c.port.as_ref()) {
                None => Some(DEF_MQTT_PORT),
                Some(port) => Some(*port),
            },
            user: match mqtt.and_then(|c| c.user.as_ref()) {
                None => None,
                Some(user) => Some(user.clone()),
            },
            password: match mqtt.and_then(|c| c.password.as_ref()) {
                None => None,
                Some(password) => Some(password.clone()),
            },
            device_id: match mqtt.and_then(|c| c.device_id.as_ref()) {
                None => None,
                Some(device_id) => Some(device_id.clone()),
            },
        }),
        database: Some(DatabaseConfig {
            url: match database.and_then(|c| c.url.as_ref()) {
                None => Some(DEF_DB_URL.to_string()),
                Some(url) => Some(url.clone()),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_default_fills_every_section() {
        let config = apply_default(&Config::default());
        assert_eq!(config.transport.as_deref(), Some(DEF_TRANSPORT));
        assert_eq!(config.station, Some(DEF_STATION));
        let serial = config.serial.unwrap();
        assert_eq!(serial.dev_path.as_deref(), Some(DEF_DEV_PATH));
        assert_eq!(serial.baud, Some(DEF_BAUD));
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host.as_deref(), Some(DEF_MQTT_HOST));
        assert_eq!(mqtt.port, Some(DEF_MQTT_PORT));
        assert_eq!(mqtt.user, None);
        assert_eq!(config.database.unwrap().url.as_deref(), Some(DEF_DB_URL));
    }

    #[test]
    fn apply_default_keeps_existing_values() {
        let config = apply_default(&Config {
            transport: Some("mqtt".to_string()),
            station: Some(5),
            serial: None,
            mqtt: Some(MqttConfig {
                host: Some("broker.local".to_string()),
                port: Some(1883),
                user: Some("app@ttn".to_string()),
                password: Some("secret".to_string()),
                device_id: Some("eui-aabb".to_string()),
            }),
            database: None,
        });
        assert_eq!(config.transport.as_deref(), Some("mqtt"));
        assert_eq!(config.station, Some(5));
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.host.as_deref(), Some("broker.local"));
        assert_eq!(mqtt.user.as_deref(), Some("app@ttn"));
    }

    #[test]
    fn config_file_sections_deserialize() {
        let conf: Config = json5::from_str(
            r#"{
                transport: "mqtt",
                station: 5,
                serial: { devPath: "/dev/ttyUSB0", baud: 9600 },
                mqtt: { host: "h", port: 8883, user: "u", password: "p", deviceId: "eui-01" },
                database: { url: "postgres://x" },
            }"#,
        )
        .unwrap();
        assert_eq!(conf.serial.unwrap().dev_path.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(conf.mqtt.unwrap().device_id.as_deref(), Some("eui-01"));
    }
}
