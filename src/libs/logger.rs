//! Process logging configuration and initialisation.

use std::env;
use std::str::FromStr;

use clap::{Arg, ArgMatches, Command};
use log::LevelFilter;
use serde::Deserialize;

/// Configuration file object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub level: Option<String>,
}

pub const DEF_LEVEL: &'static str = "info";

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("log.level")
            .long("log.level")
            .help("log level (off|error|warn|info|debug|trace)")
            .num_args(1)
            .default_value(DEF_LEVEL),
    )
}

/// To read input arguments from command-line arguments and environment variables.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        level: match args.get_one::<String>("log.level") {
            None => match env::var("BASESTATION_LOG_LEVEL") {
                Err(_) => None,
                Ok(v) => Some(v),
            },
            Some(v) => Some(v.clone()),
        },
    })
}

/// Fill missing configuration with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        level: match config.level.as_ref() {
            None => Some(DEF_LEVEL.to_string()),
            Some(level) => Some(level.clone()),
        },
    }
}

/// Install the process-wide logger. Unparseable levels fall back to the
/// default rather than failing startup.
pub fn init(config: &Config) {
    let level = config
        .level
        .as_deref()
        .and_then(|v| LevelFilter::from_str(v).ok())
        .unwrap_or(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp_secs();
    let _ = builder.try_init();
}
