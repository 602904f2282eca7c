use std::str::FromStr;

use log::warn;

pub mod codec;
pub mod config;
pub mod logger;
pub mod mqtt_task;
pub mod serial_task;
pub mod station;
pub mod store;

use codec::dispatch::StationMatch;

/// Which radio link this session talks over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Serial,
    Mqtt,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "mqtt" => Ok(Self::Mqtt),
            other => Err(format!("unknown transport: {}", other)),
        }
    }
}

/// What this invocation does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Decode and log inbound frames.
    Listen,
    /// Decode inbound frames and commit weather reports.
    Commit,
    SyncTime,
    UpdateStation,
    DataRequest,
    Reboot,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "listen" => Ok(Self::Listen),
            "commit" => Ok(Self::Commit),
            "sync-time" => Ok(Self::SyncTime),
            "update-station" => Ok(Self::UpdateStation),
            "request-data" => Ok(Self::DataRequest),
            "reboot" => Ok(Self::Reboot),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// Log how a frame's station identity resolved; shared by both transports.
pub(crate) fn log_resolution(fn_name: &str, resolution: Option<StationMatch>) {
    match resolution {
        Some(StationMatch::Foreign(id)) => {
            warn!(
                "[{}] message not for this basestation - message is for station id: {}",
                fn_name, id
            );
        }
        Some(StationMatch::Unknown) => {
            warn!("[{}] message is from an unknown station", fn_name);
        }
        Some(StationMatch::Matched(_)) | None => (),
    }
}
