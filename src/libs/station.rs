//! Station directory: the per-session snapshot of known weather stations
//! and the reverse index used to route inbound frames by identity key.

use std::collections::HashMap;

use crate::libs::codec::UNKNOWN_STATION_ID;

/// One weather station as recorded in the station store.
#[derive(Clone, Debug)]
pub struct Station {
    pub id: i32,
    pub name: String,
    /// Decimal degrees, five implied decimals on the wire.
    pub latitude: f64,
    pub longitude: f64,
    /// Metres.
    pub altitude: i32,
    /// 16-hex-char hardware key (legacy) or device EUI (gateway).
    pub identity_key: String,
}

/// Immutable for the session: loaded once at startup, a station edit is not
/// observed until restart.
pub struct StationDirectory {
    stations: HashMap<i32, Station>,
    by_key: HashMap<String, i32>,
}

impl StationDirectory {
    /// Build the directory and its reverse index. Identity keys are indexed
    /// case-insensitively; stations without a key are unreachable by
    /// identity lookup but still addressable by id.
    pub fn new(stations: HashMap<i32, Station>) -> Self {
        let mut by_key = HashMap::new();
        for station in stations.values() {
            if !station.identity_key.is_empty() {
                by_key.insert(station.identity_key.to_ascii_uppercase(), station.id);
            }
        }
        StationDirectory { stations, by_key }
    }

    pub fn get(&self, id: i32) -> Option<&Station> {
        self.stations.get(&id)
    }

    /// Resolve a hardware key or device EUI to a station id, or the
    /// unknown-station sentinel when nothing matches.
    pub fn resolve_key(&self, key: &str) -> i32 {
        match self.by_key.get(&key.to_ascii_uppercase()) {
            Some(id) => *id,
            None => UNKNOWN_STATION_ID,
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
