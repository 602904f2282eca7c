//! PostgreSQL collaborators: the station directory source and the weather
//! reading sink. The codec never touches these directly; the transport
//! tasks hand decoded reports across this seam.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use thiserror::Error;

use crate::libs::codec::WeatherReport;
use crate::libs::station::Station;

/// Which column holds the identity a transport routes by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityColumn {
    /// 16-hex-char key embedded in legacy frames.
    HardwareKey,
    /// Device EUI from the LoRaWAN envelope.
    DeviceEui,
}

impl IdentityColumn {
    fn column(&self) -> &'static str {
        match self {
            Self::HardwareKey => "hardwarekey",
            Self::DeviceEui => "eu_id",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("reading timestamp {text:?} is not parseable: {source}")]
    Timestamp {
        text: String,
        source: chrono::ParseError,
    },
}

/// Read-only source of station records, used once at startup.
#[async_trait]
pub trait StationStore {
    async fn lookup_all(&self, identity: IdentityColumn)
    -> Result<HashMap<i32, Station>, StoreError>;
}

/// Sink for decoded weather reports. Inserts are not idempotent: duplicate
/// QoS-0 deliveries become duplicate rows, which the schema accepts.
#[async_trait]
pub trait ReadingStore {
    async fn insert(&self, report: &WeatherReport) -> Result<(), StoreError>;
}

/// The production store backed by a connection pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(2).connect(url).await?;
        Ok(PgStore { pool })
    }
}

#[async_trait]
impl StationStore for PgStore {
    async fn lookup_all(
        &self,
        identity: IdentityColumn,
    ) -> Result<HashMap<i32, Station>, StoreError> {
        let query = format!(
            "SELECT id, name, latitude, longitude, altitude, {} AS identity_key \
             FROM weather_station",
            identity.column()
        );

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let mut stations = HashMap::with_capacity(rows.len());
        for row in rows {
            let identity_key: Option<String> = row.try_get("identity_key")?;
            let station = Station {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                latitude: row.try_get("latitude")?,
                longitude: row.try_get("longitude")?,
                altitude: row.try_get("altitude")?,
                identity_key: identity_key.unwrap_or_default(),
            };
            stations.insert(station.id, station);
        }
        Ok(stations)
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn insert(&self, report: &WeatherReport) -> Result<(), StoreError> {
        let reading_time = parse_reading_time(&report.header.timestamp)?;

        sqlx::query(
            "INSERT INTO weather_reading ( \
                reading_time, station_id, \
                wind_dir, wind_speed, wind_gust, wind_gust_dir, \
                wind_speed_avg2m, wind_dir_avg2m, wind_gust_10m, wind_gust_dir_10m, \
                humidity, temperature, rain_1h, rain_today, rain_since_last, \
                bar_uncorrected, bar_corrected, battery, light) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
                $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(reading_time)
        .bind(report.header.station_id)
        .bind(report.wind_direction)
        .bind(report.wind_speed)
        .bind(report.wind_gust)
        .bind(report.wind_gust_dir)
        .bind(report.wind_speed_avg2m)
        .bind(report.wind_dir_avg2m)
        .bind(report.wind_gust_10m)
        .bind(report.wind_gust_dir_10m)
        .bind(report.humidity)
        .bind(report.temperature)
        .bind(report.rain_1h)
        .bind(report.rain_today)
        .bind(report.rain_since_last)
        .bind(report.bar_uncorrected)
        .bind(report.bar_corrected)
        .bind(report.voltage.unwrap_or(0.0)) // battery; legacy has none
        .bind(0.0_f64) // light is not collected
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_reading_time(timestamp: &str) -> Result<DateTime<FixedOffset>, StoreError> {
    DateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S%:z").map_err(|source| {
        StoreError::Timestamp {
            text: timestamp.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_time_parses_codec_timestamps() {
        let utc = parse_reading_time("2023-01-01 00:00:00+00:00").unwrap();
        assert_eq!(utc.timestamp(), 1_672_531_200);

        let east = parse_reading_time("2022-01-01 00:00:00+10:00").unwrap();
        assert_eq!(east.offset().local_minus_utc(), 36_000);

        let west = parse_reading_time("2022-01-01 00:00:00-01:00").unwrap();
        assert_eq!(west.offset().local_minus_utc(), -3_600);
    }

    #[test]
    fn malformed_reading_time_is_rejected() {
        assert!(parse_reading_time("yesterday at noon").is_err());
    }

    #[test]
    fn identity_columns_match_the_station_schema() {
        assert_eq!(IdentityColumn::HardwareKey.column(), "hardwarekey");
        assert_eq!(IdentityColumn::DeviceEui.column(), "eu_id");
    }
}
