use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{IngestError, Result};
use crate::models::batch::{RowBatch, Value};
use crate::models::schema::{ColumnType, TableSchema};

/// The GHCN-Daily core elements that get loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherType {
    Precipitation, // PRCP, tenths of mm
    Snowfall,      // SNOW, mm
    SnowDepth,     // SNWD, mm
    MaxTemperature, // TMAX, tenths of degrees C
    MinTemperature, // TMIN, tenths of degrees C
}

impl WeatherType {
    pub const ALL: [WeatherType; 5] = [
        WeatherType::Precipitation,
        WeatherType::Snowfall,
        WeatherType::SnowDepth,
        WeatherType::MaxTemperature,
        WeatherType::MinTemperature,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            WeatherType::Precipitation => "PRCP",
            WeatherType::Snowfall => "SNOW",
            WeatherType::SnowDepth => "SNWD",
            WeatherType::MaxTemperature => "TMAX",
            WeatherType::MinTemperature => "TMIN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WeatherType::Precipitation => "Precipitation",
            WeatherType::Snowfall => "Snowfall",
            WeatherType::SnowDepth => "Snow Depth",
            WeatherType::MaxTemperature => "Maximum temperature",
            WeatherType::MinTemperature => "Minimum temperature",
        }
    }

    pub fn lookup_schema() -> Result<TableSchema> {
        TableSchema::from_pairs(&[
            ("weather_type", ColumnType::Text),
            ("weather_description", ColumnType::Text),
        ])
    }

    /// The code → description lookup table as one batch.
    pub fn lookup_batch() -> Result<RowBatch> {
        let rows = Self::ALL
            .iter()
            .map(|t| vec![Value::from(t.code()), Value::from(t.description())])
            .collect();
        RowBatch::from_rows(Self::lookup_schema()?.column_names(), rows)
    }
}

impl fmt::Display for WeatherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for WeatherType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IngestError::Config(format!("Unknown measurement type: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_type_from_code() {
        assert_eq!("PRCP".parse::<WeatherType>().unwrap(), WeatherType::Precipitation);
        assert_eq!("tmin".parse::<WeatherType>().unwrap(), WeatherType::MinTemperature);
        assert!("WSFG".parse::<WeatherType>().is_err());
    }

    #[test]
    fn test_lookup_batch() {
        let batch = WeatherType::lookup_batch().unwrap();

        assert_eq!(batch.columns(), &["weather_type", "weather_description"]);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.rows()[2], vec![Value::from("SNWD"), Value::from("Snow Depth")]);
    }
}
