use crate::error::Result;
use crate::models::schema::{ColumnType, TableSchema};
use crate::models::weather_type::WeatherType;
use crate::utils::constants::GHCND_DATE_FORMAT;

pub const STATION_IDENTIFIER: &str = "station_identifier";
pub const MEASUREMENT_DATE: &str = "measurement_date";
pub const MEASUREMENT_TYPE: &str = "measurement_type";
pub const MEASUREMENT_VALUE: &str = "measurement_value";
pub const MEASUREMENT_FLAG: &str = "measurement_flag";
pub const QUALITY_FLAG: &str = "quality_flag";
pub const SOURCE_FLAG: &str = "source_flag";
pub const OBSERVATION_TIME: &str = "observation_time";

/// Column layout of a headerless GHCN-Daily by-year file
/// (`ID,YYYYMMDD,ELEMENT,VALUE,MFLAG,QFLAG,SFLAG,OBSTIME`).
#[derive(Debug, Clone)]
pub struct ObservationLayout {
    elements: Vec<WeatherType>,
}

impl ObservationLayout {
    pub fn new(elements: Vec<WeatherType>) -> Self {
        Self { elements }
    }

    pub fn source_columns() -> Vec<String> {
        [
            STATION_IDENTIFIER,
            MEASUREMENT_DATE,
            MEASUREMENT_TYPE,
            MEASUREMENT_VALUE,
            MEASUREMENT_FLAG,
            QUALITY_FLAG,
            SOURCE_FLAG,
            OBSERVATION_TIME,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// Types used when parsing source fields. Flags and observation time stay text.
    pub fn source_schema() -> Result<TableSchema> {
        TableSchema::uniform(&Self::source_columns(), ColumnType::Text)?
            .with_override(MEASUREMENT_DATE, ColumnType::Date)?
            .with_override(MEASUREMENT_VALUE, ColumnType::Integer)
    }

    /// Declared schema of the target table; the value column is a 4-byte integer.
    pub fn target_schema() -> Result<TableSchema> {
        TableSchema::from_pairs(&[
            (STATION_IDENTIFIER, ColumnType::Text),
            (MEASUREMENT_DATE, ColumnType::Date),
            (MEASUREMENT_TYPE, ColumnType::Text),
            (MEASUREMENT_VALUE, ColumnType::Integer),
        ])
    }

    pub fn date_format() -> &'static str {
        GHCND_DATE_FORMAT
    }

    pub fn element_codes(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.code().to_string()).collect()
    }
}

impl Default for ObservationLayout {
    fn default() -> Self {
        Self::new(WeatherType::ALL.to_vec())
    }
}
