use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::batch::{RowBatch, Value};
use crate::models::schema::{ColumnType, TableSchema};

pub const STATION_ID_COLUMN: &str = "station_id";

/// One station from `ghcnd-stations.txt`, restricted to the fields that get loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    #[validate(length(equal = 11))]
    pub station_id: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// Metres; `None` where the file carries the -999.9 sentinel.
    pub elevation: Option<f64>,
}

impl StationMetadata {
    pub fn new(station_id: String, latitude: f64, longitude: f64, elevation: Option<f64>) -> Self {
        Self {
            station_id,
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn schema() -> Result<TableSchema> {
        TableSchema::from_pairs(&[
            (STATION_ID_COLUMN, ColumnType::Text),
            ("latitude", ColumnType::Double),
            ("longitude", ColumnType::Double),
            ("elevation", ColumnType::Double),
        ])
    }

    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Text(self.station_id.clone()),
            Value::Float(self.latitude),
            Value::Float(self.longitude),
            Value::from(self.elevation),
        ]
    }

    /// Materialise a station list as a single batch in file order.
    pub fn to_batch(stations: &[StationMetadata]) -> Result<RowBatch> {
        let rows = stations.iter().map(StationMetadata::to_row).collect();
        RowBatch::from_rows(Self::schema()?.column_names(), rows)
    }
}
