pub mod batch;
pub mod observation;
pub mod schema;
pub mod station;
pub mod weather_type;

pub use batch::{RowBatch, Value};
pub use observation::ObservationLayout;
pub use schema::{normalize_column_name, normalize_column_names, ColumnSpec, ColumnType, TableSchema};
pub use station::StationMetadata;
pub use weather_type::WeatherType;
