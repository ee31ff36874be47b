/// Default file names
pub const OBSERVATIONS_FILE: &str = "2015.csv";
pub const STATIONS_FILE: &str = "ghcnd-stations.txt";

/// Default table names
pub const OBSERVATIONS_TABLE: &str = "weather_data";
pub const STATIONS_TABLE: &str = "station_metadata";
pub const WEATHER_TYPES_TABLE: &str = "weather_types";
pub const DEFAULT_LOAD_TABLE: &str = "table";

/// Row index column written alongside every loaded table
pub const DEFAULT_INDEX_COLUMN: &str = "id";
pub const DEFAULT_START_ID: i64 = 1;

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;
pub const DEFAULT_INSERT_BATCH_ROWS: usize = 1_000;
pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// PostgreSQL caps a single statement at 65535 bind parameters
pub const POSTGRES_MAX_BIND_PARAMS: usize = 65_535;

/// Date formats
pub const GHCND_DATE_FORMAT: &str = "%Y%m%d";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Station metadata sentinel for a missing elevation
pub const MISSING_ELEVATION: f64 = -999.9;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "GHCND";
