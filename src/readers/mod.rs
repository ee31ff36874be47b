pub mod delimited_reader;
pub mod station_reader;

pub use delimited_reader::{DelimitedReader, HeaderMode, ReaderOptions, RowBatches};
pub use station_reader::{count_missing_elevation, StationReader};
