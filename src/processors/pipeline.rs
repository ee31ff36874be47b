use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::models::observation::{ObservationLayout, MEASUREMENT_TYPE, STATION_IDENTIFIER};
use crate::models::station::STATION_ID_COLUMN;
use crate::models::{normalize_column_names, ColumnType, StationMetadata, TableSchema, WeatherType};
use crate::processors::{write_whole_table, ChunkedTableLoader, ColumnSubsetFilter, IngestReport};
use crate::readers::{count_missing_elevation, DelimitedReader, ReaderOptions, StationReader};
use crate::utils::constants::DEFAULT_DATE_FORMAT;
use crate::utils::progress::ProgressReporter;
use crate::writers::{TableSpec, TableStorage};

/// A generic delimited file and the table it goes into.
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    pub path: PathBuf,
    pub table: String,
    pub delimiter: u8,
    /// Explicit names for a headerless file; empty means the first row is a header.
    pub columns: Vec<String>,
    /// Declared types by normalised column name; other columns are text.
    pub column_types: Vec<(String, ColumnType)>,
    pub date_format: String,
}

impl DelimitedSource {
    pub fn new(path: &Path, table: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            table: table.to_string(),
            delimiter: b',',
            columns: Vec::new(),
            column_types: Vec::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn reader_options(&self) -> ReaderOptions {
        let options = ReaderOptions::new()
            .with_delimiter(self.delimiter)
            .with_date_format(&self.date_format);
        if self.columns.is_empty() {
            options
        } else {
            options.with_column_names(self.columns.clone())
        }
    }

    /// Open the source and declare the target schema from its header.
    pub fn open(&self) -> Result<(DelimitedReader<std::io::BufReader<std::fs::File>>, TableSchema)> {
        let reader = DelimitedReader::open(&self.path, self.reader_options())?;
        let columns = normalize_column_names(reader.columns());
        let schema = TableSchema::uniform(&columns, ColumnType::Text)?
            .with_overrides(&self.column_types)?;
        Ok((reader, schema))
    }
}

/// The loading jobs of one run, sharing a configuration.
pub struct Pipeline<'a> {
    config: &'a IngestConfig,
    silent: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a IngestConfig) -> Self {
        Self {
            config,
            silent: false,
        }
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    fn table_spec(&self, name: &str, schema: TableSchema) -> TableSpec {
        TableSpec::new(name, schema).with_index_column(&self.config.index_column)
    }

    fn loader(&self, table: TableSpec) -> ChunkedTableLoader {
        ChunkedTableLoader::new(table, self.config.chunk_size).with_start_id(self.config.start_id)
    }

    /// Chunked load of an arbitrary delimited file.
    pub async fn load_delimited<S: TableStorage>(
        &self,
        source: &DelimitedSource,
        storage: &mut S,
    ) -> Result<IngestReport> {
        let (reader, schema) = source.open()?;
        let loader = self.loader(self.table_spec(&source.table, schema.clone()));

        let progress =
            ProgressReporter::new_spinner(&format!("Loading {}", source.table), self.silent);
        let report = loader
            .ingest_table(
                reader.batches(self.config.chunk_size, &schema),
                storage,
                Some(&progress),
            )
            .await?;
        progress.finish_with_message(&format!("Loaded {}", source.table));

        Ok(report)
    }

    /// Chunked load of a GHCN-Daily by-year file, keeping the configured
    /// measurement types and the four target columns.
    pub async fn load_observations<S: TableStorage>(
        &self,
        path: &Path,
        storage: &mut S,
    ) -> Result<IngestReport> {
        let layout = ObservationLayout::new(self.config.weather_types()?);
        let target_schema = ObservationLayout::target_schema()?;
        let filter = ColumnSubsetFilter::new(
            MEASUREMENT_TYPE,
            layout.element_codes(),
            target_schema.column_names(),
        );

        let options = ReaderOptions::new()
            .with_column_names(ObservationLayout::source_columns())
            .with_date_format(ObservationLayout::date_format());
        let reader = DelimitedReader::open(path, options)?;

        let table = &self.config.tables.observations;
        let loader = self.loader(
            self.table_spec(table, target_schema).with_indexed_column(STATION_IDENTIFIER),
        );

        let batches = reader
            .batches(self.config.chunk_size, &ObservationLayout::source_schema()?)
            .map(|batch| batch.and_then(|b| filter.apply(&b)));

        let progress = ProgressReporter::new_spinner(&format!("Loading {}", table), self.silent);
        let report = loader.ingest_table(batches, storage, Some(&progress)).await?;
        progress.finish_with_message(&format!("Loaded {}", table));

        Ok(report)
    }

    /// Whole-file load of `ghcnd-stations.txt`.
    pub async fn load_stations<S: TableStorage>(
        &self,
        path: &Path,
        storage: &mut S,
    ) -> Result<IngestReport> {
        let stations = StationReader::new().read_stations(path)?;
        let missing = count_missing_elevation(&stations);
        info!(
            stations = stations.len(),
            missing_elevation = missing,
            "station metadata read"
        );

        let table = self
            .table_spec(&self.config.tables.stations, StationMetadata::schema()?)
            .with_indexed_column(STATION_ID_COLUMN);
        let batch = StationMetadata::to_batch(&stations)?;

        write_whole_table(table, batch, self.config.start_id, storage).await
    }

    pub async fn load_weather_types<S: TableStorage>(&self, storage: &mut S) -> Result<IngestReport> {
        let table = self.table_spec(
            &self.config.tables.weather_types,
            WeatherType::lookup_schema()?,
        );
        write_whole_table(table, WeatherType::lookup_batch()?, self.config.start_id, storage).await
    }

    /// Observations, then stations, then the lookup table. Both input files
    /// are checked before anything is written.
    pub async fn import_all<S: TableStorage>(
        &self,
        observations: &Path,
        stations: &Path,
        storage: &mut S,
    ) -> Result<Vec<IngestReport>> {
        for path in [observations, stations] {
            if !path.exists() {
                return Err(IngestError::SourceNotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(vec![
            self.load_observations(observations, storage).await?,
            self.load_stations(stations, storage).await?,
            self.load_weather_types(storage).await?,
        ])
    }
}
