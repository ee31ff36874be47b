use chrono::NaiveDate;
use ghcnd_ingest::config::IngestConfig;
use ghcnd_ingest::error::{ErrorKind, IngestError};
use ghcnd_ingest::models::{ColumnType, Value};
use ghcnd_ingest::processors::{DelimitedSource, Pipeline};
use ghcnd_ingest::writers::{MemoryStorage, TableStorage};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const OBSERVATIONS: &str = "\
US1MISW0005,20150101,PRCP,0,,,N,
US1MISW0005,20150101,SNOW,0,,,N,
US1MISW0005,20150101,WESD,0,,,N,
USW00094728,20150101,TMAX,39,,,W,2400
USW00094728,20150101,TMIN,-43,,,W,2400
USW00094728,20150101,AWND,26,,,W,
USW00094728,20150102,SNWD,0,,,W,
";

const STATIONS: &str = "\
US1MISW0005  42.5064  -84.6581  286.5 MI MASON 2.8 S
USW00094728  40.7789  -73.9692   39.6 NY NEW YORK CNTRL PK TWR       HCN 72506
AQC00914000 -14.3167 -170.7667 -999.9 AS AASUFOU
";

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create fixture");
    file.write_all(contents.as_bytes()).expect("Failed to write fixture");
    path
}

fn config(chunk_size: usize) -> IngestConfig {
    IngestConfig {
        chunk_size,
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn test_observations_are_filtered_and_projected() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_file(&temp_dir, "2015.csv", OBSERVATIONS);
    let config = config(3);
    let mut storage = MemoryStorage::new();

    let report = Pipeline::new(&config)
        .with_silent(true)
        .load_observations(&input, &mut storage)
        .await
        .unwrap();

    // 7 source rows in chunks of 3; WESD and AWND are dropped
    assert_eq!(report.chunks, 3);
    assert_eq!(report.rows_written, 5);

    let table = storage.table("weather_data").unwrap();
    assert_eq!(storage.ids("weather_data"), vec![1, 2, 3, 4, 5]);
    assert_eq!(
        table.spec.schema.column_names(),
        vec![
            "station_identifier",
            "measurement_date",
            "measurement_type",
            "measurement_value"
        ]
    );

    let types: Vec<String> = table.rows.iter().map(|r| r.values[2].to_string()).collect();
    assert_eq!(types, vec!["PRCP", "SNOW", "TMAX", "TMIN", "SNWD"]);

    let tmin = &table.rows[3].values;
    assert_eq!(tmin[0], Value::from("USW00094728"));
    assert_eq!(
        tmin[1],
        Value::Date(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
    );
    assert_eq!(tmin[3], Value::Integer(-43));
}

#[tokio::test]
async fn test_observations_element_selection() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_file(&temp_dir, "2015.csv", OBSERVATIONS);
    let config = IngestConfig {
        elements: vec!["PRCP".to_string(), "TMAX".to_string()],
        ..IngestConfig::default()
    };
    let mut storage = MemoryStorage::new();

    Pipeline::new(&config)
        .with_silent(true)
        .load_observations(&input, &mut storage)
        .await
        .unwrap();

    assert_eq!(storage.row_count("weather_data").await.unwrap(), 2);
}

#[tokio::test]
async fn test_stations_and_weather_types() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stations = write_file(&temp_dir, "ghcnd-stations.txt", STATIONS);
    let config = config(100);
    let mut storage = MemoryStorage::new();
    let pipeline = Pipeline::new(&config).with_silent(true);

    let report = pipeline.load_stations(&stations, &mut storage).await.unwrap();
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.chunks, 1);

    let table = storage.table("station_metadata").unwrap();
    assert_eq!(table.spec.indexed_columns, vec!["station_id"]);
    assert_eq!(table.rows[2].values[3], Value::Null);
    assert_eq!(table.rows[1].values[1], Value::Float(40.7789));

    pipeline.load_weather_types(&mut storage).await.unwrap();
    let types = storage.table("weather_types").unwrap();
    assert_eq!(storage.ids("weather_types"), vec![1, 2, 3, 4, 5]);
    assert_eq!(types.rows[0].values[1], Value::from("Precipitation"));
}

#[tokio::test]
async fn test_import_all() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let observations = write_file(&temp_dir, "2015.csv", OBSERVATIONS);
    let stations = write_file(&temp_dir, "ghcnd-stations.txt", STATIONS);
    let config = config(2);
    let mut storage = MemoryStorage::new();

    let reports = Pipeline::new(&config)
        .with_silent(true)
        .import_all(&observations, &stations, &mut storage)
        .await
        .unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(
        storage.table_names(),
        vec!["station_metadata", "weather_data", "weather_types"]
    );
}

#[tokio::test]
async fn test_import_fails_before_writing_when_file_missing() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let observations = write_file(&temp_dir, "2015.csv", OBSERVATIONS);
    let config = config(2);
    let mut storage = MemoryStorage::new();

    let err = Pipeline::new(&config)
        .with_silent(true)
        .import_all(&observations, Path::new("/nonexistent/ghcnd-stations.txt"), &mut storage)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(storage.append_calls(), 0);
}

#[tokio::test]
async fn test_generic_load_normalizes_header_and_applies_overrides() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_file(
        &temp_dir,
        "readings.csv",
        "station id,reading date,value\nA,2015-01-01,3\nB,2015-01-02,\nC,2015-01-03,7\n",
    );
    let config = config(2);
    let mut storage = MemoryStorage::new();

    let mut source = DelimitedSource::new(&input, "table");
    source.column_types = vec![
        ("readingdate".to_string(), ColumnType::Date),
        ("value".to_string(), ColumnType::Integer),
    ];

    let report = Pipeline::new(&config)
        .with_silent(true)
        .load_delimited(&source, &mut storage)
        .await
        .unwrap();

    assert_eq!(report.chunks, 2);
    let table = storage.table("table").unwrap();
    assert_eq!(
        table.spec.schema.column_names(),
        vec!["stationid", "readingdate", "value"]
    );
    assert_eq!(table.spec.schema.column_type("stationid"), Some(ColumnType::Text));
    assert_eq!(table.rows[1].values[2], Value::Null);
    assert_eq!(storage.ids("table"), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_generic_load_unknown_override_is_config_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_file(&temp_dir, "readings.csv", "a,b\n1,2\n");
    let config = config(2);
    let mut storage = MemoryStorage::new();

    let mut source = DelimitedSource::new(&input, "table");
    source.column_types = vec![("c".to_string(), ColumnType::Integer)];

    let err = Pipeline::new(&config)
        .with_silent(true)
        .load_delimited(&source, &mut storage)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::UnknownColumn(_)));
    assert_eq!(storage.append_calls(), 0);
}

#[tokio::test]
async fn test_malformed_row_keeps_earlier_chunks() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_file(
        &temp_dir,
        "2015.csv",
        "US1MISW0005,20150101,PRCP,0,,,N,\nUS1MISW0005,20150102,PRCP,5,,,N,\nUS1MISW0005,20150103,PRCP\n",
    );
    let config = config(2);
    let mut storage = MemoryStorage::new();

    let err = Pipeline::new(&config)
        .with_silent(true)
        .load_observations(&input, &mut storage)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Source);
    assert_eq!(storage.ids("weather_data"), vec![1, 2]);
}

#[tokio::test]
async fn test_header_only_file_creates_empty_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input = write_file(&temp_dir, "readings.csv", "a,b\n");
    let config = config(2);
    let mut storage = MemoryStorage::new();

    let source = DelimitedSource::new(&input, "table");
    let report = Pipeline::new(&config)
        .with_silent(true)
        .load_delimited(&source, &mut storage)
        .await
        .unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(report.chunks, 0);
    assert_eq!(storage.row_count("table").await.unwrap(), 0);
    assert_eq!(
        storage.table("table").unwrap().spec.schema.column_names(),
        vec!["a", "b"]
    );
}
