use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::{info, Level};

use crate::cli::args::{Cli, Commands, SourceArgs};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::models::{normalize_column_names, RowBatch};
use crate::processors::{DelimitedSource, IngestReport, Pipeline};
use crate::writers::{MemoryStorage, PostgresWriter, TableStorage};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = IngestConfig::load_with_overrides(cli.config.as_deref(), &cli.overrides())?;

    if let Commands::Preview { source, rows, json } = &cli.command {
        return preview(source, *rows, *json);
    }

    if cli.dry_run {
        println!("Dry run: loading into memory, nothing is written to the database");
        let mut storage = MemoryStorage::new();
        let reports = execute(&cli.command, &config, &mut storage).await?;
        print_reports(&reports, &mut storage).await?;
        return Ok(());
    }

    let url = config.database_url()?;
    info!("Connecting to database...");
    let mut storage = PostgresWriter::connect(url)
        .await?
        .with_insert_batch_rows(config.insert_batch_rows);

    let reports = execute(&cli.command, &config, &mut storage).await?;
    print_reports(&reports, &mut storage).await?;

    println!("Ingestion complete!");
    Ok(())
}

async fn execute<S: TableStorage>(
    command: &Commands,
    config: &IngestConfig,
    storage: &mut S,
) -> Result<Vec<IngestReport>> {
    let pipeline = Pipeline::new(config);

    match command {
        Commands::Load { source, table } => {
            let source = delimited_source(source, table)?;
            println!("Loading {} into table {}", source.path.display(), table);
            println!("Chunk size: {}", config.chunk_size);
            Ok(vec![pipeline.load_delimited(&source, storage).await?])
        }

        Commands::Observations { input, .. } => {
            println!("Loading observations from {}", input.display());
            println!("Measurement types: {}", config.elements.join(", "));
            Ok(vec![pipeline.load_observations(input, storage).await?])
        }

        Commands::Stations { input } => {
            println!("Loading station metadata from {}", input.display());
            Ok(vec![pipeline.load_stations(input, storage).await?])
        }

        Commands::WeatherTypes => Ok(vec![pipeline.load_weather_types(storage).await?]),

        Commands::Import {
            observations,
            stations,
            ..
        } => {
            println!(
                "Importing {} and {}",
                observations.display(),
                stations.display()
            );
            pipeline.import_all(observations, stations, storage).await
        }

        Commands::Preview { .. } => Ok(Vec::new()),
    }
}

async fn print_reports<S: TableStorage>(reports: &[IngestReport], storage: &mut S) -> Result<()> {
    for report in reports {
        let total = storage.row_count(&report.table).await?;
        println!("{} ({} rows in table)", report.summary(), total);
    }
    Ok(())
}

fn delimited_source(args: &SourceArgs, table: &str) -> Result<DelimitedSource> {
    if !args.delimiter.is_ascii() {
        return Err(IngestError::Config(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            args.delimiter
        )));
    }

    let mut source = DelimitedSource::new(&args.input, table);
    source.delimiter = args.delimiter as u8;
    source.columns = args.columns.clone();
    source.column_types = args.column_types.clone();
    source.date_format = args.date_format.clone();
    Ok(source)
}

fn preview(args: &SourceArgs, rows: usize, json: bool) -> Result<()> {
    let source = delimited_source(args, "preview")?;
    let (reader, schema) = source.open()?;
    let batch = reader.head(rows, &schema)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&batch_to_json(&batch))?);
    } else {
        print!("{}", format_table(&batch));
    }
    Ok(())
}

fn batch_to_json(batch: &RowBatch) -> Vec<serde_json::Map<String, serde_json::Value>> {
    let columns = normalize_column_names(batch.columns());
    batch
        .rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .cloned()
                .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Plain-text table with columns padded to their widest cell.
pub fn format_table(batch: &RowBatch) -> String {
    let cells: Vec<Vec<String>> = batch
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let widths: Vec<usize> = batch
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(batch.columns().iter().map(String::as_str).collect()));
    out.push('\n');
    for row in &cells {
        out.push_str(&format_line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    // A second initialisation (e.g. in tests) is not an error
    let _ = match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    if verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
