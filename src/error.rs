use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Parse error at line {line}, column '{column}': {message}")]
    Parse {
        line: u64,
        column: String,
        message: String,
    },

    #[error("Row has {found} fields, expected {expected}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Schema mismatch for table {table}: {message}")]
    SchemaMismatch { table: String, message: String },

    #[error("Column '{column}' declared as {expected} cannot hold {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Append of chunk {chunk} to {table} failed after {rows_committed} committed rows: {source}")]
    ChunkFailed {
        table: String,
        chunk: usize,
        rows_committed: u64,
        #[source]
        source: Box<IngestError>,
    },
}

/// Coarse classification of an error by the stage of the run that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Source,
    Storage,
    Configuration,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Io(_)
            | IngestError::Csv(_)
            | IngestError::Parse { .. }
            | IngestError::ColumnCount { .. }
            | IngestError::InvalidFormat(_)
            | IngestError::Json(_) => ErrorKind::Source,

            IngestError::Database(_)
            | IngestError::SchemaMismatch { .. }
            | IngestError::TypeMismatch { .. }
            | IngestError::ChunkFailed { .. } => ErrorKind::Storage,

            IngestError::Config(_)
            | IngestError::ConfigSource(_)
            | IngestError::Validation(_)
            | IngestError::SourceNotFound { .. }
            | IngestError::UnknownColumn(_)
            | IngestError::DuplicateColumn(_) => ErrorKind::Configuration,
        }
    }
}
