use crate::error::{IngestError, Result};
use crate::models::schema::{normalize_column_name, ColumnType, TableSchema};
use crate::models::{RowBatch, Value};
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_DATE_FORMAT};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Where column names come from.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderMode {
    /// The first row of the source is a header.
    FirstRow,
    /// The source has no header; use these names.
    Names(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub delimiter: u8,
    pub header: HeaderMode,
    pub date_format: String,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            header: HeaderMode::FirstRow,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_column_names(mut self, names: Vec<String>) -> Self {
        self.header = HeaderMode::Names(names);
        self
    }

    pub fn with_date_format(mut self, date_format: &str) -> Self {
        self.date_format = date_format.to_string();
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Delimited text source that yields typed [`RowBatch`]es of bounded size.
pub struct DelimitedReader<R: Read> {
    reader: csv::Reader<R>,
    columns: Vec<String>,
    date_format: String,
}

impl DelimitedReader<BufReader<File>> {
    /// Open a file on disk. A missing file is reported before anything is read.
    pub fn open(path: &Path, options: ReaderOptions) -> Result<Self> {
        if !path.exists() {
            return Err(IngestError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file), options)
    }
}

impl<R: Read> DelimitedReader<R> {
    pub fn from_reader(source: R, options: ReaderOptions) -> Result<Self> {
        let has_headers = options.header == HeaderMode::FirstRow;
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(has_headers)
            .flexible(true)
            .from_reader(source);

        let columns = match options.header {
            HeaderMode::FirstRow => reader.headers()?.iter().map(|h| h.to_string()).collect(),
            HeaderMode::Names(names) => names,
        };

        Ok(Self {
            reader,
            columns,
            date_format: options.date_format,
        })
    }

    /// Source column names, as read (not normalised).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Consume the reader as a lazy sequence of batches of at most `chunk_size` rows.
    ///
    /// Field types come from `types`, looked up by normalised column name;
    /// columns it does not declare are read as text.
    pub fn batches(self, chunk_size: usize, types: &TableSchema) -> RowBatches<R> {
        let column_types = self
            .columns
            .iter()
            .enumerate()
            .map(|(position, name)| {
                types
                    .column_type(&normalize_column_name(name, position))
                    .unwrap_or(ColumnType::Text)
            })
            .collect();

        RowBatches {
            records: self.reader.into_records(),
            columns: self.columns,
            column_types,
            chunk_size: chunk_size.max(1),
            date_format: self.date_format,
            finished: false,
        }
    }

    /// Read up to `limit` rows as one batch.
    pub fn head(self, limit: usize, types: &TableSchema) -> Result<RowBatch> {
        let columns = self.columns.clone();
        match self.batches(limit.max(1), types).next() {
            Some(batch) => batch,
            None => Ok(RowBatch::new(columns)),
        }
    }
}

pub struct RowBatches<R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: Vec<String>,
    column_types: Vec<ColumnType>,
    chunk_size: usize,
    date_format: String,
    finished: bool,
}

impl<R: Read> RowBatches<R> {
    fn parse_record(&self, record: &StringRecord) -> Result<Vec<Value>> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != self.columns.len() {
            return Err(IngestError::Parse {
                line,
                column: "*".to_string(),
                message: format!(
                    "expected {} fields, found {}",
                    self.columns.len(),
                    record.len()
                ),
            });
        }

        record
            .iter()
            .zip(self.columns.iter().zip(&self.column_types))
            .map(|(raw, (column, column_type))| {
                column_type
                    .parse_field(raw, &self.date_format)
                    .map_err(|message| IngestError::Parse {
                        line,
                        column: column.clone(),
                        message,
                    })
            })
            .collect()
    }
}

impl<R: Read> Iterator for RowBatches<R> {
    type Item = Result<RowBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut batch = RowBatch::with_capacity(self.columns.clone(), self.chunk_size.min(8192));
        while batch.len() < self.chunk_size {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.finished = true;
                    break;
                }
            };

            let row = match self.parse_record(&record) {
                Ok(row) => row,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            if let Err(e) = batch.push_row(row) {
                self.finished = true;
                return Some(Err(e));
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
