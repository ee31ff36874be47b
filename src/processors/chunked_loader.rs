use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::error::{IngestError, Result};
use crate::models::{normalize_column_names, RowBatch};
use crate::utils::constants::DEFAULT_START_ID;
use crate::utils::progress::ProgressReporter;
use crate::writers::{TableSpec, TableStorage};

/// Next unused row identifier, threaded from one chunk to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowIdCursor {
    next_id: i64,
}

impl RowIdCursor {
    pub fn new(start_id: i64) -> Self {
        Self { next_id: start_id }
    }

    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Cursor after `rows` identifiers have been handed out. Fails instead of
    /// wrapping past `i64::MAX`.
    pub fn advance(self, rows: usize) -> Result<Self> {
        i64::try_from(rows)
            .ok()
            .and_then(|rows| self.next_id.checked_add(rows))
            .map(|next_id| Self { next_id })
            .ok_or_else(|| {
                IngestError::Config(format!(
                    "Row identifiers exhausted: {} rows starting at id {} exceed {}",
                    rows,
                    self.next_id,
                    i64::MAX
                ))
            })
    }
}

impl Default for RowIdCursor {
    fn default() -> Self {
        Self::new(DEFAULT_START_ID)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub table: String,
    pub chunks: usize,
    pub rows_written: u64,
    pub first_id: Option<i64>,
    pub last_id: Option<i64>,
    pub elapsed: Duration,
}

impl IngestReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            chunks: 0,
            rows_written: 0,
            first_id: None,
            last_id: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn summary(&self) -> String {
        let ids = match (self.first_id, self.last_id) {
            (Some(first), Some(last)) => format!("ids {}..={}", first, last),
            _ => "no ids assigned".to_string(),
        };
        format!(
            "{}: {} rows in {} chunks ({}) in {:.2}s",
            self.table,
            self.rows_written,
            self.chunks,
            ids,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Appends a lazy sequence of batches to one table, tagging every record with
/// a contiguous identifier.
///
/// Reads and writes alternate: a chunk is fully written before the next one
/// is pulled from the source. The first failure stops the run and leaves
/// already-committed chunks in place.
pub struct ChunkedTableLoader {
    table: TableSpec,
    chunk_size: usize,
    start_id: i64,
}

impl ChunkedTableLoader {
    pub fn new(table: TableSpec, chunk_size: usize) -> Self {
        Self {
            table,
            chunk_size: chunk_size.max(1),
            start_id: DEFAULT_START_ID,
        }
    }

    pub fn with_start_id(mut self, start_id: i64) -> Self {
        self.start_id = start_id;
        self
    }

    /// Normalise, tag and append a single chunk; returns the advanced cursor.
    pub async fn ingest_chunk<S: TableStorage>(
        &self,
        cursor: RowIdCursor,
        batch: RowBatch,
        storage: &mut S,
    ) -> Result<RowIdCursor> {
        let batch = normalize_batch(batch)?;
        let next = cursor.advance(batch.len())?;

        storage.append(&self.table, cursor.next_id(), &batch).await?;
        Ok(next)
    }

    pub async fn ingest_table<S, I>(
        &self,
        batches: I,
        storage: &mut S,
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestReport>
    where
        S: TableStorage,
        I: IntoIterator<Item = Result<RowBatch>>,
    {
        let started = Instant::now();
        let mut report = IngestReport::new(&self.table.name);
        let mut cursor = RowIdCursor::new(self.start_id);

        for (index, batch) in batches.into_iter().enumerate() {
            let chunk = index + 1;
            let batch = batch.map_err(|e| {
                error!(
                    table = %self.table.name,
                    chunk,
                    rows_committed = report.rows_written,
                    "reading source failed: {}",
                    e
                );
                e
            })?;

            if batch.len() > self.chunk_size {
                return Err(IngestError::InvalidFormat(format!(
                    "chunk {} has {} rows, more than the chunk size {}",
                    chunk,
                    batch.len(),
                    self.chunk_size
                )));
            }

            let rows = batch.len();
            let first_id = cursor.next_id();
            cursor = self
                .ingest_chunk(cursor, batch, storage)
                .await
                .map_err(|e| {
                    error!(
                        table = %self.table.name,
                        chunk,
                        rows_committed = report.rows_written,
                        "append failed: {}",
                        e
                    );
                    IngestError::ChunkFailed {
                        table: self.table.name.clone(),
                        chunk,
                        rows_committed: report.rows_written,
                        source: Box::new(e),
                    }
                })?;

            report.chunks = chunk;
            report.rows_written += rows as u64;
            if rows > 0 {
                report.first_id.get_or_insert(first_id);
                report.last_id = Some(cursor.next_id() - 1);
            }

            debug!(table = %self.table.name, chunk, rows, next_id = cursor.next_id(), "chunk appended");
            if let Some(p) = progress {
                p.increment(rows as u64);
            }
        }

        if report.chunks == 0 {
            // An empty source still leaves an empty table behind
            let empty = RowBatch::new(self.table.schema.column_names());
            storage.append(&self.table, cursor.next_id(), &empty).await?;
        }

        report.elapsed = started.elapsed();
        info!(
            table = %self.table.name,
            rows = report.rows_written,
            chunks = report.chunks,
            "ingestion complete"
        );
        Ok(report)
    }
}

/// Header-only rewrite of a batch to storage-safe column names.
pub fn normalize_batch(batch: RowBatch) -> Result<RowBatch> {
    let columns = normalize_column_names(batch.columns());
    batch.with_columns(columns)
}

/// Write a small table in one piece through the same append path.
pub async fn write_whole_table<S: TableStorage>(
    table: TableSpec,
    batch: RowBatch,
    start_id: i64,
    storage: &mut S,
) -> Result<IngestReport> {
    let loader = ChunkedTableLoader::new(table, batch.len()).with_start_id(start_id);
    loader
        .ingest_table(std::iter::once(Ok(batch)), storage, None)
        .await
}
