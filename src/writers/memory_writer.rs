use std::collections::HashMap;

use crate::error::{IngestError, Result};
use crate::models::{RowBatch, Value};
use crate::writers::storage::{TableSpec, TableStorage};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub spec: TableSpec,
    pub rows: Vec<StoredRow>,
}

/// In-process storage with the same append semantics as the database writer.
/// Backs `--dry-run`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: HashMap<String, MemoryTable>,
    append_calls: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn ids(&self, name: &str) -> Vec<i64> {
        self.table(name)
            .map(|t| t.rows.iter().map(|r| r.id).collect())
            .unwrap_or_default()
    }

    pub fn append_calls(&self) -> usize {
        self.append_calls
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TableStorage for MemoryStorage {
    async fn append(&mut self, table: &TableSpec, first_id: i64, batch: &RowBatch) -> Result<u64> {
        let rows = table.schema.conform(&table.name, batch)?;
        self.append_calls += 1;

        let stored = self
            .tables
            .entry(table.name.clone())
            .or_insert_with(|| MemoryTable {
                spec: table.clone(),
                rows: Vec::new(),
            });

        if stored.spec.schema != table.schema || stored.spec.index_column != table.index_column {
            return Err(IngestError::SchemaMismatch {
                table: table.name.clone(),
                message: "existing table was created with a different layout".to_string(),
            });
        }

        let written = rows.len() as u64;
        stored.rows.extend(rows.into_iter().enumerate().map(|(offset, values)| StoredRow {
            id: first_id + offset as i64,
            values,
        }));

        Ok(written)
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        self.table(table)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| IngestError::SchemaMismatch {
                table: table.to_string(),
                message: "table does not exist".to_string(),
            })
    }
}
