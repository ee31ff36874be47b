use std::collections::HashSet;

use crate::error::{IngestError, Result};
use crate::models::RowBatch;

/// Keeps the records whose category column holds one of the accepted values,
/// projected to a subset of columns.
#[derive(Debug, Clone)]
pub struct ColumnSubsetFilter {
    category_column: String,
    accepted: HashSet<String>,
    projection: Vec<String>,
}

impl ColumnSubsetFilter {
    pub fn new<I, S>(category_column: &str, accepted: I, projection: Vec<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category_column: category_column.to_string(),
            accepted: accepted.into_iter().map(Into::into).collect(),
            projection,
        }
    }

    /// Pure: the input batch is untouched and row order is preserved.
    pub fn apply(&self, batch: &RowBatch) -> Result<RowBatch> {
        let category = batch
            .column_index(&self.category_column)
            .ok_or_else(|| IngestError::UnknownColumn(self.category_column.clone()))?;

        let indices = self
            .projection
            .iter()
            .map(|name| {
                batch
                    .column_index(name)
                    .ok_or_else(|| IngestError::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;

        let mut filtered = RowBatch::new(self.projection.clone());
        for row in batch.rows() {
            let matches = row[category]
                .as_str()
                .map(|value| self.accepted.contains(value))
                .unwrap_or(false);

            if matches {
                filtered.push_row(indices.iter().map(|&i| row[i].clone()).collect())?;
            }
        }

        Ok(filtered)
    }
}
