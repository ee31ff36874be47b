use crate::error::Result;
use crate::models::{RowBatch, TableSchema};
use crate::utils::constants::DEFAULT_INDEX_COLUMN;

/// Target table: name, row index column and declared schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub index_column: String,
    pub schema: TableSchema,
    /// Extra non-unique indexes, e.g. on the station identifier used for joins.
    pub indexed_columns: Vec<String>,
}

impl TableSpec {
    pub fn new(name: &str, schema: TableSchema) -> Self {
        Self {
            name: name.to_string(),
            index_column: DEFAULT_INDEX_COLUMN.to_string(),
            schema,
            indexed_columns: Vec::new(),
        }
    }

    pub fn with_index_column(mut self, index_column: &str) -> Self {
        self.index_column = index_column.to_string();
        self
    }

    pub fn with_indexed_column(mut self, column: &str) -> Self {
        self.indexed_columns.push(column.to_string());
        self
    }
}

/// Relational append capability.
///
/// `append` creates the table from `table.schema` when it does not exist yet
/// and otherwise adds rows after the existing ones. Nothing is overwritten
/// or deduplicated. Row `p` of `batch` is stored with index `first_id + p`.
#[allow(async_fn_in_trait)]
pub trait TableStorage {
    async fn append(&mut self, table: &TableSpec, first_id: i64, batch: &RowBatch) -> Result<u64>;

    async fn row_count(&mut self, table: &str) -> Result<u64>;
}
