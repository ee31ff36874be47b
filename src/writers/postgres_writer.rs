use std::collections::HashSet;

use sqlx::postgres::PgPoolOptions;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::{ColumnType, RowBatch, Value};
use crate::utils::constants::{DEFAULT_INSERT_BATCH_ROWS, POSTGRES_MAX_BIND_PARAMS};
use crate::writers::storage::{TableSpec, TableStorage};

/// Appends batches to PostgreSQL tables over a single connection.
pub struct PostgresWriter {
    pool: PgPool,
    insert_batch_rows: usize,
    prepared_tables: HashSet<String>,
}

impl PostgresWriter {
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(1).connect(url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            insert_batch_rows: DEFAULT_INSERT_BATCH_ROWS,
            prepared_tables: HashSet::new(),
        }
    }

    /// Rows per INSERT statement.
    pub fn with_insert_batch_rows(mut self, rows: usize) -> Self {
        self.insert_batch_rows = rows.max(1);
        self
    }

    fn rows_per_statement(&self, column_count: usize) -> usize {
        // +1 for the index column
        (POSTGRES_MAX_BIND_PARAMS / (column_count + 1))
            .min(self.insert_batch_rows)
            .max(1)
    }

    async fn ensure_table(&mut self, table: &TableSpec) -> Result<()> {
        if self.prepared_tables.contains(&table.name) {
            return Ok(());
        }

        sqlx::query(&create_table_sql(table))
            .execute(&self.pool)
            .await?;

        let indexed = std::iter::once(&table.index_column).chain(&table.indexed_columns);
        for column in indexed {
            sqlx::query(&create_index_sql(&table.name, column))
                .execute(&self.pool)
                .await?;
        }

        debug!(table = %table.name, "table ready");
        self.prepared_tables.insert(table.name.clone());
        Ok(())
    }
}

impl TableStorage for PostgresWriter {
    #[instrument(skip(self, table, batch), fields(table = %table.name, rows = batch.len()), err)]
    async fn append(&mut self, table: &TableSpec, first_id: i64, batch: &RowBatch) -> Result<u64> {
        let rows = table.schema.conform(&table.name, batch)?;
        self.ensure_table(table).await?;

        if rows.is_empty() {
            return Ok(0);
        }

        let insert_prefix = insert_prefix_sql(table);
        let per_statement = self.rows_per_statement(table.schema.len());
        let column_types: Vec<ColumnType> =
            table.schema.columns().iter().map(|c| c.column_type).collect();

        // One transaction per chunk: a failed chunk leaves earlier chunks intact
        let mut tx = self.pool.begin().await?;
        let mut next_id = first_id;

        for statement_rows in rows.chunks(per_statement) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix.as_str());
            let start_id = next_id;

            builder.push_values(
                statement_rows.iter().enumerate(),
                |mut separated, (offset, row)| {
                    separated.push_bind(start_id + offset as i64);
                    for (value, column_type) in row.iter().zip(&column_types) {
                        push_value(&mut separated, *column_type, value);
                    }
                },
            );

            builder.build().execute(&mut *tx).await?;
            next_id += statement_rows.len() as i64;
        }

        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn row_count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

/// Bind a value with the parameter type of its declared column, so nulls
/// carry the right type too. Values have already been coerced by the schema.
fn push_value<'qb, 'args: 'qb>(
    separated: &mut Separated<'qb, 'args, Postgres, &'static str>,
    column_type: ColumnType,
    value: &Value,
) {
    match column_type {
        ColumnType::BigInt => {
            let v = match value {
                Value::Integer(v) => Some(*v),
                _ => None,
            };
            separated.push_bind(v);
        }
        ColumnType::Integer => {
            let v = match value {
                Value::Integer(v) => i32::try_from(*v).ok(),
                _ => None,
            };
            separated.push_bind(v);
        }
        ColumnType::Double => {
            let v = match value {
                Value::Float(v) => Some(*v),
                Value::Integer(v) => Some(*v as f64),
                _ => None,
            };
            separated.push_bind(v);
        }
        ColumnType::Text => {
            let v = match value {
                Value::Text(v) => Some(v.clone()),
                _ => None,
            };
            separated.push_bind(v);
        }
        ColumnType::Date => {
            let v = match value {
                Value::Date(v) => Some(*v),
                _ => None,
            };
            separated.push_bind(v);
        }
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(table: &TableSpec) -> String {
    let mut columns = vec![format!("{} BIGINT", quote_identifier(&table.index_column))];
    columns.extend(
        table
            .schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type.sql_type())),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(&table.name),
        columns.join(", ")
    )
}

/// Non-unique, so a re-run appends duplicates instead of failing.
pub fn create_index_sql(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_identifier(&format!("ix_{}_{}", table, column)),
        quote_identifier(table),
        quote_identifier(column)
    )
}

fn insert_prefix_sql(table: &TableSpec) -> String {
    let columns: Vec<String> = std::iter::once(&table.index_column)
        .chain(table.schema.columns().iter().map(|c| &c.name))
        .map(|name| quote_identifier(name))
        .collect();

    format!(
        "INSERT INTO {} ({}) ",
        quote_identifier(&table.name),
        columns.join(", ")
    )
}
