pub mod memory_writer;
pub mod postgres_writer;
pub mod storage;

pub use memory_writer::{MemoryStorage, MemoryTable, StoredRow};
pub use postgres_writer::PostgresWriter;
pub use storage::{TableSpec, TableStorage};
