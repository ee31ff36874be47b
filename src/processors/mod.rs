pub mod chunked_loader;
pub mod column_filter;
pub mod pipeline;

pub use chunked_loader::{normalize_batch, write_whole_table, ChunkedTableLoader, IngestReport, RowIdCursor};
pub use column_filter::ColumnSubsetFilter;
pub use pipeline::{DelimitedSource, Pipeline};
