// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! The database-loading collaborator driven by the protocol parsers.
//!
//! The decoder owns no schema state: the column registry lives behind
//! [`DatabaseLoader`], and the decoder only queries it through
//! [`DatabaseLoader::column`] to size and deliver cell payloads.

use thiserror::Error;

pub use self::catalog::{ColumnCatalog, TableCatalog};
pub use self::memory::MemoryLoader;

mod catalog;
mod memory;

pub type TableId = u32;
pub type ColumnId = u32;

/// Column flag bit: payloads arrive compressed with the integer codec.
pub const COLUMN_FLAG_COMPRESSED: u32 = 1;

/// The registry record the decoder needs to size a column's cell payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    pub elem_bits: u32,
    pub compressed: bool,
}

/// The error type of loader operations.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unexpected {0} event in {1} state")]
    UnexpectedEvent(&'static str, &'static str),
    #[error("duplicated {0}: {1}")]
    Duplicated(&'static str, String),
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("column {0}: invalid element width {1}")]
    InvalidElemBits(ColumnId, u32),
    #[error("column {0}: {1} bytes cannot hold {2} elements of {3} bits")]
    CellSize(ColumnId, usize, u64, u32),
    #[error("producer reported failure: {0}")]
    Producer(String),
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Interface of the database loader. Parsers invoke exactly one method per
/// decoded event, in stream order; any `Err` terminates parsing.
///
/// Payload slices (`data`) are only valid for the duration of the call:
/// they alias the decoder's staging buffers. Implementations that retain
/// them must copy.
pub trait DatabaseLoader {
    fn use_schema(&mut self, file: &str, name: &str) -> LoadResult<()>;

    fn remote_path(&mut self, path: &str) -> LoadResult<()>;

    fn new_table(&mut self, table_id: TableId, name: &str) -> LoadResult<()>;

    fn new_column(
        &mut self,
        column_id: ColumnId,
        table_id: TableId,
        elem_bits: u32,
        flag_bits: u32,
        name: &str,
    ) -> LoadResult<()>;

    /// Registry lookup for a previously declared column. Must return
    /// `Some` for every column accepted by [`DatabaseLoader::new_column`].
    fn column(&self, column_id: ColumnId) -> Option<ColumnInfo>;

    fn cell_data(&mut self, column_id: ColumnId, data: &[u8], elem_count: u64) -> LoadResult<()>;

    /// An empty default is delivered as an empty slice with `elem_count` 0.
    fn cell_default(&mut self, column_id: ColumnId, data: &[u8], elem_count: u64)
        -> LoadResult<()>;

    fn open_stream(&mut self) -> LoadResult<()>;

    fn close_stream(&mut self) -> LoadResult<()>;

    fn next_row(&mut self, table_id: TableId) -> LoadResult<()>;

    fn move_ahead(&mut self, table_id: TableId, nrows: u64) -> LoadResult<()>;

    fn error_message(&mut self, message: &str) -> LoadResult<()>;
}
