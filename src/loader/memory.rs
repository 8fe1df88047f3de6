// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! In-memory database loader.
//!
//! Enforces the stream state machine and owns the table/column catalog. No
//! database is written: cells are validated and accounted, which makes this
//! loader a dry-run target for producers and the default collaborator of
//! the `bulkload` binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::catalog::{ColumnCatalog, TableCatalog};
use super::{
    ColumnId, ColumnInfo, DatabaseLoader, LoadError, LoadResult, TableId, COLUMN_FLAG_COMPRESSED,
};

/// Stream lifecycle. Declarations are only accepted between use-schema and
/// open-stream; row data only while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Init,
    SchemaAnnounced,
    PathAnnounced,
    Open,
    Closed,
}

impl LoadState {
    fn name(self) -> &'static str {
        match self {
            LoadState::Init => "initial",
            LoadState::SchemaAnnounced => "schema-announced",
            LoadState::PathAnnounced => "path-announced",
            LoadState::Open => "open",
            LoadState::Closed => "closed",
        }
    }

    fn is_declaring(self) -> bool {
        matches!(self, LoadState::SchemaAnnounced | LoadState::PathAnnounced)
    }
}

pub struct MemoryLoader {
    state: LoadState,
    include_paths: Vec<PathBuf>,
    schema_files: Vec<PathBuf>,
    schema: Option<(String, String)>,
    remote_path: Option<String>,
    tables: BTreeMap<TableId, TableCatalog>,
    columns: BTreeMap<ColumnId, ColumnCatalog>,
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            state: LoadState::Init,
            include_paths: Vec::new(),
            schema_files: Vec::new(),
            schema: None,
            remote_path: None,
            tables: BTreeMap::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Add a directory to search for schema files named by use-schema.
    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) {
        self.include_paths.push(path.into());
    }

    /// Add a schema file known ahead of the stream.
    pub fn add_schema_file(&mut self, path: impl Into<PathBuf>) {
        self.schema_files.push(path.into());
    }

    fn resolve_schema(&self, file: &str) -> Option<PathBuf> {
        let path = Path::new(file);
        if path.exists() {
            return Some(path.into());
        }
        if let Some(known) = self
            .schema_files
            .iter()
            .find(|p| p.as_path() == path || p.file_name() == path.file_name())
        {
            return Some(known.clone());
        }
        self.include_paths
            .iter()
            .map(|dir| dir.join(file))
            .find(|p| p.exists())
    }

    fn expect(&self, event: &'static str, ok: bool) -> LoadResult<()> {
        if ok {
            Ok(())
        } else {
            Err(LoadError::UnexpectedEvent(event, self.state.name()))
        }
    }

    /// Bit-tight cell accounting: `bytes` must hold exactly `elem_count`
    /// elements of `elem_bits`, under either rounding direction.
    fn check_cell(
        column: &ColumnCatalog,
        data: &[u8],
        elem_count: u64,
    ) -> LoadResult<()> {
        let elem_bits = column.elem_bits();
        let bits = elem_count * u64::from(elem_bits);
        let floor_count = data.len() as u64 * 8 / u64::from(elem_bits);
        if data.len() as u64 != bits.div_ceil(8) && floor_count != elem_count {
            return Err(LoadError::CellSize(
                column.id(),
                data.len(),
                elem_count,
                elem_bits,
            ));
        }
        Ok(())
    }

    pub fn schema(&self) -> Option<(&str, &str)> {
        self.schema
            .as_ref()
            .map(|(file, name)| (file.as_str(), name.as_str()))
    }

    pub fn remote(&self) -> Option<&str> {
        self.remote_path.as_deref()
    }

    pub fn get_table(&self, table_id: TableId) -> Option<&TableCatalog> {
        self.tables.get(&table_id)
    }

    pub fn get_column(&self, column_id: ColumnId) -> Option<&ColumnCatalog> {
        self.columns.get(&column_id)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> u64 {
        self.tables.values().map(|t| t.rows()).sum()
    }

    pub fn payload_bytes(&self) -> u64 {
        self.columns.values().map(|c| c.payload_bytes()).sum()
    }
}

impl DatabaseLoader for MemoryLoader {
    fn use_schema(&mut self, file: &str, name: &str) -> LoadResult<()> {
        self.expect("use-schema", self.state == LoadState::Init)?;
        match self.resolve_schema(file) {
            Some(path) => info!("schema {} resolved to {}", name, path.display()),
            None => warn!("schema file {} not found in include paths", file),
        }
        self.schema = Some((file.to_string(), name.to_string()));
        self.state = LoadState::SchemaAnnounced;
        Ok(())
    }

    fn remote_path(&mut self, path: &str) -> LoadResult<()> {
        self.expect("remote-path", self.state == LoadState::SchemaAnnounced)?;
        self.remote_path = Some(path.to_string());
        self.state = LoadState::PathAnnounced;
        Ok(())
    }

    fn new_table(&mut self, table_id: TableId, name: &str) -> LoadResult<()> {
        self.expect("new-table", self.state.is_declaring())?;
        if self.tables.contains_key(&table_id) {
            return Err(LoadError::Duplicated("table", table_id.to_string()));
        }
        if self.tables.values().any(|t| t.name() == name) {
            return Err(LoadError::Duplicated("table", name.into()));
        }
        self.tables
            .insert(table_id, TableCatalog::new(table_id, name.to_string()));
        Ok(())
    }

    fn new_column(
        &mut self,
        column_id: ColumnId,
        table_id: TableId,
        elem_bits: u32,
        flag_bits: u32,
        name: &str,
    ) -> LoadResult<()> {
        self.expect("new-column", self.state.is_declaring())?;
        if elem_bits == 0 {
            return Err(LoadError::InvalidElemBits(column_id, elem_bits));
        }
        if flag_bits & COLUMN_FLAG_COMPRESSED != 0 && !matches!(elem_bits, 16 | 32 | 64) {
            return Err(LoadError::InvalidElemBits(column_id, elem_bits));
        }
        if self.columns.contains_key(&column_id) {
            return Err(LoadError::Duplicated("column", column_id.to_string()));
        }
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or_else(|| LoadError::NotFound("table", table_id.to_string()))?;
        table.add_column(name, column_id)?;
        self.columns.insert(
            column_id,
            ColumnCatalog::new(column_id, table_id, name.to_string(), elem_bits, flag_bits),
        );
        Ok(())
    }

    fn column(&self, column_id: ColumnId) -> Option<ColumnInfo> {
        self.columns.get(&column_id).map(|c| c.info())
    }

    fn cell_data(&mut self, column_id: ColumnId, data: &[u8], elem_count: u64) -> LoadResult<()> {
        self.expect("cell-data", self.state == LoadState::Open)?;
        let column = self
            .columns
            .get_mut(&column_id)
            .ok_or_else(|| LoadError::NotFound("column", column_id.to_string()))?;
        Self::check_cell(column, data, elem_count)?;
        column.record_cells(elem_count, data.len());
        Ok(())
    }

    fn cell_default(
        &mut self,
        column_id: ColumnId,
        data: &[u8],
        elem_count: u64,
    ) -> LoadResult<()> {
        // an empty default is a declaration; a sized default needs the
        // stream open like any other cell payload
        let ok = if data.is_empty() && elem_count == 0 {
            self.state.is_declaring() || self.state == LoadState::Open
        } else {
            self.state == LoadState::Open
        };
        self.expect("cell-default", ok)?;
        let column = self
            .columns
            .get_mut(&column_id)
            .ok_or_else(|| LoadError::NotFound("column", column_id.to_string()))?;
        Self::check_cell(column, data, elem_count)?;
        column.set_default(data);
        Ok(())
    }

    fn open_stream(&mut self) -> LoadResult<()> {
        self.expect(
            "open-stream",
            self.state == LoadState::Init || self.state.is_declaring(),
        )?;
        info!(
            "opening stream: {} tables, {} columns declared",
            self.tables.len(),
            self.columns.len()
        );
        self.state = LoadState::Open;
        Ok(())
    }

    fn close_stream(&mut self) -> LoadResult<()> {
        self.expect("end-stream", self.state == LoadState::Open)?;
        self.state = LoadState::Closed;
        Ok(())
    }

    fn next_row(&mut self, table_id: TableId) -> LoadResult<()> {
        self.expect("next-row", self.state == LoadState::Open)?;
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or_else(|| LoadError::NotFound("table", table_id.to_string()))?;
        table.advance(1);
        Ok(())
    }

    fn move_ahead(&mut self, table_id: TableId, nrows: u64) -> LoadResult<()> {
        self.expect("move-ahead", self.state == LoadState::Open)?;
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or_else(|| LoadError::NotFound("table", table_id.to_string()))?;
        table.advance(nrows);
        Ok(())
    }

    fn error_message(&mut self, message: &str) -> LoadResult<()> {
        error!("producer error: {}", message);
        Err(LoadError::Producer(message.to_string()))
    }
}
