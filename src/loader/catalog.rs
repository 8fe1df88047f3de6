// Copyright 2025 Bulkload Project Authors. Licensed under Apache-2.0.

//! Catalog records owned by the in-memory loader.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ColumnId, ColumnInfo, LoadError, LoadResult, TableId, COLUMN_FLAG_COMPRESSED};

/// The catalog of a table declared by a new-table event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCatalog {
    id: TableId,
    name: String,
    /// Mapping from column names to column ids
    column_idxs: HashMap<String, ColumnId>,
    rows: u64,
}

impl TableCatalog {
    pub fn new(id: TableId, name: String) -> TableCatalog {
        TableCatalog {
            id,
            name,
            column_idxs: HashMap::new(),
            rows: 0,
        }
    }

    pub fn add_column(&mut self, name: &str, id: ColumnId) -> LoadResult<()> {
        if self.column_idxs.contains_key(name) {
            return Err(LoadError::Duplicated("column", name.into()));
        }
        self.column_idxs.insert(name.to_string(), id);
        Ok(())
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column_idxs.contains_key(name)
    }

    pub fn get_column_id_by_name(&self, name: &str) -> Option<ColumnId> {
        self.column_idxs.get(name).cloned()
    }

    pub fn advance(&mut self, nrows: u64) {
        self.rows += nrows;
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.column_idxs.len()
    }
}

/// The catalog of a column declared by a new-column event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnCatalog {
    id: ColumnId,
    table_id: TableId,
    name: String,
    elem_bits: u32,
    flag_bits: u32,
    /// Declared default payload; `Some(vec![])` after an empty-default.
    default: Option<Vec<u8>>,
    cells: u64,
    payload_bytes: u64,
}

impl ColumnCatalog {
    pub fn new(
        id: ColumnId,
        table_id: TableId,
        name: String,
        elem_bits: u32,
        flag_bits: u32,
    ) -> ColumnCatalog {
        ColumnCatalog {
            id,
            table_id,
            name,
            elem_bits,
            flag_bits,
            default: None,
            cells: 0,
            payload_bytes: 0,
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elem_bits(&self) -> u32 {
        self.elem_bits
    }

    pub fn is_compressed(&self) -> bool {
        self.flag_bits & COLUMN_FLAG_COMPRESSED != 0
    }

    /// The registry record handed to the decoder.
    pub fn info(&self) -> ColumnInfo {
        ColumnInfo {
            elem_bits: self.elem_bits,
            compressed: self.is_compressed(),
        }
    }

    pub fn set_default(&mut self, data: &[u8]) {
        self.default = Some(data.to_vec());
    }

    pub fn default(&self) -> Option<&[u8]> {
        self.default.as_deref()
    }

    pub fn record_cells(&mut self, elem_count: u64, bytes: usize) {
        self.cells += elem_count;
        self.payload_bytes += bytes as u64;
    }

    pub fn cells(&self) -> u64 {
        self.cells
    }

    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }
}
