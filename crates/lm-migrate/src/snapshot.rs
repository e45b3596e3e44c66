//! Schema snapshot
//!
//! The set of existing tables and columns, captured once per run and then
//! queried in memory while the plan is built. Lookups ignore ASCII case, as
//! DuckDB identifiers do.

use lm_db::{ColumnInfo, Database, DbResult};
use std::collections::HashMap;

/// One column of a snapshotted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotColumn {
    pub name: String,
    pub data_type: String,
}

/// Columns of one table, in ordinal order
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    name: String,
    columns: Vec<SnapshotColumn>,
    by_name: HashMap<String, usize>,
}

impl TableSchema {
    /// The table name as stored in the catalog
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&SnapshotColumn> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.columns[idx])
    }

    /// Whether the table has a column called `name`
    pub fn has_column(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_lowercase())
    }

    /// All columns in ordinal order
    pub fn columns(&self) -> &[SnapshotColumn] {
        &self.columns
    }

    fn push(&mut self, column: SnapshotColumn) {
        let key = column.name.to_lowercase();
        if !self.by_name.contains_key(&key) {
            self.by_name.insert(key, self.columns.len());
            self.columns.push(column);
        }
    }
}

/// Tables and their columns at the moment the snapshot was taken
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    tables: HashMap<String, TableSchema>,
}

impl SchemaSnapshot {
    /// Read every column of every table in `schema`.
    pub fn capture(db: &dyn Database, schema: &str) -> DbResult<Self> {
        let columns = db.columns(schema)?;
        let snapshot = Self::from_columns(columns);
        log::debug!(
            "Captured schema snapshot of '{}': {} tables",
            schema,
            snapshot.tables.len()
        );
        Ok(snapshot)
    }

    /// Build a snapshot from catalog rows.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnInfo>) -> Self {
        let mut tables: HashMap<String, TableSchema> = HashMap::new();
        for info in columns {
            let table = tables
                .entry(info.table.to_lowercase())
                .or_insert_with(|| TableSchema {
                    name: info.table.clone(),
                    ..TableSchema::default()
                });
            table.push(SnapshotColumn {
                name: info.column,
                data_type: info.data_type,
            });
        }
        Self { tables }
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(&name.to_lowercase())
    }

    /// Whether the snapshot contains `name`
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Number of tables in the snapshot
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the snapshot contains no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
