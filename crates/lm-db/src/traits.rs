//! Database trait definition

use crate::error::DbResult;
use crate::value::SqlValue;
use serde::Serialize;
use std::ops::ControlFlow;

/// One column of one table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

/// A positional row read by [`Database::stream_rows`].
pub type SourceRow = Vec<SqlValue>;

/// Result of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed at the key, one was inserted
    Inserted,
    /// A row existed at the key and was overwritten
    Updated,
}

/// Database abstraction trait for locmig
///
/// All calls are blocking. Implementations must allow [`Database::upsert`]
/// to be called from inside a [`Database::stream_rows`] visitor.
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists
    fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Execute query returning row count
    fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Every column of every table in `schema`, ordered by table then position
    fn columns(&self, schema: &str) -> DbResult<Vec<ColumnInfo>>;

    /// Run `sql` and hand each row to `visit` as it is pulled from the cursor.
    ///
    /// A row whose cells cannot be converted arrives as `Err` and the stream
    /// continues. Returning `ControlFlow::Break` stops the stream early.
    /// Returns the number of rows pulled. An `Err` return means the query
    /// itself failed.
    fn stream_rows(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(DbResult<SourceRow>) -> ControlFlow<()>,
    ) -> DbResult<u64>;

    /// Update the row at `key` with `values`, inserting it when absent.
    fn upsert(
        &self,
        table: &str,
        key: &[(&str, SqlValue)],
        values: &[(&str, SqlValue)],
    ) -> DbResult<UpsertOutcome>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
