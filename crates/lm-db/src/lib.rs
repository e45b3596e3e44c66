//! lm-db - Database abstraction layer for locmig
//!
//! This crate provides the blocking `Database` trait (schema listing,
//! streaming cursors, keyed upserts) and its DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;
pub mod value;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{ColumnInfo, Database, SourceRow, UpsertOutcome};
pub use value::SqlValue;
