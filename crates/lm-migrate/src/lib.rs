//! lm-migrate - Migration engine for locmig
//!
//! Turns the entity catalog and locale settings into a per-locale query plan
//! over the legacy flat-column tables, then streams each query into its
//! `_Localised` derived table with idempotent upserts.

pub mod ddl;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod query_builder;
pub mod report;
pub mod snapshot;
pub mod write_gate;

pub use driver::{LocalisedRow, Migrator};
pub use error::{MigrateError, MigrateResult};
pub use pipeline::{migrate, prepare, PreparedMigration};
pub use query_builder::{
    FieldProjection, FieldSource, LocalePlan, LocalisedQuery, QueryBuilder, QueryPlan,
};
pub use report::{MigrationReport, ReportTotals, RowFailure, RowFailureKind, TableReport};
pub use snapshot::SchemaSnapshot;
pub use write_gate::WriteGate;
