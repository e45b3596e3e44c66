//! Migration driver
//!
//! Streams every query of the plan and upserts one localised row per source
//! row. Locales run in configured order and tables in plan order, one cursor
//! at a time. Row-level failures are recorded and skipped; only DDL failures
//! abort a run once it has started.

use crate::ddl::ensure_derived_tables;
use crate::error::MigrateResult;
use crate::query_builder::{LocalisedQuery, QueryPlan};
use crate::report::{MigrationReport, RowFailure, RowFailureKind, TableReport};
use crate::snapshot::SchemaSnapshot;
use crate::write_gate::WriteGate;
use lm_core::ColumnNames;
use lm_db::{Database, SourceRow, SqlValue, UpsertOutcome};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A source row split into its natural key and field values
#[derive(Debug, Clone, PartialEq)]
pub struct LocalisedRow {
    pub record_id: i64,
    pub version: Option<i64>,
    pub values: Vec<SqlValue>,
}

/// Why a source row could not be decoded
#[derive(Debug, Clone, PartialEq)]
pub struct RowDecodeError {
    pub record_id: Option<i64>,
    pub version: Option<i64>,
    pub reason: String,
}

impl LocalisedRow {
    /// Split `cells` according to the projection of `query`.
    pub fn decode(query: &LocalisedQuery, mut cells: SourceRow) -> Result<Self, RowDecodeError> {
        let key_width = query.key_width();
        let expected = key_width + query.fields.len();
        let record_id = cells.first().and_then(SqlValue::as_i64);
        let version = if query.variant.is_versioned() {
            cells.get(1).and_then(SqlValue::as_i64)
        } else {
            None
        };
        let fail = |reason: String| RowDecodeError {
            record_id,
            version,
            reason,
        };

        if cells.len() != expected {
            return Err(fail(format!(
                "expected {} columns, got {}",
                expected,
                cells.len()
            )));
        }
        let Some(id) = record_id else {
            return Err(fail(format!("unusable record identifier '{}'", cells[0])));
        };
        if query.variant.is_versioned() && version.is_none() {
            return Err(fail(format!("unusable version number '{}'", cells[1])));
        }

        let values = cells.split_off(key_width);
        Ok(Self {
            record_id: id,
            version,
            values,
        })
    }
}

/// Executes a [`QueryPlan`] against a database
pub struct Migrator<'a> {
    db: &'a dyn Database,
    plan: &'a QueryPlan,
    snapshot: &'a SchemaSnapshot,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a dyn Database, plan: &'a QueryPlan, snapshot: &'a SchemaSnapshot) -> Self {
        Self {
            db,
            plan,
            snapshot,
            cancel: None,
        }
    }

    /// Stop between rows once `flag` is raised.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Run the whole plan.
    ///
    /// With the gate closed nothing is written, derived tables included, and
    /// every decodable row is counted as would-write.
    pub fn run(&self, gate: WriteGate) -> MigrateResult<MigrationReport> {
        let mut report = MigrationReport::new(gate.is_write_enabled());
        log::info!(
            "Starting migration {} ({} queries, {})",
            report.run_id,
            self.plan.len(),
            if gate.is_write_enabled() {
                "writes enabled"
            } else {
                "dry run"
            }
        );

        if gate.is_write_enabled() {
            report.ddl_statements = ensure_derived_tables(self.db, self.plan, self.snapshot)?;
        }

        'locales: for locale_plan in &self.plan.locales {
            for query in &locale_plan.queries {
                if self.is_cancelled() {
                    report.cancelled = true;
                    break 'locales;
                }
                let cancelled = self.run_query(query, gate, &mut report);
                if cancelled {
                    report.cancelled = true;
                    break 'locales;
                }
            }
        }

        report.finish();
        if report.cancelled {
            log::warn!("Migration {} cancelled", report.run_id);
        }
        log::info!(
            "Finished migration {}: {} rows read, {} failures",
            report.run_id,
            report.totals().rows_read,
            report.failures.len()
        );
        Ok(report)
    }

    /// Stream one query into its derived table. Returns whether the run was
    /// cancelled mid-stream.
    fn run_query(&self, query: &LocalisedQuery, gate: WriteGate, report: &mut MigrationReport) -> bool {
        let mut table = TableReport::new(
            query.locale.clone(),
            query.derived_table.as_str(),
            query.source_table.as_str(),
            query.variant,
        );
        let mut failures = Vec::new();
        let mut cancelled = false;

        log::debug!("[{}] {}: {}", query.locale, query.derived_table, query.sql);

        let streamed = self.db.stream_rows(&query.sql, &mut |cells| {
            if self.is_cancelled() {
                cancelled = true;
                return ControlFlow::Break(());
            }
            table.rows_read += 1;

            let decoded = cells
                .map_err(|e| RowDecodeError {
                    record_id: None,
                    version: None,
                    reason: e.to_string(),
                })
                .and_then(|cells| LocalisedRow::decode(query, cells));

            let row = match decoded {
                Ok(row) => row,
                Err(err) => {
                    table.failed += 1;
                    failures.push(failure(
                        query,
                        RowFailureKind::Read,
                        err.record_id,
                        err.version,
                        err.reason,
                    ));
                    return ControlFlow::Continue(());
                }
            };

            if !gate.is_write_enabled() {
                table.would_write += 1;
                return ControlFlow::Continue(());
            }

            match self.write_row(query, &row) {
                Ok(UpsertOutcome::Inserted) => table.inserted += 1,
                Ok(UpsertOutcome::Updated) => table.updated += 1,
                Err(e) => {
                    table.failed += 1;
                    failures.push(failure(
                        query,
                        RowFailureKind::Write,
                        Some(row.record_id),
                        row.version,
                        e.to_string(),
                    ));
                }
            }
            ControlFlow::Continue(())
        });

        if let Err(e) = streamed {
            log::warn!(
                "[{}] {}: read query failed: {}",
                query.locale,
                query.derived_table,
                e
            );
            table.error = Some(e.to_string());
        } else {
            log::info!(
                "[{}] {}: {} read, {} inserted, {} updated, {} would write, {} failed",
                query.locale,
                query.derived_table,
                table.rows_read,
                table.inserted,
                table.updated,
                table.would_write,
                table.failed
            );
        }

        report.tables.push(table);
        report.failures.extend(failures);
        cancelled
    }

    fn write_row(&self, query: &LocalisedQuery, row: &LocalisedRow) -> lm_db::DbResult<UpsertOutcome> {
        let columns: &ColumnNames = &self.plan.columns;
        let mut key = vec![
            (columns.record_id.as_str(), SqlValue::Integer(row.record_id)),
            (columns.locale.as_str(), SqlValue::from(query.locale.as_str())),
        ];
        if let Some(version) = row.version {
            key.push((columns.version.as_str(), SqlValue::Integer(version)));
        }
        let values: Vec<(&str, SqlValue)> = query
            .fields
            .iter()
            .zip(&row.values)
            .map(|(field, value)| (field.field.as_str(), value.clone()))
            .collect();

        self.db.upsert(&query.derived_table, &key, &values)
    }
}

fn failure(
    query: &LocalisedQuery,
    kind: RowFailureKind,
    record_id: Option<i64>,
    version: Option<i64>,
    reason: String,
) -> RowFailure {
    RowFailure {
        kind,
        locale: query.locale.clone(),
        derived_table: query.derived_table.clone(),
        record_id,
        version,
        reason,
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
