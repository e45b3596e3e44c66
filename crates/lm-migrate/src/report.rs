//! Migration report
//!
//! Counts per (locale, derived table) plus every row that could not be read
//! or written. A report is always returned once the plan has been accepted.

use chrono::{DateTime, Utc};
use lm_core::{Locale, StorageVariant};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Which side of the copy a row failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowFailureKind {
    /// The source row was malformed
    Read,
    /// The upsert into the derived table failed
    Write,
}

impl fmt::Display for RowFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFailureKind::Read => write!(f, "read"),
            RowFailureKind::Write => write!(f, "write"),
        }
    }
}

/// One row that could not be migrated
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub kind: RowFailureKind,
    pub locale: Locale,
    pub derived_table: String,
    /// Record identifier, when the key could be read
    pub record_id: Option<i64>,
    pub version: Option<i64>,
    pub reason: String,
}

/// Counters for one derived table in one locale
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub locale: Locale,
    pub derived_table: String,
    pub source_table: String,
    pub variant: StorageVariant,
    pub rows_read: u64,
    pub inserted: u64,
    pub updated: u64,
    pub would_write: u64,
    pub failed: u64,
    /// Set when the read query itself could not run
    pub error: Option<String>,
}

impl TableReport {
    pub fn new(
        locale: Locale,
        derived_table: impl Into<String>,
        source_table: impl Into<String>,
        variant: StorageVariant,
    ) -> Self {
        Self {
            locale,
            derived_table: derived_table.into(),
            source_table: source_table.into(),
            variant,
            rows_read: 0,
            inserted: 0,
            updated: 0,
            would_write: 0,
            failed: 0,
            error: None,
        }
    }

    /// Rows persisted (inserted or updated)
    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Aggregate counters across the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub rows_read: u64,
    pub inserted: u64,
    pub updated: u64,
    pub would_write: u64,
    pub failed: u64,
    pub failed_tables: u64,
}

/// The outcome of one migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub write_enabled: bool,
    pub cancelled: bool,
    /// Derived-table DDL statements executed before streaming
    pub ddl_statements: usize,
    pub tables: Vec<TableReport>,
    pub failures: Vec<RowFailure>,
}

impl MigrationReport {
    pub fn new(write_enabled: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            write_enabled,
            cancelled: false,
            ddl_statements: 0,
            tables: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn totals(&self) -> ReportTotals {
        self.tables
            .iter()
            .fold(ReportTotals::default(), |mut totals, table| {
                totals.rows_read += table.rows_read;
                totals.inserted += table.inserted;
                totals.updated += table.updated;
                totals.would_write += table.would_write;
                totals.failed += table.failed;
                totals.failed_tables += u64::from(table.error.is_some());
                totals
            })
    }

    /// Whether any row or table failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || self.tables.iter().any(|t| t.error.is_some())
    }

    /// Counters for one locale and derived table
    pub fn table(&self, locale: &str, derived_table: &str) -> Option<&TableReport> {
        self.tables
            .iter()
            .find(|t| t.locale == locale && t.derived_table == derived_table)
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.write_enabled {
            "write"
        } else {
            "dry run"
        };
        writeln!(f, "Migration {} ({})", self.run_id, mode)?;

        for table in &self.tables {
            write!(
                f,
                "  {:<8} {:<48} read {:>6}",
                table.locale.as_str(),
                table.derived_table,
                table.rows_read
            )?;
            if self.write_enabled {
                write!(
                    f,
                    "  inserted {:>6}  updated {:>6}",
                    table.inserted, table.updated
                )?;
            } else {
                write!(f, "  would write {:>6}", table.would_write)?;
            }
            if table.failed > 0 {
                write!(f, "  failed {}", table.failed)?;
            }
            if let Some(error) = &table.error {
                write!(f, "  ERROR: {}", error)?;
            }
            writeln!(f)?;
        }

        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for failure in &self.failures {
                let record = match (failure.record_id, failure.version) {
                    (Some(id), Some(version)) => format!("{}@v{}", id, version),
                    (Some(id), None) => id.to_string(),
                    (None, _) => "?".to_string(),
                };
                writeln!(
                    f,
                    "  [{}] {} {} record {}: {}",
                    failure.kind, failure.locale, failure.derived_table, record, failure.reason
                )?;
            }
        }

        let totals = self.totals();
        if self.write_enabled {
            write!(
                f,
                "Total: {} read, {} inserted, {} updated, {} failed",
                totals.rows_read, totals.inserted, totals.updated, totals.failed
            )?;
        } else {
            write!(
                f,
                "Total: {} read, {} would write, {} failed",
                totals.rows_read, totals.would_write, totals.failed
            )?;
        }
        if totals.failed_tables > 0 {
            write!(f, ", {} tables errored", totals.failed_tables)?;
        }
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
