//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{ColumnInfo, Database, SourceRow, UpsertOutcome};
use crate::value::SqlValue;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use duckdb::types::{TimeUnit, ToSql, ToSqlOutput, Value};
use duckdb::{params_from_iter, Connection};
use lm_core::sql_utils::{escape_sql_string, quote_ident};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
///
/// Holds two connections to the same database: `read` serves streaming
/// cursors while `write` takes every other statement, so a visitor can upsert
/// while its cursor is still open.
pub struct DuckDbBackend {
    read: Mutex<Connection>,
    write: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Self::from_connection(conn)
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(read: Connection) -> DbResult<Self> {
        let write = read
            .try_clone()
            .map_err(|e| DbError::ConnectionError(format!("failed to open write connection: {e}")))?;
        Ok(Self {
            read: Mutex::new(read),
            write: Mutex::new(write),
        })
    }

    fn lock<'a>(conn: &'a Mutex<Connection>, which: &str) -> DbResult<MutexGuard<'a, Connection>> {
        conn.lock()
            .map_err(|e| DbError::MutexPoisoned(format!("{which} connection: {e}")))
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Boolean(*b),
            SqlValue::Integer(n) => Value::BigInt(*n),
            SqlValue::Real(x) => Value::Double(*x),
            SqlValue::Text(s) => Value::Text(s.clone()),
            SqlValue::Blob(b) => Value::Blob(b.clone()),
            SqlValue::Date(d) => Value::Date32(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
            SqlValue::Time(t) => Value::Time64(
                TimeUnit::Microsecond,
                i64::from(t.num_seconds_from_midnight()) * 1_000_000
                    + i64::from(t.nanosecond() / 1_000),
            ),
            SqlValue::Timestamp(ts) => {
                Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
            }
            SqlValue::Interval {
                months,
                days,
                nanos,
            } => Value::Interval {
                months: *months,
                days: *days,
                nanos: *nanos,
            },
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// `num_days_from_ce` of 1970-01-01; DuckDB dates count days from the epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn to_micros(unit: TimeUnit, value: i64) -> Option<i64> {
    match unit {
        TimeUnit::Second => value.checked_mul(1_000_000),
        TimeUnit::Millisecond => value.checked_mul(1_000),
        TimeUnit::Microsecond => Some(value),
        TimeUnit::Nanosecond => Some(value.div_euclid(1_000)),
    }
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn time_from_micros(micros: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok()?;
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

fn timestamp_from_micros(micros: i64) -> Option<NaiveDateTime> {
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
    DateTime::<Utc>::from_timestamp(micros.div_euclid(1_000_000), nanos).map(|dt| dt.naive_utc())
}

/// Convert one DuckDB cell into a [`SqlValue`].
fn read_cell(row: &duckdb::Row<'_>, idx: usize) -> DbResult<SqlValue> {
    let unsupported = |detail: String| DbError::UnsupportedValue {
        column: idx,
        detail,
    };
    let value: Value = row.get(idx).map_err(|e| unsupported(e.to_string()))?;
    let converted = match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Bool(b),
        Value::TinyInt(n) => SqlValue::Integer(n.into()),
        Value::SmallInt(n) => SqlValue::Integer(n.into()),
        Value::Int(n) => SqlValue::Integer(n.into()),
        Value::BigInt(n) => SqlValue::Integer(n),
        Value::UTinyInt(n) => SqlValue::Integer(n.into()),
        Value::USmallInt(n) => SqlValue::Integer(n.into()),
        Value::UInt(n) => SqlValue::Integer(n.into()),
        Value::UBigInt(n) => SqlValue::Integer(
            i64::try_from(n).map_err(|_| unsupported(format!("{n} overflows BIGINT")))?,
        ),
        Value::HugeInt(n) => SqlValue::Integer(
            i64::try_from(n).map_err(|_| unsupported(format!("{n} overflows BIGINT")))?,
        ),
        Value::Float(x) => SqlValue::Real(x.into()),
        Value::Double(x) => SqlValue::Real(x),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        Value::Text(s) | Value::Enum(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
        Value::Date32(days) => SqlValue::Date(
            date_from_days(days).ok_or_else(|| unsupported(format!("date {days} out of range")))?,
        ),
        Value::Time64(unit, value) => SqlValue::Time(
            to_micros(unit, value)
                .and_then(time_from_micros)
                .ok_or_else(|| unsupported(format!("time {value} out of range")))?,
        ),
        Value::Timestamp(unit, value) => SqlValue::Timestamp(
            to_micros(unit, value)
                .and_then(timestamp_from_micros)
                .ok_or_else(|| unsupported(format!("timestamp {value} out of range")))?,
        ),
        Value::Interval {
            months,
            days,
            nanos,
        } => SqlValue::Interval {
            months,
            days,
            nanos,
        },
        other => return Err(unsupported(format!("{other:?}"))),
    };
    Ok(converted)
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        let conn = Self::lock(&self.write, "write")?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = Self::lock(&self.write, "write")?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let conn = Self::lock(&self.write, "write")?;

        let (schema, table) = if let Some(pos) = name.rfind('.') {
            (&name[..pos], &name[pos + 1..])
        } else {
            ("main", name)
        };

        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = '{}' AND lower(table_name) = lower('{}')",
            escape_sql_string(schema),
            escape_sql_string(table)
        );

        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;

        Ok(count > 0)
    }

    fn query_count(&self, sql: &str) -> DbResult<usize> {
        let conn = Self::lock(&self.write, "write")?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(|e| DbError::ExecutionError(e.to_string()))?;
        Ok(count as usize)
    }

    fn columns(&self, schema: &str) -> DbResult<Vec<ColumnInfo>> {
        let conn = Self::lock(&self.write, "write")?;
        let sql = format!(
            "SELECT table_name, column_name, data_type FROM information_schema.columns \
             WHERE table_schema = '{}' ORDER BY table_name, ordinal_position",
            escape_sql_string(schema)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ColumnInfo {
                table: row.get(0)?,
                column: row.get(1)?,
                data_type: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    fn stream_rows(
        &self,
        sql: &str,
        visit: &mut dyn FnMut(DbResult<SourceRow>) -> ControlFlow<()>,
    ) -> DbResult<u64> {
        let conn = Self::lock(&self.read, "read")?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut pulled = 0u64;

        while let Some(row) = rows.next()? {
            pulled += 1;
            let column_count = row.as_ref().column_count();
            let cells = (0..column_count)
                .map(|idx| read_cell(row, idx))
                .collect::<DbResult<SourceRow>>();
            if visit(cells).is_break() {
                break;
            }
        }

        Ok(pulled)
    }

    fn upsert(
        &self,
        table: &str,
        key: &[(&str, SqlValue)],
        values: &[(&str, SqlValue)],
    ) -> DbResult<UpsertOutcome> {
        if key.is_empty() {
            return Err(DbError::InvalidRequest(format!(
                "upsert into {table} requires at least one key column"
            )));
        }

        let conn = Self::lock(&self.write, "write")?;
        let table_sql = quote_ident(table);
        let where_clause = key
            .iter()
            .map(|(column, _)| format!("{} = ?", quote_ident(column)))
            .collect::<Vec<_>>()
            .join(" AND ");

        let exists = if values.is_empty() {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table_sql, where_clause);
            let count: i64 = conn.query_row(
                &sql,
                params_from_iter(key.iter().map(|(_, v)| v)),
                |row| row.get(0),
            )?;
            count > 0
        } else {
            let set_clause = values
                .iter()
                .map(|(column, _)| format!("{} = ?", quote_ident(column)))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {} WHERE {}",
                table_sql, set_clause, where_clause
            );
            let params = values.iter().chain(key.iter()).map(|(_, v)| v);
            conn.execute(&sql, params_from_iter(params))? > 0
        };

        if exists {
            return Ok(UpsertOutcome::Updated);
        }

        let columns = key
            .iter()
            .chain(values.iter())
            .map(|(column, _)| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; key.len() + values.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table_sql, columns, placeholders
        );
        let params = key.iter().chain(values.iter()).map(|(_, v)| v);
        conn.execute(&sql, params_from_iter(params))?;
        Ok(UpsertOutcome::Inserted)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
