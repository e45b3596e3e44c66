//! Derived table DDL
//!
//! Derived tables are created from the plan before any row is written. An
//! existing table only gains the field columns it lacks.

use crate::error::{MigrateError, MigrateResult};
use crate::query_builder::QueryPlan;
use crate::snapshot::SchemaSnapshot;
use lm_core::sql_utils::quote_ident;
use lm_db::Database;

const FALLBACK_TYPE: &str = "VARCHAR";

/// Shape of one derived table, merged across every locale of the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTable {
    pub name: String,
    pub versioned: bool,
    /// Field name and column type, in declaration order
    pub fields: Vec<(String, String)>,
}

/// Collect the derived tables a plan writes to, in plan order.
pub fn derived_tables(plan: &QueryPlan) -> Vec<DerivedTable> {
    let mut tables: Vec<DerivedTable> = Vec::new();
    for query in plan.queries() {
        let idx = match tables
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(&query.derived_table))
        {
            Some(idx) => idx,
            None => {
                tables.push(DerivedTable {
                    name: query.derived_table.clone(),
                    versioned: query.variant.is_versioned(),
                    fields: query
                        .fields
                        .iter()
                        .map(|f| (f.field.clone(), String::new()))
                        .collect(),
                });
                tables.len() - 1
            }
        };

        // First locale with a known source type wins.
        for (slot, projection) in tables[idx].fields.iter_mut().zip(&query.fields) {
            if slot.1.is_empty() {
                if let Some(data_type) = &projection.data_type {
                    slot.1 = data_type.clone();
                }
            }
        }
    }

    for table in &mut tables {
        for (_, data_type) in &mut table.fields {
            if data_type.is_empty() {
                *data_type = FALLBACK_TYPE.to_string();
            }
        }
    }
    tables
}

/// Statements that bring every derived table of `plan` into shape.
pub fn ddl_statements(plan: &QueryPlan, snapshot: &SchemaSnapshot) -> MigrateResult<Vec<String>> {
    let columns = &plan.columns;
    let mut statements = Vec::new();

    for table in derived_tables(plan) {
        let Some(existing) = snapshot.table(&table.name) else {
            statements.push(create_table(plan, &table));
            continue;
        };

        let mut keys = vec![columns.record_id.as_str(), columns.locale.as_str()];
        if table.versioned {
            keys.push(columns.version.as_str());
        }
        if let Some(missing) = keys.iter().find(|key| !existing.has_column(key)) {
            return Err(MigrateError::plan(
                table.name.as_str(),
                format!(
                    "existing derived table '{}' has no '{}' column",
                    existing.name(),
                    missing
                ),
            ));
        }

        for (field, data_type) in &table.fields {
            if !existing.has_column(field) {
                statements.push(format!(
                    "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
                    quote_ident(existing.name()),
                    quote_ident(field),
                    data_type
                ));
            }
        }
    }
    Ok(statements)
}

fn create_table(plan: &QueryPlan, table: &DerivedTable) -> String {
    let columns = &plan.columns;
    let mut defs = vec![
        format!("{} BIGINT NOT NULL", quote_ident(&columns.record_id)),
        format!("{} VARCHAR NOT NULL", quote_ident(&columns.locale)),
    ];
    let mut key = vec![quote_ident(&columns.record_id), quote_ident(&columns.locale)];
    if table.versioned {
        defs.push(format!("{} BIGINT NOT NULL", quote_ident(&columns.version)));
        key.push(quote_ident(&columns.version));
    }
    for (field, data_type) in &table.fields {
        defs.push(format!("{} {}", quote_ident(field), data_type));
    }
    defs.push(format!("UNIQUE ({})", key.join(", ")));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(&table.name),
        defs.join(", ")
    )
}

/// Create or extend every derived table of `plan`. Returns the number of
/// statements executed.
pub fn ensure_derived_tables(
    db: &dyn Database,
    plan: &QueryPlan,
    snapshot: &SchemaSnapshot,
) -> MigrateResult<usize> {
    let statements = ddl_statements(plan, snapshot)?;
    for statement in &statements {
        log::debug!("{}", statement);
        db.execute(statement)?;
    }
    if !statements.is_empty() {
        log::info!("Prepared derived tables ({} statements)", statements.len());
    }
    Ok(statements.len())
}
