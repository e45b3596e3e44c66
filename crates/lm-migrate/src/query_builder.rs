//! Query plan construction
//!
//! Compiles one read query per (locale, entity type, storage variant) over the
//! legacy flat-column tables. Every field is resolved against the columns that
//! actually exist in the snapshot, per table: the target locale column, then
//! the default locale column, then the un-suffixed canonical column.

use crate::error::{MigrateError, MigrateResult};
use crate::snapshot::{SchemaSnapshot, TableSchema};
use lm_core::sql_utils::{legacy_column, qualified_column, quote_ident};
use lm_core::{ColumnNames, EntityCatalog, EntityName, EntityType, Locale, StorageVariant};
use serde::Serialize;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

/// Where a projected field value is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "column", rename_all = "snake_case")]
pub enum FieldSource {
    /// `<Field>_<locale>` exists on the table
    Locale(String),
    /// Fell back to `<Field>_<default>`
    DefaultLocale(String),
    /// Only the canonical `<Field>` column exists
    Canonical(String),
    /// No column at all; the value is NULL
    Missing,
}

impl FieldSource {
    /// The legacy column backing this source, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            FieldSource::Locale(c) | FieldSource::DefaultLocale(c) | FieldSource::Canonical(c) => {
                Some(c)
            }
            FieldSource::Missing => None,
        }
    }
}

/// One resolved field of a localised query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProjection {
    pub field: String,
    pub source: FieldSource,
    /// Canonical column used when the locale value is NULL
    pub canonical: Option<String>,
    /// Declared type of the source column, if known
    pub data_type: Option<String>,
}

/// A read query feeding one derived table for one locale
#[derive(Debug, Clone, Serialize)]
pub struct LocalisedQuery {
    pub locale: Locale,
    pub entity: EntityName,
    pub variant: StorageVariant,
    pub source_table: String,
    pub derived_table: String,
    pub sql: String,
    pub fields: Vec<FieldProjection>,
    /// Whether any table in the joined chain has a column for this locale
    pub has_locale_columns: bool,
}

impl LocalisedQuery {
    /// Number of leading key columns in each result row (record id, and version
    /// for the history variant).
    pub fn key_width(&self) -> usize {
        if self.variant.is_versioned() {
            2
        } else {
            1
        }
    }
}

/// Queries for a single locale, in hierarchy order
#[derive(Debug, Clone, Serialize)]
pub struct LocalePlan {
    pub locale: Locale,
    pub is_default: bool,
    pub queries: Vec<LocalisedQuery>,
}

impl LocalePlan {
    /// Look up the query feeding `derived_table`
    pub fn get(&self, derived_table: &str) -> Option<&LocalisedQuery> {
        self.queries
            .iter()
            .find(|q| q.derived_table.eq_ignore_ascii_case(derived_table))
    }
}

/// Locale -> derived table -> query, in configured locale order
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    pub default_locale: Locale,
    pub columns: ColumnNames,
    pub locales: Vec<LocalePlan>,
}

impl QueryPlan {
    /// Look up the query for one locale and derived table
    pub fn get(&self, locale: &str, derived_table: &str) -> Option<&LocalisedQuery> {
        self.locale(locale).and_then(|plan| plan.get(derived_table))
    }

    /// The plan for one locale
    pub fn locale(&self, locale: &str) -> Option<&LocalePlan> {
        self.locales.iter().find(|plan| plan.locale == locale)
    }

    /// Every query of every locale, in execution order
    pub fn queries(&self) -> impl Iterator<Item = &LocalisedQuery> {
        self.locales.iter().flat_map(|plan| plan.queries.iter())
    }

    /// Total number of queries in the plan
    pub fn len(&self) -> usize {
        self.locales.iter().map(|plan| plan.queries.len()).sum()
    }

    /// Whether the plan contains no queries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a [`QueryPlan`] against a schema snapshot
pub struct QueryBuilder<'a> {
    catalog: &'a EntityCatalog,
    snapshot: &'a SchemaSnapshot,
    columns: &'a ColumnNames,
}

/// One table of the joined ancestor chain
struct ChainTable<'a> {
    alias: String,
    entity: &'a EntityType,
    schema: &'a TableSchema,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(
        catalog: &'a EntityCatalog,
        snapshot: &'a SchemaSnapshot,
        columns: &'a ColumnNames,
    ) -> Self {
        Self {
            catalog,
            snapshot,
            columns,
        }
    }

    /// Compile the plan for `hierarchy` across `locales`.
    ///
    /// The default locale is always planned, after the listed locales when it
    /// is not among them.
    pub fn build(
        &self,
        hierarchy: &[&EntityType],
        locales: &[Locale],
        default_locale: &Locale,
    ) -> MigrateResult<QueryPlan> {
        let unlisted_default = (!locales.contains(default_locale)).then_some(default_locale);
        let mut plans = Vec::with_capacity(locales.len() + 1);
        for locale in locales.iter().chain(unlisted_default) {
            let mut queries = Vec::new();
            for entity in hierarchy {
                for variant in entity.variants() {
                    queries.push(self.build_query(entity, variant, locale, default_locale)?);
                }
            }
            log::debug!("Planned {} queries for locale {}", queries.len(), locale);
            plans.push(LocalePlan {
                locale: locale.clone(),
                is_default: locale == default_locale,
                queries,
            });
        }

        Ok(QueryPlan {
            default_locale: default_locale.clone(),
            columns: self.columns.clone(),
            locales: plans,
        })
    }

    /// Compile the query feeding one derived table for one locale.
    pub fn build_query(
        &self,
        entity: &EntityType,
        variant: StorageVariant,
        locale: &Locale,
        default_locale: &Locale,
    ) -> MigrateResult<LocalisedQuery> {
        let chain = self.chain(entity, variant)?;
        let Some(own) = chain.last() else {
            return Err(MigrateError::plan(entity.name.as_str(), "empty ancestor chain"));
        };

        let mut select = self.key_projection(own, variant)?;
        let mut fields = Vec::with_capacity(entity.fields().len());
        for field in entity.fields() {
            let projection = resolve_field(own.schema, field, locale, default_locale);
            select.push(format!(
                "{} AS {}",
                value_expression(&own.alias, &projection),
                quote_ident(field)
            ));
            fields.push(projection);
        }

        let mut sql = format!(
            "SELECT {} FROM {} AS {}",
            select.join(", "),
            quote_ident(own.schema.name()),
            quote_ident(&own.alias)
        );
        for ancestor in &chain[..chain.len() - 1] {
            sql.push_str(&format!(
                " INNER JOIN {} AS {} ON {}",
                quote_ident(ancestor.schema.name()),
                quote_ident(&ancestor.alias),
                self.join_condition(ancestor, own, variant)?
            ));
        }

        let is_default = locale == default_locale;
        let presence = locale_presence(&chain, locale);
        let has_locale_columns = !presence.is_empty();
        if !is_default {
            if presence.is_empty() {
                sql.push_str(" WHERE FALSE");
            } else {
                sql.push_str(&format!(" WHERE ({})", presence.join(" OR ")));
            }
        }
        sql.push_str(&format!(" ORDER BY {}", self.order_by(own, variant)?));

        validate_sql(entity, &sql)?;

        Ok(LocalisedQuery {
            locale: locale.clone(),
            entity: entity.name.clone(),
            variant,
            source_table: own.schema.name().to_string(),
            derived_table: variant.localised_table(&entity.table),
            sql,
            fields,
            has_locale_columns,
        })
    }

    /// Resolve the root-first chain of legacy tables for `entity` in `variant`.
    fn chain(&self, entity: &EntityType, variant: StorageVariant) -> MigrateResult<Vec<ChainTable<'a>>> {
        let ancestors = self.catalog.ancestors(entity.name.as_str())?;
        let mut chain = Vec::with_capacity(ancestors.len());
        for (depth, member) in ancestors.into_iter().enumerate() {
            let table = variant.legacy_table(&member.table);
            let schema = self.snapshot.table(&table).ok_or_else(|| {
                MigrateError::plan(
                    entity.name.as_str(),
                    format!("legacy table '{}' does not exist", table),
                )
            })?;
            for key in self.key_columns(variant) {
                if !schema.has_column(key) {
                    return Err(MigrateError::plan(
                        entity.name.as_str(),
                        format!("legacy table '{}' has no '{}' column", table, key),
                    ));
                }
            }
            chain.push(ChainTable {
                alias: format!("t{}", depth),
                entity: member,
                schema,
            });
        }
        Ok(chain)
    }

    /// Legacy columns identifying a row in `variant`.
    fn key_columns(&self, variant: StorageVariant) -> Vec<&'a str> {
        if variant.is_versioned() {
            vec![self.columns.record_id.as_str(), self.columns.version.as_str()]
        } else {
            vec![self.columns.id.as_str()]
        }
    }

    /// Snapshot spelling of a key column on `table`.
    fn key_column<'t>(&self, table: &'t ChainTable<'_>, key: &str) -> MigrateResult<&'t str> {
        table
            .schema
            .column(key)
            .map(|c| c.name.as_str())
            .ok_or_else(|| {
                MigrateError::plan(
                    table.entity.name.as_str(),
                    format!("legacy table '{}' has no '{}' column", table.schema.name(), key),
                )
            })
    }

    fn key_projection(&self, own: &ChainTable<'_>, variant: StorageVariant) -> MigrateResult<Vec<String>> {
        let mut select = vec![format!(
            "{} AS {}",
            qualified_column(&own.alias, self.key_column(own, self.key_columns(variant)[0])?),
            quote_ident(&self.columns.record_id)
        )];
        if variant.is_versioned() {
            select.push(format!(
                "{} AS {}",
                qualified_column(&own.alias, self.key_column(own, &self.columns.version)?),
                quote_ident(&self.columns.version)
            ));
        }
        Ok(select)
    }

    fn join_condition(
        &self,
        ancestor: &ChainTable<'_>,
        own: &ChainTable<'_>,
        variant: StorageVariant,
    ) -> MigrateResult<String> {
        let mut parts = Vec::new();
        for key in self.key_columns(variant) {
            parts.push(format!(
                "{} = {}",
                qualified_column(&ancestor.alias, self.key_column(ancestor, key)?),
                qualified_column(&own.alias, self.key_column(own, key)?)
            ));
        }
        Ok(parts.join(" AND "))
    }

    fn order_by(&self, own: &ChainTable<'_>, variant: StorageVariant) -> MigrateResult<String> {
        let mut parts = Vec::new();
        for key in self.key_columns(variant) {
            parts.push(qualified_column(&own.alias, self.key_column(own, key)?));
        }
        Ok(parts.join(", "))
    }
}

/// Pick the source column for `field` on one table.
fn resolve_field(
    schema: &TableSchema,
    field: &str,
    locale: &Locale,
    default_locale: &Locale,
) -> FieldProjection {
    let canonical = schema.column(field);
    let localised = schema.column(&legacy_column(field, locale));
    let fallback = schema.column(&legacy_column(field, default_locale));

    let (source, data_type) = match (localised, fallback, canonical) {
        (Some(col), _, _) => (FieldSource::Locale(col.name.clone()), Some(&col.data_type)),
        (None, Some(col), _) => (
            FieldSource::DefaultLocale(col.name.clone()),
            Some(&col.data_type),
        ),
        (None, None, Some(col)) => (FieldSource::Canonical(col.name.clone()), Some(&col.data_type)),
        (None, None, None) => (FieldSource::Missing, None),
    };

    let canonical = match source {
        FieldSource::Locale(_) | FieldSource::DefaultLocale(_) => canonical.map(|c| c.name.clone()),
        FieldSource::Canonical(_) | FieldSource::Missing => None,
    };

    FieldProjection {
        field: field.to_string(),
        source,
        canonical,
        data_type: data_type.cloned(),
    }
}

fn value_expression(alias: &str, projection: &FieldProjection) -> String {
    match (projection.source.column(), &projection.canonical) {
        (Some(column), Some(canonical)) => format!(
            "COALESCE({}, {})",
            qualified_column(alias, column),
            qualified_column(alias, canonical)
        ),
        (Some(column), None) => qualified_column(alias, column),
        (None, _) => "CAST(NULL AS VARCHAR)".to_string(),
    }
}

/// `IS NOT NULL` tests for every column holding `locale` across the chain.
fn locale_presence(chain: &[ChainTable<'_>], locale: &Locale) -> Vec<String> {
    chain
        .iter()
        .flat_map(|table| {
            table.entity.fields().iter().filter_map(move |field| {
                table
                    .schema
                    .column(&legacy_column(field, locale))
                    .map(|col| format!("{} IS NOT NULL", qualified_column(&table.alias, &col.name)))
            })
        })
        .collect()
}

fn validate_sql(entity: &EntityType, sql: &str) -> MigrateResult<()> {
    let statements = Parser::parse_sql(&DuckDbDialect {}, sql).map_err(|e| {
        MigrateError::plan(entity.name.as_str(), format!("generated SQL does not parse: {}", e))
    })?;
    if statements.len() != 1 {
        return Err(MigrateError::plan(
            entity.name.as_str(),
            format!("expected one statement, generated {}", statements.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "query_builder_test.rs"]
mod tests;
