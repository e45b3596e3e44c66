//! Run preparation
//!
//! Resolves configuration into a plan in the order that fails fastest:
//! locales, then the entity catalog and hierarchy, then the schema snapshot
//! and the queries built from it.

use crate::driver::Migrator;
use crate::error::MigrateResult;
use crate::query_builder::{QueryBuilder, QueryPlan};
use crate::report::MigrationReport;
use crate::snapshot::SchemaSnapshot;
use crate::write_gate::WriteGate;
use lm_core::{Config, CoreError, EntityName};
use lm_db::Database;

/// A plan together with the snapshot it was built from
#[derive(Debug)]
pub struct PreparedMigration {
    /// Entity types covered by the plan, ancestors first
    pub entities: Vec<EntityName>,
    pub snapshot: SchemaSnapshot,
    pub plan: QueryPlan,
}

impl PreparedMigration {
    pub fn migrator<'a>(&'a self, db: &'a dyn Database) -> Migrator<'a> {
        Migrator::new(db, &self.plan, &self.snapshot)
    }
}

/// Resolve `config` into a query plan against the current schema of `db`.
///
/// `root` overrides the configured root entity type. Without either, every
/// hierarchy in the catalog is planned.
pub fn prepare(
    config: &Config,
    root: Option<&str>,
    db: &dyn Database,
) -> MigrateResult<PreparedMigration> {
    let settings = config.locale_settings();
    let locales = settings.migration_locales()?;
    let default_locale = settings.default_locale()?;

    let catalog = config.catalog()?;
    let hierarchy = match config.resolve_root(root) {
        Some(root) => catalog.resolve_hierarchy(root)?,
        None => catalog.all_hierarchies(),
    };
    if hierarchy.is_empty() {
        return Err(CoreError::ConfigInvalid {
            message: "no entity types declared".to_string(),
        }
        .into());
    }

    let snapshot = SchemaSnapshot::capture(db, &config.database.schema)?;
    let plan =
        QueryBuilder::new(&catalog, &snapshot, &config.columns).build(&hierarchy, &locales, default_locale)?;
    log::info!(
        "Planned {} queries over {} entity types and {} locales",
        plan.len(),
        hierarchy.len(),
        locales.len()
    );

    Ok(PreparedMigration {
        entities: hierarchy.iter().map(|e| e.name.clone()).collect(),
        snapshot,
        plan,
    })
}

/// Prepare and run a migration in one call.
pub fn migrate(
    config: &Config,
    root: Option<&str>,
    db: &dyn Database,
    gate: WriteGate,
) -> MigrateResult<MigrationReport> {
    prepare(config, root, db)?.migrator(db).run(gate)
}
