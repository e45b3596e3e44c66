//! List command implementation

use anyhow::{Context, Result};
use lm_core::{Config, EntityCatalog, EntityType, StorageVariant};
use serde::Serialize;

use crate::cli::{GlobalArgs, LsArgs, LsOutput};
use crate::commands::common::{load_config, print_table};

/// Entity information for display
#[derive(Debug, Serialize)]
struct EntityInfo {
    name: String,
    table: String,
    parent: Option<String>,
    depth: usize,
    fields: Vec<String>,
    variants: Vec<StorageVariant>,
    derived_tables: Vec<String>,
}

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let infos = entity_infos(&config, args.root.as_deref())?;

    match args.output {
        LsOutput::Table => {
            let rows: Vec<Vec<String>> = infos
                .iter()
                .map(|info| {
                    vec![
                        info.name.clone(),
                        info.table.clone(),
                        info.parent.clone().unwrap_or_else(|| "-".to_string()),
                        info.fields.join(", "),
                        info.derived_tables.join(", "),
                    ]
                })
                .collect();
            print_table(&["NAME", "TABLE", "PARENT", "FIELDS", "DERIVED TABLES"], &rows);
            println!("\n{} entity types", infos.len());
        }
        LsOutput::Json => {
            let json = serde_json::to_string_pretty(&infos).context("Failed to serialize")?;
            println!("{}", json);
        }
        LsOutput::Tree => {
            for info in &infos {
                let variants: Vec<String> = info.variants.iter().map(|v| v.to_string()).collect();
                println!(
                    "{}{} [{}] ({})",
                    "  ".repeat(info.depth),
                    info.name,
                    info.table,
                    variants.join(", ")
                );
            }
        }
    }

    Ok(())
}

/// Describe the hierarchy under `root`, or every hierarchy.
fn entity_infos(config: &Config, root: Option<&str>) -> Result<Vec<EntityInfo>> {
    let catalog = config.catalog().context("Invalid entity catalog")?;
    let entities = match config.resolve_root(root) {
        Some(root) => catalog.resolve_hierarchy(root)?,
        None => catalog.all_hierarchies(),
    };
    entities
        .into_iter()
        .map(|entity| entity_info(&catalog, entity))
        .collect()
}

fn entity_info(catalog: &EntityCatalog, entity: &EntityType) -> Result<EntityInfo> {
    let depth = catalog.ancestors(entity.name.as_str())?.len() - 1;
    let variants = entity.variants();
    Ok(EntityInfo {
        name: entity.name.to_string(),
        table: entity.table.clone(),
        parent: entity.parent.as_ref().map(|p| p.to_string()),
        depth,
        fields: entity.fields().to_vec(),
        derived_tables: variants
            .iter()
            .map(|variant| variant.localised_table(&entity.table))
            .collect(),
        variants,
    })
}
