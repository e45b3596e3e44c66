//! Plan command implementation

use anyhow::{Context, Result};
use lm_migrate::{prepare, FieldSource, LocalePlan, LocalisedQuery};

use crate::cli::{GlobalArgs, PlanArgs, PlanOutput};
use crate::commands::common::{load_config, open_database};

/// Execute the plan command
pub async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let db = open_database(&config, global)?;
    let prepared = prepare(&config, args.root.as_deref(), db.as_ref())
        .context("Failed to build query plan")?;

    let locales: Vec<&LocalePlan> = match &args.locale {
        Some(wanted) => {
            let plan = prepared.plan.locale(wanted).with_context(|| {
                format!("Locale '{}' is not among the configured locales", wanted)
            })?;
            vec![plan]
        }
        None => prepared.plan.locales.iter().collect(),
    };

    match args.output {
        PlanOutput::Sql => {
            for locale in locales {
                let marker = if locale.is_default { " (default)" } else { "" };
                println!("-- locale {}{}", locale.locale, marker);
                for query in &locale.queries {
                    print_query(query);
                }
            }
        }
        PlanOutput::Json => {
            let json =
                serde_json::to_string_pretty(&locales).context("Failed to serialize plan")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn print_query(query: &LocalisedQuery) {
    println!(
        "-- {} <- {} ({}, {})",
        query.derived_table, query.source_table, query.entity, query.variant
    );
    for field in &query.fields {
        let source = match &field.source {
            FieldSource::Locale(column) => column.clone(),
            FieldSource::DefaultLocale(column) => format!("{} (default locale)", column),
            FieldSource::Canonical(column) => format!("{} (canonical)", column),
            FieldSource::Missing => "NULL".to_string(),
        };
        println!("--   {} <- {}", field.field, source);
    }
    println!("{};", query.sql);
    println!();
}
