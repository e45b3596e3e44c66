//! Migrate command implementation

use anyhow::{Context, Result};
use lm_migrate::{prepare, MigrationReport, WriteGate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::{GlobalArgs, MigrateArgs, ReportOutput};
use crate::commands::common::{load_config, open_database, ExitCode, EXIT_FAILURES};

/// Exit code for a run stopped by Ctrl-C
const EXIT_INTERRUPTED: i32 = 130;

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let db = open_database(&config, global)?;
    let gate = WriteGate::from_flag(args.write);
    let root = args.root.clone();

    let cancel = Arc::new(AtomicBool::new(false));
    let interrupt = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, stopping after the current row");
                cancel.store(true, Ordering::SeqCst);
            }
        })
    };

    // The driver pulls rows through a blocking cursor.
    let report = tokio::task::spawn_blocking(move || -> Result<MigrationReport> {
        let prepared = prepare(&config, root.as_deref(), db.as_ref())
            .context("Failed to prepare migration")?;
        let report = prepared
            .migrator(db.as_ref())
            .with_cancellation(cancel)
            .run(gate)
            .context("Migration aborted")?;
        Ok(report)
    })
    .await
    .context("Migration task failed")??;
    interrupt.abort();
    if let Some(secs) = report.elapsed_secs() {
        log::debug!("Migration {} took {:.2}s", report.run_id, secs);
    }

    match args.output {
        ReportOutput::Text => println!("{}", report),
        ReportOutput::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
    }

    if report.cancelled {
        return Err(ExitCode(EXIT_INTERRUPTED).into());
    }
    if report.has_failures() {
        return Err(ExitCode(EXIT_FAILURES).into());
    }
    Ok(())
}
