//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use lm_core::Config;
use lm_db::{Database, DuckDbBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run before `main` exits.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: this is control flow, not a message for stderr.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Exit code for a run whose report contains failures
pub(crate) const EXIT_FAILURES: i32 = 4;

/// Load locmig.yml from `--config`, or from the project directory.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path)),
        None => Config::load_from_dir(Path::new(&global.project_dir))
            .context("Failed to load config"),
    }
}

/// Resolve the database path: `--database` as given, otherwise the
/// configured path relative to the project directory.
pub(crate) fn database_path(config: &Config, global: &GlobalArgs) -> String {
    if let Some(path) = &global.database {
        return path.clone();
    }
    let configured = &config.database.path;
    if configured == ":memory:" || Path::new(configured).is_absolute() {
        return configured.clone();
    }
    let mut path = PathBuf::from(&global.project_dir);
    path.push(configured);
    path.display().to_string()
}

pub(crate) fn open_database(config: &Config, global: &GlobalArgs) -> Result<Arc<dyn Database>> {
    let path = database_path(config, global);
    log::debug!("Opening database {}", path);
    let db: Arc<dyn Database> =
        Arc::new(DuckDbBackend::new(&path).context("Failed to connect to database")?);
    Ok(db)
}

/// Print a formatted table to stdout.
///
/// Columns are left-aligned, sized to their widest cell and separated by two
/// spaces, with a dashed line under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}
