//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// locmig - migrate legacy locale-suffixed columns into localised tables
#[derive(Parser, Debug)]
#[command(name = "lm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory holding locmig.yml
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true, env = "LM_CONFIG")]
    pub config: Option<String>,

    /// Override database path (DuckDB file or :memory:)
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy legacy locale columns into the localised tables
    Migrate(MigrateArgs),

    /// Print the per-locale query plan without running it
    Plan(PlanArgs),

    /// List entity types with their storage variants and derived tables
    Ls(LsArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Commit writes (default is a dry run)
    #[arg(short, long, env = "LM_WRITE")]
    pub write: bool,

    /// Root entity type to migrate (default: config `root`, else every hierarchy)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: ReportOutput,
}

/// Report output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutput {
    /// Human-readable report
    Text,
    /// JSON report
    Json,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Root entity type to plan (default: config `root`, else every hierarchy)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Only show queries for this locale
    #[arg(short, long)]
    pub locale: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "sql")]
    pub output: PlanOutput,
}

/// Plan output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutput {
    /// Annotated SQL
    Sql,
    /// JSON plan
    Json,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Root entity type to list (default: config `root`, else every hierarchy)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: LsOutput,
}

/// List output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
    /// Inheritance tree
    Tree,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
