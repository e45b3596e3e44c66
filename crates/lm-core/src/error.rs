//! Error types for lm-core
//!
//! Every variant here is a configuration error: it is raised before any
//! query runs and aborts the migration without a report.

use thiserror::Error;

/// Core error type for locmig
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: No locales configured
    #[error("[C004] Configuration error: locales required")]
    LocalesRequired,

    /// C005: No default locale configured
    #[error("[C005] Configuration error: default locale required")]
    DefaultLocaleRequired,

    /// C006: Root entity type is not in the catalog
    #[error("[C006] Configuration error: unknown entity type '{name}'")]
    UnknownEntityType { name: String },

    /// C007: Entity catalog is internally inconsistent
    #[error("[C007] Invalid entity catalog: {message}")]
    InvalidCatalog { message: String },

    /// C008: Inheritance chain loops back on itself
    #[error("[C008] Circular inheritance detected: {cycle}")]
    CircularInheritance { cycle: String },

    /// C009: IO error with file path context
    #[error("[C009] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
