//! lm-core - Core library for locmig
//!
//! This crate provides configuration parsing, the locale resolver, the
//! entity catalog (inheritance hierarchy and table ownership), storage
//! variants with the derived table naming contract, and SQL identifier
//! helpers shared by the other locmig crates.

pub mod config;
pub mod entity;
pub mod error;
pub mod locale;
mod newtype_string;
pub mod sql_utils;
pub mod variant;

pub use config::{ColumnNames, Config, DatabaseConfig};
pub use entity::{EntityCatalog, EntityDef, EntityName, EntityType};
pub use error::{CoreError, CoreResult};
pub use locale::{Locale, LocaleSettings};
pub use variant::{StorageVariant, LOCALISED_MARKER};
