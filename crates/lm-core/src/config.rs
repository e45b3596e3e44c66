//! Configuration types and parsing for locmig.yml

use crate::entity::{EntityCatalog, EntityDef, EntityName};
use crate::error::{CoreError, CoreResult};
use crate::locale::{Locale, LocaleSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names searched for when a directory is given instead of a file
pub const CONFIG_FILE_NAMES: &[&str] = &["locmig.yml", "locmig.yaml"];

/// Main configuration from locmig.yml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Locales to migrate, in order
    #[serde(default)]
    pub locales: Vec<Locale>,

    /// Locale every record is guaranteed a localised row in
    #[serde(default)]
    pub default_locale: Option<Locale>,

    /// Root entity type to migrate when none is given on the command line.
    ///
    /// When unset, every hierarchy in `entities` is migrated.
    #[serde(default)]
    pub root: Option<EntityName>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Column naming conventions shared by legacy and derived tables
    #[serde(default)]
    pub columns: ColumnNames,

    /// Declarative entity catalog
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Schema holding both legacy and derived tables (default: "main")
    #[serde(default = "default_db_schema")]
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            schema: default_db_schema(),
        }
    }
}

fn default_db_path() -> String {
    "locmig.duckdb".to_string()
}

fn default_db_schema() -> String {
    "main".to_string()
}

/// Names of the bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnNames {
    /// Record identifier on current and live legacy tables
    #[serde(default = "default_id_column")]
    pub id: String,

    /// Record identifier on `_Versions` tables and on every derived table
    #[serde(default = "default_record_id_column")]
    pub record_id: String,

    /// Version number on `_Versions` tables
    #[serde(default = "default_version_column")]
    pub version: String,

    /// Locale column on derived tables
    #[serde(default = "default_locale_column")]
    pub locale: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            record_id: default_record_id_column(),
            version: default_version_column(),
            locale: default_locale_column(),
        }
    }
}

fn default_id_column() -> String {
    "ID".to_string()
}

fn default_record_id_column() -> String {
    "RecordID".to_string()
}

fn default_version_column() -> String {
    "Version".to_string()
}

fn default_locale_column() -> String {
    "Locale".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, trying locmig.yml then locmig.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        Self::find_in_dir(dir)
            .ok_or_else(|| CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            })
            .and_then(|path| Self::load(&path))
    }

    /// Find the config file in `dir`, if any
    pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Structural checks that do not need the database.
    ///
    /// Missing locales are not checked here; they surface from
    /// [`LocaleSettings`] when a migration asks for them.
    fn validate(&self) -> CoreResult<()> {
        let columns = [
            ("columns.id", &self.columns.id),
            ("columns.record_id", &self.columns.record_id),
            ("columns.version", &self.columns.version),
            ("columns.locale", &self.columns.locale),
        ];
        for (key, value) in columns {
            if value.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{} must not be empty", key),
                });
            }
        }
        if self.columns.record_id.eq_ignore_ascii_case(&self.columns.locale)
            || self.columns.record_id.eq_ignore_ascii_case(&self.columns.version)
            || self.columns.version.eq_ignore_ascii_case(&self.columns.locale)
        {
            return Err(CoreError::ConfigInvalid {
                message: "columns.record_id, columns.version and columns.locale must differ"
                    .to_string(),
            });
        }
        self.check_field_names()
    }

    /// Declared fields become derived table columns next to the key columns,
    /// so they must not reuse a key column name.
    fn check_field_names(&self) -> CoreResult<()> {
        let reserved = [
            &self.columns.record_id,
            &self.columns.locale,
            &self.columns.version,
        ];
        for def in &self.entities {
            for field in &def.fields {
                if let Some(key) = reserved.iter().find(|key| key.eq_ignore_ascii_case(field)) {
                    return Err(CoreError::InvalidCatalog {
                        message: format!(
                            "field '{}' on entity '{}' clashes with key column '{}'",
                            field, def.name, key
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Locale resolver over the configured locales
    pub fn locale_settings(&self) -> LocaleSettings {
        LocaleSettings::new(self.locales.clone(), self.default_locale.clone())
    }

    /// Build the entity catalog from the declared entities
    pub fn catalog(&self) -> CoreResult<EntityCatalog> {
        self.check_field_names()?;
        EntityCatalog::build(&self.entities)
    }

    /// Resolve the root entity type: CLI flag > config `root` > None (all hierarchies)
    pub fn resolve_root<'a>(&'a self, cli_root: Option<&'a str>) -> Option<&'a str> {
        cli_root.or_else(|| self.root.as_ref().map(|r| r.as_str()))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
