use super::*;
use tempfile::TempDir;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("locales: [en_US]").unwrap();
    assert_eq!(config.locales.len(), 1);
    assert!(config.default_locale.is_none());
    assert_eq!(config.database.path, "locmig.duckdb");
    assert_eq!(config.database.schema, "main");
    assert_eq!(config.columns, ColumnNames::default());
    assert!(config.entities.is_empty());
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
locales: [en_US, de_AT]
default_locale: en_US
root: TranslatedDataObject
database:
  path: ./site.duckdb
columns:
  id: Id
  record_id: RecordId
entities:
  - name: TranslatedDataObject
    table: FluentTestDataObject
    fields: [Title, Name]
  - name: TranslatedDataObjectSubclass
    table: FluentTestDataObjectSubclass
    parent: TranslatedDataObject
    fields: [Category]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.locales[1], "de_AT");
    assert_eq!(config.default_locale.as_ref().unwrap(), "en_US");
    assert_eq!(config.root.as_ref().unwrap(), "TranslatedDataObject");
    assert_eq!(config.database.path, "./site.duckdb");
    assert_eq!(config.columns.id, "Id");
    assert_eq!(config.columns.record_id, "RecordId");
    assert_eq!(config.columns.version, "Version");
    assert_eq!(config.entities.len(), 2);

    let catalog = config.catalog().unwrap();
    assert_eq!(catalog.roots().len(), 1);
}

#[test]
fn test_unknown_fields_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("locales: [en_US]\nlanguages: [de]");
    assert!(result.is_err());
}

#[test]
fn test_invalid_locale_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("locales: ['en US']");
    assert!(result.is_err());
}

#[test]
fn test_locale_settings_from_config() {
    let config: Config =
        serde_yaml::from_str("locales: [en_US, de_AT]\ndefault_locale: en_US").unwrap();
    let settings = config.locale_settings();
    assert_eq!(settings.locales().unwrap().len(), 2);
    assert_eq!(settings.default_locale().unwrap(), "en_US");
}

#[test]
fn test_missing_locales_surface_from_resolver() {
    let config: Config = serde_yaml::from_str("default_locale: en_US").unwrap();
    assert!(matches!(
        config.locale_settings().locales(),
        Err(CoreError::LocalesRequired)
    ));
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locmig.yml");
    std::fs::write(&path, "locales: [en_US]\ndefault_locale: en_US\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.locales[0], "en_US");
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("locmig.yaml"), "locales: [de_AT]\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.locales[0], "de_AT");

    std::fs::write(dir.path().join("locmig.yml"), "locales: [en_US]\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.locales[0], "en_US");
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_parse_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locmig.yml");
    std::fs::write(&path, "locales: {not: a list}\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
    assert!(err.to_string().contains("locmig.yml"));
}

#[test]
fn test_colliding_column_names_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locmig.yml");
    std::fs::write(&path, "locales: [en_US]\ncolumns:\n  locale: RecordID\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_resolve_root_priority() {
    let config: Config = serde_yaml::from_str("root: SiteTree").unwrap();
    assert_eq!(config.resolve_root(Some("Page")), Some("Page"));
    assert_eq!(config.resolve_root(None), Some("SiteTree"));

    let config = Config::default();
    assert_eq!(config.resolve_root(None), None);
}

#[test]
fn test_field_named_like_key_column_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locmig.yml");
    std::fs::write(
        &path,
        "locales: [en_US]\nentities:\n  - name: Page\n    table: Page\n    fields: [Title, locale]\n",
    )
    .unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::InvalidCatalog { .. }));
    assert!(err.to_string().contains("'locale'"));
    assert!(err.to_string().contains("'Locale'"));
}

#[test]
fn test_field_named_like_custom_key_column_rejected_by_catalog() {
    let yaml = r#"
columns:
  record_id: ItemID
entities:
  - name: Page
    table: Page
    fields: [ItemID]
  - name: Other
    table: Other
    fields: [RecordID]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config.catalog().unwrap_err();
    assert!(matches!(err, CoreError::InvalidCatalog { .. }));
    assert!(err.to_string().contains("'ItemID'"));
}
