use super::*;
use lm_core::{EntityDef, EntityName};
use lm_db::ColumnInfo;

fn def(name: &str, table: &str, parent: Option<&str>, fields: &[&str]) -> EntityDef {
    EntityDef {
        name: EntityName::try_new(name).unwrap(),
        table: table.to_string(),
        parent: parent.map(|p| EntityName::try_new(p).unwrap()),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        versioned: false,
        staged_live: false,
    }
}

fn catalog() -> EntityCatalog {
    let mut site_tree = def("SiteTree", "SiteTree", None, &["Title"]);
    site_tree.versioned = true;
    site_tree.staged_live = true;
    EntityCatalog::build(&[
        def("TranslatedDataObject", "FluentTestDataObject", None, &["Title", "Name"]),
        def(
            "TranslatedDataObjectSubclass",
            "FluentTestDataObjectSubclass",
            Some("TranslatedDataObject"),
            &["Category"],
        ),
        def(
            "TranslatedDataObjectPartialSubclass",
            "FluentTestDataObjectPartialSubclass",
            Some("TranslatedDataObject"),
            &["Colour", "Legs"],
        ),
        site_tree,
        def("TranslatedPage", "FluentTestPage", Some("SiteTree"), &["TranslatedValue"]),
    ])
    .unwrap()
}

fn table(name: &str, columns: &[&str]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|column| ColumnInfo {
            table: name.to_string(),
            column: column.to_string(),
            data_type: "VARCHAR".to_string(),
        })
        .collect()
}

fn snapshot() -> SchemaSnapshot {
    let mut columns = Vec::new();
    columns.extend(table(
        "FluentTestDataObject",
        &["ID", "Title", "Name", "Title_en_US", "Title_de_AT", "Name_en_US", "Name_de_AT"],
    ));
    columns.extend(table(
        "FluentTestDataObjectSubclass",
        &["ID", "Category_en_US", "Category_de_AT"],
    ));
    columns.extend(table("FluentTestDataObjectPartialSubclass", &["ID", "Colour_en_US"]));
    for suffix in ["", "_Live"] {
        columns.extend(table(&format!("SiteTree{suffix}"), &["ID", "Title_en_US", "Title_de_AT"]));
        columns.extend(table(&format!("FluentTestPage{suffix}"), &["ID", "TranslatedValue_en_US"]));
    }
    columns.extend(table(
        "SiteTree_Versions",
        &["ID", "RecordID", "Version", "Title_en_US", "Title_de_AT"],
    ));
    columns.extend(table(
        "FluentTestPage_Versions",
        &["ID", "RecordID", "Version", "TranslatedValue_en_US"],
    ));
    SchemaSnapshot::from_columns(columns)
}

fn locale(s: &str) -> Locale {
    Locale::try_new(s).unwrap()
}

fn build(root: &str, locales: &[&str]) -> QueryPlan {
    let catalog = catalog();
    let snapshot = snapshot();
    let columns = ColumnNames::default();
    let hierarchy = catalog.resolve_hierarchy(root).unwrap();
    let locales: Vec<Locale> = locales.iter().map(|l| locale(l)).collect();
    QueryBuilder::new(&catalog, &snapshot, &columns)
        .build(&hierarchy, &locales, &locale("en_US"))
        .unwrap()
}

#[test]
fn test_plan_keys_per_locale() {
    let plan = build("TranslatedDataObject", &["en_US", "de_AT"]);

    assert_eq!(plan.locales.len(), 2);
    for locale_plan in &plan.locales {
        let tables: Vec<&str> = locale_plan
            .queries
            .iter()
            .map(|q| q.derived_table.as_str())
            .collect();
        assert_eq!(
            tables,
            vec![
                "FluentTestDataObject_Localised",
                "FluentTestDataObjectSubclass_Localised",
                "FluentTestDataObjectPartialSubclass_Localised",
            ]
        );
    }
    assert!(plan.get("de_AT", "FluentTestDataObject_Localised").is_some());
    assert!(plan.get("fr_FR", "FluentTestDataObject_Localised").is_none());
}

#[test]
fn test_locale_order_is_preserved() {
    let plan = build("TranslatedDataObject", &["de_AT", "en_US"]);
    let order: Vec<&str> = plan.locales.iter().map(|p| p.locale.as_str()).collect();
    assert_eq!(order, vec!["de_AT", "en_US"]);
    assert!(!plan.locales[0].is_default);
    assert!(plan.locales[1].is_default);
}

#[test]
fn test_unlisted_default_locale_is_planned_last() {
    let plan = build("TranslatedDataObject", &["de_AT"]);
    let order: Vec<&str> = plan.locales.iter().map(|p| p.locale.as_str()).collect();
    assert_eq!(order, vec!["de_AT", "en_US"]);
    assert!(plan.locales[1].is_default);

    let query = plan.get("en_US", "FluentTestDataObject_Localised").unwrap();
    assert!(!query.sql.contains("WHERE"));
}

#[test]
fn test_versioned_entity_produces_three_variants() {
    let plan = build("SiteTree", &["en_US"]);
    let tables: Vec<&str> = plan.queries().map(|q| q.derived_table.as_str()).collect();
    assert_eq!(
        tables,
        vec![
            "SiteTree_Localised",
            "SiteTree_Localised_Live",
            "SiteTree_Localised_Versions",
            "FluentTestPage_Localised",
            "FluentTestPage_Localised_Live",
            "FluentTestPage_Localised_Versions",
        ]
    );
    assert_eq!(plan.len(), 6);
}

#[test]
fn test_locale_column_with_canonical_backing() {
    let plan = build("TranslatedDataObject", &["en_US", "de_AT"]);
    let query = plan.get("de_AT", "FluentTestDataObject_Localised").unwrap();

    assert_eq!(query.fields[0].source, FieldSource::Locale("Title_de_AT".into()));
    assert_eq!(query.fields[0].canonical.as_deref(), Some("Title"));
    assert!(query
        .sql
        .contains("COALESCE(\"t0\".\"Title_de_AT\", \"t0\".\"Title\") AS \"Title\""));
    assert!(query.sql.starts_with("SELECT \"t0\".\"ID\" AS \"RecordID\""));
}

#[test]
fn test_falls_back_to_default_locale_column() {
    let plan = build("TranslatedDataObject", &["en_US", "de_AT"]);
    let query = plan
        .get("de_AT", "FluentTestDataObjectPartialSubclass_Localised")
        .unwrap();

    assert_eq!(
        query.fields[0].source,
        FieldSource::DefaultLocale("Colour_en_US".into())
    );
    assert!(query.fields[0].canonical.is_none());
    assert!(query.sql.contains("\"t1\".\"Colour_en_US\" AS \"Colour\""));
}

#[test]
fn test_missing_field_resolves_to_null() {
    let plan = build("TranslatedDataObject", &["en_US", "de_AT"]);
    let query = plan
        .get("en_US", "FluentTestDataObjectPartialSubclass_Localised")
        .unwrap();

    assert_eq!(query.fields[1].field, "Legs");
    assert_eq!(query.fields[1].source, FieldSource::Missing);
    assert!(query.sql.contains("CAST(NULL AS VARCHAR) AS \"Legs\""));
}

#[test]
fn test_subclass_joins_ancestor_on_id() {
    let plan = build("TranslatedDataObject", &["en_US"]);
    let query = plan
        .get("en_US", "FluentTestDataObjectSubclass_Localised")
        .unwrap();

    assert_eq!(query.source_table, "FluentTestDataObjectSubclass");
    assert!(query.sql.contains(
        "FROM \"FluentTestDataObjectSubclass\" AS \"t1\" INNER JOIN \"FluentTestDataObject\" AS \"t0\" ON \"t0\".\"ID\" = \"t1\".\"ID\""
    ));
    assert!(query.sql.ends_with("ORDER BY \"t1\".\"ID\""));
}

#[test]
fn test_versions_variant_joins_on_record_and_version() {
    let plan = build("SiteTree", &["en_US"]);
    let query = plan.get("en_US", "FluentTestPage_Localised_Versions").unwrap();

    assert_eq!(query.key_width(), 2);
    assert!(query
        .sql
        .starts_with("SELECT \"t1\".\"RecordID\" AS \"RecordID\", \"t1\".\"Version\" AS \"Version\""));
    assert!(query.sql.contains(
        "ON \"t0\".\"RecordID\" = \"t1\".\"RecordID\" AND \"t0\".\"Version\" = \"t1\".\"Version\""
    ));
    assert!(query
        .sql
        .ends_with("ORDER BY \"t1\".\"RecordID\", \"t1\".\"Version\""));
}

#[test]
fn test_default_locale_has_no_predicate() {
    let plan = build("TranslatedDataObject", &["en_US", "de_AT"]);
    let query = plan.get("en_US", "FluentTestDataObject_Localised").unwrap();
    assert!(!query.sql.contains("WHERE"));
}

#[test]
fn test_predicate_spans_joined_chain() {
    let plan = build("TranslatedDataObject", &["en_US", "de_AT"]);
    let query = plan
        .get("de_AT", "FluentTestDataObjectPartialSubclass_Localised")
        .unwrap();

    assert!(query.has_locale_columns);
    assert!(query.sql.contains(
        "WHERE (\"t0\".\"Title_de_AT\" IS NOT NULL OR \"t0\".\"Name_de_AT\" IS NOT NULL)"
    ));
}

#[test]
fn test_locale_without_columns_selects_nothing() {
    let plan = build("TranslatedDataObject", &["en_US", "en_NZ"]);
    let query = plan.get("en_NZ", "FluentTestDataObject_Localised").unwrap();

    assert!(!query.has_locale_columns);
    assert!(query.sql.contains("WHERE FALSE"));
    assert_eq!(
        query.fields[0].source,
        FieldSource::DefaultLocale("Title_en_US".into())
    );
}

#[test]
fn test_missing_legacy_table_is_plan_error() {
    let catalog = catalog();
    let snapshot = SchemaSnapshot::from_columns(table("FluentTestDataObject", &["ID"]));
    let columns = ColumnNames::default();
    let hierarchy = catalog.resolve_hierarchy("TranslatedDataObject").unwrap();

    let err = QueryBuilder::new(&catalog, &snapshot, &columns)
        .build(&hierarchy, &[locale("en_US")], &locale("en_US"))
        .unwrap_err();

    match err {
        MigrateError::PlanConstruction { entity, message } => {
            assert_eq!(entity, "TranslatedDataObjectSubclass");
            assert!(message.contains("FluentTestDataObjectSubclass"));
        }
        other => panic!("expected plan error, got {other:?}"),
    }
}

#[test]
fn test_missing_version_column_is_plan_error() {
    let catalog = catalog();
    let mut columns = Vec::new();
    columns.extend(table("SiteTree", &["ID", "Title_en_US"]));
    columns.extend(table("SiteTree_Live", &["ID", "Title_en_US"]));
    columns.extend(table("SiteTree_Versions", &["ID", "RecordID", "Title_en_US"]));
    let snapshot = SchemaSnapshot::from_columns(columns);
    let names = ColumnNames::default();
    let site_tree = catalog.get("SiteTree").unwrap();

    let err = QueryBuilder::new(&catalog, &snapshot, &names)
        .build(&[site_tree], &[locale("en_US")], &locale("en_US"))
        .unwrap_err();

    assert!(matches!(err, MigrateError::PlanConstruction { .. }));
    assert!(err.to_string().contains("'Version'"));
}

#[test]
fn test_custom_identifier_columns() {
    let catalog = catalog();
    let snapshot = SchemaSnapshot::from_columns(table(
        "FluentTestDataObject",
        &["Pk", "Title_en_US", "Name_en_US"],
    ));
    let columns = ColumnNames {
        id: "Pk".to_string(),
        ..ColumnNames::default()
    };
    let entity = catalog.get("TranslatedDataObject").unwrap();

    let plan = QueryBuilder::new(&catalog, &snapshot, &columns)
        .build(&[entity], &[locale("en_US")], &locale("en_US"))
        .unwrap();

    let query = plan.get("en_US", "FluentTestDataObject_Localised").unwrap();
    assert!(query.sql.starts_with("SELECT \"t0\".\"Pk\" AS \"RecordID\""));
}
