use super::*;

fn seeded() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE items (\"ID\" INTEGER, \"Title\" VARCHAR, \"Price\" DOUBLE, \"Active\" BOOLEAN);
         INSERT INTO items VALUES (1, 'A House', 10.5, true), (2, NULL, NULL, false), (3, 'Ein Haus', 2, NULL);",
    )
    .unwrap();
    db
}

#[test]
fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_new_memory_alias() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    assert!(!db.relation_exists("anything").unwrap());
}

#[test]
fn test_from_path_persists() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("site.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute_batch("CREATE TABLE kept (id INT); INSERT INTO kept VALUES (1);")
            .unwrap();
    }
    let db = DuckDbBackend::from_path(&path).unwrap();
    assert_eq!(db.query_count("SELECT * FROM kept").unwrap(), 1);
}

#[test]
fn test_relation_exists() {
    let db = seeded();
    assert!(db.relation_exists("items").unwrap());
    assert!(db.relation_exists("ITEMS").unwrap());
    assert!(!db.relation_exists("nonexistent").unwrap());
}

#[test]
fn test_query_count() {
    let db = seeded();
    assert_eq!(db.query_count("SELECT * FROM items").unwrap(), 3);
}

#[test]
fn test_execute_reports_affected_rows() {
    let db = seeded();
    let changed = db
        .execute("UPDATE items SET \"Title\" = 'x' WHERE \"ID\" > 1")
        .unwrap();
    assert_eq!(changed, 2);
}

#[test]
fn test_columns_snapshot() {
    let db = seeded();
    let columns = db.columns("main").unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.column.as_str()).collect();
    assert_eq!(names, vec!["ID", "Title", "Price", "Active"]);
    assert!(columns.iter().all(|c| c.table == "items"));
    assert_eq!(columns[1].data_type, "VARCHAR");
}

#[test]
fn test_stream_rows_converts_cells() {
    let db = seeded();
    let mut rows = Vec::new();
    let pulled = db
        .stream_rows(
            "SELECT \"ID\", \"Title\", \"Price\", \"Active\" FROM items ORDER BY \"ID\"",
            &mut |row| {
                rows.push(row.unwrap());
                ControlFlow::Continue(())
            },
        )
        .unwrap();

    assert_eq!(pulled, 3);
    assert_eq!(
        rows[0],
        vec![
            SqlValue::Integer(1),
            SqlValue::Text("A House".into()),
            SqlValue::Real(10.5),
            SqlValue::Bool(true),
        ]
    );
    assert_eq!(rows[1][1], SqlValue::Null);
    assert_eq!(rows[2][3], SqlValue::Null);
}

#[test]
fn test_stream_rows_stops_on_break() {
    let db = seeded();
    let mut seen = 0;
    let pulled = db
        .stream_rows("SELECT * FROM items", &mut |_| {
            seen += 1;
            ControlFlow::Break(())
        })
        .unwrap();
    assert_eq!(seen, 1);
    assert_eq!(pulled, 1);
}

#[test]
fn test_stream_rows_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db
        .stream_rows("SELECT * FROM missing", &mut |_| ControlFlow::Continue(()))
        .unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));
}

#[test]
fn test_upsert_inside_open_cursor() {
    let db = seeded();
    db.execute_batch(
        "CREATE TABLE items_copy (\"RecordID\" BIGINT, \"Locale\" VARCHAR, \"Title\" VARCHAR, UNIQUE (\"RecordID\", \"Locale\"))",
    )
    .unwrap();

    db.stream_rows("SELECT \"ID\", \"Title\" FROM items", &mut |row| {
        let row = row.unwrap();
        db.upsert(
            "items_copy",
            &[("RecordID", row[0].clone()), ("Locale", "en_US".into())],
            &[("Title", row[1].clone())],
        )
        .unwrap();
        ControlFlow::Continue(())
    })
    .unwrap();

    assert_eq!(db.query_count("SELECT * FROM items_copy").unwrap(), 3);
}

#[test]
fn test_upsert_inserts_then_updates() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE loc (\"RecordID\" BIGINT, \"Locale\" VARCHAR, \"Title\" VARCHAR, UNIQUE (\"RecordID\", \"Locale\"))",
    )
    .unwrap();
    let key = [("RecordID", SqlValue::Integer(1)), ("Locale", "de_AT".into())];

    let first = db
        .upsert("loc", &key, &[("Title", "Haus".into())])
        .unwrap();
    assert_eq!(first, UpsertOutcome::Inserted);

    let second = db
        .upsert("loc", &key, &[("Title", "Ein Haus".into())])
        .unwrap();
    assert_eq!(second, UpsertOutcome::Updated);

    assert_eq!(db.query_count("SELECT * FROM loc").unwrap(), 1);
    assert_eq!(
        db.query_count("SELECT * FROM loc WHERE \"Title\" = 'Ein Haus'")
            .unwrap(),
        1
    );
}

#[test]
fn test_upsert_without_values() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE keys_only (\"RecordID\" BIGINT, \"Locale\" VARCHAR)")
        .unwrap();
    let key = [("RecordID", SqlValue::Integer(5)), ("Locale", "en_US".into())];

    assert_eq!(
        db.upsert("keys_only", &key, &[]).unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        db.upsert("keys_only", &key, &[]).unwrap(),
        UpsertOutcome::Updated
    );
    assert_eq!(db.query_count("SELECT * FROM keys_only").unwrap(), 1);
}

#[test]
fn test_upsert_requires_key() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.upsert("loc", &[], &[]).unwrap_err();
    assert!(matches!(err, DbError::InvalidRequest(_)));
}

#[test]
fn test_upsert_constraint_violation() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE guarded (\"RecordID\" BIGINT, \"Title\" VARCHAR CHECK (\"Title\" <> 'bad'))",
    )
    .unwrap();
    let err = db
        .upsert(
            "guarded",
            &[("RecordID", SqlValue::Integer(1))],
            &[("Title", "bad".into())],
        )
        .unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
}

#[test]
fn test_temporal_values_round_trip() {
    use chrono::NaiveDate;

    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE dated (\"ID\" INTEGER, \"Published\" DATE, \"Opens\" TIME, \"Inspected\" TIMESTAMP, \"Term\" INTERVAL);
         INSERT INTO dated VALUES
             (1, DATE '2020-01-01', TIME '09:30:15', TIMESTAMP '2021-03-04 05:06:07.250', INTERVAL 3 DAY),
             (2, DATE '1969-12-31', NULL, NULL, NULL);
         CREATE TABLE dated_copy (\"RecordID\" BIGINT, \"Published\" DATE, \"Opens\" TIME, \"Inspected\" TIMESTAMP, \"Term\" INTERVAL);",
    )
    .unwrap();

    let mut rows = Vec::new();
    db.stream_rows(
        "SELECT \"ID\", \"Published\", \"Opens\", \"Inspected\", \"Term\" FROM dated ORDER BY \"ID\"",
        &mut |row| {
            rows.push(row.unwrap());
            ControlFlow::Continue(())
        },
    )
    .unwrap();

    let published = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    assert_eq!(rows[0][1], SqlValue::Date(published));
    assert_eq!(
        rows[0][2],
        SqlValue::Time(chrono::NaiveTime::from_hms_opt(9, 30, 15).unwrap())
    );
    assert_eq!(
        rows[0][3],
        SqlValue::Timestamp(
            NaiveDate::from_ymd_opt(2021, 3, 4)
                .unwrap()
                .and_hms_milli_opt(5, 6, 7, 250)
                .unwrap()
        )
    );
    assert_eq!(
        rows[0][4],
        SqlValue::Interval {
            months: 0,
            days: 3,
            nanos: 0
        }
    );
    assert_eq!(
        rows[1][1],
        SqlValue::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap())
    );

    for row in &rows {
        db.upsert(
            "dated_copy",
            &[("RecordID", row[0].clone())],
            &[
                ("Published", row[1].clone()),
                ("Opens", row[2].clone()),
                ("Inspected", row[3].clone()),
                ("Term", row[4].clone()),
            ],
        )
        .unwrap();
    }
    assert_eq!(
        db.query_count(
            "SELECT * FROM dated_copy WHERE \"Published\" = DATE '2020-01-01' \
             AND \"Opens\" = TIME '09:30:15' \
             AND \"Inspected\" = TIMESTAMP '2021-03-04 05:06:07.250' \
             AND \"Term\" = INTERVAL 3 DAY"
        )
        .unwrap(),
        1
    );
    assert_eq!(
        db.query_count("SELECT * FROM dated_copy WHERE \"Published\" = DATE '1969-12-31'")
            .unwrap(),
        1
    );
}
