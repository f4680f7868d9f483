mod common;

use common::create_grafana_sqlite;
use grafana_pg_migrate::session::SourceDatabase;
use tempfile::TempDir;

#[test]
fn test_folder_mapping_from_sqlite_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grafana.db");
    create_grafana_sqlite(
        &path,
        &[
            (1, "home", 0, false),
            (2, "reports", 0, true),
            (3, "weekly", 2, false),
            (4, "monthly", 2, false),
            (5, "orphan", 42, false),
        ],
    );

    let mapping = SourceDatabase::open(&path).unwrap().folder_mapping().unwrap();
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.folder_for("weekly"), Some("reports"));
    assert_eq!(mapping.folder_for("monthly"), Some("reports"));
    assert_eq!(mapping.folder_for("home"), None);
    assert_eq!(mapping.folder_for("orphan"), None);
}

#[test]
fn test_missing_dashboard_table_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE org (id INTEGER PRIMARY KEY);").unwrap();
    drop(conn);

    let source = SourceDatabase::open(&path).unwrap();
    assert!(source.folder_mapping().is_err());
}
