use grafana_pg_migrate::session::{PgTarget, SqlTarget};
use rusqlite::Connection;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Environment variable naming a scratch Postgres database for end-to-end tests
#[allow(dead_code)]
pub const DATABASE_URL_ENV: &str = "GRAFANA_MIGRATE_TEST_DATABASE_URL";

/// Connection string for the scratch database, if the environment provides one
#[allow(dead_code)]
pub fn test_database_url() -> Option<String> {
    std::env::var(DATABASE_URL_ENV).ok().filter(|url| !url.is_empty())
}

/// A schema of its own on the scratch database; the session's search_path
/// points at it so unqualified names in the dump resolve there
#[allow(dead_code)]
pub struct TestSchema {
    pub target: PgTarget,
    pub name: String,
}

#[allow(dead_code)]
impl TestSchema {
    pub async fn create(url: &str) -> TestSchema {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
        let name = format!("grafana_migrate_{}_{}", std::process::id(), nanos);

        let target = PgTarget::connect(url).await.unwrap();
        target.execute(&format!("CREATE SCHEMA {name}")).await.unwrap();
        target.execute(&format!("SET search_path TO {name}")).await.unwrap();
        TestSchema { target, name }
    }

    /// Single text value of a one-row query
    pub async fn scalar(&self, sql: &str) -> Option<String> {
        let rows = self.target.query(sql).await.unwrap();
        assert_eq!(rows.len(), 1, "expected one row from {sql}");
        rows[0][0].clone()
    }

    pub async fn teardown(self) {
        self.target
            .execute(&format!("DROP SCHEMA {} CASCADE", self.name))
            .await
            .unwrap();
    }
}

/// Write a small Grafana-shaped SQLite database with folders
#[allow(dead_code)]
pub fn create_grafana_sqlite(path: &Path, dashboards: &[(i64, &str, i64, bool)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE dashboard (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            slug TEXT NOT NULL,
            title TEXT NOT NULL,
            folder_id INTEGER NOT NULL DEFAULT 0,
            is_folder INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    for (id, slug, folder_id, is_folder) in dashboards {
        conn.execute(
            "INSERT INTO dashboard (id, slug, title, folder_id, is_folder) VALUES (?1, ?2, ?2, ?3, ?4)",
            rusqlite::params![id, slug, folder_id, *is_folder as i64],
        )
        .unwrap();
    }
}
