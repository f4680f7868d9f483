use crate::migration::folders::FolderMapping;
use crate::Result;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Read-only handle on the SQLite database being migrated
pub struct SourceDatabase {
    conn: Connection,
}

impl SourceDatabase {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Dashboard slug -> folder slug for every dashboard that lives in a folder
    pub fn folder_mapping(&self) -> Result<FolderMapping> {
        let folders = self.folder_slugs()?;

        let mut stmt = self
            .conn
            .prepare("SELECT slug, folder_id FROM dashboard WHERE is_folder = 0")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
        })?;

        let mut mapping = FolderMapping::default();
        for row in rows {
            let (dashboard_slug, folder_id) = row?;
            // 0 and NULL both mean the root level
            let Some(folder_id) = folder_id.filter(|id| *id != 0) else {
                continue;
            };
            match folders.get(&folder_id) {
                Some(folder_slug) => mapping.insert(dashboard_slug, folder_slug.clone()),
                None => warn!(
                    "Dashboard {} references missing folder id {}, leaving it at the root",
                    dashboard_slug, folder_id
                ),
            }
        }

        debug!("Read {} dashboard/folder assignments from SQLite", mapping.len());
        Ok(mapping)
    }

    fn folder_slugs(&self) -> Result<HashMap<i64, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, slug FROM dashboard WHERE is_folder = 1")?;
        let folders = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(folders)
    }
}
