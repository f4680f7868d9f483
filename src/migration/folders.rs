use crate::catalog::quote_literal;
use crate::session::target::{row_i64, row_text, SqlTarget, TextRow};
use crate::{MigrateError, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const DESTINATION_FOLDERS: &str = "SELECT id, slug FROM dashboard WHERE is_folder = true";
const DESTINATION_DASHBOARDS: &str = "SELECT slug, folder_id FROM dashboard WHERE is_folder = false";

/// Dashboard slug -> folder slug, read from the source before the import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderMapping {
    by_dashboard: HashMap<String, String>,
}

impl FolderMapping {
    pub fn insert(&mut self, dashboard_slug: String, folder_slug: String) {
        self.by_dashboard.insert(dashboard_slug, folder_slug);
    }

    pub fn folder_for(&self, dashboard_slug: &str) -> Option<&str> {
        self.by_dashboard.get(dashboard_slug).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_dashboard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dashboard.is_empty()
    }
}

impl FromIterator<(String, String)> for FolderMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { by_dashboard: iter.into_iter().collect() }
    }
}

/// slug <-> id lookup built fresh for one fix pass
#[derive(Debug, Default)]
pub struct SlugIdIndex {
    by_slug: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
}

impl SlugIdIndex {
    pub fn insert(&mut self, slug: String, id: i64) {
        self.by_id.insert(id, slug.clone());
        self.by_slug.insert(slug, id);
    }

    pub fn id(&self, slug: &str) -> Option<i64> {
        self.by_slug.get(slug).copied()
    }

    pub fn slug(&self, id: i64) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Index from `(id, slug)` rows
    fn from_rows(rows: &[TextRow]) -> Result<Self> {
        let mut index = Self::default();
        for row in rows {
            let id = row_i64(row, 0)?.ok_or_else(|| MigrateError::Schema("folder with NULL id".to_string()))?;
            let slug = row_text(row, 1)?.unwrap_or_default();
            index.insert(slug, id);
        }
        Ok(index)
    }
}

/// Puts imported dashboards back into their folders.
///
/// Dashboard rows keep the folder id they had in SQLite, but the folders
/// themselves may have been issued new ids. Folders are matched by slug.
pub struct FolderRelationshipFixer<'a> {
    target: &'a dyn SqlTarget,
}

impl<'a> FolderRelationshipFixer<'a> {
    pub fn new(target: &'a dyn SqlTarget) -> Self {
        Self { target }
    }

    /// Returns the number of dashboards moved
    pub async fn fix(&self, mapping: &FolderMapping) -> Result<usize> {
        let folders = SlugIdIndex::from_rows(&self.query(DESTINATION_FOLDERS).await?)?;
        let dashboards = self.query(DESTINATION_DASHBOARDS).await?;

        let mut fixed = 0;
        for row in &dashboards {
            let Some(dashboard_slug) = row_text(row, 0)? else {
                continue;
            };
            // Not in the mapping: a root-level dashboard
            let Some(target_folder) = mapping.folder_for(&dashboard_slug) else {
                continue;
            };
            let current_folder = row_i64(row, 1)?.and_then(|id| folders.slug(id));
            if current_folder == Some(target_folder) {
                continue;
            }
            let Some(target_id) = folders.id(target_folder) else {
                warn!(
                    "Folder {} of dashboard {} not found in destination, leaving it as is",
                    target_folder, dashboard_slug
                );
                continue;
            };

            info!("Replace folder id for {} to {}", dashboard_slug, target_id);
            let stmt = format!(
                "UPDATE dashboard SET folder_id = {} WHERE slug = {}",
                target_id,
                quote_literal(&dashboard_slug)
            );
            let rows = self
                .target
                .execute(&stmt)
                .await
                .map_err(|e| MigrateError::statement(e, stmt.clone()))?;
            debug!("{} rows were fixed", rows);
            fixed += 1;
        }

        Ok(fixed)
    }

    async fn query(&self, sql: &str) -> Result<Vec<TextRow>> {
        self.target
            .query(sql)
            .await
            .map_err(|e| MigrateError::statement(e, sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::ScriptedTarget;
    use pretty_assertions::assert_eq;

    fn mapping() -> FolderMapping {
        [
            ("weekly".to_string(), "reports".to_string()),
            ("pager".to_string(), "ops".to_string()),
            ("lost".to_string(), "deleted-folder".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn target() -> ScriptedTarget {
        ScriptedTarget::new()
            .answer(
                "is_folder = true",
                vec![vec![Some("31"), Some("reports")], vec![Some("32"), Some("ops")]],
            )
            .answer(
                "is_folder = false",
                vec![
                    // Still carries the SQLite id of `reports`
                    vec![Some("weekly"), Some("10")],
                    // Already correct
                    vec![Some("pager"), Some("32")],
                    // Root-level
                    vec![Some("home"), Some("0")],
                    vec![Some("lost"), None],
                ],
            )
    }

    #[test]
    fn test_slug_id_index() {
        let mut index = SlugIdIndex::default();
        index.insert("reports".to_string(), 31);
        assert_eq!(index.id("reports"), Some(31));
        assert_eq!(index.slug(31), Some("reports"));
        assert_eq!(index.id("ops"), None);
    }

    #[tokio::test]
    async fn test_dashboard_moved_to_new_folder_id() {
        let target = target();
        let fixed = FolderRelationshipFixer::new(&target).fix(&mapping()).await.unwrap();
        assert_eq!(fixed, 1);

        let updates: Vec<_> = target.executed().into_iter().filter(|s| s.starts_with("UPDATE")).collect();
        assert_eq!(updates, vec!["UPDATE dashboard SET folder_id = 31 WHERE slug = 'weekly'".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_mapping_changes_nothing() {
        let target = target();
        let fixed = FolderRelationshipFixer::new(&target).fix(&FolderMapping::default()).await.unwrap();
        assert_eq!(fixed, 0);
        assert_eq!(target.executed().len(), 2);
    }
}
