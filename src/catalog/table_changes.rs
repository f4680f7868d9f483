/// A column stored as boolean in Postgres but dumped by SQLite as 0/1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub table: &'static str,
    pub column: &'static str,
    /// Default restored after the column is narrowed back to boolean
    pub default_literal: Option<&'static str>,
}

/// All boolean columns of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    pub table: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl TableChange {
    pub fn new(table: &'static str, columns: &[(&'static str, Option<&'static str>)]) -> Self {
        Self {
            table,
            columns: columns
                .iter()
                .map(|&(column, default_literal)| ColumnSpec { table, column, default_literal })
                .collect(),
        }
    }
}

/// Columns whose type is widened to integer for the import and narrowed
/// back afterwards. Identifiers are unquoted; callers quote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChangeCatalog {
    tables: Vec<TableChange>,
}

const FALSE: Option<&str> = Some("false");

impl TableChangeCatalog {
    pub fn new(tables: Vec<TableChange>) -> Self {
        Self { tables }
    }

    /// Boolean columns of the Grafana schema
    pub fn grafana() -> Self {
        Self::new(vec![
            TableChange::new("alert", &[("silenced", None)]),
            TableChange::new("alert_configuration", &[("default", FALSE)]),
            TableChange::new("alert_configuration_history", &[("default", FALSE)]),
            TableChange::new("alert_rule", &[("is_paused", FALSE)]),
            TableChange::new("alert_rule_version", &[("is_paused", FALSE)]),
            TableChange::new(
                "alert_notification",
                &[
                    ("is_default", FALSE),
                    ("send_reminder", FALSE),
                    ("disable_resolve_message", FALSE),
                ],
            ),
            TableChange::new(
                "dashboard",
                &[("is_folder", FALSE), ("has_acl", FALSE), ("is_public", FALSE)],
            ),
            TableChange::new("dashboard_snapshot", &[("external", None)]),
            TableChange::new(
                "data_source",
                &[
                    ("basic_auth", None),
                    ("is_default", None),
                    ("read_only", None),
                    ("with_credentials", FALSE),
                ],
            ),
            TableChange::new("migration_log", &[("success", None)]),
            TableChange::new("plugin_setting", &[("enabled", None), ("pinned", None)]),
            TableChange::new("team_member", &[("external", None)]),
            TableChange::new("temp_user", &[("email_sent", None)]),
            TableChange::new(
                "user",
                &[
                    ("is_admin", None),
                    ("email_verified", None),
                    ("is_disabled", FALSE),
                    ("is_service_account", FALSE),
                ],
            ),
            TableChange::new("user_auth_token", &[("auth_token_seen", None)]),
            TableChange::new("role", &[("hidden", FALSE)]),
            TableChange::new("data_keys", &[("active", None)]),
            TableChange::new("api_key", &[("is_revoked", FALSE)]),
        ])
    }

    pub fn tables(&self) -> &[TableChange] {
        &self.tables
    }

    /// Every column, in catalog order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.tables.iter().flat_map(|t| t.columns.iter())
    }

    pub fn len(&self) -> usize {
        self.columns().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TableChangeCatalog {
    fn default() -> Self {
        Self::grafana()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_grafana_catalog_tables_unique() {
        let catalog = TableChangeCatalog::grafana();
        let names: HashSet<_> = catalog.tables().iter().map(|t| t.table).collect();
        assert_eq!(names.len(), catalog.tables().len());
    }

    #[test]
    fn test_column_specs_carry_their_table() {
        let catalog = TableChangeCatalog::grafana();
        for table in catalog.tables() {
            assert!(!table.columns.is_empty(), "{} has no columns", table.table);
            assert!(table.columns.iter().all(|c| c.table == table.table));
        }
    }

    #[test]
    fn test_user_table_defaults() {
        let catalog = TableChangeCatalog::grafana();
        let user: Vec<_> = catalog.columns().filter(|c| c.table == "user").collect();
        assert_eq!(user.len(), 4);
        assert_eq!(user[0].column, "is_admin");
        assert_eq!(user[0].default_literal, None);
        assert_eq!(user[2].column, "is_disabled");
        assert_eq!(user[2].default_literal, Some("false"));
    }

    #[test]
    fn test_reduced_catalog() {
        let catalog = TableChangeCatalog::new(vec![TableChange::new("flags", &[("on", FALSE)])]);
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
        assert!(TableChangeCatalog::new(vec![]).is_empty());
    }
}
