use crate::session::SqlTarget;
use crate::{MigrateError, Result};
use tracing::debug;

const RESET_HOME_DASHBOARD: &str = "UPDATE preferences SET home_dashboard_id = 0 WHERE org_id = 1";

const CHAR_TO_TEXT: [&str; 2] = [
    "ALTER TABLE tag ALTER COLUMN key TYPE text",
    "ALTER TABLE tag ALTER COLUMN value TYPE text",
];

/// Optional clean-ups run after the data is in place
pub struct PostMigrationFixups<'a> {
    target: &'a dyn SqlTarget,
}

impl<'a> PostMigrationFixups<'a> {
    pub fn new(target: &'a dyn SqlTarget) -> Self {
        Self { target }
    }

    /// Point the default org back at the built-in home dashboard
    pub async fn reset_home_dashboard(&self) -> Result<()> {
        self.run(RESET_HOME_DASHBOARD).await
    }

    /// Widen the legacy `char` columns of `tag` to `text`
    pub async fn change_char_to_text(&self) -> Result<()> {
        for stmt in CHAR_TO_TEXT {
            self.run(stmt).await?;
        }
        Ok(())
    }

    async fn run(&self, stmt: &str) -> Result<()> {
        debug!("Executing: {}", stmt);
        self.target
            .execute(stmt)
            .await
            .map_err(|e| MigrateError::statement(e, stmt))?;
        Ok(())
    }
}
