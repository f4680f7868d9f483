use super::dump::SqliteDumper;
use super::fixups::PostMigrationFixups;
use super::folders::{FolderMapping, FolderRelationshipFixer};
use super::prompt::ContinuePolicy;
use super::sequences::{SequenceMode, SequenceReconciler};
use crate::catalog::TableChangeCatalog;
use crate::query::{ImportReport, StatementExecutor};
use crate::session::{PgTarget, SourceDatabase, SqlTarget};
use crate::translator::{self, HexDecodeMode};
use crate::types::TypeCoercionEngine;
use crate::Result;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// File name of the sanitized dump inside the staging directory
pub const STAGED_DUMP_NAME: &str = "grafana.sql";

/// Everything one migration run needs to know
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub sqlite_file: PathBuf,
    pub connection_string: String,
    pub dump_dir: PathBuf,
    pub hex_mode: HexDecodeMode,
    pub sequence_mode: SequenceMode,
    pub reset_home_dashboard: bool,
    pub change_char_to_text: bool,
    pub sqlite_bin: String,
    pub dump_timeout: Duration,
}

/// The sanitized dump as written to the staging directory
#[derive(Debug, Clone)]
pub struct StagedDump {
    pub path: PathBuf,
    pub sha256: String,
    pub document: String,
}

/// What happened on the destination
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub import: ImportReport,
    pub sequences_reset: usize,
    pub dashboards_moved: usize,
}

#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub staged: StagedDump,
    pub applied: ApplyReport,
}

/// SQLite file to Postgres, one stage after the other
pub struct MigrationPipeline {
    options: MigrationOptions,
    engine: TypeCoercionEngine,
    policy: Box<dyn ContinuePolicy>,
}

impl MigrationPipeline {
    pub fn new(options: MigrationOptions, policy: Box<dyn ContinuePolicy>) -> Self {
        Self {
            options,
            engine: TypeCoercionEngine::new(TableChangeCatalog::grafana()),
            policy,
        }
    }

    /// Replace the boolean column catalog
    pub fn with_catalog(mut self, catalog: TableChangeCatalog) -> Self {
        self.engine = TypeCoercionEngine::new(catalog);
        self
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        info!("SQLite file: {}", self.options.sqlite_file.display());
        info!("Dump directory: {}", self.options.dump_dir.display());

        let dumper = SqliteDumper::new(&self.options.sqlite_bin, self.options.dump_timeout);
        let version = dumper.check_available().await?;
        info!("{} command exists ({})", self.options.sqlite_bin, version);

        let raw = dumper.dump(&self.options.sqlite_file).await?;
        info!("SQLite database dumped ({} bytes)", raw.len());

        let staged = self.stage_dump(&raw).await?;
        info!("Sanitized dump written to {} (sha256 {})", staged.path.display(), staged.sha256);

        // Read before the import; ids in the destination are reissued
        let mapping = SourceDatabase::open(&self.options.sqlite_file)?.folder_mapping()?;
        info!("Got folder/dashboard relationship for {} dashboards from SQLite", mapping.len());

        let target = PgTarget::connect(&self.options.connection_string).await?;
        let applied = self.apply(&target, &staged.document, &mapping).await?;

        Ok(MigrationReport { staged, applied })
    }

    /// Sanitize a raw dump and write it to the staging directory
    pub async fn stage_dump(&self, raw: &str) -> Result<StagedDump> {
        let document = translator::prepare_dump(raw, self.options.hex_mode)?;
        info!("Dump sanitized, blob literals converted ({:?})", self.options.hex_mode);

        let path = self.options.dump_dir.join(STAGED_DUMP_NAME);
        tokio::fs::write(&path, document.as_bytes()).await?;
        let sha256 = format!("{:x}", Sha256::digest(document.as_bytes()));

        Ok(StagedDump { path, sha256, document })
    }

    /// Import a sanitized dump into `target` and repair what the import
    /// cannot carry over
    pub async fn apply(
        &self,
        target: &dyn SqlTarget,
        document: &str,
        mapping: &FolderMapping,
    ) -> Result<ApplyReport> {
        let executor = StatementExecutor::new(target, &self.engine, self.policy.as_ref());
        let import = executor.import(document).await?;
        info!("Imported dump file to Postgres");

        let sequences_reset = SequenceReconciler::new(target)
            .reconcile(&self.options.sequence_mode)
            .await?;
        info!("Sequences reset");

        let dashboards_moved = FolderRelationshipFixer::new(target).fix(mapping).await?;
        info!("Folder ids fixed ({} dashboards moved)", dashboards_moved);

        let fixups = PostMigrationFixups::new(target);
        if self.options.reset_home_dashboard {
            fixups.reset_home_dashboard().await?;
            info!("Home dashboard was changed to default");
        }
        if self.options.change_char_to_text {
            fixups.change_char_to_text().await?;
            info!("CHAR type was converted to TEXT");
        }

        Ok(ApplyReport { import, sequences_reset, dashboards_moved })
    }
}
