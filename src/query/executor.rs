use crate::error::StatementErrorKind;
use crate::migration::prompt::ContinuePolicy;
use crate::session::SqlTarget;
use crate::translator::HexLiteralCodec;
use crate::types::{CoercionReport, TypeCoercionEngine};
use crate::{MigrateError, Result};
use tracing::{debug, info};

/// Statement the destination application creates on first start and which
/// collides with the dumped main org
const REMOVE_DEFAULT_ORG: &str = "DELETE FROM org WHERE id = 1";

/// Split a sanitized dump into statements on `;` + newline.
///
/// Terminators inside single-quoted literals or double-quoted identifiers do
/// not split. Returned statements carry no trailing `;` and blank fragments
/// are dropped.
pub fn split_statements(document: &str) -> Vec<&str> {
    let bytes = document.as_bytes();
    let mut statements = Vec::new();
    let mut in_literal = false;
    let mut in_ident = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' if !in_ident => in_literal = !in_literal,
            b'"' if !in_literal => in_ident = !in_ident,
            b';' if !in_literal && !in_ident => {
                let rest = &bytes[i + 1..];
                let newline = if rest.starts_with(b"\n") {
                    Some(1)
                } else if rest.starts_with(b"\r\n") {
                    Some(2)
                } else {
                    None
                };
                if let Some(len) = newline {
                    push_statement(&mut statements, &document[start..i]);
                    i += 1 + len;
                    start = i;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    let tail = document[start..].trim_end();
    push_statement(&mut statements, tail.strip_suffix(';').unwrap_or(tail));
    statements
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, fragment: &'a str) {
    let stmt = fragment.trim();
    if !stmt.is_empty() {
        statements.push(stmt);
    }
}

/// Counters for one pass over the dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Statements found in the document
    pub statements: usize,
    /// Statements the destination accepted, including recovered ones
    pub executed: usize,
    /// Statements skipped because the row already existed
    pub duplicates_skipped: usize,
    /// Statements that succeeded after the bytea rewrite
    pub recovered: usize,
}

/// Everything [`StatementExecutor::import`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub widen: CoercionReport,
    pub stats: ExecutionStats,
    pub narrow: CoercionReport,
}

/// Applies a sanitized dump to the destination, one statement at a time and
/// in dump order. There is no enclosing transaction; a failed run is fixed by
/// running it again, which relies on duplicate keys being skipped.
pub struct StatementExecutor<'a> {
    target: &'a dyn SqlTarget,
    engine: &'a TypeCoercionEngine,
    policy: &'a dyn ContinuePolicy,
}

impl<'a> StatementExecutor<'a> {
    pub fn new(
        target: &'a dyn SqlTarget,
        engine: &'a TypeCoercionEngine,
        policy: &'a dyn ContinuePolicy,
    ) -> Self {
        Self { target, engine, policy }
    }

    /// Widen boolean columns, run every statement, then narrow them back.
    /// Each coercion phase that reports drift is gated by the policy.
    pub async fn import(&self, document: &str) -> Result<ImportReport> {
        let mut widen = self.engine.widen(self.target).await?;
        self.remove_default_org(&mut widen).await?;
        self.gate(&widen).await?;

        let stats = self.run_statements(document).await?;

        let narrow = self.engine.narrow(self.target).await?;
        self.gate(&narrow).await?;

        Ok(ImportReport { widen, stats, narrow })
    }

    /// Execute the document's statements without any coercion around them
    pub async fn run_statements(&self, document: &str) -> Result<ExecutionStats> {
        let statements = split_statements(document);
        let mut stats = ExecutionStats { statements: statements.len(), ..Default::default() };
        info!("Importing {} statements", stats.statements);

        for stmt in statements {
            self.execute_one(stmt, &mut stats).await?;
        }

        info!(
            "Executed {} statements ({} duplicates skipped, {} recovered)",
            stats.executed, stats.duplicates_skipped, stats.recovered
        );
        Ok(stats)
    }

    async fn execute_one(&self, stmt: &str, stats: &mut ExecutionStats) -> Result<()> {
        let err = match self.target.execute(stmt).await {
            Ok(_) => {
                stats.executed += 1;
                return Ok(());
            }
            Err(e) => e,
        };

        match err.kind() {
            StatementErrorKind::DuplicateKey => {
                debug!("Skipping duplicate row: {}", err);
                stats.duplicates_skipped += 1;
                Ok(())
            }
            StatementErrorKind::DatatypeMismatch => {
                // Only a deferred blob decode can be repaired; any other
                // mismatch is a real schema difference
                let Some(rewritten) = HexLiteralCodec::rewrite_for_bytea(stmt) else {
                    return Err(MigrateError::statement(err, stmt));
                };
                debug!("Failed to import because of type issue ({}). Retrying as bytea", err);
                match self.target.execute(&rewritten).await {
                    Ok(_) => {
                        stats.executed += 1;
                        stats.recovered += 1;
                        Ok(())
                    }
                    // A re-run reaches the unique check only once the type is right
                    Err(retry) if retry.kind() == StatementErrorKind::DuplicateKey => {
                        stats.duplicates_skipped += 1;
                        Ok(())
                    }
                    Err(retry) => Err(MigrateError::statement(retry, rewritten)),
                }
            }
            StatementErrorKind::Missing | StatementErrorKind::Other => {
                Err(MigrateError::statement(err, stmt))
            }
        }
    }

    async fn remove_default_org(&self, widen: &mut CoercionReport) -> Result<()> {
        debug!("Executing: {}", REMOVE_DEFAULT_ORG);
        match self.target.execute(REMOVE_DEFAULT_ORG).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == StatementErrorKind::Missing => {
                debug!("{} {}", e, REMOVE_DEFAULT_ORG);
                widen.drifted.push("org".to_string());
                Ok(())
            }
            Err(e) => Err(MigrateError::statement(e, REMOVE_DEFAULT_ORG)),
        }
    }

    async fn gate(&self, report: &CoercionReport) -> Result<()> {
        let count = report.drift_count();
        if count > 0 && !self.policy.should_continue(report.phase, count).await {
            return Err(MigrateError::Aborted(format!(
                "{} phase reported {} missing tables/columns",
                report.phase, count
            )));
        }
        Ok(())
    }
}
