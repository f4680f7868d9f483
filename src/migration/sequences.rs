use crate::catalog::{quote_ident, quote_literal};
use crate::error::StatementErrorKind;
use crate::session::target::{row_text, SqlTarget};
use crate::{MigrateError, Result};
use tracing::{debug, info};

/// Every sequence owned by a table column, as quoted identifiers
const DISCOVER_SEQUENCES: &str = r#"
SELECT quote_ident(sn.nspname) || '.' || quote_ident(s.relname),
       quote_ident(tn.nspname) || '.' || quote_ident(t.relname),
       quote_ident(a.attname)
FROM pg_class s
JOIN pg_namespace sn ON sn.oid = s.relnamespace
JOIN pg_depend d ON d.objid = s.oid
    AND d.classid = 'pg_class'::regclass
    AND d.refclassid = 'pg_class'::regclass
    AND d.deptype IN ('a', 'i')
JOIN pg_class t ON t.oid = d.refobjid
JOIN pg_namespace tn ON tn.oid = t.relnamespace
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = d.refobjsubid
WHERE s.relkind = 'S'
  AND tn.nspname NOT IN ('pg_catalog', 'information_schema')
ORDER BY s.relname"#;

/// Name Grafana's Postgres schema gives the `user` sequence after a table rename
const USER_SEQUENCE_FALLBACK: &str = "user_id_seq1";

/// A sequence and the column it feeds. All parts are already quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceBinding {
    pub sequence: String,
    pub table: String,
    pub column: String,
}

impl SequenceBinding {
    /// Binding for `<table>_id_seq` on `<table>.id`
    pub fn conventional(table: &str) -> Self {
        Self::named(table, &format!("{table}_id_seq"))
    }

    fn named(table: &str, sequence: &str) -> Self {
        Self {
            sequence: quote_ident(sequence),
            table: quote_ident(table),
            column: quote_ident("id"),
        }
    }

    /// Leaves the sequence's next value at `max(column) + 1`, or 1 for an
    /// empty table
    pub fn setval_statement(&self) -> String {
        format!(
            "SELECT setval({}, COALESCE(MAX({}), 0) + 1, false) FROM {}",
            quote_literal(&self.sequence),
            self.column,
            self.table
        )
    }
}

/// Which sequences get reset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SequenceMode {
    /// Every sequence the destination catalog ties to a table column
    #[default]
    Discover,
    /// `<table>_id_seq` for each listed table
    Tables(Vec<String>),
}

/// Moves id sequences past the imported rows so the application's own
/// inserts do not collide with them
pub struct SequenceReconciler<'a> {
    target: &'a dyn SqlTarget,
}

impl<'a> SequenceReconciler<'a> {
    pub fn new(target: &'a dyn SqlTarget) -> Self {
        Self { target }
    }

    /// Returns the number of sequences reset
    pub async fn reconcile(&self, mode: &SequenceMode) -> Result<usize> {
        let count = match mode {
            SequenceMode::Discover => {
                let bindings = self.discover().await?;
                for binding in &bindings {
                    self.reset(binding).await?;
                }
                bindings.len()
            }
            SequenceMode::Tables(tables) => {
                for table in tables {
                    self.reset_table(table).await?;
                }
                tables.len()
            }
        };
        info!("Reset {} sequences", count);
        Ok(count)
    }

    pub async fn discover(&self) -> Result<Vec<SequenceBinding>> {
        debug!("Running query to find all table sequences");
        let rows = self
            .target
            .query(DISCOVER_SEQUENCES)
            .await
            .map_err(|e| MigrateError::statement(e, DISCOVER_SEQUENCES))?;

        rows.iter()
            .map(|row| -> Result<SequenceBinding> {
                let field = |idx: usize| -> Result<String> {
                    row_text(row, idx)?.ok_or_else(|| {
                        MigrateError::Schema(format!("sequence discovery returned NULL in column {idx}"))
                    })
                };
                Ok(SequenceBinding { sequence: field(0)?, table: field(1)?, column: field(2)? })
            })
            .collect()
    }

    async fn reset(&self, binding: &SequenceBinding) -> Result<()> {
        let stmt = binding.setval_statement();
        debug!("Executing: {}", stmt);
        self.target
            .query(&stmt)
            .await
            .map_err(|e| MigrateError::statement(e, stmt.clone()))?;
        Ok(())
    }

    async fn reset_table(&self, table: &str) -> Result<()> {
        let binding = SequenceBinding::conventional(table);
        let stmt = binding.setval_statement();
        debug!("Executing: {}", stmt);
        let err = match self.target.query(&stmt).await {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };

        if table == "user" && err.kind() == StatementErrorKind::Missing {
            debug!("{}, retrying with {}", err, USER_SEQUENCE_FALLBACK);
            return self.reset(&SequenceBinding::named(table, USER_SEQUENCE_FALLBACK)).await;
        }
        Err(MigrateError::statement(err, stmt))
    }
}
