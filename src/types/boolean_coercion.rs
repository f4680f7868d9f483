use crate::catalog::{quote_ident, ColumnSpec, TableChangeCatalog};
use crate::error::StatementErrorKind;
use crate::session::SqlTarget;
use crate::{MigrateError, Result};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionPhase {
    /// boolean -> integer, before the import
    Widen,
    /// integer -> boolean, after the import
    Narrow,
}

impl fmt::Display for CoercionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionPhase::Widen => write!(f, "widen"),
            CoercionPhase::Narrow => write!(f, "narrow"),
        }
    }
}

/// Outcome of one coercion phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionReport {
    pub phase: CoercionPhase,
    /// Columns changed successfully
    pub applied: usize,
    /// `table.column` entries missing from the destination schema
    pub drifted: Vec<String>,
}

impl CoercionReport {
    pub fn drift_count(&self) -> usize {
        self.drifted.len()
    }
}

/// Moves the catalog's boolean columns to integer and back.
///
/// SQLite dumps booleans as 0/1 which a Postgres boolean column rejects, so
/// the columns are widened for the import and narrowed once the data is in.
/// A default is dropped before widening and restored after narrowing since a
/// boolean default cannot survive the type change.
pub struct TypeCoercionEngine {
    catalog: TableChangeCatalog,
}

impl TypeCoercionEngine {
    pub fn new(catalog: TableChangeCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TableChangeCatalog {
        &self.catalog
    }

    /// Statements that widen one column, in execution order
    pub fn widen_statements(column: &ColumnSpec) -> Vec<String> {
        let table = quote_ident(column.table);
        let name = quote_ident(column.column);
        let mut statements = Vec::with_capacity(2);
        if column.default_literal.is_some() {
            statements.push(format!("ALTER TABLE {table} ALTER COLUMN {name} DROP DEFAULT"));
        }
        statements.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {name} TYPE integer USING {name}::integer"
        ));
        statements
    }

    /// Statements that narrow one column, in execution order. The type must
    /// change before the default is restored.
    pub fn narrow_statements(column: &ColumnSpec) -> Vec<String> {
        let table = quote_ident(column.table);
        let name = quote_ident(column.column);
        let mut statements = Vec::with_capacity(2);
        statements.push(format!(
            "ALTER TABLE {table} ALTER COLUMN {name} TYPE boolean USING \
             CASE WHEN {name} = 0 THEN FALSE WHEN {name} = 1 THEN TRUE ELSE NULL END"
        ));
        if let Some(default) = column.default_literal {
            statements.push(format!("ALTER TABLE {table} ALTER COLUMN {name} SET DEFAULT {default}"));
        }
        statements
    }

    pub async fn widen(&self, target: &dyn SqlTarget) -> Result<CoercionReport> {
        self.run(CoercionPhase::Widen, target).await
    }

    pub async fn narrow(&self, target: &dyn SqlTarget) -> Result<CoercionReport> {
        self.run(CoercionPhase::Narrow, target).await
    }

    async fn run(&self, phase: CoercionPhase, target: &dyn SqlTarget) -> Result<CoercionReport> {
        let mut report = CoercionReport { phase, applied: 0, drifted: Vec::new() };

        'columns: for column in self.catalog.columns() {
            let statements = match phase {
                CoercionPhase::Widen => Self::widen_statements(column),
                CoercionPhase::Narrow => Self::narrow_statements(column),
            };

            for stmt in statements {
                debug!("Executing: {}", stmt);
                if let Err(e) = target.execute(&stmt).await {
                    if e.kind() == StatementErrorKind::Missing {
                        debug!(
                            "Column/table doesn't exist. This is usually fine to ignore: {} {}",
                            e, stmt
                        );
                        report.drifted.push(format!("{}.{}", column.table, column.column));
                        continue 'columns;
                    }
                    warn!("{} {}", e, stmt);
                    return Err(MigrateError::statement(e, stmt));
                }
            }
            report.applied += 1;
        }

        info!(
            "Boolean {} phase: {} columns changed, {} missing from destination",
            phase,
            report.applied,
            report.drift_count()
        );
        Ok(report)
    }
}
