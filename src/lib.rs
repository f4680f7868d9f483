pub mod catalog;
pub mod config;
pub mod error;
pub mod migration;
pub mod query;
pub mod session;
pub mod translator;
pub mod types;

use std::time::Duration;
use thiserror::Error;

pub use error::{StatementError, StatementErrorKind};

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Postgres connection error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{error} {statement}")]
    Statement {
        error: StatementError,
        statement: String,
    },

    #[error("Failed to decode hex literal {literal}: {reason}")]
    HexDecode { literal: String, reason: String },

    #[error("Dump tool error: {0}")]
    DumpTool(String),

    #[error("Dump tool did not finish within {0:?}")]
    DumpTimeout(Duration),

    #[error("Unexpected result from destination: {0}")]
    Schema(String),

    #[error("Stopping migration at user's request ({0})")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

impl MigrateError {
    /// Attach the offending statement so the operator can reproduce it
    pub fn statement(error: StatementError, statement: impl Into<String>) -> Self {
        MigrateError::Statement {
            error,
            statement: statement.into(),
        }
    }
}
