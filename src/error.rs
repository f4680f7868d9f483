use std::fmt;

/// SQLSTATE: unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE: datatype_mismatch
pub const DATATYPE_MISMATCH: &str = "42804";
/// SQLSTATE: undefined_table
pub const UNDEFINED_TABLE: &str = "42P01";
/// SQLSTATE: undefined_column
pub const UNDEFINED_COLUMN: &str = "42703";
/// SQLSTATE: undefined_object
pub const UNDEFINED_OBJECT: &str = "42704";

/// How the import treats a failed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementErrorKind {
    /// Row already present, safe to skip
    DuplicateKey,
    /// Value type does not fit the column. Recoverable when the statement
    /// carries a deferred blob decode aimed at a bytea column.
    DatatypeMismatch,
    /// Table, column or sequence absent from the destination schema
    Missing,
    Other,
}

/// Error reported by the destination for a single statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementError {
    /// SQLSTATE code when the server supplied one
    pub code: Option<String>,
    pub message: String,
}

impl StatementError {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Error raised below the protocol level (socket closed, etc)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn kind(&self) -> StatementErrorKind {
        match self.code.as_deref() {
            Some(UNIQUE_VIOLATION) => StatementErrorKind::DuplicateKey,
            Some(DATATYPE_MISMATCH) => StatementErrorKind::DatatypeMismatch,
            Some(UNDEFINED_TABLE) | Some(UNDEFINED_COLUMN) | Some(UNDEFINED_OBJECT) => {
                StatementErrorKind::Missing
            }
            Some(_) => StatementErrorKind::Other,
            // No SQLSTATE to go by, only the (English) message
            None => self.kind_from_message(),
        }
    }

    fn kind_from_message(&self) -> StatementErrorKind {
        if self.message.contains("duplicate key") {
            StatementErrorKind::DuplicateKey
        } else if self.message.contains("is of type bytea but expression is of type text") {
            StatementErrorKind::DatatypeMismatch
        } else if self.message.contains("does not exist") {
            StatementErrorKind::Missing
        } else {
            StatementErrorKind::Other
        }
    }
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (SQLSTATE {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for StatementError {}

impl From<tokio_postgres::Error> for StatementError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => Self::new(Some(db_err.code().code()), db_err.message()),
            None => Self::transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_sqlstate() {
        let dup = StatementError::new(Some("23505"), "duplicate key value violates unique constraint \"org_pkey\"");
        assert_eq!(dup.kind(), StatementErrorKind::DuplicateKey);

        let missing = StatementError::new(Some("42703"), "column \"is_public\" of relation \"dashboard\" does not exist");
        assert_eq!(missing.kind(), StatementErrorKind::Missing);

        let table = StatementError::new(Some("42P01"), "relation \"alert\" does not exist");
        assert_eq!(table.kind(), StatementErrorKind::Missing);
    }

    #[test]
    fn test_datatype_mismatch_classified_by_code() {
        let bytea = StatementError::new(
            Some("42804"),
            "column \"encrypted_data\" is of type bytea but expression is of type text",
        );
        assert_eq!(bytea.kind(), StatementErrorKind::DatatypeMismatch);

        // Server running with lc_messages = de_DE
        let localized = StatementError::new(
            Some("42804"),
            "Spalte »encrypted_data« hat Typ bytea, aber der Ausdruck hat Typ text",
        );
        assert_eq!(localized.kind(), StatementErrorKind::DatatypeMismatch);
    }

    #[test]
    fn test_code_wins_over_message() {
        let err = StatementError::new(Some("42601"), "duplicate key in syntax error text");
        assert_eq!(err.kind(), StatementErrorKind::Other);
    }

    #[test]
    fn test_classify_by_message_without_code() {
        assert_eq!(
            StatementError::transport("ERROR: duplicate key value").kind(),
            StatementErrorKind::DuplicateKey
        );
        assert_eq!(
            StatementError::transport("column \"data\" is of type bytea but expression is of type text").kind(),
            StatementErrorKind::DatatypeMismatch
        );
        assert_eq!(
            StatementError::transport("connection closed").kind(),
            StatementErrorKind::Other
        );
    }

    #[test]
    fn test_display_includes_code() {
        let err = StatementError::new(Some("42601"), "syntax error at or near \"X\"");
        assert_eq!(err.to_string(), "syntax error at or near \"X\" (SQLSTATE 42601)");
    }
}
