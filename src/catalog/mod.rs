pub mod table_changes;

pub use table_changes::{ColumnSpec, TableChange, TableChangeCatalog};

/// Quote an identifier for Postgres, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal for Postgres (standard_conforming_strings on)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
