pub mod executor;

pub use executor::{split_statements, ExecutionStats, ImportReport, StatementExecutor};
