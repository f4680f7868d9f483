// Connections to the source and destination databases
pub mod source;
pub mod target;

#[cfg(test)]
pub mod testing;

pub use source::SourceDatabase;
pub use target::{PgTarget, SqlTarget, TextRow};
