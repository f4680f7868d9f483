pub mod dump;
pub mod fixups;
pub mod folders;
pub mod pipeline;
pub mod prompt;
pub mod sequences;

pub use dump::SqliteDumper;
pub use fixups::PostMigrationFixups;
pub use folders::{FolderMapping, FolderRelationshipFixer, SlugIdIndex};
pub use pipeline::{ApplyReport, MigrationOptions, MigrationPipeline, MigrationReport, StagedDump};
pub use prompt::{ContinuePolicy, ErrorPolicy};
pub use sequences::{SequenceBinding, SequenceMode, SequenceReconciler};
