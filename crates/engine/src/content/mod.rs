mod compiler;
mod database;

pub use compiler::{compile_def_database, ContentCompileError, ContentErrorCode, SourceLocation};
pub use database::{DefDatabase, EntityArchetype, EntityDefId, EntityKind};
