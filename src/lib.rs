//! # Strata - Historical index of code structure
//!
//! Walks a git repository's history oldest-first and records, for every
//! commit, the modules, classes, functions and attributes that existed in
//! its Python sources.
//!
//! Strata provides:
//! - A history walker driving one storage transaction per commit
//! - An iterative tree walk over each commit's file tree
//! - Tree-sitter based structural extraction of Python files
//! - SQLite-backed append-only storage of the extracted records

pub mod model;
pub mod storage;
pub mod walker;
pub mod analyzer;
pub mod history;
pub mod indexer;
pub mod ignore;
pub mod output;
pub mod config;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use model::{CommitRecord, Owner};
pub use storage::SqliteStore;
pub use walker::{SourceFile, SourceFiles, SourceFilter};
pub use analyzer::{FileOutcome, ModuleOutline, PythonAnalyzer, SkipReason};
pub use history::GitHistory;
pub use indexer::{IndexStats, Indexer};

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Strata operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Repository error: {0}")]
    Repository(#[from] git2::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Schema mismatch: table `{table}` has no column `{column}`")]
    SchemaMismatch { table: String, column: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
