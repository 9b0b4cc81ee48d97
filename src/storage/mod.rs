//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - commits(sha1, authored_at, committed_at)
//! - modules(name, commit_id)
//! - classes(name, module_id, start_lineno, end_lineno)
//! - functions(name, module_id | class_id, start_lineno, end_lineno)
//! - attributes(name, module_id | class_id)

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, CommitTransaction, DbStats};
