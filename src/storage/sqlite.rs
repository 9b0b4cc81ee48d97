//! SQLite storage implementation

use std::path::Path;
use chrono::{DateTime, FixedOffset};
use rusqlite::{Connection, Transaction, params};
use crate::{Result, Error};
use crate::model::{
    AttributeId, ClassId, CommitId, CommitRecord, FunctionId, ModuleId, Owner, StoredAttribute,
    StoredClass, StoredCommit, StoredFunction, StoredModule,
};
use super::schema;

/// SQLite-backed storage for the structural index
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    ///
    /// Safe to run against an existing database as long as every table
    /// carries the columns listed in [`schema::REQUIRED_COLUMNS`].
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for stmt in schema::table_statements() {
            self.conn.execute(stmt, [])?;
        }
        self.verify_schema()?;
        for stmt in schema::CREATE_INDEXES {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn verify_schema(&self) -> Result<()> {
        for (table, required) in schema::REQUIRED_COLUMNS {
            let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", table))?;
            let columns: Vec<String> = stmt
                .query_map([], |row| row.get(1))?
                .collect::<rusqlite::Result<_>>()?;

            if let Some(missing) = required.iter().find(|c| !columns.iter().any(|have| have == *c)) {
                return Err(Error::SchemaMismatch {
                    table: table.to_string(),
                    column: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    // ========== Unit of Work ==========

    /// Begin the transaction that will hold one commit's records.
    ///
    /// Nothing is visible to other readers until [`CommitTransaction::commit`];
    /// dropping the transaction rolls it back.
    pub fn begin(&mut self) -> Result<CommitTransaction<'_>> {
        let tx = self.conn.transaction()?;
        Ok(CommitTransaction { tx })
    }

    // ========== Read Operations ==========

    /// All commits in insertion order
    pub fn commits(&self) -> Result<Vec<StoredCommit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sha1, authored_at, committed_at FROM commits ORDER BY id"
        )?;

        let commits = stmt
            .query_map([], |row| self.row_to_commit(row))?
            .collect::<rusqlite::Result<_>>()?;

        Ok(commits)
    }

    /// Modules of a commit, in insertion order
    pub fn modules_in_commit(&self, commit: CommitId) -> Result<Vec<StoredModule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, commit_id FROM modules WHERE commit_id = ?1 ORDER BY id"
        )?;

        let modules = stmt
            .query_map([commit.0], |row| {
                Ok(StoredModule {
                    id: ModuleId(row.get(0)?),
                    name: row.get(1)?,
                    commit: CommitId(row.get(2)?),
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(modules)
    }

    /// Classes of a module, in insertion order
    pub fn classes_in_module(&self, module: ModuleId) -> Result<Vec<StoredClass>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, module_id, start_lineno, end_lineno FROM classes WHERE module_id = ?1 ORDER BY id"
        )?;

        let classes = stmt
            .query_map([module.0], |row| {
                Ok(StoredClass {
                    id: ClassId(row.get(0)?),
                    name: row.get(1)?,
                    module: ModuleId(row.get(2)?),
                    start_lineno: row.get(3)?,
                    end_lineno: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(classes)
    }

    /// Functions owned by a module or a class
    pub fn functions_owned_by(&self, owner: Owner) -> Result<Vec<StoredFunction>> {
        let sql = match owner {
            Owner::Module(_) => {
                "SELECT id, name, module_id, class_id, start_lineno, end_lineno
                 FROM functions WHERE module_id = ?1 ORDER BY id"
            }
            Owner::Class(_) => {
                "SELECT id, name, module_id, class_id, start_lineno, end_lineno
                 FROM functions WHERE class_id = ?1 ORDER BY id"
            }
        };

        let mut stmt = self.conn.prepare(sql)?;
        let functions = stmt
            .query_map([owner_key(owner)], |row| self.row_to_function(row))?
            .collect::<rusqlite::Result<_>>()?;

        Ok(functions)
    }

    /// Attributes owned by a module or a class
    pub fn attributes_owned_by(&self, owner: Owner) -> Result<Vec<StoredAttribute>> {
        let sql = match owner {
            Owner::Module(_) => {
                "SELECT id, name, module_id, class_id FROM attributes WHERE module_id = ?1 ORDER BY id"
            }
            Owner::Class(_) => {
                "SELECT id, name, module_id, class_id FROM attributes WHERE class_id = ?1 ORDER BY id"
            }
        };

        let mut stmt = self.conn.prepare(sql)?;
        let attributes = stmt
            .query_map([owner_key(owner)], |row| {
                Ok(StoredAttribute {
                    id: AttributeId(row.get(0)?),
                    name: row.get(1)?,
                    owner: owner_from_row(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(attributes)
    }

    /// Count rows of one table
    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            commits: self.count("commits")?,
            modules: self.count("modules")?,
            classes: self.count("classes")?,
            functions: self.count("functions")?,
            attributes: self.count("attributes")?,
        })
    }

    /// Helper to convert a row to a StoredCommit
    fn row_to_commit(&self, row: &rusqlite::Row) -> rusqlite::Result<StoredCommit> {
        let authored: String = row.get(2)?;
        let committed: String = row.get(3)?;

        Ok(StoredCommit {
            id: CommitId(row.get(0)?),
            sha1: row.get(1)?,
            authored_at: parse_timestamp(2, &authored)?,
            committed_at: parse_timestamp(3, &committed)?,
        })
    }

    /// Helper to convert a row to a StoredFunction
    fn row_to_function(&self, row: &rusqlite::Row) -> rusqlite::Result<StoredFunction> {
        Ok(StoredFunction {
            id: FunctionId(row.get(0)?),
            name: row.get(1)?,
            owner: owner_from_row(row, 2)?,
            start_lineno: row.get(4)?,
            end_lineno: row.get(5)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn owner_key(owner: Owner) -> i64 {
    match owner {
        Owner::Module(id) => id.0,
        Owner::Class(id) => id.0,
    }
}

fn owner_from_row(row: &rusqlite::Row, first: usize) -> rusqlite::Result<Owner> {
    let module_id: Option<i64> = row.get(first)?;
    let class_id: Option<i64> = row.get(first + 1)?;
    Owner::from_columns(module_id, class_id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(first, rusqlite::types::Type::Integer, Box::new(e))
    })
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// One commit's worth of inserts.
///
/// Wraps a SQLite transaction; the commit and everything attached to it
/// become visible together, or not at all.
pub struct CommitTransaction<'a> {
    tx: Transaction<'a>,
}

impl CommitTransaction<'_> {
    /// Insert a commit record
    pub fn insert_commit(&self, commit: &CommitRecord) -> Result<CommitId> {
        self.tx.execute(
            "INSERT INTO commits (sha1, authored_at, committed_at) VALUES (?1, ?2, ?3)",
            params![
                commit.sha1,
                commit.authored_at.to_rfc3339(),
                commit.committed_at.to_rfc3339(),
            ],
        )?;
        Ok(CommitId(self.tx.last_insert_rowid()))
    }

    /// Insert a module owned by a commit
    pub fn insert_module(&self, commit: CommitId, name: &str) -> Result<ModuleId> {
        self.tx.execute(
            "INSERT INTO modules (name, commit_id) VALUES (?1, ?2)",
            params![name, commit.0],
        )?;
        Ok(ModuleId(self.tx.last_insert_rowid()))
    }

    /// Insert a class owned by a module
    pub fn insert_class(&self, module: ModuleId, name: &str, start_lineno: u32, end_lineno: u32) -> Result<ClassId> {
        self.tx.execute(
            r#"
            INSERT INTO classes (name, module_id, start_lineno, end_lineno)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![name, module.0, start_lineno, end_lineno],
        )?;
        Ok(ClassId(self.tx.last_insert_rowid()))
    }

    /// Insert a function owned by a module (top-level) or a class (method)
    pub fn insert_function(&self, owner: Owner, name: &str, start_lineno: u32, end_lineno: u32) -> Result<FunctionId> {
        let (module_id, class_id) = owner.columns();
        self.tx.execute(
            r#"
            INSERT INTO functions (name, module_id, class_id, start_lineno, end_lineno)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![name, module_id, class_id, start_lineno, end_lineno],
        )?;
        Ok(FunctionId(self.tx.last_insert_rowid()))
    }

    /// Insert an attribute owned by a module (name binding) or a class (instance attribute)
    pub fn insert_attribute(&self, owner: Owner, name: &str) -> Result<AttributeId> {
        let (module_id, class_id) = owner.columns();
        self.tx.execute(
            "INSERT INTO attributes (name, module_id, class_id) VALUES (?1, ?2, ?3)",
            params![name, module_id, class_id],
        )?;
        Ok(AttributeId(self.tx.last_insert_rowid()))
    }

    /// Commit the transaction
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DbStats {
    pub commits: usize,
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub attributes: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Commits: {}", self.commits)?;
        writeln!(f, "  Modules: {}", self.modules)?;
        writeln!(f, "  Classes: {}", self.classes)?;
        writeln!(f, "  Functions: {}", self.functions)?;
        writeln!(f, "  Attributes: {}", self.attributes)
    }
}
