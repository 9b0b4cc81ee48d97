//! Record types for the structural index
//!
//! Five record kinds make up the index:
//! - `Commit`: one visited commit, identified by its raw object id
//! - `Module`: one source file as it existed in one commit
//! - `Class`: a class defined at the top level of a module
//! - `Function`: a top-level function or a method of a class
//! - `Attribute`: a module-level name binding or a class instance attribute
//!
//! Records are append-only. Nothing here is ever updated after insertion.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::fmt;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Row id of a stored commit
    CommitId
);
row_id!(
    /// Row id of a stored module
    ModuleId
);
row_id!(
    /// Row id of a stored class
    ClassId
);
row_id!(
    /// Row id of a stored function
    FunctionId
);
row_id!(
    /// Row id of a stored attribute
    AttributeId
);

/// The single owner of a function or attribute.
///
/// A function is either a top-level function of a module or a method of a
/// class; an attribute is either a module-level binding or an instance
/// attribute of a class. Never both, never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Module(ModuleId),
    Class(ClassId),
}

impl Owner {
    /// Split into the `(module_id, class_id)` column pair
    pub fn columns(&self) -> (Option<i64>, Option<i64>) {
        match self {
            Owner::Module(id) => (Some(id.0), None),
            Owner::Class(id) => (None, Some(id.0)),
        }
    }

    /// Rebuild an owner from the `(module_id, class_id)` column pair
    pub fn from_columns(module_id: Option<i64>, class_id: Option<i64>) -> Result<Self> {
        match (module_id, class_id) {
            (Some(m), None) => Ok(Owner::Module(ModuleId(m))),
            (None, Some(c)) => Ok(Owner::Class(ClassId(c))),
            (m, c) => Err(Error::InvalidRecord(format!(
                "owner must be exactly one of module/class, got module={:?} class={:?}",
                m, c
            ))),
        }
    }
}

/// A commit about to be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Raw object id bytes (20 bytes for SHA-1 repositories)
    pub sha1: Vec<u8>,
    /// Author timestamp, in the author's offset
    pub authored_at: DateTime<FixedOffset>,
    /// Committer timestamp, in the committer's offset
    pub committed_at: DateTime<FixedOffset>,
}

impl CommitRecord {
    /// Build the record for a git commit
    pub fn from_git(commit: &git2::Commit<'_>) -> Result<Self> {
        Ok(Self {
            sha1: commit.id().as_bytes().to_vec(),
            authored_at: git_time(commit.author().when())?,
            committed_at: git_time(commit.time())?,
        })
    }
}

/// Convert a git timestamp (seconds + minute offset) to a zoned datetime
pub fn git_time(time: git2::Time) -> Result<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).ok_or_else(|| {
        Error::InvalidRecord(format!("timezone offset out of range: {} minutes", time.offset_minutes()))
    })?;
    let utc = DateTime::from_timestamp(time.seconds(), 0)
        .ok_or_else(|| Error::InvalidRecord(format!("timestamp out of range: {}", time.seconds())))?;
    Ok(utc.with_timezone(&offset))
}

/// A commit read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCommit {
    pub id: CommitId,
    pub sha1: Vec<u8>,
    pub authored_at: DateTime<FixedOffset>,
    pub committed_at: DateTime<FixedOffset>,
}

/// A module read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredModule {
    pub id: ModuleId,
    pub name: String,
    pub commit: CommitId,
}

/// A class read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredClass {
    pub id: ClassId,
    pub name: String,
    pub module: ModuleId,
    pub start_lineno: u32,
    pub end_lineno: u32,
}

/// A function read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFunction {
    pub id: FunctionId,
    pub name: String,
    pub owner: Owner,
    pub start_lineno: u32,
    pub end_lineno: u32,
}

/// An attribute read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttribute {
    pub id: AttributeId,
    pub name: String,
    pub owner: Owner,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_columns() {
        assert_eq!(Owner::Module(ModuleId(3)).columns(), (Some(3), None));
        assert_eq!(Owner::Class(ClassId(7)).columns(), (None, Some(7)));
        assert_eq!(Owner::from_columns(Some(3), None).unwrap(), Owner::Module(ModuleId(3)));
        assert_eq!(Owner::from_columns(None, Some(7)).unwrap(), Owner::Class(ClassId(7)));
    }

    #[test]
    fn test_owner_rejects_both_or_neither() {
        assert!(Owner::from_columns(Some(1), Some(2)).is_err());
        assert!(Owner::from_columns(None, None).is_err());
    }

    #[test]
    fn test_git_time_keeps_offset() {
        let time = git2::Time::new(1_700_000_000, -300);
        let dt = git_time(time).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.offset().local_minus_utc(), -300 * 60);
    }
}
