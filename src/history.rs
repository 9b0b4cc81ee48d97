//! Commit history traversal
//!
//! Yields every commit reachable from a starting reference exactly once,
//! parents before children, oldest first.

use crate::Result;
use git2::{Commit, Repository, Revwalk, Sort};
use std::path::Path;

/// Reference the walk starts from when none is given
pub const DEFAULT_START: &str = "HEAD";

/// Git history wrapper using git2
pub struct GitHistory {
    repo: Repository,
}

impl GitHistory {
    /// Open the repository at `path`.
    ///
    /// The path must be the repository itself (working tree or bare
    /// directory); parent directories are not searched.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path)?;
        Ok(Self { repo })
    }

    /// The underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Walk the history reachable from `start` (default `HEAD`), oldest first.
    ///
    /// The start reference is resolved eagerly, so a missing or unborn start
    /// fails here, before any commit is yielded.
    pub fn walk(&self, start: Option<&str>) -> Result<CommitWalk<'_>> {
        let reference = start.unwrap_or(DEFAULT_START);
        let start = self.repo.revparse_single(reference)?.peel_to_commit()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;
        revwalk.push(start.id())?;

        tracing::debug!("Walking history from {} ({})", reference, start.id());
        Ok(CommitWalk { repo: &self.repo, revwalk })
    }
}

/// Iterator over the commits of a history walk
pub struct CommitWalk<'r> {
    repo: &'r Repository,
    revwalk: Revwalk<'r>,
}

impl<'r> Iterator for CommitWalk<'r> {
    type Item = Result<Commit<'r>>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = match self.revwalk.next()? {
            Ok(oid) => oid,
            Err(e) => return Some(Err(e.into())),
        };
        Some(self.repo.find_commit(oid).map_err(Into::into))
    }
}
