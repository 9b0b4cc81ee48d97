//! Repository tree walk
//!
//! Enumerates the analyzable source files of one commit's tree with an
//! explicit worklist of `(path, tree)` pairs. Files of a directory are
//! yielded in entry order before any of its subdirectories are opened;
//! subdirectories are taken from the top of the stack.

use crate::ignore::IgnoreFilter;
use crate::Result;
use git2::{ObjectType, Oid, Repository, Tree};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Default extension of analyzable source files
pub const DEFAULT_EXTENSIONS: &[&str] = &["py"];

/// Decides which tree entries are worth analyzing
pub struct SourceFilter {
    extensions: Vec<String>,
    excludes: IgnoreFilter,
}

impl SourceFilter {
    /// Create a filter from file extensions (without the dot) and exclude patterns
    pub fn new(extensions: &[String], excludes: &[String]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.trim_start_matches('.').to_string()).collect(),
            excludes: IgnoreFilter::new(excludes),
        }
    }

    /// Check whether a file name carries one of the analyzable extensions
    pub fn matches_name(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            name.strip_suffix(ext.as_str())
                .is_some_and(|stem| stem.ends_with('.'))
        })
    }

    fn is_excluded(&self, path: &[String], is_dir: bool) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let path: PathBuf = path.iter().collect();
        self.excludes.is_ignored(&path, is_dir)
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        let extensions: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect();
        Self::new(&extensions, &[])
    }
}

/// A source file found in a commit's tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path segments relative to the repository root
    pub path: Vec<String>,
    /// Blob holding the file content
    pub blob: Oid,
}

impl SourceFile {
    /// Slash-joined path, used as the module name
    pub fn display_path(&self) -> String {
        self.path.join("/")
    }
}

/// Iterator over the analyzable files of a tree
pub struct SourceFiles<'r> {
    repo: &'r Repository,
    filter: &'r SourceFilter,
    stack: Vec<(Vec<String>, Tree<'r>)>,
    ready: VecDeque<SourceFile>,
}

impl<'r> SourceFiles<'r> {
    pub fn new(repo: &'r Repository, root: Tree<'r>, filter: &'r SourceFilter) -> Self {
        Self {
            repo,
            filter,
            stack: vec![(Vec::new(), root)],
            ready: VecDeque::new(),
        }
    }

    /// Open one directory: queue its matching files, push its subdirectories
    fn expand(&mut self, path: Vec<String>, tree: Tree<'r>) -> Result<()> {
        for entry in tree.iter() {
            let name = String::from_utf8_lossy(entry.name_bytes()).into_owned();
            let mut child = path.clone();
            child.push(name);

            match entry.kind() {
                Some(ObjectType::Tree) => {
                    if self.filter.is_excluded(&child, true) {
                        continue;
                    }
                    let subtree = self.repo.find_tree(entry.id())?;
                    self.stack.push((child, subtree));
                }
                Some(ObjectType::Blob) => {
                    let name = &child[child.len() - 1];
                    if !self.filter.matches_name(name) || self.filter.is_excluded(&child, false) {
                        continue;
                    }
                    self.ready.push_back(SourceFile { path: child, blob: entry.id() });
                }
                // Submodules and anything else
                _ => {}
            }
        }
        Ok(())
    }
}

impl Iterator for SourceFiles<'_> {
    type Item = Result<SourceFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.ready.pop_front() {
                return Some(Ok(file));
            }
            let (path, tree) = self.stack.pop()?;
            if let Err(e) = self.expand(path, tree) {
                return Some(Err(e));
            }
        }
    }
}
