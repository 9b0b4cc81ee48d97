//! History indexer
//!
//! Drives the pipeline: for each commit (oldest first) open one storage
//! transaction, walk the commit's tree, analyze every source file and store
//! what was found, then commit the transaction before moving on.
//!
//! Files that fail to decode or parse are skipped. Any other error aborts
//! the run; the transaction of the commit in flight is rolled back.

use crate::analyzer::{FileOutcome, ModuleOutline, PythonAnalyzer};
use crate::history::GitHistory;
use crate::model::{CommitId, CommitRecord, Owner};
use crate::output;
use crate::storage::{CommitTransaction, SqliteStore};
use crate::walker::{SourceFiles, SourceFilter};
use crate::Result;
use git2::{Commit, Repository};
use std::fmt;

/// Counters for an indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub commits: usize,
    pub files: usize,
    pub modules: usize,
    pub skipped: usize,
    pub classes: usize,
    pub functions: usize,
    pub attributes: usize,
}

impl IndexStats {
    fn absorb(&mut self, other: &IndexStats) {
        self.commits += other.commits;
        self.files += other.files;
        self.modules += other.modules;
        self.skipped += other.skipped;
        self.classes += other.classes;
        self.functions += other.functions;
        self.attributes += other.attributes;
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index Statistics:")?;
        writeln!(f, "  Commits: {}", self.commits)?;
        writeln!(f, "  Files: {} ({} skipped)", self.files, self.skipped)?;
        writeln!(f, "  Modules: {}", self.modules)?;
        writeln!(f, "  Classes: {}", self.classes)?;
        writeln!(f, "  Functions: {}", self.functions)?;
        writeln!(f, "  Attributes: {}", self.attributes)
    }
}

/// Indexes a repository's history into a store
pub struct Indexer<'s> {
    store: &'s mut SqliteStore,
    filter: SourceFilter,
}

impl<'s> Indexer<'s> {
    pub fn new(store: &'s mut SqliteStore, filter: SourceFilter) -> Self {
        Self { store, filter }
    }

    /// Index every commit reachable from `start` (default `HEAD`), oldest first
    pub fn index_history(&mut self, history: &GitHistory, start: Option<&str>) -> Result<IndexStats> {
        let mut stats = IndexStats::default();

        for commit in history.walk(start)? {
            let commit = commit?;
            let commit_stats = self.index_commit(history.repository(), &commit)?;
            stats.absorb(&commit_stats);
        }

        Ok(stats)
    }

    /// Index a single commit inside its own transaction
    pub fn index_commit(&mut self, repo: &Repository, commit: &Commit<'_>) -> Result<IndexStats> {
        output::commit_progress(&commit.id().to_string());

        let record = CommitRecord::from_git(commit)?;
        let tree = commit.tree()?;
        // A fresh parser per commit; nothing is cached across revisions
        let mut analyzer = PythonAnalyzer::new()?;

        let tx = self.store.begin()?;
        let commit_id = tx.insert_commit(&record)?;
        let mut stats = IndexStats { commits: 1, ..IndexStats::default() };

        for file in SourceFiles::new(repo, tree, &self.filter) {
            let file = file?;
            let path = file.display_path();
            output::file_progress(&path);
            stats.files += 1;

            let blob = repo.find_blob(file.blob)?;
            match analyzer.analyze(&file.path, blob.content()) {
                FileOutcome::Parsed(outline) => {
                    store_module(&tx, commit_id, &outline, &mut stats)?;
                }
                FileOutcome::Skipped(reason) => {
                    tracing::warn!("Skipping {} at {}: {}", path, commit.id(), reason);
                    stats.skipped += 1;
                }
            }
        }

        tx.commit()?;
        tracing::debug!(
            "Indexed commit {}: {} modules, {} skipped",
            commit.id(),
            stats.modules,
            stats.skipped
        );
        Ok(stats)
    }
}

/// Insert one module and everything it owns
fn store_module(
    tx: &CommitTransaction<'_>,
    commit: CommitId,
    outline: &ModuleOutline,
    stats: &mut IndexStats,
) -> Result<()> {
    let module = tx.insert_module(commit, &outline.name)?;
    stats.modules += 1;

    for class in &outline.classes {
        let class_id = tx.insert_class(module, &class.name, class.start_lineno, class.end_lineno)?;
        stats.classes += 1;

        for attribute in &class.instance_attributes {
            tx.insert_attribute(Owner::Class(class_id), attribute)?;
            stats.attributes += 1;
        }

        // Methods carry the span of their class, not their own
        for method in &class.methods {
            tx.insert_function(Owner::Class(class_id), method, class.start_lineno, class.end_lineno)?;
            stats.functions += 1;
        }
    }

    for function in &outline.functions {
        tx.insert_function(Owner::Module(module), &function.name, function.start_lineno, function.end_lineno)?;
        stats.functions += 1;
    }

    for attribute in &outline.attributes {
        tx.insert_attribute(Owner::Module(module), attribute)?;
        stats.attributes += 1;
    }

    tracing::trace!(
        "Stored module {} ({} classes, {} functions, {} attributes)",
        outline.name,
        outline.classes.len(),
        outline.functions.len(),
        outline.attributes.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StoredModule;
    use crate::storage::DbStats;
    use crate::test_support::TestRepo;

    fn run(repo: &TestRepo, store: &mut SqliteStore) -> IndexStats {
        let history = GitHistory::open(repo.dir.path()).unwrap();
        let mut indexer = Indexer::new(store, SourceFilter::default());
        indexer.index_history(&history, None).unwrap()
    }

    fn only_module(store: &SqliteStore) -> StoredModule {
        let commits = store.commits().unwrap();
        let mut modules = store.modules_in_commit(commits[0].id).unwrap();
        assert_eq!(modules.len(), 1);
        modules.remove(0)
    }

    #[test]
    fn test_one_commit_record_per_commit_in_order() {
        let repo = TestRepo::new();
        let ids = vec![
            repo.commit(&[("a.py", b"x = 1\n")], 1_000),
            repo.commit(&[("a.py", b"x = 2\n")], 2_000),
            repo.commit(&[("a.py", b"x = 3\n")], 3_000),
        ];

        let mut store = SqliteStore::open_in_memory().unwrap();
        let stats = run(&repo, &mut store);
        assert_eq!(stats.commits, 3);

        let commits = store.commits().unwrap();
        let hashes: Vec<Vec<u8>> = commits.iter().map(|c| c.sha1.clone()).collect();
        let expected: Vec<Vec<u8>> = ids.iter().map(|id| id.as_bytes().to_vec()).collect();
        assert_eq!(hashes, expected);

        assert!(commits.windows(2).all(|w| w[0].committed_at <= w[1].committed_at));
        assert_eq!(commits[0].authored_at.timestamp(), 1_000);
        assert_eq!(commits[0].authored_at.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_top_level_function_is_owned_by_module() {
        let repo = TestRepo::new();
        repo.commit(&[("lib.py", b"import os\n\ndef f():\n    return os.sep\n")], 1_000);

        let mut store = SqliteStore::open_in_memory().unwrap();
        run(&repo, &mut store);

        let module = only_module(&store);
        assert_eq!(module.name, "lib.py");

        let functions = store.functions_owned_by(Owner::Module(module.id)).unwrap();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "f");
        assert_eq!(functions[0].owner, Owner::Module(module.id));
        assert_eq!((functions[0].start_lineno, functions[0].end_lineno), (3, 4));

        let stats = store.stats().unwrap();
        assert_eq!(stats, DbStats { commits: 1, modules: 1, classes: 0, functions: 1, attributes: 0 });
    }

    #[test]
    fn test_method_records_class_span() {
        let source = b"\
import os


# class below
class C:
    def m(self):
        self.v = 1

    A = 1
    B = 2
";
        let repo = TestRepo::new();
        repo.commit(&[("c.py", source)], 1_000);

        let mut store = SqliteStore::open_in_memory().unwrap();
        run(&repo, &mut store);

        let module = only_module(&store);
        let classes = store.classes_in_module(module.id).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "C");
        assert_eq!((classes[0].start_lineno, classes[0].end_lineno), (5, 10));

        let methods = store.functions_owned_by(Owner::Class(classes[0].id)).unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "m");
        assert_eq!((methods[0].start_lineno, methods[0].end_lineno), (5, 10));

        let attributes = store.attributes_owned_by(Owner::Class(classes[0].id)).unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].name, "v");

        assert!(store.functions_owned_by(Owner::Module(module.id)).unwrap().is_empty());
    }

    #[test]
    fn test_bad_files_are_skipped_and_the_commit_continues() {
        let repo = TestRepo::new();
        repo.commit(
            &[
                ("a_broken.py", b"def broken(:\n    pass\n"),
                ("b_binary.py", b"\x00\xff\xfe\x00"),
                ("c_good.py", b"GOOD = True\n"),
            ],
            1_000,
        );

        let mut store = SqliteStore::open_in_memory().unwrap();
        let stats = run(&repo, &mut store);
        assert_eq!(stats.files, 3);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.modules, 1);

        let module = only_module(&store);
        assert_eq!(module.name, "c_good.py");
        let attributes = store.attributes_owned_by(Owner::Module(module.id)).unwrap();
        assert_eq!(attributes[0].name, "GOOD");
    }

    #[test]
    fn test_module_names_are_joined_paths() {
        let repo = TestRepo::new();
        repo.commit(
            &[
                ("pkg/__init__.py", b""),
                ("pkg/sub/impl.py", b"def g():\n    pass\n"),
                ("notes.txt", b"not python"),
            ],
            1_000,
        );

        let mut store = SqliteStore::open_in_memory().unwrap();
        run(&repo, &mut store);

        let commits = store.commits().unwrap();
        let mut names: Vec<String> = store
            .modules_in_commit(commits[0].id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["pkg/__init__.py", "pkg/sub/impl.py"]);
    }

    #[test]
    fn test_each_commit_sees_its_own_revision() {
        let repo = TestRepo::new();
        repo.commit(&[("m.py", b"def old():\n    pass\n")], 1_000);
        repo.commit(&[("m.py", b"def new():\n    pass\n")], 2_000);

        let mut store = SqliteStore::open_in_memory().unwrap();
        run(&repo, &mut store);

        let names: Vec<String> = store
            .commits()
            .unwrap()
            .iter()
            .flat_map(|c| store.modules_in_commit(c.id).unwrap())
            .flat_map(|m| store.functions_owned_by(Owner::Module(m.id)).unwrap())
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["old", "new"]);
    }

    #[test]
    fn test_fresh_stores_get_identical_records() {
        let repo = TestRepo::new();
        repo.commit(
            &[("app.py", b"class A:\n    def __init__(self):\n        self.x = 1\n\ndef main():\n    pass\n\nVERSION = 1\n")],
            1_000,
        );

        let snapshot = |store: &SqliteStore| {
            let mut rows = Vec::new();
            for commit in store.commits().unwrap() {
                rows.push(format!("commit {:?} {}", commit.sha1, commit.authored_at));
                for module in store.modules_in_commit(commit.id).unwrap() {
                    rows.push(format!("module {}", module.name));
                    for class in store.classes_in_module(module.id).unwrap() {
                        rows.push(format!("class {} {}-{}", class.name, class.start_lineno, class.end_lineno));
                        for f in store.functions_owned_by(Owner::Class(class.id)).unwrap() {
                            rows.push(format!("method {} {}-{}", f.name, f.start_lineno, f.end_lineno));
                        }
                        for a in store.attributes_owned_by(Owner::Class(class.id)).unwrap() {
                            rows.push(format!("instance attribute {}", a.name));
                        }
                    }
                    for f in store.functions_owned_by(Owner::Module(module.id)).unwrap() {
                        rows.push(format!("function {} {}-{}", f.name, f.start_lineno, f.end_lineno));
                    }
                    for a in store.attributes_owned_by(Owner::Module(module.id)).unwrap() {
                        rows.push(format!("attribute {}", a.name));
                    }
                }
            }
            rows
        };

        let mut first = SqliteStore::open_in_memory().unwrap();
        let mut second = SqliteStore::open_in_memory().unwrap();
        run(&repo, &mut first);
        run(&repo, &mut second);

        assert_eq!(first.stats().unwrap(), second.stats().unwrap());
        assert_eq!(snapshot(&first), snapshot(&second));
        assert_eq!(snapshot(&first).len(), 7);
    }

    #[test]
    fn test_rerun_into_same_store_appends() {
        let repo = TestRepo::new();
        repo.commit(&[("a.py", b"def f():\n    pass\n")], 1_000);
        repo.commit(&[("a.py", b"def f():\n    pass\n")], 2_000);

        let mut store = SqliteStore::open_in_memory().unwrap();
        run(&repo, &mut store);
        run(&repo, &mut store);

        let stats = store.stats().unwrap();
        assert_eq!(stats.commits, 4);
        assert_eq!(stats.modules, 4);
        assert_eq!(stats.functions, 4);
    }

    #[test]
    fn test_missing_start_reference_aborts_before_any_commit() {
        let repo = TestRepo::new();
        repo.commit(&[("a.py", b"")], 1_000);

        let history = GitHistory::open(repo.dir.path()).unwrap();
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut indexer = Indexer::new(&mut store, SourceFilter::default());

        assert!(indexer.index_history(&history, Some("no-such-branch")).is_err());
        assert_eq!(store.stats().unwrap(), DbStats::default());
    }
}
