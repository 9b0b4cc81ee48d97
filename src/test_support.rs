//! Scratch git repositories for tests, built directly through git2.

use git2::{Oid, Repository, Signature, Time};
use std::collections::BTreeMap;
use tempfile::TempDir;

pub(crate) struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

enum Entry<'a> {
    Blob(&'a [u8]),
    Dir(BTreeMap<&'a str, Entry<'a>>),
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    /// Commit a full snapshot of `files` (slash-separated paths) on top of HEAD
    pub fn commit(&self, files: &[(&str, &[u8])], seconds: i64) -> Oid {
        let tree_id = self.write_tree(files);
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::new("Test User", "test@example.com", &Time::new(seconds, 60)).unwrap();

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, "snapshot", &tree, &parents)
            .unwrap()
    }

    pub fn write_tree(&self, files: &[(&str, &[u8])]) -> Oid {
        let mut root = BTreeMap::new();
        for (path, content) in files {
            let segments: Vec<&str> = path.split('/').collect();
            let (file, dirs) = segments.split_last().unwrap();
            let mut level = &mut root;
            for dir in dirs {
                let entry = level.entry(*dir).or_insert_with(|| Entry::Dir(BTreeMap::new()));
                level = match entry {
                    Entry::Dir(children) => children,
                    Entry::Blob(_) => panic!("{} is both a file and a directory", dir),
                };
            }
            level.insert(*file, Entry::Blob(*content));
        }
        self.build(&root)
    }

    fn build(&self, entries: &BTreeMap<&str, Entry<'_>>) -> Oid {
        let mut builder = self.repo.treebuilder(None).unwrap();
        for (name, entry) in entries {
            match entry {
                Entry::Blob(content) => {
                    let blob = self.repo.blob(content).unwrap();
                    builder.insert(*name, blob, 0o100644).unwrap();
                }
                Entry::Dir(children) => {
                    let tree = self.build(children);
                    builder.insert(*name, tree, 0o040000).unwrap();
                }
            }
        }
        builder.write().unwrap()
    }
}
