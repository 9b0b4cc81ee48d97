use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Gitignore-style exclusion patterns matched against in-repository paths.
///
/// Paths come from git trees, not the filesystem, so no `.gitignore` files
/// are read; only the configured patterns apply.
pub struct IgnoreFilter {
    inner: Gitignore,
}

impl IgnoreFilter {
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(".");

        for pattern in patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e);
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_match_relative_paths() {
        let filter = IgnoreFilter::new(&["tests/".to_string(), "*_pb2.py".to_string()]);

        assert!(filter.is_ignored(Path::new("tests"), true));
        assert!(filter.is_ignored(Path::new("pkg/api_pb2.py"), false));
        assert!(!filter.is_ignored(Path::new("pkg/api.py"), false));
    }

    #[test]
    fn test_no_patterns_ignores_nothing() {
        let filter = IgnoreFilter::new(&[]);
        assert!(filter.is_empty());
        assert!(!filter.is_ignored(Path::new("anything.py"), false));
    }
}
