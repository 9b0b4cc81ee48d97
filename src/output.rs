//! Progress lines written while indexing
//!
//! One line per commit and one per file, on stdout. Informational only;
//! set `STRATA_QUIET=1` to silence them.

use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("STRATA_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

pub fn commit_progress(id: &str) {
    if !is_quiet() {
        println!("Analyzing commit {}", id);
    }
}

pub fn file_progress(path: &str) {
    if !is_quiet() {
        println!("Analyzing file {}", path);
    }
}
