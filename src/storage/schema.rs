//! Database schema definitions

/// SQL to create the commits table
pub const CREATE_COMMITS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS commits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sha1 BLOB NOT NULL,
    authored_at TEXT NOT NULL,
    committed_at TEXT NOT NULL
)
"#;

/// SQL to create the modules table
pub const CREATE_MODULES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS modules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    commit_id INTEGER NOT NULL REFERENCES commits(id)
)
"#;

/// SQL to create the classes table
pub const CREATE_CLASSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    module_id INTEGER NOT NULL REFERENCES modules(id),
    start_lineno INTEGER NOT NULL,
    end_lineno INTEGER NOT NULL,
    CHECK (start_lineno <= end_lineno)
)
"#;

/// SQL to create the functions table
/// A function belongs to exactly one of a module or a class
pub const CREATE_FUNCTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS functions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    module_id INTEGER REFERENCES modules(id),
    class_id INTEGER REFERENCES classes(id),
    start_lineno INTEGER NOT NULL,
    end_lineno INTEGER NOT NULL,
    CHECK ((module_id IS NULL) <> (class_id IS NULL)),
    CHECK (start_lineno <= end_lineno)
)
"#;

/// SQL to create the attributes table
/// An attribute belongs to exactly one of a module or a class
pub const CREATE_ATTRIBUTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS attributes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    module_id INTEGER REFERENCES modules(id),
    class_id INTEGER REFERENCES classes(id),
    CHECK ((module_id IS NULL) <> (class_id IS NULL))
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_commits_sha1 ON commits(sha1)",
    "CREATE INDEX IF NOT EXISTS idx_modules_commit ON modules(commit_id)",
    "CREATE INDEX IF NOT EXISTS idx_modules_name ON modules(name)",
    "CREATE INDEX IF NOT EXISTS idx_classes_module ON classes(module_id)",
    "CREATE INDEX IF NOT EXISTS idx_functions_module ON functions(module_id)",
    "CREATE INDEX IF NOT EXISTS idx_functions_class ON functions(class_id)",
    "CREATE INDEX IF NOT EXISTS idx_attributes_module ON attributes(module_id)",
    "CREATE INDEX IF NOT EXISTS idx_attributes_class ON attributes(class_id)",
];

/// Columns each table must carry for an existing database to be reused
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("commits", &["id", "sha1", "authored_at", "committed_at"]),
    ("modules", &["id", "name", "commit_id"]),
    ("classes", &["id", "name", "module_id", "start_lineno", "end_lineno"]),
    ("functions", &["id", "name", "module_id", "class_id", "start_lineno", "end_lineno"]),
    ("attributes", &["id", "name", "module_id", "class_id"]),
];

/// Table creation statements, in foreign-key dependency order
pub fn table_statements() -> Vec<&'static str> {
    vec![
        CREATE_COMMITS_TABLE,
        CREATE_MODULES_TABLE,
        CREATE_CLASSES_TABLE,
        CREATE_FUNCTIONS_TABLE,
        CREATE_ATTRIBUTES_TABLE,
    ]
}
