use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::walker::DEFAULT_EXTENSIONS;

/// Contents of `strata.toml`. Every field is optional; command-line flags win.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Database file the index is written to
    pub database: Option<String>,
    /// Reference the history walk starts from
    pub rev: Option<String>,
    /// Extensions of analyzable source files, without the dot
    pub extensions: Option<Vec<String>>,
    /// Gitignore-style patterns of paths to leave out
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl StrataConfig {
    pub fn extensions(&self) -> Vec<String> {
        self.extensions
            .clone()
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("strata.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("db.sqlite3")
}

/// Load the config file; a missing default file is not an error, a missing explicit one is
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StrataConfig> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Ok(StrataConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StrataConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
