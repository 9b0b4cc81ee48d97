//! Strata CLI - index the structural history of a repository

use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use strata::config;
use strata::history::{GitHistory, DEFAULT_START};
use strata::storage::SqliteStore;
use strata::ui::{self, Icons};
use strata::{Indexer, SourceFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "Commit-by-commit historical index of Python code structure")]
#[command(long_about = r#"
Strata walks a git repository's history oldest-first and records, for every
commit, the modules, classes, functions and attributes of its Python files.

Example usage:
  strata ./my-project
  strata ./my-project --database history.sqlite3 --rev main
"#)]
struct Cli {
    /// Path to the git repository to index
    repo: PathBuf,

    /// Path to the database file (default: db.sqlite3)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Reference the history walk starts from (default: HEAD)
    #[arg(short, long)]
    rev: Option<String>,

    /// Path to a config file (default: strata.toml, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = config::load_config(cli.config.as_deref())?;
    let database = cli
        .database
        .or_else(|| settings.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(config::default_database_path);
    let rev = cli.rev.or_else(|| settings.rev.clone());
    let source_filter = SourceFilter::new(&settings.extensions(), &settings.exclude);

    let history = GitHistory::open(&cli.repo)?;

    config::ensure_db_dir(&database)?;
    let mut store = SqliteStore::open(&database)?;

    ui::header("Indexing repository history");
    ui::status(Icons::FOLDER, "Repository", &cli.repo.display().to_string());
    ui::status(Icons::DATABASE, "Database", &database.display().to_string());
    ui::status(Icons::BRANCH, "Start", rev.as_deref().unwrap_or(DEFAULT_START));
    tracing::info!("Indexing {} into {:?}", cli.repo.display(), database);

    let started = Instant::now();
    let mut indexer = Indexer::new(&mut store, source_filter);
    let stats = indexer.index_history(&history, rev.as_deref())?;

    ui::section("Run Summary");
    ui::summary_row("Commits:", &stats.commits.to_string());
    ui::summary_row("Files analyzed:", &stats.files.to_string());
    ui::summary_row("Modules:", &stats.modules.to_string());
    ui::summary_row("Classes:", &stats.classes.to_string());
    ui::summary_row("Functions:", &stats.functions.to_string());
    ui::summary_row("Attributes:", &stats.attributes.to_string());
    ui::status(Icons::CLOCK, "Elapsed", &format!("{:.2?}", started.elapsed()));

    if stats.skipped > 0 {
        ui::warn(&format!("{} files skipped (undecodable or invalid syntax)", stats.skipped));
    }

    println!();
    print!("{}", store.stats()?);
    ui::success("Indexing complete!");

    Ok(())
}
