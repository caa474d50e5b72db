use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::filters::{SearchFilters, parse_query};
use crate::indexer::{IndexOutcome, IndexSummary, Progress};
use crate::locator::FileLocator;
use crate::models::SearchResult;
use crate::utils::{
    default_config_path, format_file_size, format_path_with_tilde, format_timestamp,
};

#[derive(Parser)]
#[command(name = "findex")]
#[command(version)]
#[command(about = "Index local files and find them by name", long_about = None)]
pub struct Cli {
    /// Config file (defaults to config.json under FINDEX_HOME or the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a directory (or the configured auto-index paths when none is given)
    Index {
        path: Option<PathBuf>,

        /// Only index the immediate children
        #[arg(long)]
        no_recursive: bool,
    },

    /// Search the index; inline filters such as `type:rs kind:file` are accepted
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Restrict to extensions (repeatable)
        #[arg(long = "type", short = 't', value_name = "EXT")]
        types: Vec<String>,

        #[arg(long, conflicts_with = "dirs_only")]
        files_only: bool,

        #[arg(long)]
        dirs_only: bool,

        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Most recently opened entries
    Recent {
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Most frequently opened entries
    Frequent {
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Record that a path was opened
    Open { path: PathBuf },

    /// Drop a path from the index
    Remove { path: PathBuf },

    /// Clear the index and re-index the given directories
    Rebuild {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Watch directories and keep the index current until Enter is pressed
    Monitor { paths: Vec<PathBuf> },

    /// Show index statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Drop every cached query result
    ClearCache,

    /// Delete the whole index
    Clear,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let locator = FileLocator::open(config).context("Failed to open the index")?;

    match command {
        Commands::Index { path, no_recursive } => index(&locator, path, !no_recursive)?,
        Commands::Search { query, types, files_only, dirs_only, limit, json } => {
            let mut filters = if files_only {
                SearchFilters::files_only()
            } else if dirs_only {
                SearchFilters::directories_only()
            } else {
                SearchFilters::new()
            };
            for extension in &types {
                filters.add_type(extension);
            }
            search(&locator, &query.join(" "), filters, limit, json)?;
        }
        Commands::Recent { limit, json } => {
            let results = locator.recent_files(limit)?;
            print_results(&results, json, "No recently opened files")?;
        }
        Commands::Frequent { limit, json } => {
            let results = locator.frequent_files(limit)?;
            print_results(&results, json, "No frequently opened files")?;
        }
        Commands::Open { path } => {
            if locator.record_access(&path)? {
                println!("Recorded access to {}", format_path_with_tilde(&path));
            } else {
                bail!("Not indexed: {}", path.display());
            }
        }
        Commands::Remove { path } => {
            if locator.remove_record(&path)? {
                println!("Removed {}", format_path_with_tilde(&path));
            } else {
                println!("Not indexed: {}", format_path_with_tilde(&path));
            }
        }
        Commands::Rebuild { paths } => {
            let summary = with_progress_output(|progress| locator.rebuild_index(&paths, progress))?;
            print_summary("Rebuilt index", &summary);
        }
        Commands::Monitor { paths } => monitor(&locator, &paths)?,
        Commands::Stats { json } => show_stats(&locator, json)?,
        Commands::ClearCache => {
            let removed = locator.clear_cache()?;
            println!("Cleared {} cached searches", removed);
        }
        Commands::Clear => {
            locator.clear_all()?;
            println!("Index cleared");
        }
    }

    Ok(())
}

fn index(locator: &FileLocator, path: Option<PathBuf>, recursive: bool) -> Result<()> {
    let Some(path) = path else {
        if locator.config().indexing.auto_index_paths.is_empty() {
            bail!("No path given and no auto_index_paths configured");
        }
        let summary = with_progress_output(|progress| locator.auto_index(progress))?;
        print_summary("Indexed auto-index paths", &summary);
        return Ok(());
    };

    if path.is_dir() {
        let summary = with_progress_output(|progress| {
            locator.index_directory(&path, recursive, progress)
        })?;
        print_summary(&format!("Indexed {}", format_path_with_tilde(&path)), &summary);
    } else {
        match locator.index_path(&path)? {
            IndexOutcome::Indexed(_) => println!("Indexed {}", format_path_with_tilde(&path)),
            IndexOutcome::Excluded(reason) => {
                println!("Not indexed: {} ({})", format_path_with_tilde(&path), reason)
            }
            IndexOutcome::DirectorySkipped => {
                println!("Not indexed: {} (directories disabled)", format_path_with_tilde(&path))
            }
        }
    }
    Ok(())
}

fn search(
    locator: &FileLocator,
    raw_query: &str,
    cli_filters: SearchFilters,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let parsed = parse_query(raw_query)?;
    let filters = parsed.filters.merge(cli_filters)?;
    if parsed.text.is_empty() {
        bail!("Query has filters but no search text");
    }

    let results = match limit {
        Some(limit) => locator.search_limited(&parsed.text, &filters, limit)?,
        None => locator.search(&parsed.text, &filters)?,
    };
    print_results(&results, json, "No matches")
}

fn monitor(locator: &FileLocator, paths: &[PathBuf]) -> Result<()> {
    locator.start_monitoring(paths).context("Failed to start monitoring")?;
    let stats = locator.stats()?;
    println!("Monitoring {} path(s):", stats.monitored_paths.len());
    for path in &stats.monitored_paths {
        println!("  {}", format_path_with_tilde(path));
    }
    println!("Press Enter to stop");

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    locator.stop_monitoring();
    let stats = locator.stats()?;
    println!(
        "Stopped monitoring ({} events, {} failed)",
        stats.events_processed, stats.event_failures
    );
    Ok(())
}

fn show_stats(locator: &FileLocator, json: bool) -> Result<()> {
    let stats = locator.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Index Statistics");
    println!("================");
    println!("Files: {}", stats.total_files);
    println!("Directories: {}", stats.total_directories);
    println!("Keywords: {}", stats.total_keywords);
    println!("Cached searches: {}", stats.cached_searches);
    println!("Monitoring: {}", if stats.is_monitoring { "yes" } else { "no" });
    println!();
    println!("Index hidden files: {}", stats.index_hidden);
    println!("Index directories: {}", stats.index_directories);
    println!("Excluded extensions: {}", stats.excluded_extensions.join(", "));
    println!("Excluded paths: {}", stats.excluded_paths.join(", "));
    if let Ok(path) = locator.config().database_path() {
        println!("Database: {}", format_path_with_tilde(&path));
    }
    Ok(())
}

fn print_results(results: &[SearchResult], json: bool, empty_message: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("{}", empty_message);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    for result in results {
        let size = match (result.is_directory, result.size) {
            (true, _) => "dir".to_string(),
            (false, Some(size)) => format_file_size(size),
            (false, None) => "-".to_string(),
        };
        writeln!(
            out,
            "{:>6.1}  {:<13} {:>9}  {:<10}  {}",
            result.score,
            result.match_tier.as_str(),
            size,
            format_timestamp(result.last_accessed.as_ref()),
            format_path_with_tilde(&result.path)
        )?;
    }
    Ok(())
}

fn print_summary(label: &str, summary: &IndexSummary) {
    println!(
        "{}: {} entries, {} skipped{}",
        label,
        summary.indexed,
        summary.skipped,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
}

/// Runs a walk with a live counter on stderr when it is a terminal
fn with_progress_output<T>(
    run: impl FnOnce(Option<&mut dyn FnMut(&Progress)>) -> crate::error::Result<T>,
) -> Result<T> {
    if !io::stderr().is_terminal() {
        return Ok(run(None)?);
    }

    let mut report = |progress: &Progress| {
        if progress.finished {
            eprint!("\r\x1b[K");
        } else {
            eprint!("\rIndexed {} entries...", progress.count);
        }
    };
    Ok(run(Some(&mut report))?)
}
