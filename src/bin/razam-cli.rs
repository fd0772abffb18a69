//! CLI driver for the fingerprinting engine. A worked example of the
//! inputs/outputs described in spec §6; the desktop GUI and
//! microphone capture in `examples/original_source/razam.py` /
//! `mic.py` stay out of scope (spec §1) — this exposes the same
//! actions (load/create/update index, find best match) as
//! subcommands instead of menu items.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use razam::config::Config;
use razam::error::{LoadError, QueryError};
use razam::index::Index;
use razam::orchestrator::{self, UpdateTarget};

#[derive(Parser)]
#[command(name = "razam-cli", about = "Shazam-style audio fingerprint matcher")]
struct Cli {
    /// Path to the index file. Kept as `index.pkl` by default for
    /// compatibility with existing deployments (spec §4.5) — the
    /// bytes written are this crate's own versioned format, not a
    /// Python pickle.
    #[arg(long, global = true, default_value = "index.pkl")]
    index: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a new index from a file or a directory of audio files.
    Index {
        /// Audio file, or directory of audio files to fingerprint.
        path: PathBuf,

        /// Descend into subdirectories when `path` is a directory.
        #[arg(long)]
        recursive: bool,

        /// Number of worker threads (defaults to the host core count).
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Merge new files or a directory into an existing index.
    Update {
        /// Directory or individual audio files to merge in.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Treat `paths[0]` as a directory and descend recursively.
        #[arg(long)]
        recursive: bool,
    },
    /// Identify a short audio clip against the index.
    Query {
        /// Audio file to identify.
        sample: PathBuf,

        /// Maximum number of ranked results to print.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Index { path, recursive, workers } => {
            let mut config = Config::default();
            if let Some(workers) = workers {
                config.workers = workers;
            }
            run_index(&cli.index, &path, recursive, &config)
        }
        Commands::Update { paths, recursive } => run_update(&cli.index, &paths, recursive),
        Commands::Query { sample, top } => run_query(&cli.index, &sample, top),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}

fn run_index(index_path: &PathBuf, path: &PathBuf, recursive: bool, config: &Config) -> Result<(), i32> {
    match orchestrator::create_index(path, recursive, config) {
        Ok(index) => {
            if let Err(e) = index.save(index_path) {
                eprintln!("failed to save index: {e}");
                return Err(1);
            }
            println!("indexed {} hash keys into {}", index.len(), index_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            Err(1)
        }
    }
}

fn run_update(index_path: &PathBuf, paths: &[PathBuf], recursive: bool) -> Result<(), i32> {
    let mut index = match Index::load(index_path) {
        Ok(index) => index,
        Err(LoadError::NotFound { .. }) => Index::new(),
        Err(e) => {
            eprintln!("{e}");
            return Err(1);
        }
    };

    let config = Config::default();
    let target = if paths.len() == 1 && paths[0].is_dir() {
        UpdateTarget::Directory {
            path: &paths[0],
            recursive,
        }
    } else {
        UpdateTarget::Files(paths)
    };
    orchestrator::update_index(&mut index, target, &config);

    if let Err(e) = index.save(index_path) {
        eprintln!("failed to save index: {e}");
        return Err(1);
    }
    println!("index updated and saved to {}", index_path.display());
    Ok(())
}

fn run_query(index_path: &PathBuf, sample: &PathBuf, top: usize) -> Result<(), i32> {
    let index = match Index::load(index_path) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("{e}");
            return Err(1);
        }
    };

    match orchestrator::query(&index, sample) {
        Ok(results) if results.is_empty() => {
            println!("no matches found");
            Ok(())
        }
        Ok(results) => {
            for (rank, result) in results.iter().take(top).enumerate() {
                println!("{}. {} (score: {})", rank + 1, result.track_id, result.score);
            }
            Ok(())
        }
        Err(QueryError::NoIndex) => {
            eprintln!("no index is available; build one with `razam-cli index` first");
            Err(1)
        }
    }
}
