//! Orchestrator (spec §4.7): builds an index from a file or
//! directory, updates an existing index, and runs queries. Grounded
//! in `examples/original_source/functions.py`'s `create_index` /
//! `update_index` and `razam.py`'s menu actions, and in spec §5's
//! one-worker-per-file concurrency model.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::audio;
use crate::config::Config;
use crate::error::{DecodeError, EmptyCorpus, QueryError};
use crate::hasher;
use crate::index::Index;
use crate::matcher;
use crate::peaks;
use crate::spectral;
use crate::types::{MatchResult, TrackId};

/// Lists files directly under `dir` (non-recursive) or the whole
/// subtree (recursive), in a deterministic order. Grounded in
/// `examples/original_source/functions.py`'s `get_list_of_files`,
/// reimplemented with `walkdir` instead of hand-rolled `os.scandir`
/// recursion.
fn list_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Runs the full pipeline (Decoder -> Spectral Front-End -> Peak
/// Picker -> Hasher) on one file, returning its partial index. Files
/// that fail to decode are skipped with a warning, never aborting the
/// caller (spec §4.7, §7).
fn fingerprint_file(path: &Path) -> Option<(TrackId, std::collections::HashMap<crate::types::HashKey, Vec<crate::types::Posting>>)> {
    let pcm = match audio::decode(path) {
        Ok(pcm) => pcm,
        Err(DecodeError::UnsupportedFormat { path }) => {
            warn!(?path, "skipping file with unsupported audio format");
            return None;
        }
        Err(DecodeError::Io { path, source }) => {
            warn!(?path, %source, "skipping file that could not be read");
            return None;
        }
    };

    let track_id = TrackId::from(path);
    let matrix = spectral::spectrogram(&pcm);
    let constellation = peaks::pick(&matrix);
    debug!(track = %track_id, peaks = constellation.len(), "fingerprinted file");
    let hashes = hasher::hash(&track_id, &constellation);
    Some((track_id, hashes))
}

fn fingerprint_files(paths: &[PathBuf], config: &Config) -> Index {
    let mut index = Index::new();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .expect("failed to build worker pool");
        let partials: Vec<_> = pool.install(|| paths.par_iter().filter_map(|p| fingerprint_file(p)).collect());
        for (_track, batch) in partials {
            index.merge(batch);
        }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = config;
        for path in paths {
            if let Some((_track, batch)) = fingerprint_file(path) {
                index.merge(batch);
            }
        }
    }

    index
}

/// Builds an index from `path`: a single file, or a directory
/// (optionally descended recursively), optionally fingerprinted in
/// parallel (spec §4.7).
pub fn create_index(path: &Path, recursive: bool, config: &Config) -> Result<Index, EmptyCorpus> {
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        list_files(path, recursive)
    };

    info!(count = files.len(), path = %path.display(), "fingerprinting corpus");
    let index = fingerprint_files(&files, config);

    if index.is_empty() {
        return Err(EmptyCorpus);
    }
    Ok(index)
}

/// What to fingerprint and merge into an existing index (spec §4.7).
pub enum UpdateTarget<'a> {
    Directory { path: &'a Path, recursive: bool },
    Files(&'a [PathBuf]),
}

/// Builds a sub-index from `target` and merges it into `index` in
/// place (spec §4.7).
pub fn update_index(index: &mut Index, target: UpdateTarget<'_>, config: &Config) {
    let files = match target {
        UpdateTarget::Directory { path, recursive } => list_files(path, recursive),
        UpdateTarget::Files(paths) => paths.to_vec(),
    };
    info!(count = files.len(), "updating index");
    let batch_index = fingerprint_files(&files, config);
    index.merge_index(batch_index);
}

/// Decodes the sample at `sample_path`, fingerprints it to a
/// transient mini-index, and ranks it against `index` (spec §4.7).
pub fn query(index: &Index, sample_path: &Path) -> Result<Vec<MatchResult>, QueryError> {
    if index.is_empty() {
        return Err(QueryError::NoIndex);
    }
    let Some((_track, hashes)) = fingerprint_file(sample_path) else {
        return Ok(Vec::new());
    };
    Ok(matcher::rank(&hashes, index))
}
