use std::path::PathBuf;

use thiserror::Error;

/// Failure modes of the Decoder Adapter (spec §4.1, §7).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported audio format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("i/o error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure modes of `Index::load` (spec §7).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("index file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("index file at {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("index file at {path} was written by an incompatible version (found {found}, expected {expected})")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("i/o error reading index at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure modes of `Index::save` (spec §7). Saves are atomic: a partial
/// write can never leave a corrupt file at `path`.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("i/o error writing index to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode index: {0}")]
    Encode(#[from] bincode::Error),
}

/// Surfaced by the Orchestrator when a query can't run (spec §7).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no index is available to query")]
    NoIndex,
}

/// Surfaced by `create_index` when no hashes were produced from the
/// given corpus (spec §7).
#[derive(Debug, Error)]
#[error("no fingerprints were produced from the given corpus")]
pub struct EmptyCorpus;
