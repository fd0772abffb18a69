//! Shazam-style audio fingerprinting, indexing, and matching engine.
//!
//! Pipeline: `Decoder Adapter -> Spectral Front-End -> Peak Picker ->
//! Hasher -> Index Store -> Matcher`, orchestrated by
//! [`orchestrator`]. See `SPEC_FULL.md` for the full design.

pub mod audio;
pub mod config;
pub mod error;
pub mod hasher;
pub mod index;
pub mod matcher;
pub mod orchestrator;
pub mod peaks;
pub mod spectral;
pub mod types;

pub use config::Config;
pub use error::{DecodeError, EmptyCorpus, LoadError, QueryError, SaveError};
pub use index::Index;
pub use types::{Constellation, HashKey, MatchResult, Peak, Posting, TrackId};
