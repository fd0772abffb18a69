//! Fixed DSP parameters and operational knobs (spec §6, §9).
//!
//! The constants below are wire-visible: changing any of them
//! invalidates existing index files, since the hash keys and postings
//! they produce are no longer comparable to ones produced before the
//! change. They are compiled in, not configurable, for exactly that
//! reason.

/// Sample rate all audio is resampled to before fingerprinting.
pub const SAMPLE_RATE: u32 = 22050;

/// Number of mel filterbank bands.
pub const MEL_BANDS: usize = 256;

/// Upper cutoff of the mel filterbank, in Hz.
pub const FMAX: f32 = 4000.0;

/// Lower cutoff of the mel filterbank, in Hz.
pub const FMIN: f32 = 0.0;

/// STFT window length, in samples.
pub const WINDOW_SIZE: usize = 2048;

/// STFT hop length, in samples.
pub const HOP_SIZE: usize = 512;

/// Side length of the square neighbourhood used by the peak picker's
/// maximum filter.
pub const NEIGHBORHOOD_SIZE: usize = 20;

/// Half-width of the hasher's target zone, in constellation positions.
pub const TARGET_ZONE: usize = 20;

/// Bin width of the matcher's offset-difference histogram, in time-bins.
pub const HISTOGRAM_BIN_WIDTH: i64 = 150;

/// Floor applied to dB-normalised spectrogram values to avoid `-inf`.
pub const DB_FLOOR: f32 = -80.0;

/// Version tag embedded in every persisted index header. Bumping this
/// when the DSP parameters above change means an index built under a
/// different pipeline version fails to load with a clear error
/// instead of silently producing nonsense matches.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Default index file name, kept for compatibility with the prototype
/// this engine replaces (see `examples/original_source/razam.py`'s
/// `default_index_filename`). The on-disk bytes are this crate's own
/// format, not a Python pickle; the name is a user-facing default, not
/// a format promise.
pub const DEFAULT_INDEX_FILENAME: &str = "index.pkl";

/// Operational knobs that do not affect index compatibility.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads used to fingerprint a corpus in
    /// parallel. Defaults to the host core count.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: num_cpus::get().max(1),
        }
    }
}
