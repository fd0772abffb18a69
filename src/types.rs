//! Core data model (spec §3): peaks, constellations, hash keys, and
//! postings. These are value types shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// Opaque identifier for a track, typically an absolute filesystem
/// path. Newtype over `String` so it can't be confused with other
/// string-y fields (band names, file contents) at call sites.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(s: impl Into<String>) -> Self {
        TrackId(s.into())
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&std::path::Path> for TrackId {
    fn from(p: &std::path::Path) -> Self {
        TrackId(p.to_string_lossy().into_owned())
    }
}

/// A single spectral peak: `(time_bin, freq_bin)`, both non-negative
/// bin indices (spec §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Peak {
    pub t: u32,
    pub f: u32,
}

/// Sorted, duplicate-free sequence of peaks extracted from one audio
/// file — the fingerprint primitive (spec §3, invariant 1).
#[derive(Clone, Debug, Default)]
pub struct Constellation(pub Vec<Peak>);

impl Constellation {
    pub fn from_peaks(mut peaks: Vec<Peak>) -> Self {
        peaks.sort_unstable_by_key(|p| (p.t, p.f));
        peaks.dedup();
        Constellation(peaks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` iff the constellation is sorted ascending by `(t, f)` and
    /// free of duplicates (spec §8, invariant 1).
    pub fn is_well_formed(&self) -> bool {
        self.0.windows(2).all(|w| (w[0].t, w[0].f) < (w[1].t, w[1].f))
    }
}

/// `(f1, f2, dt)` — frequency of the anchor, frequency of the target,
/// and their time delta in bins. `dt` may be zero or negative; sign is
/// preserved (spec §3, §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HashKey {
    pub f1: u32,
    pub f2: u32,
    pub dt: i32,
}

/// `(anchor_time, track_id)` — where in which track an anchor
/// occurred (spec §3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub anchor_time: u32,
    pub track_id: TrackId,
}

/// A ranked query result: a candidate track paired with its
/// coherence score (the matcher's max histogram bin count).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    pub track_id: TrackId,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constellation_from_peaks_sorts_and_dedups() {
        let peaks = vec![
            Peak { t: 2, f: 1 },
            Peak { t: 1, f: 5 },
            Peak { t: 1, f: 5 },
            Peak { t: 1, f: 2 },
        ];
        let c = Constellation::from_peaks(peaks);
        assert!(c.is_well_formed());
        assert_eq!(c.len(), 3);
        assert_eq!(c.0[0], Peak { t: 1, f: 2 });
        assert_eq!(c.0[1], Peak { t: 1, f: 5 });
        assert_eq!(c.0[2], Peak { t: 2, f: 1 });
    }
}
