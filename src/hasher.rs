//! Hasher (spec §4.4): constellation -> `(f1, f2, dt) -> [(anchor_time, track_id)]`.
//!
//! Grounded in `examples/original_source/functions.py`'s `get_hashes`,
//! with the REDESIGN FLAG from spec §9 applied: the target zone's
//! lower bound is clamped to `0` rather than wrapping to the end of
//! the constellation.

use std::collections::HashMap;

use crate::config::TARGET_ZONE;
use crate::types::{Constellation, HashKey, Posting, TrackId};

/// `(track_id, constellation) -> mapping (f1, f2, dt) -> postings` (spec §4.4).
pub fn hash(track_id: &TrackId, constellation: &Constellation) -> HashMap<HashKey, Vec<Posting>> {
    debug_assert!(
        constellation.is_well_formed(),
        "hasher requires a sorted, duplicate-free constellation"
    );
    let points = &constellation.0;
    let mut hashes: HashMap<HashKey, Vec<Posting>> = HashMap::new();

    for (i, anchor) in points.iter().enumerate() {
        let lo = i.saturating_sub(TARGET_ZONE);
        let hi = (i + TARGET_ZONE).min(points.len());
        for target in &points[lo..hi] {
            let key = HashKey {
                f1: anchor.f,
                f2: target.f,
                dt: target.t as i32 - anchor.t as i32,
            };
            hashes.entry(key).or_default().push(Posting {
                anchor_time: anchor.t,
                track_id: track_id.clone(),
            });
        }
    }

    hashes
}
