//! Matcher (spec §4.6): query hashes + index -> ranked tracks by
//! time-coherence histogram. Grounded in
//! `examples/original_source/functions.py`'s `get_offset_diffs` /
//! `get_best_matches`.

use std::collections::HashMap;

use crate::config::HISTOGRAM_BIN_WIDTH;
use crate::index::Index;
use crate::types::{HashKey, MatchResult, Posting, TrackId};

/// Step 1 (spec §4.6): for every query key present in `index`, record
/// `db_offset - q_offset` per candidate track.
fn offset_diffs(
    query_hashes: &HashMap<HashKey, Vec<Posting>>,
    index: &Index,
) -> HashMap<TrackId, Vec<i64>> {
    let mut diffs: HashMap<TrackId, Vec<i64>> = HashMap::new();

    for (key, query_postings) in query_hashes {
        let Some(index_postings) = index.get(key) else {
            continue;
        };
        for q in query_postings {
            for db in index_postings {
                diffs
                    .entry(db.track_id.clone())
                    .or_default()
                    .push(db.anchor_time as i64 - q.anchor_time as i64);
            }
        }
    }

    diffs
}

/// Step 2 (spec §4.6): histogram with bin width 150, aligned to
/// `min(D)`; the track's score is the max bin count.
fn coherence_score(mut diffs: Vec<i64>) -> u32 {
    diffs.sort_unstable();
    let min = *diffs.first().unwrap();
    let max = *diffs.last().unwrap();

    let n_bins = ((max - min) / HISTOGRAM_BIN_WIDTH + 1).max(1) as usize;
    let mut bins = vec![0u32; n_bins];
    for d in diffs {
        let bin = ((d - min) / HISTOGRAM_BIN_WIDTH) as usize;
        bins[bin.min(n_bins - 1)] += 1;
    }
    bins.into_iter().max().unwrap_or(0)
}

/// `query_hashes, index -> ranked sequence of track_id` (spec §4.6).
pub fn rank(query_hashes: &HashMap<HashKey, Vec<Posting>>, index: &Index) -> Vec<MatchResult> {
    let diffs = offset_diffs(query_hashes, index);

    let mut scored: Vec<MatchResult> = diffs
        .into_iter()
        .map(|(track_id, d)| MatchResult {
            track_id,
            score: coherence_score(d),
        })
        .collect();

    // descending score, ties broken by track_id so ranking never depends
    // on HashMap iteration order (spec §5, §4.6 step 3).
    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.track_id.0.cmp(&b.track_id.0)));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(t: u32, track: &str) -> Posting {
        Posting {
            anchor_time: t,
            track_id: TrackId::new(track),
        }
    }

    #[test]
    fn no_key_overlap_returns_empty_ranking() {
        let mut index = Index::new();
        let mut batch = HashMap::new();
        batch.insert(HashKey { f1: 1, f2: 2, dt: 3 }, vec![posting(0, "a")]);
        index.merge(batch);

        let mut query = HashMap::new();
        query.insert(HashKey { f1: 9, f2: 9, dt: 9 }, vec![posting(0, "q")]);

        assert!(rank(&query, &index).is_empty());
    }

    #[test]
    fn coherent_offsets_outscore_scattered_ones() {
        let mut index = Index::new();
        let mut batch = HashMap::new();
        // track "coherent": every posting sits at a constant offset (100) from
        // the query's anchor times, so all diffs land in one bin.
        for t in 0..10u32 {
            let key = HashKey { f1: t, f2: t, dt: 0 };
            batch
                .entry(key)
                .or_insert_with(Vec::new)
                .push(posting(t + 100, "coherent"));
        }
        // track "scattered": offsets spread far apart so they fall in
        // different 150-wide bins.
        for (i, t) in (0..10u32).enumerate() {
            let key = HashKey { f1: t, f2: t, dt: 0 };
            batch
                .entry(key)
                .or_insert_with(Vec::new)
                .push(posting(t + (i as u32) * 1000, "scattered"));
        }
        index.merge(batch);

        let mut query = HashMap::new();
        for t in 0..10u32 {
            let key = HashKey { f1: t, f2: t, dt: 0 };
            query.entry(key).or_insert_with(Vec::new).push(posting(t, "q"));
        }

        let ranked = rank(&query, &index);
        assert_eq!(ranked[0].track_id, TrackId::new("coherent"));
        assert_eq!(ranked[0].score, 10);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn equal_scores_break_ties_by_track_id_deterministically() {
        let mut index = Index::new();
        let mut batch = HashMap::new();
        for track in ["zeta", "alpha", "mu"] {
            let key = HashKey { f1: 0, f2: 0, dt: 0 };
            batch
                .entry(key)
                .or_insert_with(Vec::new)
                .push(posting(0, track));
        }
        index.merge(batch);

        let mut query = HashMap::new();
        query.insert(HashKey { f1: 0, f2: 0, dt: 0 }, vec![posting(0, "q")]);

        // all three tracks score identically; ranking must be by track_id,
        // not by HashMap iteration order, across repeated calls.
        for _ in 0..5 {
            let ranked = rank(&query, &index);
            let names: Vec<&str> = ranked.iter().map(|r| r.track_id.0.as_str()).collect();
            assert_eq!(names, vec!["alpha", "mu", "zeta"]);
        }
    }
}
