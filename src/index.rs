//! Index store (spec §4.5): in-memory inverted index with bulk
//! insert/merge and atomic serialise/deserialise to a persistent
//! file. Grounded in `examples/original_source/functions.py`'s
//! `open_index_file`/`save_index_file` (there, a Python pickle; here,
//! a versioned bincode container, per spec §4.5's allowance for a
//! native format on fresh deployments).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::INDEX_FORMAT_VERSION;
use crate::error::{LoadError, SaveError};
use crate::types::{HashKey, Posting};

const MAGIC: &[u8; 8] = b"RAZAMIDX";

/// Inverted mapping `hash key -> postings` (spec §3). Every key
/// present has at least one posting (spec §3, invariant 2); duplicate
/// postings within a key are permitted and never deduplicated (spec
/// §3, invariant: "additive-only").
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Index {
    entries: HashMap<HashKey, Vec<Posting>>,
}

impl Index {
    pub fn new() -> Self {
        Index::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &HashKey) -> Option<&[Posting]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HashKey, &Vec<Posting>)> {
        self.entries.iter()
    }

    /// Inserts every posting of `batch` into `self`, appending to
    /// existing posting lists with no deduplication (spec §3, §4.5).
    pub fn merge(&mut self, batch: HashMap<HashKey, Vec<Posting>>) {
        for (key, mut postings) in batch {
            self.entries.entry(key).or_default().append(&mut postings);
        }
    }

    /// Merges another whole index into `self`, same semantics as
    /// `merge` applied to its postings.
    pub fn merge_index(&mut self, other: Index) {
        self.merge(other.entries);
    }

    /// Persists the index atomically: writes to a temporary sibling
    /// file, then renames it into place, so a crash or I/O failure
    /// mid-write never leaves a corrupt file at `path` (spec §7).
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let tmp_path = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path).map_err(|source| SaveError::Io {
                path: tmp_path.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(file);
            writer.write_all(MAGIC).map_err(|source| SaveError::Io {
                path: tmp_path.clone(),
                source,
            })?;
            writer
                .write_all(&INDEX_FORMAT_VERSION.to_le_bytes())
                .map_err(|source| SaveError::Io {
                    path: tmp_path.clone(),
                    source,
                })?;
            bincode::serialize_into(&mut writer, self)?;
            writer.flush().map_err(|source| SaveError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        }
        std::fs::rename(&tmp_path, path).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Loads a previously saved index. `load(save(x)) == x` (spec §8,
    /// invariant 3).
    pub fn load(path: &Path) -> Result<Index, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if &magic != MAGIC {
            return Err(LoadError::Malformed {
                path: path.to_path_buf(),
                reason: "missing index magic header".to_string(),
            });
        }

        let mut version_bytes = [0u8; 4];
        reader
            .read_exact(&mut version_bytes)
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let version = u32::from_le_bytes(version_bytes);
        if version != INDEX_FORMAT_VERSION {
            return Err(LoadError::VersionMismatch {
                path: path.to_path_buf(),
                found: version,
                expected: INDEX_FORMAT_VERSION,
            });
        }

        bincode::deserialize_from(&mut reader).map_err(|e| LoadError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackId;

    fn posting(t: u32, track: &str) -> Posting {
        Posting {
            anchor_time: t,
            track_id: TrackId::new(track),
        }
    }

    #[test]
    fn merge_appends_without_dedup() {
        let mut index = Index::new();
        let key = HashKey { f1: 1, f2: 2, dt: 3 };

        let mut batch_a = HashMap::new();
        batch_a.insert(key, vec![posting(1, "a")]);
        index.merge(batch_a);

        let mut batch_b = HashMap::new();
        batch_b.insert(key, vec![posting(1, "a")]);
        index.merge(batch_b);

        assert_eq!(index.get(&key).unwrap().len(), 2);
    }

    /// Postings within a key may land in a different order depending
    /// on merge order; the index equality the spec cares about is up
    /// to that ordering (spec §8, invariant 4).
    fn assert_index_eq_up_to_posting_order(a: &Index, b: &Index) {
        assert_eq!(a.entries.len(), b.entries.len());
        for (key, postings_a) in &a.entries {
            let postings_b = b.entries.get(key).expect("key present in both indexes");
            let mut sorted_a = postings_a.clone();
            let mut sorted_b = postings_b.clone();
            let sort_key = |p: &Posting| (p.anchor_time, p.track_id.0.clone());
            sorted_a.sort_by_key(sort_key);
            sorted_b.sort_by_key(sort_key);
            assert_eq!(sorted_a, sorted_b);
        }
    }

    #[test]
    fn merge_is_associative_and_has_identity() {
        let key1 = HashKey { f1: 1, f2: 2, dt: 3 };
        let key2 = HashKey { f1: 4, f2: 5, dt: -6 };

        let mut a = Index::new();
        let mut ba = HashMap::new();
        ba.insert(key1, vec![posting(1, "a")]);
        a.merge(ba);

        let mut b = Index::new();
        let mut bb = HashMap::new();
        bb.insert(key2, vec![posting(2, "b")]);
        b.merge(bb);

        let mut c = Index::new();
        let mut bc = HashMap::new();
        bc.insert(key1, vec![posting(3, "c")]);
        c.merge(bc);

        let mut left = a.clone();
        left.merge(b.entries.clone());
        left.merge(c.entries.clone());

        let mut bc_merged = b.clone();
        bc_merged.merge(c.entries.clone());
        let mut right = a.clone();
        right.merge(bc_merged.entries.clone());

        assert_index_eq_up_to_posting_order(&left, &right);

        let mut with_identity = a.clone();
        with_identity.merge(Index::new().entries);
        assert_index_eq_up_to_posting_order(&with_identity, &a);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");

        let mut index = Index::new();
        let mut batch = HashMap::new();
        batch.insert(HashKey { f1: 1, f2: 2, dt: 3 }, vec![posting(10, "a")]);
        index.merge(batch);

        index.save(&path).unwrap();
        let loaded = Index::load(&path).unwrap();
        assert_eq!(index, loaded);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");
        assert!(matches!(Index::load(&path), Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn load_rejects_mismatched_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(MAGIC).unwrap();
        file.write_all(&999u32.to_le_bytes()).unwrap();
        drop(file);

        assert!(matches!(
            Index::load(&path),
            Err(LoadError::VersionMismatch { .. })
        ));
    }
}
