//! Pass 1: barcode grouping and hash-ordered bucket assignment.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::seqio;

use super::{SplitBucket, SplitPolicy, SplitStats};

/// Content hash keying a barcode group (records with byte-identical
/// sequences).
pub type SeqHash = [u8; 32];

/// Hash raw sequence bytes into a group key.
pub fn seq_hash(seq: &[u8]) -> SeqHash {
    Sha256::digest(seq).into()
}

/// Pseudo-random but reproducible per-label selector byte.
fn label_hash_byte(label: &str) -> u8 {
    Sha256::digest(label.as_bytes())[0]
}

fn ceil_div(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 { 0 } else { a.div_ceil(b) }
}

/// One barcode group during pass 1.
#[derive(Debug, Default)]
struct BarcodeGroup {
    label: String,
    count: u64,
    conflict: bool,
}

/// A group queued for per-label assignment.
struct GroupUnit {
    hash: SeqHash,
    count: u64,
}

/// Frozen pass-1 decisions consumed by pass 2.
#[derive(Debug, Default)]
pub struct SplitPlan {
    seq_bucket: HashMap<SeqHash, SplitBucket>,
    conflicted: HashSet<SeqHash>,
    invalid_ids: HashSet<String>,
}

impl SplitPlan {
    /// Resolve the bucket for one record.
    ///
    /// Invalid ids, missing labels, conflicted groups, and sequences with no
    /// pass-1 decision all fall through to `Pretrain`.
    pub fn bucket_for(&self, id: &str, has_label: bool, hash: &SeqHash) -> SplitBucket {
        if self.invalid_ids.contains(id) || !has_label || self.conflicted.contains(hash) {
            return SplitBucket::Pretrain;
        }
        self.seq_bucket
            .get(hash)
            .copied()
            .unwrap_or(SplitBucket::Pretrain)
    }

    /// Number of conflicted barcode groups.
    pub fn conflicted_groups(&self) -> usize {
        self.conflicted.len()
    }

    /// Number of records excluded up front for invalid/missing ids.
    pub fn invalid_ids(&self) -> usize {
        self.invalid_ids.len()
    }
}

/// Build the split plan by streaming `input` once.
///
/// Groups records by sequence hash, flags label conflicts within a group,
/// then partitions every label's groups into buckets in ascending hash
/// order. Records listed in `invalid_ids` are excluded from grouping and
/// will be routed to `Pretrain` in pass 2.
pub fn build_plan(
    input: &Path,
    labels: &HashMap<String, String>,
    invalid_ids: HashSet<String>,
    policy: &SplitPolicy,
) -> Result<(SplitPlan, SplitStats)> {
    let mut groups: IndexMap<SeqHash, BarcodeGroup> = IndexMap::new();
    let mut stats = SplitStats::default();
    let mut invalid_ids = invalid_ids;

    let reader = seqio::open_input(input)?;
    seqio::read_fasta(reader, input, |rec| {
        stats.total_records += 1;
        if invalid_ids.contains(&rec.id) {
            return Ok(());
        }
        let Some(label) = labels.get(&rec.id) else {
            invalid_ids.insert(rec.id);
            return Ok(());
        };

        let group = groups.entry(seq_hash(&rec.seq)).or_default();
        if group.count == 0 {
            group.label = label.clone();
        } else if group.label != *label {
            group.conflict = true;
        }
        group.count += 1;
        Ok(())
    })?;

    let mut seq_bucket = HashMap::with_capacity(groups.len());
    let mut conflicted = HashSet::new();
    let mut species_units: IndexMap<&str, Vec<GroupUnit>> = IndexMap::new();
    let mut species_totals: HashMap<&str, u64> = HashMap::new();

    for (hash, group) in &groups {
        if group.conflict {
            conflicted.insert(*hash);
            continue;
        }
        species_units.entry(group.label.as_str()).or_default().push(GroupUnit {
            hash: *hash,
            count: group.count,
        });
        *species_totals.entry(group.label.as_str()).or_insert(0) += group.count;
    }

    stats.total_classes = species_units.len() as u64;
    for (label, mut units) in species_units {
        let total = species_totals.get(label).copied().unwrap_or(0);
        units.sort_by(|a, b| a.hash.cmp(&b.hash));

        if total >= policy.min_seen_records && units.len() >= policy.min_seen_groups {
            stats.seen_classes += 1;
            let test = policy.max_test_records.min(ceil_div(2 * total, 10));
            let val = ceil_div(total - test, 20);
            assign_units(
                &mut seq_bucket,
                &units,
                &[
                    (SplitBucket::SeenTest, Some(test)),
                    (SplitBucket::SeenVal, Some(val)),
                    (SplitBucket::SeenTrain, None),
                ],
            );
        } else if label_hash_byte(label) < policy.unseen_hash_threshold {
            stats.unseen_classes += 1;
            let test = policy.max_test_records.min(ceil_div(2 * total, 10));
            let val = ceil_div(total - test, 5);
            assign_units(
                &mut seq_bucket,
                &units,
                &[
                    (SplitBucket::UnseenTest, Some(test)),
                    (SplitBucket::UnseenVal, Some(val)),
                    (SplitBucket::UnseenKeys, None),
                ],
            );
        } else {
            stats.heldout_classes += 1;
            for unit in &units {
                seq_bucket.insert(unit.hash, SplitBucket::OtherHeldout);
            }
        }
    }

    Ok((
        SplitPlan {
            seq_bucket,
            conflicted,
            invalid_ids,
        },
        stats,
    ))
}

/// Consume hash-ordered groups into each bucket until its record quota is
/// met; a `None` target absorbs all remaining groups.
fn assign_units(
    seq_bucket: &mut HashMap<SeqHash, SplitBucket>,
    units: &[GroupUnit],
    targets: &[(SplitBucket, Option<u64>)],
) {
    let mut idx = 0;
    for (bucket, target) in targets {
        match target {
            None => {
                for unit in &units[idx..] {
                    seq_bucket.insert(unit.hash, *bucket);
                }
                return;
            }
            Some(target) => {
                let mut acc = 0;
                while idx < units.len() && acc < *target {
                    seq_bucket.insert(units[idx].hash, *bucket);
                    acc += units[idx].count;
                    idx += 1;
                }
            }
        }
        if idx >= units.len() {
            return;
        }
    }
}
