//! Open-world/closed-world dataset partitioning.
//!
//! Records are grouped by exact sequence identity and each species label's
//! barcode groups are assigned to split buckets by a deterministic,
//! hash-derived order. Because both the group order and the seen/unseen
//! selector derive from content hashes, appending new records to a growing
//! dataset never reshuffles prior assignments.

mod plan;
mod runner;

use serde::{Deserialize, Serialize};

pub use plan::{SplitPlan, build_plan};
pub use runner::{SplitConfig, split_file};

/// The eight split buckets. Every input record lands in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitBucket {
    SeenTrain,
    SeenVal,
    SeenTest,
    UnseenTest,
    UnseenVal,
    UnseenKeys,
    OtherHeldout,
    Pretrain,
}

impl SplitBucket {
    /// All buckets, in stable output order.
    pub const ALL: [SplitBucket; 8] = [
        SplitBucket::SeenTrain,
        SplitBucket::SeenVal,
        SplitBucket::SeenTest,
        SplitBucket::UnseenTest,
        SplitBucket::UnseenVal,
        SplitBucket::UnseenKeys,
        SplitBucket::OtherHeldout,
        SplitBucket::Pretrain,
    ];

    /// Stable string identifier.
    pub fn id(&self) -> &'static str {
        match self {
            SplitBucket::SeenTrain => "seen_train",
            SplitBucket::SeenVal => "seen_val",
            SplitBucket::SeenTest => "seen_test",
            SplitBucket::UnseenTest => "test_unseen",
            SplitBucket::UnseenVal => "val_unseen",
            SplitBucket::UnseenKeys => "keys_unseen",
            SplitBucket::OtherHeldout => "other_heldout",
            SplitBucket::Pretrain => "pretrain",
        }
    }

    /// Fixed output filename for this bucket.
    pub fn file_name(&self) -> &'static str {
        match self {
            SplitBucket::SeenTrain => "seen_train.fasta",
            SplitBucket::SeenVal => "seen_val.fasta",
            SplitBucket::SeenTest => "seen_test.fasta",
            SplitBucket::UnseenTest => "test_unseen.fasta",
            SplitBucket::UnseenVal => "val_unseen.fasta",
            SplitBucket::UnseenKeys => "keys_unseen.fasta",
            SplitBucket::OtherHeldout => "other_heldout.fasta",
            SplitBucket::Pretrain => "pretrain.fasta",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// Policy constants for seen/unseen/heldout classification.
///
/// The numeric values carry no stated derivation; they are preserved as
/// named, overridable fields rather than re-derived.
#[derive(Debug, Clone)]
pub struct SplitPolicy {
    /// Minimum record count for a label to qualify as a seen class.
    pub min_seen_records: u64,
    /// Minimum distinct barcode groups for a label to qualify as seen.
    pub min_seen_groups: usize,
    /// Cap on per-label test records in both seen and unseen classes.
    pub max_test_records: u64,
    /// Labels whose hash byte falls below this go to the unseen class;
    /// the rest are held out.
    pub unseen_hash_threshold: u8,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            min_seen_records: 8,
            min_seen_groups: 2,
            max_test_records: 25,
            unseen_hash_threshold: 128,
        }
    }
}

/// Per-run split statistics for the JSON report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitStats {
    pub total_records: u64,
    pub total_classes: u64,
    pub seen_classes: u64,
    pub unseen_classes: u64,
    pub heldout_classes: u64,
    pub seen_train_records: u64,
    pub seen_val_records: u64,
    pub seen_test_records: u64,
    pub test_unseen_records: u64,
    pub val_unseen_records: u64,
    pub keys_unseen_records: u64,
    pub other_heldout_records: u64,
    pub pretrain_records: u64,
}

impl SplitStats {
    /// Store the written record count for one bucket.
    pub fn set_bucket_records(&mut self, bucket: SplitBucket, count: u64) {
        match bucket {
            SplitBucket::SeenTrain => self.seen_train_records = count,
            SplitBucket::SeenVal => self.seen_val_records = count,
            SplitBucket::SeenTest => self.seen_test_records = count,
            SplitBucket::UnseenTest => self.test_unseen_records = count,
            SplitBucket::UnseenVal => self.val_unseen_records = count,
            SplitBucket::UnseenKeys => self.keys_unseen_records = count,
            SplitBucket::OtherHeldout => self.other_heldout_records = count,
            SplitBucket::Pretrain => self.pretrain_records = count,
        }
    }

    /// Sum of all per-bucket record counts.
    pub fn bucket_total(&self) -> u64 {
        self.seen_train_records
            + self.seen_val_records
            + self.seen_test_records
            + self.test_unseen_records
            + self.val_unseen_records
            + self.keys_unseen_records
            + self.other_heldout_records
            + self.pretrain_records
    }
}

/// JSON split report emitted next to the bucket files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    pub input: String,
    pub out_dir: String,
    pub classifiers: Vec<String>,
    pub pruned_taxids: usize,
    pub stats: SplitStats,
}
