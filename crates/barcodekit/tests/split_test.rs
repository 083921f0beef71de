//! End-to-end split tests: bucket assignment, determinism, and pruning.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use barcodekit::error::BarcodekitError;
use barcodekit::split::{SplitBucket, SplitConfig, SplitPolicy, split_file};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// An anchor class with enough singleton groups that `seen_train` is never
/// empty, keeping the taxdump prune step satisfiable regardless of how the
/// scenario under test hashes out.
const ANCHOR_LABEL: &str = "Anchor species";

fn anchor_records() -> Vec<(String, String)> {
    (0..12)
        .map(|i| (format!("ANC{i:02}"), format!("{}ACGTACGT", "T".repeat(i + 1))))
        .collect()
}

fn write_fasta(path: &Path, records: &[(String, String)]) {
    let mut content = String::new();
    for (id, seq) in records {
        content.push_str(&format!(">{id}\n{seq}\n"));
    }
    fs::write(path, content).unwrap();
}

fn write_labels(path: &Path, pairs: &[(String, String)]) {
    let mut content = String::from("processid\tspecies\n");
    for (pid, label) in pairs {
        content.push_str(&format!("{pid}\t{label}\n"));
    }
    fs::write(path, content).unwrap();
}

fn write_taxdump(dir: &Path, pids: &[String]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("nodes.dmp"),
        "1\t|\t1\t|\tno rank\t|\n\
         10\t|\t1\t|\tgenus\t|\n\
         100\t|\t10\t|\tspecies\t|\n\
         55\t|\t1\t|\tgenus\t|\n",
    )
    .unwrap();
    fs::write(
        dir.join("names.dmp"),
        "1\t|\troot\t|\t\t|\tscientific name\t|\n\
         10\t|\tAnchor\t|\t\t|\tscientific name\t|\n\
         100\t|\tAnchor species\t|\t\t|\tscientific name\t|\n\
         55\t|\tUnrelated\t|\t\t|\tscientific name\t|\n",
    )
    .unwrap();
    let mut map = String::new();
    for pid in pids {
        map.push_str(&format!("{pid}\t100\n"));
    }
    fs::write(dir.join("taxid.map"), map).unwrap();
}

fn run_split(tmp: &Path, records: &[(String, String)], labels: &[(String, String)]) -> SplitConfig {
    let input = tmp.join("input.fasta");
    let labels_path = tmp.join("labels.tsv");
    let taxdump_dir = tmp.join("taxdump");
    write_fasta(&input, records);
    write_labels(&labels_path, labels);
    write_taxdump(&taxdump_dir, &records.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>());
    SplitConfig {
        input,
        out_dir: tmp.join("out"),
        labels_path,
        taxdump_dir,
        taxid_map: None,
        classifiers: vec!["blast".to_string()],
        policy: SplitPolicy::default(),
    }
}

fn bucket_ids(out_dir: &Path) -> HashMap<SplitBucket, Vec<String>> {
    let mut by_bucket = HashMap::new();
    for bucket in SplitBucket::ALL {
        let content = fs::read_to_string(out_dir.join(bucket.file_name())).unwrap();
        let ids: Vec<String> = content
            .lines()
            .filter_map(|l| l.strip_prefix('>'))
            .map(String::from)
            .collect();
        by_bucket.insert(bucket, ids);
    }
    by_bucket
}

fn seq_hash(seq: &str) -> [u8; 32] {
    Sha256::digest(seq.as_bytes()).into()
}

#[test]
fn every_record_lands_in_exactly_one_bucket() {
    let tmp = TempDir::new().unwrap();
    let mut records = anchor_records();
    // A small class, a conflict pair, and an unlabeled record.
    records.push(("SM1".to_string(), "CCCCAAAA".to_string()));
    records.push(("SM2".to_string(), "CCCCTTTT".to_string()));
    records.push(("CF1".to_string(), "GGGGCCCC".to_string()));
    records.push(("CF2".to_string(), "GGGGCCCC".to_string()));
    records.push(("NOLABEL".to_string(), "AACCGGTT".to_string()));

    let mut labels: Vec<(String, String)> = records
        .iter()
        .filter(|(id, _)| id.starts_with("ANC"))
        .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string()))
        .collect();
    labels.push(("SM1".to_string(), "Small classus".to_string()));
    labels.push(("SM2".to_string(), "Small classus".to_string()));
    labels.push(("CF1".to_string(), "Conflict one".to_string()));
    labels.push(("CF2".to_string(), "Conflict two".to_string()));

    let cfg = run_split(tmp.path(), &records, &labels);
    let report = split_file(&cfg).unwrap();

    assert_eq!(report.stats.total_records, records.len() as u64);
    assert_eq!(report.stats.bucket_total(), report.stats.total_records);

    let by_bucket = bucket_ids(&cfg.out_dir);
    let mut seen: HashSet<String> = HashSet::new();
    for ids in by_bucket.values() {
        for id in ids {
            assert!(seen.insert(id.clone()), "id {id} appears in two buckets");
        }
    }
    assert_eq!(seen.len(), records.len());

    // Conflicting-label duplicates and the unlabeled record go to pretrain.
    let pretrain = &by_bucket[&SplitBucket::Pretrain];
    for id in ["CF1", "CF2", "NOLABEL"] {
        assert!(pretrain.contains(&id.to_string()), "{id} not in pretrain");
    }
}

#[test]
fn seen_class_quotas_consume_hash_ordered_groups() {
    let tmp = TempDir::new().unwrap();

    // One seen class with barcode groups of sizes 6/3/1 (total 10):
    // test quota = min(25, ceil(2*10/10)) = 2, val quota = ceil(8/20) = 1.
    let seqs = ["ACGTACGTAA", "TGCATGCAGG", "GATTACAGAT"];
    let mut records = Vec::new();
    for i in 0..6 {
        records.push((format!("G1_{i}"), seqs[0].to_string()));
    }
    for i in 0..3 {
        records.push((format!("G2_{i}"), seqs[1].to_string()));
    }
    records.push(("G3_0".to_string(), seqs[2].to_string()));
    records.extend(anchor_records());

    let mut labels: Vec<(String, String)> = records
        .iter()
        .filter(|(id, _)| id.starts_with('G'))
        .map(|(id, _)| (id.clone(), "Homo sapiens".to_string()))
        .collect();
    labels.extend(
        records
            .iter()
            .filter(|(id, _)| id.starts_with("ANC"))
            .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string())),
    );

    let cfg = run_split(tmp.path(), &records, &labels);
    let report = split_file(&cfg).unwrap();
    assert_eq!(report.stats.seen_classes, 2);

    // Recompute the expected assignment from the documented policy: groups
    // ordered by ascending sequence hash, quotas consumed in
    // test -> val -> train order by group occupancy.
    let mut groups: Vec<(usize, u64)> = vec![(0, 6), (1, 3), (2, 1)];
    groups.sort_by_key(|(i, _)| seq_hash(seqs[*i]));
    let mut expected: HashMap<usize, SplitBucket> = HashMap::new();
    let mut idx = 0;
    for (bucket, quota) in [
        (SplitBucket::SeenTest, Some(2u64)),
        (SplitBucket::SeenVal, Some(1)),
        (SplitBucket::SeenTrain, None),
    ] {
        match quota {
            None => {
                while idx < groups.len() {
                    expected.insert(groups[idx].0, bucket);
                    idx += 1;
                }
            }
            Some(quota) => {
                let mut acc = 0;
                while idx < groups.len() && acc < quota {
                    expected.insert(groups[idx].0, bucket);
                    acc += groups[idx].1;
                    idx += 1;
                }
            }
        }
    }

    let by_bucket = bucket_ids(&cfg.out_dir);
    for (group_idx, bucket) in &expected {
        let prefix = format!("G{}_", group_idx + 1);
        let members: usize = by_bucket[bucket]
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .count();
        let group_size = [6usize, 3, 1][*group_idx];
        assert_eq!(
            members, group_size,
            "group {prefix} expected whole in {bucket:?}"
        );
    }
}

#[test]
fn small_class_routes_by_label_hash() {
    let tmp = TempDir::new().unwrap();
    let label = "Tiny classling";
    let mut records = anchor_records();
    records.push(("T1".to_string(), "AAAACCCCGGGG".to_string()));
    records.push(("T2".to_string(), "AAAACCCCGGGT".to_string()));

    let mut labels: Vec<(String, String)> = records
        .iter()
        .filter(|(id, _)| id.starts_with("ANC"))
        .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string()))
        .collect();
    labels.push(("T1".to_string(), label.to_string()));
    labels.push(("T2".to_string(), label.to_string()));

    let cfg = run_split(tmp.path(), &records, &labels);
    let report = split_file(&cfg).unwrap();
    let by_bucket = bucket_ids(&cfg.out_dir);

    let unseen_selector = Sha256::digest(label.as_bytes())[0] < 128;
    let tiny_in = |bucket: SplitBucket| {
        by_bucket[&bucket]
            .iter()
            .filter(|id| id.starts_with('T'))
            .count()
    };
    let unseen_total = tiny_in(SplitBucket::UnseenTest)
        + tiny_in(SplitBucket::UnseenVal)
        + tiny_in(SplitBucket::UnseenKeys);
    let heldout_total = tiny_in(SplitBucket::OtherHeldout);

    if unseen_selector {
        assert_eq!(unseen_total, 2);
        assert_eq!(heldout_total, 0);
        assert_eq!(report.stats.unseen_classes, 1);
    } else {
        assert_eq!(unseen_total, 0);
        assert_eq!(heldout_total, 2);
        assert_eq!(report.stats.heldout_classes, 1);
    }
}

#[test]
fn split_is_deterministic_and_order_independent() {
    let tmp = TempDir::new().unwrap();
    let mut records = anchor_records();
    records.push(("X1".to_string(), "ACACACACAC".to_string()));
    records.push(("X2".to_string(), "GTGTGTGTGT".to_string()));
    let mut labels: Vec<(String, String)> = records
        .iter()
        .filter(|(id, _)| id.starts_with("ANC"))
        .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string()))
        .collect();
    labels.push(("X1".to_string(), "Extra species".to_string()));
    labels.push(("X2".to_string(), "Extra species".to_string()));

    let dir_a = tmp.path().join("run_a");
    let dir_b = tmp.path().join("run_b");
    fs::create_dir_all(&dir_a).unwrap();
    fs::create_dir_all(&dir_b).unwrap();

    let cfg_a = run_split(&dir_a, &records, &labels);
    split_file(&cfg_a).unwrap();

    let mut reversed = records.clone();
    reversed.reverse();
    let cfg_b = run_split(&dir_b, &reversed, &labels);
    split_file(&cfg_b).unwrap();

    let id_bucket = |out_dir: &Path| -> HashMap<String, SplitBucket> {
        bucket_ids(out_dir)
            .into_iter()
            .flat_map(|(bucket, ids)| ids.into_iter().map(move |id| (id, bucket)))
            .collect()
    };
    assert_eq!(id_bucket(&cfg_a.out_dir), id_bucket(&cfg_b.out_dir));

    // Identical input twice: identical files byte for byte.
    let dir_c = tmp.path().join("run_c");
    fs::create_dir_all(&dir_c).unwrap();
    let cfg_c = run_split(&dir_c, &records, &labels);
    split_file(&cfg_c).unwrap();
    for bucket in SplitBucket::ALL {
        let a = fs::read(cfg_a.out_dir.join(bucket.file_name())).unwrap();
        let c = fs::read(cfg_c.out_dir.join(bucket.file_name())).unwrap();
        assert_eq!(a, c, "bucket {} differs across reruns", bucket.id());
    }
}

#[test]
fn duplicate_processid_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let records = vec![
        ("P1".to_string(), "ACGT".to_string()),
        ("P1".to_string(), "TTTT".to_string()),
    ];
    let labels = vec![("P1".to_string(), "Homo sapiens".to_string())];
    let cfg = run_split(tmp.path(), &records, &labels);
    let err = split_file(&cfg).unwrap_err();
    assert!(matches!(err, BarcodekitError::Integrity(_)));
}

#[test]
fn conflicting_labels_for_one_processid_are_fatal() {
    let tmp = TempDir::new().unwrap();
    let records = anchor_records();
    let mut labels: Vec<(String, String)> = records
        .iter()
        .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string()))
        .collect();
    labels.push(("ANC00".to_string(), "Different species".to_string()));

    let cfg = run_split(tmp.path(), &records, &labels);
    let err = split_file(&cfg).unwrap_err();
    assert!(matches!(err, BarcodekitError::Integrity(_)));
}

#[test]
fn pruned_taxdump_is_exact_ancestor_closure() {
    let tmp = TempDir::new().unwrap();
    let records = anchor_records();
    let labels: Vec<(String, String)> = records
        .iter()
        .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string()))
        .collect();

    let cfg = run_split(tmp.path(), &records, &labels);
    let report = split_file(&cfg).unwrap();

    // All anchor records map to taxid 100 with chain 100 -> 10 -> 1; the
    // unrelated node 55 must be pruned away.
    assert_eq!(report.pruned_taxids, 3);
    let nodes = fs::read_to_string(cfg.out_dir.join("taxdump_pruned/nodes.dmp")).unwrap();
    let kept: HashSet<i64> = nodes
        .lines()
        .filter_map(|l| l.split("\t|\t").next())
        .filter_map(|s| s.parse().ok())
        .collect();
    assert_eq!(kept, HashSet::from([1, 10, 100]));

    // Pruned taxid.map lists exactly the seen_train process ids, sorted.
    let by_bucket = bucket_ids(&cfg.out_dir);
    let mut train_ids = by_bucket[&SplitBucket::SeenTrain].clone();
    train_ids.sort();
    let map = fs::read_to_string(cfg.out_dir.join("taxdump_pruned/taxid.map")).unwrap();
    let mapped: Vec<String> = map
        .lines()
        .filter_map(|l| l.split('\t').next())
        .map(String::from)
        .collect();
    assert_eq!(mapped, train_ids);
}

#[test]
fn split_report_is_written_with_stats() {
    let tmp = TempDir::new().unwrap();
    let records = anchor_records();
    let labels: Vec<(String, String)> = records
        .iter()
        .map(|(id, _)| (id.clone(), ANCHOR_LABEL.to_string()))
        .collect();

    let cfg = run_split(tmp.path(), &records, &labels);
    split_file(&cfg).unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cfg.out_dir.join("split_report.json")).unwrap())
            .unwrap();
    assert_eq!(report["classifiers"], serde_json::json!(["blast"]));
    assert_eq!(report["stats"]["total_records"], 12);
    assert_eq!(report["stats"]["total_classes"], 1);
    assert_eq!(report["pruned_taxids"], 3);
}
