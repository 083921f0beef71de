//! Pass 2: bucket file writing, taxonomy pruning, and the split report.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{BarcodekitError, Result};
use crate::label;
use crate::seqio;
use crate::taxdump;

use super::plan::{build_plan, seq_hash};
use super::{SplitBucket, SplitPolicy, SplitReport, SplitStats};

/// Options for one split run.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Input FASTA (optionally gzipped).
    pub input: PathBuf,
    /// Output directory for bucket files and reports.
    pub out_dir: PathBuf,
    /// Taxonkit-style TSV mapping processid to species label.
    pub labels_path: PathBuf,
    /// Directory holding nodes.dmp/names.dmp/taxid.map.
    pub taxdump_dir: PathBuf,
    /// Optional taxid.map override.
    pub taxid_map: Option<PathBuf>,
    /// Classifier names recorded in the report; formatting is external.
    pub classifiers: Vec<String>,
    /// Seen/unseen/heldout policy constants.
    pub policy: SplitPolicy,
}

/// Run the full split: plan, write bucket FASTAs, prune the taxdump
/// restricted to `seen_train`, and write `split_report.json`.
pub fn split_file(cfg: &SplitConfig) -> Result<SplitReport> {
    if cfg.classifiers.is_empty() {
        return Err(BarcodekitError::Config(
            "classifier list must not be empty".to_string(),
        ));
    }

    let fasta_ids = collect_fasta_ids(&cfg.input)?;
    let (labels, invalid_ids) = load_label_map(&cfg.labels_path, &fasta_ids)?;

    let (plan, mut stats) = build_plan(&cfg.input, &labels, invalid_ids, &cfg.policy)?;

    let (counts, seen_train_ids) = write_bucket_fastas(&cfg.input, &cfg.out_dir, &plan, &labels)?;
    for bucket in SplitBucket::ALL {
        stats.set_bucket_records(bucket, counts[bucket.index()]);
    }

    let pruned = taxdump::prune_for_train(
        &seen_train_ids,
        &cfg.taxdump_dir,
        cfg.taxid_map.as_deref(),
        &cfg.out_dir,
    )?;

    let report = SplitReport {
        input: cfg.input.display().to_string(),
        out_dir: cfg.out_dir.display().to_string(),
        classifiers: cfg.classifiers.clone(),
        pruned_taxids: pruned.kept,
        stats,
    };
    let report_path = cfg.out_dir.join("split_report.json");
    let file = File::create(&report_path).map_err(|e| BarcodekitError::io(&report_path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
    Ok(report)
}

/// Collect all record ids, failing on duplicates, empty ids, or empty input.
fn collect_fasta_ids(input: &Path) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    let reader = seqio::open_input(input)?;
    seqio::read_fasta(reader, input, |rec| {
        if rec.id.is_empty() {
            return Err(BarcodekitError::Integrity(format!(
                "FASTA record with empty id in {}",
                input.display()
            )));
        }
        if !ids.insert(rec.id.clone()) {
            return Err(BarcodekitError::Integrity(format!(
                "duplicate processid in input FASTA: {}",
                rec.id
            )));
        }
        Ok(())
    })?;
    if ids.is_empty() {
        return Err(BarcodekitError::EmptyInput(input.to_path_buf()));
    }
    Ok(ids)
}

/// Load the processid -> species label map for the wanted ids.
///
/// Ids with empty or placeholder labels, and wanted ids absent from the
/// file, are returned as invalid (they route to `Pretrain`). A processid
/// mapped to two different labels is a fatal integrity error.
fn load_label_map(
    path: &Path,
    wanted: &HashSet<String>,
) -> Result<(HashMap<String, String>, HashSet<String>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(seqio::open_input(path)?);

    let headers = reader.headers()?.clone();
    let idx_process = headers.iter().position(|h| h == "processid");
    let idx_species = headers.iter().position(|h| h == "species");
    let (Some(idx_process), Some(idx_species)) = (idx_process, idx_species) else {
        return Err(BarcodekitError::MissingHeaders {
            path: path.to_path_buf(),
            needed: "processid, species".to_string(),
        });
    };

    let mut labels: HashMap<String, String> = HashMap::with_capacity(wanted.len());
    let mut invalid: HashSet<String> = HashSet::new();
    let mut line: u64 = 1;

    for row in reader.records() {
        line += 1;
        let row = row?;
        let pid = row.get(idx_process).unwrap_or("");
        if pid.is_empty() {
            return Err(BarcodekitError::Row {
                path: path.to_path_buf(),
                line,
                message: "empty processid".to_string(),
            });
        }
        if !wanted.contains(pid) {
            continue;
        }

        let species = label::normalize_label(row.get(idx_species).unwrap_or(""));
        if species.is_empty() {
            invalid.insert(pid.to_string());
            continue;
        }
        if let Some(prev) = labels.get(pid) {
            if *prev != species {
                return Err(BarcodekitError::Integrity(format!(
                    "processid {pid} maps to multiple labels ({prev}, {species}) at {}:{line}",
                    path.display()
                )));
            }
            continue;
        }
        labels.insert(pid.to_string(), species);
    }

    for pid in wanted {
        if !labels.contains_key(pid) {
            invalid.insert(pid.clone());
        }
    }
    if labels.is_empty() {
        return Err(BarcodekitError::Integrity(format!(
            "label input has no matching process ids for input FASTA: {}",
            path.display()
        )));
    }
    Ok((labels, invalid))
}

/// Re-stream the input and write each record into its bucket file.
///
/// Returns per-bucket record counts (indexed by `SplitBucket::index`) and
/// the set of process ids written to `seen_train`.
fn write_bucket_fastas(
    input: &Path,
    out_dir: &Path,
    plan: &super::SplitPlan,
    labels: &HashMap<String, String>,
) -> Result<([u64; 8], HashSet<String>)> {
    fs::create_dir_all(out_dir).map_err(|e| BarcodekitError::io(out_dir, e))?;

    let mut writers: Vec<BufWriter<File>> = Vec::with_capacity(8);
    for bucket in SplitBucket::ALL {
        let path = out_dir.join(bucket.file_name());
        let file = File::create(&path).map_err(|e| BarcodekitError::io(&path, e))?;
        writers.push(BufWriter::new(file));
    }

    let mut counts = [0u64; 8];
    let mut seen_train_ids = HashSet::new();

    let reader = seqio::open_input(input)?;
    seqio::read_fasta(reader, input, |rec| {
        let hash = seq_hash(&rec.seq);
        let bucket = plan.bucket_for(&rec.id, labels.contains_key(&rec.id), &hash);

        let writer = &mut writers[bucket.index()];
        seqio::write_fasta(writer, &rec.id, &rec.seq)
            .map_err(|e| BarcodekitError::io(out_dir.join(bucket.file_name()), e))?;
        counts[bucket.index()] += 1;
        if bucket == SplitBucket::SeenTrain {
            seen_train_ids.insert(rec.id);
        }
        Ok(())
    })?;

    for (bucket, writer) in SplitBucket::ALL.into_iter().zip(&mut writers) {
        use std::io::Write;
        writer
            .flush()
            .map_err(|e| BarcodekitError::io(out_dir.join(bucket.file_name()), e))?;
    }
    Ok((counts, seen_train_ids))
}
