//! Two-pass streaming curation of a BOLD-style TSV.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::consensus::BinResolver;
use crate::error::{BarcodekitError, Result};
use crate::seqio;

use super::engine::{RuleEngine, TaxonRecord};
use super::report::{AuditWriter, CurationReport, CurationStats, PROTOCOL, RULESET_VERSION};

const OUTPUT_HEADER: &str =
    "kingdom\tphylum\tclass\torder\tfamily\tsubfamily\ttribe\tgenus\tspecies\tprocessid\n";

/// Options for one curation run.
#[derive(Debug, Clone, Default)]
pub struct CurationConfig {
    /// Where to write the JSON curation report, if anywhere.
    pub report_path: Option<std::path::PathBuf>,
    /// Where to write the row-level audit trail, if anywhere.
    pub audit_path: Option<std::path::PathBuf>,
}

/// Columns the curation run needs, resolved once from the header.
struct Columns {
    process_id: usize,
    bin_uri: usize,
    ranks: [usize; 9],
}

const RANK_NAMES: [&str; 9] = [
    "kingdom",
    "phylum",
    "class",
    "order",
    "family",
    "subfamily",
    "tribe",
    "genus",
    "species",
];

fn tsv_reader(input: &Path) -> Result<csv::Reader<Box<dyn BufRead>>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(seqio::open_input(input)?))
}

fn resolve_columns(input: &Path, headers: &csv::StringRecord) -> Result<Columns> {
    if headers.len() == 0 || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(BarcodekitError::EmptyInput(input.to_path_buf()));
    }
    let find = |name: &str| headers.iter().position(|h| h == name);

    let mut missing = Vec::new();
    let process_id = find("processid");
    let bin_uri = find("bin_uri");
    let ranks: Vec<Option<usize>> = RANK_NAMES.iter().map(|r| find(r)).collect();

    if process_id.is_none() {
        missing.push("processid");
    }
    if bin_uri.is_none() {
        missing.push("bin_uri");
    }
    for (name, idx) in RANK_NAMES.iter().zip(&ranks) {
        if idx.is_none() {
            missing.push(name);
        }
    }
    if !missing.is_empty() {
        return Err(BarcodekitError::MissingHeaders {
            path: input.to_path_buf(),
            needed: missing.join(", "),
        });
    }

    let mut rank_idx = [0usize; 9];
    for (slot, idx) in rank_idx.iter_mut().zip(&ranks) {
        *slot = idx.unwrap_or(0);
    }
    Ok(Columns {
        process_id: process_id.unwrap_or(0),
        bin_uri: bin_uri.unwrap_or(0),
        ranks: rank_idx,
    })
}

fn field(row: &csv::StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("")
}

/// Pass 1: feed every (BIN, genus, species) triple to the resolver.
fn prime_resolver(input: &Path) -> Result<BinResolver> {
    let mut reader = tsv_reader(input)?;
    let headers = reader.headers()?.clone();
    let cols = resolve_columns(input, &headers)?;
    // genus and species are the last two rank columns.
    let (idx_genus, idx_species) = (cols.ranks[7], cols.ranks[8]);

    let mut resolver = BinResolver::new();
    for row in reader.records() {
        let row = row?;
        resolver.observe(
            field(&row, cols.bin_uri),
            field(&row, idx_genus),
            field(&row, idx_species),
        );
    }
    Ok(resolver)
}

/// Curate `input` into a taxonkit-style TSV at `output`.
///
/// Runs the bulk-synchronous priming pass first, then curates every row
/// against the frozen BIN decisions. Structural errors (missing headers,
/// empty input) abort the run; per-record label problems never do.
pub fn curate_file(input: &Path, output: &Path, cfg: &CurationConfig) -> Result<CurationReport> {
    let resolver = prime_resolver(input)?;
    let decisions = resolver.decisions();
    let engine = RuleEngine::new(&decisions);

    let mut reader = tsv_reader(input)?;
    let headers = reader.headers()?.clone();
    let cols = resolve_columns(input, &headers)?;

    let out_file = File::create(output).map_err(|e| BarcodekitError::io(output, e))?;
    let mut writer = BufWriter::new(out_file);
    writer
        .write_all(OUTPUT_HEADER.as_bytes())
        .map_err(|e| BarcodekitError::io(output, e))?;

    let mut audit = match &cfg.audit_path {
        Some(path) => Some(AuditWriter::create(path)?),
        None => None,
    };
    let mut stats = CurationStats::default();

    for row in reader.records() {
        let row = row?;
        let mut rec = TaxonRecord {
            process_id: field(&row, cols.process_id).to_string(),
            bin_uri: field(&row, cols.bin_uri).to_string(),
            kingdom: field(&row, cols.ranks[0]).to_string(),
            phylum: field(&row, cols.ranks[1]).to_string(),
            class: field(&row, cols.ranks[2]).to_string(),
            order: field(&row, cols.ranks[3]).to_string(),
            family: field(&row, cols.ranks[4]).to_string(),
            subfamily: field(&row, cols.ranks[5]).to_string(),
            tribe: field(&row, cols.ranks[6]).to_string(),
            genus: field(&row, cols.ranks[7]).to_string(),
            species: field(&row, cols.ranks[8]).to_string(),
        };

        let before = rec.clone();
        let outcome = engine.curate(&mut rec);
        stats.record(outcome.changed, &outcome.fired);
        if outcome.changed {
            if let Some(audit) = audit.as_mut() {
                audit.write_row(&before, &rec, &outcome.fired)?;
            }
        }

        let line = [
            rec.kingdom.as_str(),
            rec.phylum.as_str(),
            rec.class.as_str(),
            rec.order.as_str(),
            rec.family.as_str(),
            rec.subfamily.as_str(),
            rec.tribe.as_str(),
            rec.genus.as_str(),
            rec.species.as_str(),
            rec.process_id.as_str(),
        ]
        .join("\t");
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| BarcodekitError::io(output, e))?;
    }

    writer.flush().map_err(|e| BarcodekitError::io(output, e))?;
    if let Some(audit) = audit {
        audit.finish()?;
    }

    let report = CurationReport {
        protocol: PROTOCOL.to_string(),
        ruleset_version: RULESET_VERSION.to_string(),
        input_path: input.display().to_string(),
        audit_path: cfg.audit_path.as_ref().map(|p| p.display().to_string()),
        bin_summary: decisions.summary.clone(),
        stats,
    };
    if let Some(path) = &cfg.report_path {
        report.save(path)?;
    }
    Ok(report)
}
