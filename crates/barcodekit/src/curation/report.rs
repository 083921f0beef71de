//! Curation statistics, JSON report, and the row-level audit trail.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consensus::BinSummary;
use crate::error::{BarcodekitError, Result};

use super::engine::{Rule, TaxonRecord};

/// Curation protocol identifier.
pub const PROTOCOL: &str = "bioscan-5m";

/// Version tag of the rule cascade.
pub const RULESET_VERSION: &str = "bioscan-5m.v1";

const AUDIT_HEADER: &str = "processid\tbin_uri\tgenus_before\tspecies_before\tsubfamily_before\tgenus_after\tspecies_after\tsubfamily_after\trules\n";

/// Monotone per-rule counters for one curation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurationStats {
    pub rows_total: u64,
    pub rows_changed: u64,
    pub placeholder_normalize: u64,
    pub subfamily_fill_from_family_tribe: u64,
    pub species_epithet_only_fix: u64,
    pub genus_from_resolved_species: u64,
    pub genus_inferred_from_species: u64,
    pub bin_canonical_species_adopt: u64,
    pub genus_species_mismatch_demote: u64,
    pub open_or_empty_to_bin_provisional: u64,
    pub provisional_dropped_missing_bin: u64,
}

impl CurationStats {
    /// Count one curated row and the rules that fired for it.
    pub fn record(&mut self, changed: bool, fired: &BTreeSet<Rule>) {
        self.rows_total += 1;
        if changed {
            self.rows_changed += 1;
        }
        for rule in fired {
            match rule {
                Rule::PlaceholderNormalize => self.placeholder_normalize += 1,
                Rule::SubfamilyFill => self.subfamily_fill_from_family_tribe += 1,
                Rule::EpithetOnlyFix => self.species_epithet_only_fix += 1,
                Rule::GenusFromResolved => self.genus_from_resolved_species += 1,
                Rule::GenusInferred => self.genus_inferred_from_species += 1,
                Rule::BinCanonicalAdopt => self.bin_canonical_species_adopt += 1,
                Rule::GenusSpeciesMismatchDemote => self.genus_species_mismatch_demote += 1,
                Rule::OpenToBinProvisional => self.open_or_empty_to_bin_provisional += 1,
                Rule::ProvisionalDroppedNoBin => self.provisional_dropped_missing_bin += 1,
            }
        }
    }
}

/// JSON curation report emitted at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationReport {
    pub protocol: String,
    pub ruleset_version: String,
    pub input_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_path: Option<String>,
    pub bin_summary: BinSummary,
    pub stats: CurationStats,
}

impl CurationReport {
    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BarcodekitError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| BarcodekitError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Tab-separated before/after audit trail, one row per changed record.
pub struct AuditWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AuditWriter {
    /// Create the audit file and write its header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BarcodekitError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| BarcodekitError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(AUDIT_HEADER.as_bytes())
            .map_err(|e| BarcodekitError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Append one changed row. Callers skip unchanged rows.
    pub fn write_row(
        &mut self,
        before: &TaxonRecord,
        after: &TaxonRecord,
        fired: &BTreeSet<Rule>,
    ) -> Result<()> {
        let mut rules: Vec<&str> = fired.iter().map(Rule::id).collect();
        rules.sort_unstable();
        let rules = rules.join(",");
        let line = [
            audit_field(&after.process_id),
            audit_field(&after.bin_uri),
            audit_field(&before.genus),
            audit_field(&before.species),
            audit_field(&before.subfamily),
            audit_field(&after.genus),
            audit_field(&after.species),
            audit_field(&after.subfamily),
            rules,
        ]
        .join("\t");
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| BarcodekitError::io(&self.path, e))
    }

    /// Flush and close the audit file.
    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| BarcodekitError::io(&self.path, e))
    }
}

fn audit_field(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
