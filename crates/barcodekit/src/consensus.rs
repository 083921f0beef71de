//! BIN consensus over observed species labels.
//!
//! A BIN (Barcode Index Number) clusters records by sequence similarity,
//! independent of named taxonomy. When several records in one BIN carry
//! resolved species labels, the resolver decides whether a single canonical
//! species can be adopted for the whole BIN or whether the BIN is conflicted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::label::{self, ResolvedSpecies, SpeciesLabel};

/// Outcome of resolving one BIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinResolution {
    /// No resolved species observed for this BIN.
    Absent,
    /// A single canonical species can be adopted.
    Accepted {
        /// Canonical `"Genus epithet"` string.
        canonical: String,
    },
    /// Multiple species with no strict-majority winner.
    Conflicted,
}

/// Per-BIN counts in the curation report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinSummary {
    /// BINs with at least one resolved observation.
    pub observed: usize,
    /// BINs that resolved to a single canonical species.
    pub canonical: usize,
    /// BINs marked conflicted.
    pub conflicted: usize,
}

/// Aggregates (BIN, canonical species) observations across one input file.
///
/// Built once during the priming pass; read-only afterwards.
#[derive(Debug, Default)]
pub struct BinResolver {
    counts: HashMap<String, HashMap<String, u32>>,
}

impl BinResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation.
    ///
    /// Discards the observation unless the species classifies as resolved.
    /// When an explicit genus is supplied and disagrees case-insensitively
    /// with the classified genus, the row is treated as cross-contaminated
    /// and discarded.
    pub fn observe(&mut self, bin_uri: &str, genus: &str, species: &str) {
        let bin = label::normalize_label(bin_uri);
        if bin.is_empty() {
            return;
        }
        let SpeciesLabel::Resolved(info) = label::classify(species) else {
            return;
        };

        let genus = label::normalize_label(genus);
        if !genus.is_empty() && !genus.eq_ignore_ascii_case(&info.genus) {
            return;
        }

        *self
            .counts
            .entry(bin)
            .or_default()
            .entry(info.canonical)
            .or_insert(0) += 1;
    }

    /// Resolve one BIN.
    ///
    /// A single observed species is accepted unconditionally. With several
    /// species, the top count wins only with a strict majority of the BIN
    /// total and a strictly higher count than the runner-up; ties at the top
    /// are always conflicts. Lexicographic order of the canonical string
    /// breaks count ties deterministically when picking the candidate.
    pub fn resolve(&self, bin_uri: &str) -> BinResolution {
        let bin = label::normalize_label(bin_uri);
        let Some(by_species) = self.counts.get(&bin) else {
            return BinResolution::Absent;
        };
        if by_species.is_empty() {
            return BinResolution::Absent;
        }
        if by_species.len() == 1 {
            let canonical = by_species.keys().next().cloned().unwrap_or_default();
            return BinResolution::Accepted { canonical };
        }

        let mut ranked: Vec<(&str, u32)> = by_species
            .iter()
            .map(|(species, count)| (species.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let total: u32 = ranked.iter().map(|(_, c)| c).sum();
        let (best, best_count) = ranked[0];
        let second_count = ranked[1].1;

        if best_count > second_count && best_count * 2 > total {
            BinResolution::Accepted {
                canonical: best.to_string(),
            }
        } else {
            BinResolution::Conflicted
        }
    }

    /// Number of BINs with at least one resolved observation.
    pub fn observed_bins(&self) -> usize {
        self.counts.len()
    }

    /// Snapshot per-BIN decisions for the curation pass.
    pub fn decisions(&self) -> BinDecisions {
        let mut accepted = HashMap::new();
        let mut summary = BinSummary::default();
        for bin in self.counts.keys() {
            summary.observed += 1;
            match self.resolve(bin) {
                BinResolution::Accepted { canonical } => {
                    // Re-classify so the adopted label carries genus/epithet.
                    if let SpeciesLabel::Resolved(info) = label::classify(&canonical) {
                        accepted.insert(bin.clone(), info);
                        summary.canonical += 1;
                    }
                }
                BinResolution::Conflicted => summary.conflicted += 1,
                BinResolution::Absent => {}
            }
        }
        BinDecisions { accepted, summary }
    }
}

/// Frozen per-BIN decisions, built once before curation begins.
#[derive(Debug, Default)]
pub struct BinDecisions {
    accepted: HashMap<String, ResolvedSpecies>,
    /// Counts for the curation report.
    pub summary: BinSummary,
}

impl BinDecisions {
    /// Accepted canonical species for a BIN, if any.
    pub fn canonical_for(&self, bin_uri: &str) -> Option<&ResolvedSpecies> {
        let bin = label::normalize_label(bin_uri);
        if bin.is_empty() {
            return None;
        }
        self.accepted.get(&bin)
    }
}
