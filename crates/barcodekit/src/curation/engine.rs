//! The curation rule cascade.

use std::collections::BTreeSet;
use std::fmt;

use crate::consensus::BinDecisions;
use crate::label::{self, SpeciesLabel};

/// One taxon record, mutated in place during curation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonRecord {
    pub process_id: String,
    pub bin_uri: String,
    pub kingdom: String,
    pub phylum: String,
    pub class: String,
    pub order: String,
    pub family: String,
    pub subfamily: String,
    pub tribe: String,
    pub genus: String,
    pub species: String,
}

/// Identifiers of the curation rules, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rule {
    PlaceholderNormalize,
    SubfamilyFill,
    EpithetOnlyFix,
    GenusFromResolved,
    GenusInferred,
    BinCanonicalAdopt,
    GenusSpeciesMismatchDemote,
    OpenToBinProvisional,
    ProvisionalDroppedNoBin,
}

impl Rule {
    /// Stable string identifier used in reports and audit rows.
    pub fn id(&self) -> &'static str {
        match self {
            Rule::PlaceholderNormalize => "placeholder_normalize",
            Rule::SubfamilyFill => "subfamily_fill_from_family_tribe",
            Rule::EpithetOnlyFix => "species_epithet_only_fix",
            Rule::GenusFromResolved => "genus_from_resolved_species",
            Rule::GenusInferred => "genus_inferred_from_species",
            Rule::BinCanonicalAdopt => "bin_canonical_species_adopt",
            Rule::GenusSpeciesMismatchDemote => "genus_species_mismatch_demote",
            Rule::OpenToBinProvisional => "open_or_empty_to_bin_provisional",
            Rule::ProvisionalDroppedNoBin => "provisional_dropped_missing_bin",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Result of curating one record.
#[derive(Debug, Clone)]
pub struct CurationOutcome {
    /// Whether any field differs from its pre-curation value.
    pub changed: bool,
    /// Rules that fired, in stable cascade order.
    pub fired: BTreeSet<Rule>,
}

/// Applies the fixed-order rule cascade against frozen BIN decisions.
pub struct RuleEngine<'a> {
    decisions: &'a BinDecisions,
}

fn eq_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl<'a> RuleEngine<'a> {
    /// Create an engine over a frozen decision set.
    pub fn new(decisions: &'a BinDecisions) -> Self {
        Self { decisions }
    }

    /// Curate one record in place. Never fails.
    pub fn curate(&self, rec: &mut TaxonRecord) -> CurationOutcome {
        let before = rec.clone();
        let mut fired = BTreeSet::new();

        if normalize_fields(rec) {
            fired.insert(Rule::PlaceholderNormalize);
        }
        if fill_subfamily_hole(rec) {
            fired.insert(Rule::SubfamilyFill);
        }
        if fix_bare_epithet(rec) {
            fired.insert(Rule::EpithetOnlyFix);
        }
        self.apply_species_rules(rec, &mut fired);

        if (fired.contains(&Rule::OpenToBinProvisional)
            || fired.contains(&Rule::GenusSpeciesMismatchDemote))
            && rec.species.is_empty()
        {
            fired.insert(Rule::ProvisionalDroppedNoBin);
        }

        CurationOutcome {
            changed: *rec != before,
            fired,
        }
    }

    fn apply_species_rules(&self, rec: &mut TaxonRecord, fired: &mut BTreeSet<Rule>) {
        let info = label::classify(&rec.species);
        let bin_info = self.decisions.canonical_for(&rec.bin_uri);
        let mut genus = rec.genus.clone();
        let mut species = rec.species.clone();

        match info {
            SpeciesLabel::Resolved(resolved) => {
                if genus.is_empty() {
                    genus = resolved.genus;
                    species = resolved.canonical;
                    fired.insert(Rule::GenusFromResolved);
                } else if eq_fold(&genus, &resolved.genus) {
                    // Already consistent; adopt the canonical form silently.
                    genus = resolved.genus;
                    species = resolved.canonical;
                } else if let Some(bin) = bin_info.filter(|b| eq_fold(&genus, &b.genus)) {
                    genus = bin.genus.clone();
                    species = bin.canonical.clone();
                    fired.insert(Rule::BinCanonicalAdopt);
                } else {
                    // Genus/species disagreement not resolvable via BIN
                    // evidence: demote to a provisional label.
                    species = label::provisional_label(&genus, &rec.bin_uri);
                    fired.insert(Rule::GenusSpeciesMismatchDemote);
                }
            }
            SpeciesLabel::Open { .. } | SpeciesLabel::Empty => {
                let normalized = match &info {
                    SpeciesLabel::Open { normalized } => normalized.as_str(),
                    _ => "",
                };
                if genus.is_empty() {
                    if let Some(inferred) = label::infer_genus(normalized) {
                        genus = inferred;
                        fired.insert(Rule::GenusInferred);
                    }
                }

                if let Some(bin) =
                    bin_info.filter(|b| genus.is_empty() || eq_fold(&genus, &b.genus))
                {
                    genus = bin.genus.clone();
                    species = bin.canonical.clone();
                    fired.insert(Rule::BinCanonicalAdopt);
                } else {
                    species = label::provisional_label(&genus, &rec.bin_uri);
                    fired.insert(Rule::OpenToBinProvisional);
                }
            }
        }

        rec.genus = genus;
        rec.species = species;
    }
}

/// Rule 1: placeholder-normalize every rank field and the BIN field.
fn normalize_fields(rec: &mut TaxonRecord) -> bool {
    let mut changed = false;
    for field in [
        &mut rec.kingdom,
        &mut rec.phylum,
        &mut rec.class,
        &mut rec.order,
        &mut rec.family,
        &mut rec.subfamily,
        &mut rec.tribe,
        &mut rec.genus,
        &mut rec.species,
        &mut rec.bin_uri,
    ] {
        let normalized = label::normalize_label(field);
        if normalized != *field {
            *field = normalized;
            changed = true;
        }
    }
    changed
}

/// Rule 2: family and tribe present, subfamily missing.
fn fill_subfamily_hole(rec: &mut TaxonRecord) -> bool {
    if !rec.family.is_empty() && !rec.tribe.is_empty() && rec.subfamily.is_empty() {
        rec.subfamily = format!("{} subfam. incertae sedis", rec.family);
        true
    } else {
        false
    }
}

/// Rule 3: species holds a bare epithet and the genus is known.
fn fix_bare_epithet(rec: &mut TaxonRecord) -> bool {
    if !rec.genus.is_empty() && label::looks_like_bare_epithet(&rec.species) {
        rec.species = format!("{} {}", rec.genus, rec.species.to_lowercase());
        true
    } else {
        false
    }
}
