//! Species-label classification.
//!
//! Free-text species labels from barcode submissions fall into three kinds:
//! empty placeholders ("None", "n/a"), open nomenclature ("Homo sp.",
//! "Homo cf. sapiens"), and resolved binomials ("Homo sapiens"). The
//! classifier normalizes whitespace and case, then decides the kind and, for
//! resolved labels, produces the canonical `"Genus epithet"` form.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Values treated as "no data" wherever a label or rank field is read.
static PLACEHOLDER_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "",
        "-",
        "n/a",
        "na",
        "none",
        "null",
        "unclassified",
        "undetermined",
        "unidentified",
        "unknown",
    ])
});

/// Open-nomenclature markers that disqualify a label from species rank.
static OPEN_NOMENCLATURE_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "aff",
        "cf",
        "complex",
        "group",
        "indet",
        "nr",
        "sp",
        "spp",
        "species",
        "undescribed",
        "unknown",
    ])
});

/// A species label that parsed as a clean binomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpecies {
    /// Genus token exactly as written (capitalized).
    pub genus: String,
    /// Lowercased specific epithet.
    pub epithet: String,
    /// Canonical `"Genus epithet"` string.
    pub canonical: String,
}

/// Semantic kind of a free-text species label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesLabel {
    /// Blank or a known placeholder value.
    Empty,
    /// Open nomenclature or otherwise not a clean binomial.
    Open {
        /// Whitespace-normalized label text.
        normalized: String,
    },
    /// A clean `Genus epithet` binomial.
    Resolved(ResolvedSpecies),
}

impl SpeciesLabel {
    /// Canonical string, defined only for resolved labels.
    pub fn canonical(&self) -> Option<&str> {
        match self {
            SpeciesLabel::Resolved(r) => Some(&r.canonical),
            _ => None,
        }
    }
}

/// Trim and collapse whitespace; map placeholder values to the empty string.
pub fn normalize_label(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if PLACEHOLDER_TOKENS.contains(collapsed.to_lowercase().as_str()) {
        String::new()
    } else {
        collapsed
    }
}

fn normalize_token(token: &str) -> String {
    token
        .trim()
        .to_lowercase()
        .trim_matches(|c| ".,;:()[]{}".contains(c))
        .to_string()
}

fn is_open_marker(token: &str) -> bool {
    OPEN_NOMENCLATURE_TOKENS.contains(normalize_token(token).as_str())
}

/// A genus-shaped token: uppercase letter head, then letters or hyphens.
fn is_genus_token(token: &str) -> bool {
    let token = token.trim();
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() && c.is_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphabetic() || c == '-')
}

/// An epithet-shaped token: lowercase letters or hyphens only.
fn is_epithet_token(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && token.chars().all(|c| c.is_lowercase() || c == '-')
}

/// Classify a free-text species label.
pub fn classify(species: &str) -> SpeciesLabel {
    let norm = normalize_label(species);
    if norm.is_empty() {
        return SpeciesLabel::Empty;
    }

    let parts: Vec<&str> = norm.split_whitespace().collect();
    if parts.len() < 2 {
        return SpeciesLabel::Open { normalized: norm };
    }

    if parts.iter().any(|p| is_open_marker(p)) {
        return SpeciesLabel::Open { normalized: norm };
    }

    let genus = parts[0];
    let epithet = parts[1].to_lowercase();
    if !is_genus_token(genus) || !is_epithet_token(&epithet) {
        return SpeciesLabel::Open { normalized: norm };
    }

    SpeciesLabel::Resolved(ResolvedSpecies {
        canonical: format!("{genus} {epithet}"),
        genus: genus.to_string(),
        epithet,
    })
}

/// Infer a bare genus from a label whose head token is genus-shaped and not
/// an open-nomenclature marker.
pub fn infer_genus(label: &str) -> Option<String> {
    let norm = normalize_label(label);
    let head = norm.split_whitespace().next()?;
    if is_open_marker(head) || !is_genus_token(head) {
        return None;
    }
    Some(head.to_string())
}

/// Build a BIN-provisional label `"<genus> sp. <bin>"`.
///
/// Returns the empty string when either input normalizes to empty; there is
/// no fallback to a record-level process identifier.
pub fn provisional_label(genus: &str, bin_uri: &str) -> String {
    let genus = normalize_label(genus);
    let bin_uri = normalize_label(bin_uri);
    if genus.is_empty() || bin_uri.is_empty() {
        String::new()
    } else {
        format!("{genus} sp. {bin_uri}")
    }
}

/// Whether a species field holds a bare epithet (all-lowercase token).
pub(crate) fn looks_like_bare_epithet(species: &str) -> bool {
    is_epithet_token(species)
}
