//! BIN-aware curation of taxonomic labels.
//!
//! Curation applies a fixed-order cascade of repair rules to each taxon
//! record, consulting the label classifier and the BIN consensus resolver.
//! The resolver is primed in a full streaming pass before any rule decision
//! depends on it, so curation output is stable regardless of row order.
//!
//! # Usage
//!
//! ```no_run
//! use barcodekit::curation::{CurationConfig, curate_file};
//!
//! let cfg = CurationConfig {
//!     report_path: Some("curation_report.json".into()),
//!     audit_path: Some("curation_audit.tsv".into()),
//! };
//! let report = curate_file("bold.tsv".as_ref(), "taxonkit_input.tsv".as_ref(), &cfg).unwrap();
//! println!("bins conflicted: {}", report.bin_summary.conflicted);
//! ```

mod engine;
mod report;
mod run;

pub use engine::{CurationOutcome, Rule, RuleEngine, TaxonRecord};
pub use report::{AuditWriter, CurationReport, CurationStats, PROTOCOL, RULESET_VERSION};
pub use run::{CurationConfig, curate_file};
