//! Barcodekit: BIN-aware label curation and dataset splitting for DNA barcodes.
//!
//! Barcodekit repairs noisy species labels attached to barcode records using
//! Barcode Index Number (BIN) consensus, and partitions barcode collections
//! into reproducible open-world/closed-world splits with no label leakage
//! between buckets.
//!
//! # Core Principles
//!
//! - **Deterministic**: split assignments derive from content hashes, never
//!   from input order, so appending records does not reshuffle prior splits
//! - **Auditable**: every curation rule that fires is counted and, on
//!   request, written to a row-level before/after audit trail
//! - **Fail-fast**: structural and integrity errors abort the run; only
//!   well-defined per-record conditions are routed to fallback buckets
//!
//! # Example
//!
//! ```no_run
//! use barcodekit::curation::{CurationConfig, curate_file};
//!
//! let report = curate_file(
//!     "BOLD_Public.tsv".as_ref(),
//!     "taxonkit_input.tsv".as_ref(),
//!     &CurationConfig::default(),
//! ).unwrap();
//!
//! println!("rows changed: {}", report.stats.rows_changed);
//! ```

pub mod consensus;
pub mod curation;
pub mod error;
pub mod label;
pub mod seqio;
pub mod split;
pub mod taxdump;

pub use consensus::{BinResolution, BinResolver, BinSummary};
pub use curation::{CurationConfig, CurationReport, CurationStats, Rule, TaxonRecord};
pub use error::{BarcodekitError, Result};
pub use label::{ResolvedSpecies, SpeciesLabel};
pub use split::{SplitBucket, SplitConfig, SplitPolicy, SplitReport, SplitStats};
pub use taxdump::{TaxDump, TaxNode};
