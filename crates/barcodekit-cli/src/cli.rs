//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Barcodekit: BIN-aware label curation and dataset splitting for DNA barcodes
#[derive(Parser)]
#[command(name = "barcodekit")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Curate taxonomic labels in a BOLD-style TSV using BIN consensus
    Curate {
        /// Input TSV (optionally gzipped) with processid/bin_uri/rank columns
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output taxonkit-style TSV
        #[arg(short, long, default_value = "taxonkit_input.tsv")]
        output: PathBuf,

        /// Optional JSON curation report path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Optional row-level audit TSV path
        #[arg(long)]
        audit: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
    },

    /// Split a FASTA into open/closed-world buckets and prune the taxdump
    Split {
        /// Input FASTA (optionally gzipped)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory for bucket files and reports
        #[arg(short, long, default_value = "libraries")]
        out_dir: PathBuf,

        /// Taxonkit-style TSV with processid/species labels
        #[arg(long, default_value = "taxonkit_input.tsv")]
        labels: PathBuf,

        /// Taxdump directory with nodes.dmp/names.dmp/taxid.map
        #[arg(long, default_value = "bold-taxdump")]
        taxdump_dir: PathBuf,

        /// Optional taxid.map override
        #[arg(long)]
        taxid_map: Option<PathBuf>,

        /// Comma-separated classifiers recorded for downstream formatting
        #[arg(long, default_value = "blast,kraken2,sintax")]
        classifiers: String,
    },
}
