//! Curate command - repair taxonomic labels with BIN consensus.

use std::path::PathBuf;

use barcodekit::curation::{CurationConfig, curate_file};
use colored::Colorize;

pub fn run(
    input: PathBuf,
    output: PathBuf,
    report: Option<PathBuf>,
    audit: Option<PathBuf>,
    force: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("File not found: {}", input.display()).into());
    }
    if output.exists() && !force {
        return Err(format!(
            "Output exists: {} (use --force to overwrite)",
            output.display()
        )
        .into());
    }

    println!(
        "{} {}",
        "Curating".cyan().bold(),
        input.display().to_string().white()
    );

    let cfg = CurationConfig {
        report_path: report,
        audit_path: audit,
    };
    let report = curate_file(&input, &output, &cfg)?;

    println!(
        "  {} rows, {} changed",
        report.stats.rows_total.to_string().bold(),
        report.stats.rows_changed.to_string().yellow()
    );
    println!(
        "  BINs: {} observed, {} canonical, {} conflicted",
        report.bin_summary.observed,
        report.bin_summary.canonical.to_string().green(),
        report.bin_summary.conflicted.to_string().red()
    );

    if verbose {
        println!();
        println!("{}", "Rule counters:".yellow().bold());
        let stats = serde_json::to_value(&report.stats)?;
        if let Some(map) = stats.as_object() {
            for (rule, count) in map {
                println!("  {:40} {}", rule, count);
            }
        }
    }

    println!(
        "{} {}",
        "Wrote".green().bold(),
        output.display().to_string().white()
    );
    Ok(())
}
