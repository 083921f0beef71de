//! Split command - open/closed-world dataset partitioning.

use std::path::PathBuf;

use barcodekit::split::{SplitBucket, SplitConfig, SplitPolicy, split_file};
use colored::Colorize;

pub fn run(
    input: PathBuf,
    out_dir: PathBuf,
    labels: PathBuf,
    taxdump_dir: PathBuf,
    taxid_map: Option<PathBuf>,
    classifiers: String,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("File not found: {}", input.display()).into());
    }
    let classifiers: Vec<String> = classifiers
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    println!(
        "{} {}",
        "Splitting".cyan().bold(),
        input.display().to_string().white()
    );

    let cfg = SplitConfig {
        input,
        out_dir: out_dir.clone(),
        labels_path: labels,
        taxdump_dir,
        taxid_map,
        classifiers,
        policy: SplitPolicy::default(),
    };
    let report = split_file(&cfg)?;

    println!(
        "  {} records across {} classes ({} seen, {} unseen, {} heldout)",
        report.stats.total_records.to_string().bold(),
        report.stats.total_classes,
        report.stats.seen_classes.to_string().green(),
        report.stats.unseen_classes.to_string().yellow(),
        report.stats.heldout_classes
    );
    println!(
        "  pruned taxdump kept {} taxids",
        report.pruned_taxids.to_string().bold()
    );

    if verbose {
        println!();
        println!("{}", "Bucket records:".yellow().bold());
        let stats = serde_json::to_value(&report.stats)?;
        for bucket in SplitBucket::ALL {
            let key = format!("{}_records", bucket.id());
            let count = stats.get(&key).and_then(|v| v.as_u64()).unwrap_or(0);
            println!("  {:20} {}", bucket.file_name(), count);
        }
    }

    println!(
        "{} {}",
        "Wrote".green().bold(),
        out_dir.join("split_report.json").display().to_string().white()
    );
    Ok(())
}
