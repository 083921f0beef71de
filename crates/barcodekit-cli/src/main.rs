//! Barcodekit CLI - BIN-aware curation and dataset splitting.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Curate {
            input,
            output,
            report,
            audit,
            force,
        } => commands::curate::run(input, output, report, audit, force, cli.verbose),

        Commands::Split {
            input,
            out_dir,
            labels,
            taxdump_dir,
            taxid_map,
            classifiers,
        } => commands::split::run(
            input,
            out_dir,
            labels,
            taxdump_dir,
            taxid_map,
            classifiers,
            cli.verbose,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
