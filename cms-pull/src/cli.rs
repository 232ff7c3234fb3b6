//! CLI interface for cms-pull: command parsing and the entrypoint used by
//! `main` and the integration tests.
//!
//! All mapping, path derivation and file writing lives in `cms-pull-core`;
//! this module only loads config, picks the adapter and reports results.
//!
//! ## Commands
//! - `pull --config <yaml>`: run a full pull from the configured source
//! - `write --json-file <path> --output-dir <dir>`: write prebuilt output records
//!
//! Extend [`Commands`] for new subcommands and keep the logic in the core crate.

use crate::load_config::{load_config, SourceSection};
use anyhow::Result;
use clap::{Parser, Subcommand};
use cms_pull_core::adapter::{read_records, LocalExportAdapter};
use cms_pull_core::materialize::write_files;
use cms_pull_core::synchronise::synchronise;
use std::path::PathBuf;

/// CLI for cms-pull: materialize headless CMS content as static-site files.
#[derive(Parser)]
#[clap(
    name = "cms-pull",
    version,
    about = "Pull Contentful, Sanity or DatoCMS content into static-site-generator files"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull all root entries from the configured source and write them as files
    Pull {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Write an already materialized JSON array of `{filePath, data}` records
    Write {
        /// Path to the JSON records file
        #[clap(long)]
        json_file: PathBuf,
        /// Directory the record file paths are relative to
        #[clap(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// CLI logic entrypoint for integration tests and main()
pub fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Pull { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "pull", source = ?config.source, "Starting pull");
            let adapter = match &config.source {
                SourceSection::LocalExport { path } => LocalExportAdapter::new(path),
            };

            let report = match synchronise(&adapter, &config.synchronise) {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(command = "pull", error = %e, "Pull failed");
                    return Err(e.into());
                }
            };

            match &report.write {
                Some(write) => {
                    tracing::info!(command = "pull", "Pull complete");
                    println!(
                        "Pulled {} records from {}: {} written, {} unchanged",
                        report.records.len(),
                        report.vendor,
                        write.written.len(),
                        write.unchanged.len()
                    );
                }
                None => println!("{}", serde_json::to_string_pretty(&report.records)?),
            }
            Ok(())
        }
        Commands::Write {
            json_file,
            output_dir,
        } => {
            tracing::info!(command = "write", json_file = ?json_file, "Creating files from JSON records");
            let records = read_records(&json_file)?;
            match write_files(&records, &output_dir) {
                Ok(write) => {
                    println!(
                        "Wrote {} files, {} unchanged",
                        write.written.len(),
                        write.unchanged.len()
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "write", error = %e, "Writing files failed");
                    Err(e.into())
                }
            }
        }
    }
}
