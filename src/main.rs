//! swag-from-source - Command-line tool for generating Swagger 2.0 documents.
//!
//! Reads `swag:meta`, `swag:route`, `swag:req` and `swag:ans` directives from the doc comments
//! of a Rust project and writes a Swagger 2.0 document.
//!
//! # Usage
//!
//! ```bash
//! swag-from-source [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Generate YAML from every package below the current directory:
//! ```bash
//! swag-from-source -o swagger.yaml
//! ```
//!
//! Merge into an existing JSON document, loading two packages of another project:
//! ```bash
//! swag-from-source -C ./petstore -m ./api -m ./models/... -i base.json -o swagger.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use swag_from_source::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("swag-from-source starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Swagger document generation completed successfully");

    Ok(())
}
