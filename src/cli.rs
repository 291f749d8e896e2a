use crate::loader::{RustSourceLoader, SourceLoader};
use crate::openapi_builder::DocumentBuilder;
use crate::serializer::{load_document, save_document};
use crate::walker::PackageWalker;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

/// Swagger generator - Builds a Swagger 2.0 document from swag:* comment directives
#[derive(Parser, Debug)]
#[command(name = "swag-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Existing Swagger document (JSON or YAML) to merge generated content into
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output file; YAML for .yml/.yaml, JSON otherwise, stdout for "-"
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "./swagger.yaml")]
    pub output: String,

    /// Package patterns to load; `dir/...` includes every package below `dir`
    #[arg(short = 'm', long = "models", value_name = "PATTERN", default_value = "./...")]
    pub models: Vec<String>,

    /// Directory the package patterns are relative to
    #[arg(short = 'C', long = "dir", value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.dir.is_dir() {
        anyhow::bail!("Source directory is not a directory: {}", args.dir.display());
    }

    info!("Source directory: {}", args.dir.display());
    info!("Package patterns: {}", args.models.join(", "));
    match &args.input {
        Some(input) => info!("Input document: {}", input.display()),
        None => info!("Input document: none"),
    }
    if args.output.is_empty() || args.output == "-" {
        info!("Output: stdout");
    } else {
        info!("Output file: {}", args.output);
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting Swagger document generation...");

    // Step 1: Load the source model for the requested packages
    let loader = RustSourceLoader::new(args.dir.clone());
    let model = loader
        .load(&args.models)
        .with_context(|| format!("Failed to load packages {}", args.models.join(", ")))?;
    info!("Loaded {} packages", model.package_count());

    // Step 2: Walk packages and collect directives
    let registry = PackageWalker::walk(&model);

    // Step 3: Merge into the input document, or a fresh one
    let input = load_document(args.input.as_deref());
    let document = DocumentBuilder::new(&model, input).build(&registry);
    info!(
        "Document has {} paths and {} definitions",
        document.paths.len(),
        document.definitions.len()
    );

    // Step 4: Write the result
    save_document(&document, &args.output)?;

    info!("Generation complete!");
    Ok(())
}
