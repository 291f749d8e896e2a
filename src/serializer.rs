//! Loading and saving Swagger documents in YAML or JSON format.
//!
//! The format is chosen by file extension: `.yml` and `.yaml` are YAML, anything else is JSON.

use crate::openapi_builder::Document;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Loads an existing document to merge generated content into.
///
/// Returns `None` when no path is given. A missing path, a directory, or a file that cannot
/// be read or parsed is logged and also yields `None`, so generation starts from a fresh
/// document.
pub fn load_document(path: Option<&Path>) -> Option<Document> {
    let path = path?;
    if !path.is_file() {
        warn!("Input document {} is not a file, starting from scratch", path.display());
        return None;
    }

    match read_document(path) {
        Ok(document) => {
            info!("Loaded input document {}", path.display());
            Some(document)
        }
        Err(e) => {
            warn!("Ignoring input document: {:#}", e);
            None
        }
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if is_yaml(path) {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

/// Serializes a document to YAML format.
///
/// The document goes through a generic JSON value first so that YAML and JSON output share
/// one key order.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &Document) -> Result<String> {
    debug!("Serializing document to YAML");
    let value = serde_json::to_value(doc).context("Failed to convert document to a generic value")?;
    serde_yaml::to_string(&value).context("Failed to serialize document to YAML")
}

/// Serializes a document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &Document) -> Result<String> {
    debug!("Serializing document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize document to JSON")
}

/// Writes a document to `output`, or to stdout when `output` is empty or `-`.
pub fn save_document(doc: &Document, output: &str) -> Result<()> {
    if output.is_empty() || output == "-" {
        println!("{}", serialize_yaml(doc)?);
        return Ok(());
    }

    let path = Path::new(output);
    let content = if is_yaml(path) {
        serialize_yaml(doc)?
    } else {
        serialize_json(doc)?
    };
    write_to_file(&content, path)?;
    info!("Wrote document to {}", path.display());
    Ok(())
}

/// Writes string content to a file.
///
/// Creates the file and any missing parent directories, or overwrites an existing file.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
