use crate::error::{Error, Result};
use crate::model::CommentGroup;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// AST parser for Rust source files.
///
/// The `AstParser` uses the `syn` crate to parse Rust source code into a syntax tree, from
/// which the loader reads declarations, doc comments and types.
///
/// # Example
///
/// ```no_run
/// use swag_from_source::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("src/main.rs")).unwrap();
/// println!("Parsed {} items", parsed.syntax_tree.items.len());
/// ```
pub struct AstParser;

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

/// The parsed files of one package directory.
#[derive(Debug)]
pub struct ParsedPackage {
    /// Directory path relative to the loader's base directory, `.` for the base itself
    pub id: String,
    /// Directory name
    pub name: String,
    /// Files in path order
    pub files: Vec<ParsedFile>,
    /// Identities of the packages declared as `mod name;` child modules
    pub imports: Vec<String>,
}

impl AstParser {
    /// Parses a single Rust source file into an AST.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Rust syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| Error::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::parse(path, &e))?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses several files, stopping at the first one that fails.
    pub fn parse_files(paths: &[PathBuf]) -> Result<Vec<ParsedFile>> {
        debug!("Parsing {} files", paths.len());
        paths.iter().map(|path| Self::parse_file(path)).collect()
    }
}

/// Collects the doc attributes of an item into a comment group.
///
/// Each line is prefixed with `marker` (`///` or `//!`) so the group reads like the source
/// comment. Only attributes of the matching style are taken: inner for `//!`, outer otherwise.
pub fn doc_comment(attrs: &[syn::Attribute], marker: &str) -> Option<CommentGroup> {
    let inner = marker == "//!";
    let mut lines = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("doc") || matches!(attr.style, syn::AttrStyle::Inner(_)) != inner {
            continue;
        }
        let syn::Meta::NameValue(name_value) = &attr.meta else {
            continue;
        };
        if let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(text),
            ..
        }) = &name_value.value
        {
            for line in text.value().split('\n') {
                lines.push(format!("{marker}{line}"));
            }
        }
    }

    (!lines.is_empty()).then(|| CommentGroup { lines })
}
