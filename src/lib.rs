//! swag-from-source - Swagger 2.0 documents from comment directives.
//!
//! This library builds a Swagger 2.0 document from directives written in the doc comments of
//! a Rust project:
//!
//! - `swag:meta` in a package doc sets document metadata (`title`, `version`, `host`, ...)
//! - `swag:route <id> <METHOD> <path> [tags]` declares an operation
//! - `swag:req <id>` binds a type to the operation's request
//! - `swag:ans <id> <code>` binds a type to one of the operation's responses
//!
//! # Architecture
//!
//! 1. [`scanner`] - Discovers package directories and selects the pattern roots
//! 2. [`parser`] - Parses Rust source files into syntax trees
//! 3. [`type_resolver`] - Resolves Rust types into the source model's type shapes
//! 4. [`loader`] - Lowers parsed packages into the [`model::SourceModel`]
//! 5. [`walker`] - Visits packages from the roots through their imports
//! 6. [`annotation`] - Finds directives in a package's comments ([`directive`] holds the grammars)
//! 7. [`registry`] - Keeps the collected metas, routes and bound declarations
//! 8. [`schema_generator`] - Synthesizes JSON schemas from declared types
//! 9. [`openapi_builder`] - Merges everything into the document
//! 10. [`serializer`] - Loads and saves documents as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use swag_from_source::{
//!     loader::{RustSourceLoader, SourceLoader},
//!     openapi_builder::DocumentBuilder,
//!     serializer::serialize_yaml,
//!     walker::PackageWalker,
//! };
//! use std::path::PathBuf;
//!
//! let loader = RustSourceLoader::new(PathBuf::from("./my-project"));
//! let model = loader.load(&["./...".to_string()]).unwrap();
//!
//! let registry = PackageWalker::walk(&model);
//! let document = DocumentBuilder::new(&model, None).build(&registry);
//!
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod annotation;
pub mod cli;
pub mod directive;
pub mod error;
pub mod loader;
pub mod model;
pub mod openapi_builder;
pub mod parser;
pub mod registry;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod type_resolver;
pub mod walker;
