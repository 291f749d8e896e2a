//! Resolved source model consumed by the annotation scanner and the schema synthesizer.
//!
//! The model is the narrow contract between a language front end (see [`crate::loader`])
//! and the rest of the pipeline. It describes, per package, the parsed files with their
//! comment groups, the top-level declarations of each file, and a fully resolved shape for
//! every declared type. Nothing in here knows how the model was produced.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Identity of a named type: the declaring package plus the type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedType {
    /// Identity of the declaring package
    pub package: String,
    /// Declared type name
    pub name: String,
}

impl NamedType {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Builtin scalar kinds a front end can classify a type as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    /// Platform-sized signed integer
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    /// Platform-sized unsigned integer
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    /// Error values, serialized as their message
    Error,
    /// A builtin the front end recognized but that has no schema mapping
    Unsupported,
}

/// Resolved shape of a type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Scalar(ScalarKind),
    /// Pointer-like indirection (references, boxes, optional values)
    Pointer(Box<TypeRef>),
    /// Variable-length sequence
    Slice(Box<TypeRef>),
    /// Fixed-length sequence
    Array(Box<TypeRef>, usize),
    /// Anonymous struct shape
    Struct(StructType),
    /// Reference to a declared type, looked up through [`SourceModel::underlying`]
    Named(NamedType),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructType {
    pub fields: Vec<Field>,
}

/// A struct field as seen by the serializer of the analyzed language.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Declared field name
    pub name: String,
    /// Declared field type
    pub ty: TypeRef,
    /// Whether the field is visible outside its package
    pub exported: bool,
    /// Whether the field is embedded (its members are promoted into the parent)
    pub embedded: bool,
    /// Raw serialization tag in `key:"value" key2:"value2"` form
    pub tag: Option<String>,
    /// Comment attached to the field
    pub comment: Option<CommentGroup>,
}

/// A run of adjacent comment lines, kept as source text including comment markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup {
    pub lines: Vec<String>,
}

impl CommentGroup {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Iterates over physical lines; block comments spanning several lines are split.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().flat_map(|line| line.split('\n'))
    }

    /// Comment text with markers removed and surrounding blank lines dropped.
    pub fn text(&self) -> String {
        let cleaned: Vec<&str> = self.lines().map(clean_comment_line).collect();
        let start = cleaned.iter().position(|l| !l.is_empty()).unwrap_or(cleaned.len());
        let end = cleaned.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
        cleaned[start..end].join("\n")
    }
}

/// Strips comment markers (`//`, `///`, `//!`, `/*`, `*/`, leading `*`) and surrounding whitespace.
pub fn clean_comment_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches('/')
        .trim_start_matches(|c: char| c == '!' || c == '*')
        .trim_end_matches("*/")
        .trim()
}

/// One declared type inside a type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: String,
    pub ty: TypeRef,
}

/// A group of type specs sharing one doc comment.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub doc: Option<CommentGroup>,
    pub specs: Vec<TypeSpec>,
}

/// Top-level declaration of a file.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func { name: String },
    Import,
    Value,
    Types(TypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Package documentation comment of the file
    pub doc: Option<CommentGroup>,
    /// Every comment group of the file, the doc group included
    pub comments: Vec<CommentGroup>,
    pub decls: Vec<Decl>,
}

impl SourceFile {
    /// Top-level type declarations, in source order.
    pub fn type_decls(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Types(types) => Some(types),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Unique package identity
    pub id: String,
    /// Short package name
    pub name: String,
    pub files: Vec<SourceFile>,
    /// Identities of directly imported packages
    pub imports: Vec<String>,
}

/// The complete package set: the requested roots plus everything they import.
#[derive(Debug, Clone, Default)]
pub struct SourceModel {
    roots: Vec<String>,
    packages: HashMap<String, Package>,
}

impl SourceModel {
    pub fn new(roots: Vec<String>, packages: Vec<Package>) -> Self {
        Self {
            roots,
            packages: packages
                .into_iter()
                .map(|package| (package.id.clone(), package))
                .collect(),
        }
    }

    /// Root packages in the order they were requested; unknown identities are skipped.
    pub fn roots(&self) -> impl Iterator<Item = &Package> {
        self.roots.iter().filter_map(|id| self.packages.get(id))
    }

    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Looks up the declared shape behind a named type.
    pub fn underlying(&self, named: &NamedType) -> Option<&TypeRef> {
        self.packages
            .get(&named.package)?
            .files
            .iter()
            .flat_map(SourceFile::type_decls)
            .flat_map(|decl| decl.specs.iter())
            .find(|spec| spec.name == named.name)
            .map(|spec| &spec.ty)
    }
}
