use crate::model::{CommentGroup, Decl, Package, SourceFile, SourceModel, TypeDecl, TypeSpec};
use crate::parser::{doc_comment, AstParser, ParsedFile, ParsedPackage};
use crate::scanner::FileScanner;
use crate::type_resolver::TypeResolver;
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use syn::ext::IdentExt;

/// Produces a resolved source model from package patterns.
pub trait SourceLoader {
    /// Loads the packages selected by `patterns` together with everything they import.
    fn load(&self, patterns: &[String]) -> Result<SourceModel>;
}

/// Loads Rust sources below a base directory.
///
/// Every directory holding `.rs` files is a package. A `mod name;` declaration whose `name/`
/// directory is a package makes that package an import.
pub struct RustSourceLoader {
    base_dir: PathBuf,
}

impl RustSourceLoader {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

impl SourceLoader for RustSourceLoader {
    fn load(&self, patterns: &[String]) -> Result<SourceModel> {
        let scan = FileScanner::new(self.base_dir.clone())
            .scan(patterns)
            .with_context(|| format!("Failed to scan {}", self.base_dir.display()))?;
        info!(
            "Found {} packages ({} Rust files), {} selected",
            scan.packages.len(),
            scan.rust_file_count(),
            scan.roots.len()
        );

        let mut loaded: BTreeMap<String, ParsedPackage> = BTreeMap::new();
        let mut queue: VecDeque<String> = scan.roots.iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if loaded.contains_key(&id) {
                continue;
            }
            let Some(sources) = scan.package(&id) else {
                continue;
            };

            let files = AstParser::parse_files(&sources.files)
                .with_context(|| format!("Failed to load package {}", id))?;
            let imports = module_imports(&id, &files, |child| scan.package(child).is_some());
            debug!("Package {}: {} files, imports {:?}", id, files.len(), imports);
            queue.extend(imports.iter().cloned());

            loaded.insert(
                id.clone(),
                ParsedPackage {
                    id,
                    name: sources.name.clone(),
                    files,
                    imports,
                },
            );
        }

        let packages: Vec<ParsedPackage> = loaded.into_values().collect();
        Ok(build_model(&packages, scan.roots))
    }
}

/// Packages named by the out-of-line `mod` declarations of a package's files.
fn module_imports(package: &str, files: &[ParsedFile], is_package: impl Fn(&str) -> bool) -> Vec<String> {
    let mut imports = Vec::new();
    for file in files {
        for item in &file.syntax_tree.items {
            let syn::Item::Mod(module) = item else {
                continue;
            };
            if module.content.is_some() {
                continue;
            }

            let name = module.ident.unraw().to_string();
            let child = if package == "." {
                name
            } else {
                format!("{package}/{name}")
            };
            if is_package(&child) && !imports.contains(&child) {
                imports.push(child);
            }
        }
    }
    imports
}

/// Lowers parsed packages into the source model.
pub fn build_model(packages: &[ParsedPackage], roots: Vec<String>) -> SourceModel {
    let resolver = TypeResolver::new(packages);

    let packages = packages
        .iter()
        .map(|package| Package {
            id: package.id.clone(),
            name: package.name.clone(),
            files: package
                .files
                .iter()
                .map(|file| lower_file(file, &package.id, &resolver))
                .collect(),
            imports: package.imports.clone(),
        })
        .collect();

    SourceModel::new(roots, packages)
}

fn lower_file(file: &ParsedFile, package: &str, resolver: &TypeResolver) -> SourceFile {
    let doc = doc_comment(&file.syntax_tree.attrs, "//!");
    let mut comments: Vec<CommentGroup> = doc.iter().cloned().collect();
    collect_comments(&file.syntax_tree.items, &mut comments);
    let mut decls = Vec::new();

    for item in &file.syntax_tree.items {
        let item_doc = doc_comment(item_attrs(item), "///");

        let decl = match item {
            syn::Item::Struct(_) | syn::Item::Enum(_) | syn::Item::Type(_) => {
                resolver.resolve_item(item, package).and_then(|ty| {
                    let name = item_ident(item)?;
                    Some(Decl::Types(TypeDecl {
                        doc: item_doc,
                        specs: vec![TypeSpec { name, ty }],
                    }))
                })
            }
            syn::Item::Fn(func) => Some(Decl::Func {
                name: func.sig.ident.unraw().to_string(),
            }),
            syn::Item::Use(_) | syn::Item::ExternCrate(_) | syn::Item::Mod(_) => Some(Decl::Import),
            syn::Item::Const(_) | syn::Item::Static(_) => Some(Decl::Value),
            _ => None,
        };
        decls.extend(decl);
    }

    SourceFile {
        path: file.path.clone(),
        doc,
        comments,
        decls,
    }
}

fn item_ident(item: &syn::Item) -> Option<String> {
    let ident = match item {
        syn::Item::Struct(s) => &s.ident,
        syn::Item::Enum(e) => &e.ident,
        syn::Item::Type(t) => &t.ident,
        _ => return None,
    };
    Some(ident.unraw().to_string())
}

fn item_attrs(item: &syn::Item) -> &[syn::Attribute] {
    match item {
        syn::Item::Const(i) => &i.attrs,
        syn::Item::Enum(i) => &i.attrs,
        syn::Item::ExternCrate(i) => &i.attrs,
        syn::Item::Fn(i) => &i.attrs,
        syn::Item::ForeignMod(i) => &i.attrs,
        syn::Item::Impl(i) => &i.attrs,
        syn::Item::Macro(i) => &i.attrs,
        syn::Item::Mod(i) => &i.attrs,
        syn::Item::Static(i) => &i.attrs,
        syn::Item::Struct(i) => &i.attrs,
        syn::Item::Trait(i) => &i.attrs,
        syn::Item::TraitAlias(i) => &i.attrs,
        syn::Item::Type(i) => &i.attrs,
        syn::Item::Union(i) => &i.attrs,
        syn::Item::Use(i) => &i.attrs,
        _ => &[],
    }
}

/// Doc comments of `items` in source order, descending into inline modules.
fn collect_comments(items: &[syn::Item], comments: &mut Vec<CommentGroup>) {
    for item in items {
        comments.extend(doc_comment(item_attrs(item), "///"));
        comments.extend(nested_fn_docs(item));

        if let syn::Item::Mod(syn::ItemMod {
            attrs,
            content: Some((_, inner)),
            ..
        }) = item
        {
            comments.extend(doc_comment(attrs, "//!"));
            collect_comments(inner, comments);
        }
    }
}

/// Doc comments of the functions inside `impl` and `trait` blocks.
fn nested_fn_docs(item: &syn::Item) -> Vec<CommentGroup> {
    match item {
        syn::Item::Impl(block) => block
            .items
            .iter()
            .filter_map(|item| match item {
                syn::ImplItem::Fn(func) => doc_comment(&func.attrs, "///"),
                _ => None,
            })
            .collect(),
        syn::Item::Trait(block) => block
            .items
            .iter()
            .filter_map(|item| match item {
                syn::TraitItem::Fn(func) => doc_comment(&func.attrs, "///"),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Builds a model from in-memory sources, one file per package, every package a root.
#[cfg(test)]
pub(crate) fn model_from_sources(sources: &[(&str, &str)]) -> SourceModel {
    let ids: Vec<&str> = sources.iter().map(|(id, _)| *id).collect();
    let packages: Vec<ParsedPackage> = sources
        .iter()
        .map(|(id, code)| {
            let files = vec![ParsedFile {
                path: PathBuf::from(*id).join("lib.rs"),
                syntax_tree: syn::parse_file(code).unwrap(),
            }];
            let imports = module_imports(id, &files, |child| ids.contains(&child));
            ParsedPackage {
                id: id.to_string(),
                name: id.rsplit('/').next().unwrap_or(id).to_string(),
                files,
                imports,
            }
        })
        .collect();

    build_model(&packages, ids.iter().map(|id| id.to_string()).collect())
}
