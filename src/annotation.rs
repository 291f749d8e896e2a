use crate::directive::{detect_directives, parse_route, DirectiveKinds};
use crate::model::{NamedType, Package, SourceFile};
use crate::registry::{DeclarationRecord, MetaRecord, Registry};
use log::debug;

/// Finds `swag:*` directives in the files of a package and records them.
///
/// Each file is classified first by the directive kinds its comments mention; only the
/// matching extraction steps run for it.
pub struct AnnotationScanner;

impl AnnotationScanner {
    /// Scans every file of `package` into `registry`.
    pub fn scan_package(package: &Package, registry: &mut Registry) {
        debug!("Scanning package {} ({} files)", package.id, package.files.len());
        for file in &package.files {
            Self::scan_file(package, file, registry);
        }
    }

    /// Scans a single file, returning the directive kinds it was classified with.
    pub fn scan_file(package: &Package, file: &SourceFile, registry: &mut Registry) -> DirectiveKinds {
        let kinds = detect_directives(&file.comments);
        if kinds.is_empty() {
            return kinds;
        }
        debug!("{}: directives {:?}", file.path.display(), kinds);

        if kinds.contains(DirectiveKinds::META) {
            if let Some(doc) = &file.doc {
                registry.add_meta(MetaRecord {
                    package: package.id.clone(),
                    file: file.path.clone(),
                    comments: doc.clone(),
                });
            }
        }

        if kinds.contains(DirectiveKinds::ROUTE) {
            for route in file.comments.iter().filter_map(parse_route) {
                debug!("Found route {} {} {}", route.id, route.method, route.path);
                registry.add_route(route);
            }
        }

        if kinds.intersects(DirectiveKinds::REQ.union(DirectiveKinds::ANS)) {
            for decl in file.type_decls() {
                for spec in &decl.specs {
                    let record = DeclarationRecord::new(
                        NamedType::new(package.id.as_str(), spec.name.as_str()),
                        decl.doc.clone(),
                        file.path.clone(),
                        package.id.clone(),
                    );
                    registry.add_declaration(record);
                }
            }
        }

        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommentGroup, Decl, ScalarKind, TypeDecl, TypeRef, TypeSpec};
    use std::path::PathBuf;

    fn group(lines: &[&str]) -> CommentGroup {
        CommentGroup::new(lines.iter().copied())
    }

    fn type_decl(name: &str, doc: &[&str]) -> Decl {
        Decl::Types(TypeDecl {
            doc: Some(group(doc)),
            specs: vec![TypeSpec {
                name: name.to_string(),
                ty: TypeRef::Scalar(ScalarKind::String),
            }],
        })
    }

    fn package(files: Vec<SourceFile>) -> Package {
        Package {
            id: "api".to_string(),
            name: "api".to_string(),
            files,
            imports: Vec::new(),
        }
    }

    fn file(doc: Option<CommentGroup>, decls: Vec<Decl>) -> SourceFile {
        let mut comments: Vec<CommentGroup> = doc.iter().cloned().collect();
        for decl in &decls {
            if let Decl::Types(TypeDecl { doc: Some(doc), .. }) = decl {
                comments.push(doc.clone());
            }
        }
        SourceFile {
            path: PathBuf::from("api/lib.rs"),
            doc,
            comments,
            decls,
        }
    }

    #[test]
    fn test_scan_meta_file() {
        let doc = group(&["//! swag:meta", "//! title: Pets"]);
        let package = package(vec![file(Some(doc.clone()), Vec::new())]);
        let mut registry = Registry::new();

        AnnotationScanner::scan_package(&package, &mut registry);

        assert_eq!(registry.metas().len(), 1);
        assert_eq!(registry.metas()[0].comments, doc);
        assert_eq!(registry.metas()[0].package, "api");
    }

    #[test]
    fn test_scan_routes_from_all_groups() {
        let mut source = file(None, vec![Decl::Func { name: "list".to_string() }]);
        source.comments = vec![
            group(&["/// swag:route listPets GET /pets pets"]),
            group(&["/// swag:route getPet GET /pets/{id} pets", "/// Fetch one pet"]),
            group(&["/// unrelated"]),
        ];
        let mut registry = Registry::new();

        let kinds = AnnotationScanner::scan_file(&package(Vec::new()), &source, &mut registry);

        assert!(kinds.contains(DirectiveKinds::ROUTE));
        let ids: Vec<&str> = registry.routes().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["listPets", "getPet"]);
    }

    #[test]
    fn test_scan_declarations_only_in_flagged_files() {
        let mut registry = Registry::new();
        let source = file(
            None,
            vec![
                type_decl("NewPet", &["/// swag:req createPet", "/// Pet to create"]),
                type_decl("Pet", &["/// swag:ans getPet 200"]),
                type_decl("Helper", &["/// Not bound"]),
                Decl::Value,
            ],
        );

        AnnotationScanner::scan_file(&package(Vec::new()), &source, &mut registry);

        let request = registry.requests().get("createPet").unwrap();
        assert_eq!(request.type_name, NamedType::new("api", "NewPet"));
        let response = registry.responses().get("getPet-200").unwrap();
        assert_eq!(response.type_name, NamedType::new("api", "Pet"));
        assert_eq!(registry.requests().len(), 1);
        assert_eq!(registry.responses().len(), 1);
    }

    #[test]
    fn test_scan_file_without_directives() {
        let mut registry = Registry::new();
        let source = file(Some(group(&["//! Plain crate docs"])), vec![type_decl("Pet", &["/// A pet"])]);

        let kinds = AnnotationScanner::scan_file(&package(Vec::new()), &source, &mut registry);

        assert!(kinds.is_empty());
        assert!(registry.metas().is_empty());
        assert!(registry.requests().is_empty());
    }
}
