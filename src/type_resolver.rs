use crate::model::{Field, NamedType, ScalarKind, StructType, TypeRef};
use crate::parser::{doc_comment, ParsedPackage};
use log::debug;
use std::collections::HashMap;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::parse::Parse;
use syn::Token;

/// Well-known timestamp types and the package identity they resolve to.
const TIMESTAMP_TYPES: &[(&str, &str)] = &[
    ("SystemTime", "std::time"),
    ("DateTime", "chrono"),
    ("NaiveDateTime", "chrono"),
    ("OffsetDateTime", "time"),
    ("PrimitiveDateTime", "time"),
];

/// Resolves `syn` types of a package set into model type shapes.
///
/// Paths are resolved by their last segment: a type declared in the current package wins,
/// then one declared in any loaded package. Anything else becomes an unresolved named type.
pub struct TypeResolver {
    /// Declared type name -> packages declaring it, in load order
    declared: HashMap<String, Vec<String>>,
}

/// Where a type expression appears.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Package the expression belongs to
    pub package: &'a str,
    /// Type named by `Self`, if any
    pub self_type: Option<&'a str>,
}

/// Serde attributes for a field or container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerdeAttributes {
    /// Renamed field name
    pub rename: Option<String>,
    /// Container-level rename rule
    pub rename_all: Option<String>,
    /// Whether to skip this field during serialization
    pub skip: bool,
    /// Whether to flatten this field
    pub flatten: bool,
}

impl SerdeAttributes {
    /// Serialization tag in `json:"name"` form.
    pub fn to_tag(&self) -> Option<String> {
        if self.skip {
            return Some(r#"json:"-""#.to_string());
        }
        self.rename
            .as_ref()
            .map(|name| format!(r#"json:"{}""#, name.replace('\\', "\\\\").replace('"', "\\\"")))
    }
}

impl TypeResolver {
    /// Create a new TypeResolver over the declarations of `packages`
    pub fn new(packages: &[ParsedPackage]) -> Self {
        let mut declared: HashMap<String, Vec<String>> = HashMap::new();
        for package in packages {
            for file in &package.files {
                for item in &file.syntax_tree.items {
                    let ident = match item {
                        syn::Item::Struct(s) => &s.ident,
                        syn::Item::Enum(e) => &e.ident,
                        syn::Item::Type(t) => &t.ident,
                        _ => continue,
                    };
                    declared
                        .entry(ident.unraw().to_string())
                        .or_default()
                        .push(package.id.clone());
                }
            }
        }
        debug!("Initializing TypeResolver with {} declared types", declared.len());
        Self { declared }
    }

    /// Resolves a type name to its declaring package.
    pub fn lookup(&self, name: &str, package: &str) -> Option<NamedType> {
        let packages = self.declared.get(name)?;
        let owner = packages
            .iter()
            .find(|id| *id == package)
            .or_else(|| packages.first())?;
        Some(NamedType::new(owner.as_str(), name))
    }

    /// Resolves the shape of a declared item, `None` for items that declare no type.
    pub fn resolve_item(&self, item: &syn::Item, package: &str) -> Option<TypeRef> {
        match item {
            syn::Item::Struct(item_struct) => {
                let name = item_struct.ident.unraw().to_string();
                let scope = Scope {
                    package,
                    self_type: Some(name.as_str()),
                };
                let container = parse_serde_attributes(&item_struct.attrs);
                Some(self.resolve_fields(&item_struct.fields, scope, &container))
            }
            syn::Item::Enum(item_enum) => {
                let unit_only = item_enum
                    .variants
                    .iter()
                    .all(|variant| matches!(variant.fields, syn::Fields::Unit));
                // unit variants serialize as their names
                Some(TypeRef::Scalar(if unit_only {
                    ScalarKind::String
                } else {
                    ScalarKind::Unsupported
                }))
            }
            syn::Item::Type(item_type) => {
                let name = item_type.ident.unraw().to_string();
                let scope = Scope {
                    package,
                    self_type: Some(name.as_str()),
                };
                Some(self.resolve_type(&item_type.ty, scope))
            }
            _ => None,
        }
    }

    fn resolve_fields(&self, fields: &syn::Fields, scope: Scope<'_>, container: &SerdeAttributes) -> TypeRef {
        match fields {
            syn::Fields::Named(named) => TypeRef::Struct(StructType {
                fields: named
                    .named
                    .iter()
                    .filter_map(|field| self.resolve_field(field, scope, container))
                    .collect(),
            }),
            // newtypes serialize as their inner value
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                self.resolve_type(&unnamed.unnamed[0].ty, scope)
            }
            syn::Fields::Unnamed(_) => TypeRef::Scalar(ScalarKind::Unsupported),
            syn::Fields::Unit => TypeRef::Struct(StructType::default()),
        }
    }

    /// Resolves a named struct field.
    pub fn resolve_field(&self, field: &syn::Field, scope: Scope<'_>, container: &SerdeAttributes) -> Option<Field> {
        let name = field.ident.as_ref()?.unraw().to_string();
        let mut serde_attrs = parse_serde_attributes(&field.attrs);
        if serde_attrs.rename.is_none() {
            serde_attrs.rename = container
                .rename_all
                .as_deref()
                .and_then(|rule| apply_rename_rule(rule, &name));
        }

        Some(Field {
            ty: self.resolve_type(&field.ty, scope),
            exported: !matches!(field.vis, syn::Visibility::Inherited),
            embedded: serde_attrs.flatten,
            tag: serde_attrs.to_tag(),
            comment: doc_comment(&field.attrs, "///"),
            name,
        })
    }

    /// Resolves a type expression.
    pub fn resolve_type(&self, ty: &syn::Type, scope: Scope<'_>) -> TypeRef {
        match ty {
            syn::Type::Path(type_path) if type_path.qself.is_none() => self.resolve_path(&type_path.path, scope),
            syn::Type::Reference(reference) => TypeRef::Pointer(Box::new(self.resolve_type(&reference.elem, scope))),
            syn::Type::Ptr(pointer) => TypeRef::Pointer(Box::new(self.resolve_type(&pointer.elem, scope))),
            syn::Type::Slice(slice) => TypeRef::Slice(Box::new(self.resolve_type(&slice.elem, scope))),
            syn::Type::Array(array) => {
                let len = match &array.len {
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Int(int),
                        ..
                    }) => int.base10_parse::<usize>().unwrap_or(0),
                    _ => 0,
                };
                TypeRef::Array(Box::new(self.resolve_type(&array.elem, scope)), len)
            }
            syn::Type::Paren(paren) => self.resolve_type(&paren.elem, scope),
            syn::Type::Group(group) => self.resolve_type(&group.elem, scope),
            _ => TypeRef::Scalar(ScalarKind::Unsupported),
        }
    }

    fn resolve_path(&self, path: &syn::Path, scope: Scope<'_>) -> TypeRef {
        let Some(segment) = path.segments.last() else {
            return TypeRef::Scalar(ScalarKind::Unsupported);
        };
        let name = segment.ident.unraw().to_string();
        let first_arg = || first_type_argument(&segment.arguments);

        match name.as_str() {
            "Option" | "Box" | "Rc" | "Arc" | "Cow" => {
                return match first_arg() {
                    Some(inner) => TypeRef::Pointer(Box::new(self.resolve_type(inner, scope))),
                    None => TypeRef::Scalar(ScalarKind::Unsupported),
                };
            }
            "Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "LinkedList" => {
                return match first_arg() {
                    Some(inner) => TypeRef::Slice(Box::new(self.resolve_type(inner, scope))),
                    None => TypeRef::Scalar(ScalarKind::Unsupported),
                };
            }
            "HashMap" | "BTreeMap" => return TypeRef::Scalar(ScalarKind::Unsupported),
            "Self" => {
                if let Some(named) = scope.self_type.and_then(|name| self.lookup(name, scope.package)) {
                    return TypeRef::Named(named);
                }
            }
            _ => {}
        }

        if let Some(kind) = parse_primitive_type(&name) {
            return TypeRef::Scalar(kind);
        }

        if let Some(named) = self.lookup(&name, scope.package) {
            return TypeRef::Named(named);
        }

        if let Some((_, package)) = TIMESTAMP_TYPES.iter().find(|(ty, _)| *ty == name) {
            return TypeRef::Named(NamedType::new(*package, name));
        }

        debug!("Type {} is not declared in any loaded package", name);
        TypeRef::Named(NamedType::new("", name))
    }
}

fn first_type_argument(arguments: &syn::PathArguments) -> Option<&syn::Type> {
    let syn::PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

/// Parse a primitive type name
pub fn parse_primitive_type(type_name: &str) -> Option<ScalarKind> {
    match type_name {
        "bool" => Some(ScalarKind::Bool),
        "i8" => Some(ScalarKind::Int8),
        "i16" => Some(ScalarKind::Int16),
        "i32" => Some(ScalarKind::Int32),
        "i64" => Some(ScalarKind::Int64),
        "isize" => Some(ScalarKind::Int),
        "u8" => Some(ScalarKind::Uint8),
        "u16" => Some(ScalarKind::Uint16),
        "u32" => Some(ScalarKind::Uint32),
        "u64" => Some(ScalarKind::Uint64),
        "usize" => Some(ScalarKind::Uint),
        "f32" => Some(ScalarKind::Float32),
        "f64" => Some(ScalarKind::Float64),
        "String" | "str" | "char" => Some(ScalarKind::String),
        "i128" | "u128" => Some(ScalarKind::Unsupported),
        _ => None,
    }
}

/// Parse Serde attributes from field or container attributes
///
/// Malformed attributes are ignored; the compiler rejects them anyway.
pub fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if let Some(value) = serialize_name(&meta)? {
                    serde_attrs.rename = Some(value);
                }
            } else if meta.path.is_ident("rename_all") {
                if let Some(value) = serialize_name(&meta)? {
                    serde_attrs.rename_all = Some(value);
                }
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde_attrs.skip = true;
            } else if meta.path.is_ident("flatten") {
                serde_attrs.flatten = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        });

        if let Err(e) = result {
            debug!("Ignoring unparsable serde attribute: {}", e);
        }
    }

    serde_attrs
}

/// Value of `name = "x"` or the `serialize` half of `name(serialize = "x", deserialize = "y")`.
fn serialize_name(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(Token![=]) {
        let value: syn::LitStr = meta.value()?.parse()?;
        return Ok(Some(value.value()));
    }

    let mut name = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            let value: syn::LitStr = inner.value()?.parse()?;
            name = Some(value.value());
        } else {
            skip_meta_value(&inner)?;
        }
        Ok(())
    })?;
    Ok(name)
}

fn skip_meta_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse_terminated(syn::Meta::parse, Token![,])?;
    }
    Ok(())
}

/// Applies a serde `rename_all` rule to a snake_case field name.
pub fn apply_rename_rule(rule: &str, field: &str) -> Option<String> {
    let words = || field.split('_').filter(|word| !word.is_empty());
    let capitalize = |word: &str| {
        let mut chars = word.chars();
        chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect::<String>())
            .unwrap_or_default()
    };

    let renamed = match rule {
        "lowercase" => field.to_lowercase(),
        "UPPERCASE" => field.to_uppercase(),
        "snake_case" => field.to_string(),
        "SCREAMING_SNAKE_CASE" => field.to_uppercase(),
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_uppercase(),
        "PascalCase" => words().map(capitalize).collect(),
        "camelCase" => words()
            .enumerate()
            .map(|(i, word)| if i == 0 { word.to_string() } else { capitalize(word) })
            .collect(),
        _ => {
            debug!("Unknown rename rule {}", rule);
            return None;
        }
    };
    Some(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;
    use std::path::PathBuf;

    fn package(id: &str, code: &str) -> ParsedPackage {
        ParsedPackage {
            id: id.to_string(),
            name: id.to_string(),
            files: vec![ParsedFile {
                path: PathBuf::from(format!("{id}/lib.rs")),
                syntax_tree: syn::parse_file(code).unwrap(),
            }],
            imports: Vec::new(),
        }
    }

    fn scope(package: &str) -> Scope<'_> {
        Scope {
            package,
            self_type: None,
        }
    }

    fn resolve(resolver: &TypeResolver, ty: &str) -> TypeRef {
        resolver.resolve_type(&syn::parse_str(ty).unwrap(), scope("api"))
    }

    fn struct_fields(resolver: &TypeResolver, code: &str) -> Vec<Field> {
        let item: syn::Item = syn::parse_str(code).unwrap();
        match resolver.resolve_item(&item, "api") {
            Some(TypeRef::Struct(st)) => st.fields,
            other => panic!("expected a struct, got {other:?}"),
        }
    }

    #[test]
    fn test_primitive_types() {
        let resolver = TypeResolver::new(&[]);
        assert_eq!(resolve(&resolver, "bool"), TypeRef::Scalar(ScalarKind::Bool));
        assert_eq!(resolve(&resolver, "usize"), TypeRef::Scalar(ScalarKind::Uint));
        assert_eq!(resolve(&resolver, "std::string::String"), TypeRef::Scalar(ScalarKind::String));
        assert_eq!(resolve(&resolver, "u128"), TypeRef::Scalar(ScalarKind::Unsupported));
        assert_eq!(
            resolve(&resolver, "&'static str"),
            TypeRef::Pointer(Box::new(TypeRef::Scalar(ScalarKind::String)))
        );
    }

    #[test]
    fn test_wrappers_and_sequences() {
        let resolver = TypeResolver::new(&[]);
        let string = || Box::new(TypeRef::Scalar(ScalarKind::String));

        assert_eq!(resolve(&resolver, "Option<String>"), TypeRef::Pointer(string()));
        assert_eq!(resolve(&resolver, "Cow<'a, str>"), TypeRef::Pointer(string()));
        assert_eq!(resolve(&resolver, "Vec<String>"), TypeRef::Slice(string()));
        assert_eq!(resolve(&resolver, "BTreeSet<String>"), TypeRef::Slice(string()));
        assert_eq!(resolve(&resolver, "[String]"), TypeRef::Slice(string()));
        assert_eq!(resolve(&resolver, "[String; 4]"), TypeRef::Array(string(), 4));
        assert_eq!(
            resolve(&resolver, "HashMap<String, i32>"),
            TypeRef::Scalar(ScalarKind::Unsupported)
        );
    }

    #[test]
    fn test_named_types_prefer_same_package() {
        let packages = vec![
            package("models", "pub struct Pet {} pub struct Owner {}"),
            package("api", "pub struct Pet {}"),
        ];
        let resolver = TypeResolver::new(&packages);

        assert_eq!(resolve(&resolver, "Pet"), TypeRef::Named(NamedType::new("api", "Pet")));
        assert_eq!(
            resolve(&resolver, "crate::models::Owner"),
            TypeRef::Named(NamedType::new("models", "Owner"))
        );
        assert_eq!(resolve(&resolver, "Unknown"), TypeRef::Named(NamedType::new("", "Unknown")));
    }

    #[test]
    fn test_timestamps_unless_declared_locally() {
        let resolver = TypeResolver::new(&[]);
        assert_eq!(
            resolve(&resolver, "chrono::DateTime<chrono::Utc>"),
            TypeRef::Named(NamedType::new("chrono", "DateTime"))
        );
        assert_eq!(
            resolve(&resolver, "SystemTime"),
            TypeRef::Named(NamedType::new("std::time", "SystemTime"))
        );

        let packages = vec![package("api", "pub struct DateTime { pub raw: String }")];
        let resolver = TypeResolver::new(&packages);
        assert_eq!(resolve(&resolver, "DateTime"), TypeRef::Named(NamedType::new("api", "DateTime")));
    }

    #[test]
    fn test_struct_fields() {
        let resolver = TypeResolver::new(&[]);
        let fields = struct_fields(
            &resolver,
            r#"
            pub struct Pet {
                /// The name
                pub name: String,
                #[serde(rename = "petKind", default)]
                pub(crate) kind: String,
                #[serde(skip_serializing_if = "Option::is_none")]
                pub nickname: Option<String>,
                #[serde(skip)]
                pub cache: Vec<u8>,
                #[serde(flatten)]
                pub extra: Extra,
                private: bool,
                pub r#type: String,
            }
            "#,
        );

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "kind", "nickname", "cache", "extra", "private", "type"]);

        assert_eq!(fields[0].comment.as_ref().unwrap().text(), "The name");
        assert_eq!(fields[1].tag.as_deref(), Some(r#"json:"petKind""#));
        assert!(fields[1].exported);
        assert_eq!(fields[2].tag, None);
        assert_eq!(fields[3].tag.as_deref(), Some(r#"json:"-""#));
        assert!(fields[4].embedded);
        assert!(!fields[5].exported);
    }

    #[test]
    fn test_rename_all_container() {
        let resolver = TypeResolver::new(&[]);
        let fields = struct_fields(
            &resolver,
            r#"
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            pub struct Query {
                pub page_size: u32,
                #[serde(rename = "q")]
                pub search_term: String,
            }
            "#,
        );

        assert_eq!(fields[0].tag.as_deref(), Some(r#"json:"pageSize""#));
        assert_eq!(fields[1].tag.as_deref(), Some(r#"json:"q""#));
    }

    #[test]
    fn test_rename_serialize_half() {
        let attrs = syn::parse_str::<syn::ItemStruct>(
            r#"#[serde(rename(serialize = "out", deserialize = "in"))] struct S;"#,
        )
        .unwrap()
        .attrs;
        assert_eq!(parse_serde_attributes(&attrs).rename.as_deref(), Some("out"));
    }

    #[test]
    fn test_apply_rename_rule() {
        assert_eq!(apply_rename_rule("camelCase", "page_size").as_deref(), Some("pageSize"));
        assert_eq!(apply_rename_rule("PascalCase", "page_size").as_deref(), Some("PageSize"));
        assert_eq!(apply_rename_rule("kebab-case", "page_size").as_deref(), Some("page-size"));
        assert_eq!(
            apply_rename_rule("SCREAMING_SNAKE_CASE", "page_size").as_deref(),
            Some("PAGE_SIZE")
        );
        assert_eq!(apply_rename_rule("nonsense", "page_size"), None);
    }

    #[test]
    fn test_enums_and_aliases() {
        let packages = vec![package("api", "pub struct Pet {}")];
        let resolver = TypeResolver::new(&packages);

        let unit: syn::Item = syn::parse_str("enum Status { Active, Inactive }").unwrap();
        assert_eq!(resolver.resolve_item(&unit, "api"), Some(TypeRef::Scalar(ScalarKind::String)));

        let data: syn::Item = syn::parse_str("enum Shape { Circle(f64) }").unwrap();
        assert_eq!(
            resolver.resolve_item(&data, "api"),
            Some(TypeRef::Scalar(ScalarKind::Unsupported))
        );

        let alias: syn::Item = syn::parse_str("type Pets = Vec<Pet>;").unwrap();
        assert_eq!(
            resolver.resolve_item(&alias, "api"),
            Some(TypeRef::Slice(Box::new(TypeRef::Named(NamedType::new("api", "Pet")))))
        );

        let newtype: syn::Item = syn::parse_str("pub struct PetId(pub u64);").unwrap();
        assert_eq!(resolver.resolve_item(&newtype, "api"), Some(TypeRef::Scalar(ScalarKind::Uint64)));

        let func: syn::Item = syn::parse_str("fn f() {}").unwrap();
        assert_eq!(resolver.resolve_item(&func, "api"), None);
    }

    #[test]
    fn test_self_reference() {
        let packages = vec![package("api", "pub struct Node { pub next: Option<Box<Self>> }")];
        let resolver = TypeResolver::new(&packages);
        let item = &packages[0].files[0].syntax_tree.items[0];

        let ty = resolver.resolve_item(item, "api").unwrap();
        let TypeRef::Struct(st) = ty else {
            panic!("expected a struct shape");
        };
        let expected = TypeRef::Pointer(Box::new(TypeRef::Pointer(Box::new(TypeRef::Named(
            NamedType::new("api", "Node"),
        )))));
        assert_eq!(st.fields[0].ty, expected);
    }
}
