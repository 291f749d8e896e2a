//! Records collected by the annotation scanner.
//!
//! The registry is owned by the pipeline: the walker fills it, the document builder reads
//! it. Maps keep first-insertion order and replace values in place, so a duplicate ID keeps
//! its original position but takes the value seen last during traversal.

use crate::directive::{
    parse_request_binding, parse_response_binding, RequestBinding, ResponseBinding, RouteRecord,
};
use crate::model::{CommentGroup, NamedType};
use log::debug;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::PathBuf;

/// String-keyed map iterating in first-insertion order.
#[derive(Debug, Clone)]
pub struct InsertionMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> InsertionMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Inserts or replaces in place, returning the previous value.
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for InsertionMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Package doc comment of a file carrying a `swag:meta` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    pub package: String,
    pub file: PathBuf,
    pub comments: CommentGroup,
}

/// A type declaration found in a file carrying `swag:req` or `swag:ans` directives.
///
/// Bindings are parsed from the doc comment on first use and cached. A declaration may be
/// bound as a request and as a response at the same time; the two bindings are independent.
#[derive(Debug, Clone)]
pub struct DeclarationRecord {
    /// Resolved identity of the declared type
    pub type_name: NamedType,
    /// Doc comment of the declaration
    pub doc: Option<CommentGroup>,
    /// File the declaration was found in
    pub file: PathBuf,
    /// Package the declaration was found in
    pub package: String,
    request: OnceCell<Option<RequestBinding>>,
    response: OnceCell<Option<ResponseBinding>>,
}

impl DeclarationRecord {
    pub fn new(type_name: NamedType, doc: Option<CommentGroup>, file: PathBuf, package: String) -> Self {
        Self {
            type_name,
            doc,
            file,
            package,
            request: OnceCell::new(),
            response: OnceCell::new(),
        }
    }

    pub fn request_binding(&self) -> Option<&RequestBinding> {
        self.request
            .get_or_init(|| self.doc.as_ref().and_then(parse_request_binding))
            .as_ref()
    }

    pub fn response_binding(&self) -> Option<&ResponseBinding> {
        self.response
            .get_or_init(|| self.doc.as_ref().and_then(parse_response_binding))
            .as_ref()
    }

    pub fn has_req_annotation(&self) -> bool {
        self.request_binding().is_some()
    }

    pub fn has_ans_annotation(&self) -> bool {
        self.response_binding().is_some()
    }
}

/// Deduplicated directive records of a whole scan.
#[derive(Debug, Default)]
pub struct Registry {
    metas: Vec<MetaRecord>,
    routes: InsertionMap<RouteRecord>,
    requests: InsertionMap<DeclarationRecord>,
    responses: InsertionMap<DeclarationRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_meta(&mut self, meta: MetaRecord) {
        self.metas.push(meta);
    }

    /// Registers a route; a later route with the same ID replaces the earlier one.
    pub fn add_route(&mut self, route: RouteRecord) {
        let id = route.id.clone();
        if let Some(previous) = self.routes.insert(id.clone(), route) {
            debug!("Route {} redeclared, replacing {} {}", id, previous.method, previous.path);
        }
    }

    /// Registers a declaration under each binding it carries.
    ///
    /// Returns `false` when the declaration carries neither a request nor a response binding.
    pub fn add_declaration(&mut self, decl: DeclarationRecord) -> bool {
        let request = decl.request_binding().map(|b| b.name().to_string());
        let response = decl.response_binding().map(|b| b.name.clone());

        match (request, response) {
            (None, None) => false,
            (request, response) => {
                if let Some(name) = request {
                    debug!("Request binding {} -> {}", name, decl.type_name);
                    self.requests.insert(name, decl.clone());
                }
                if let Some(name) = response {
                    debug!("Response binding {} -> {}", name, decl.type_name);
                    self.responses.insert(name, decl);
                }
                true
            }
        }
    }

    pub fn metas(&self) -> &[MetaRecord] {
        &self.metas
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteRecord> {
        self.routes.values()
    }

    pub fn route(&self, id: &str) -> Option<&RouteRecord> {
        self.routes.get(id)
    }

    /// Request-bound declarations keyed by schema name.
    pub fn requests(&self) -> &InsertionMap<DeclarationRecord> {
        &self.requests
    }

    /// Response-bound declarations keyed by `<ID>-<CODE>`.
    pub fn responses(&self) -> &InsertionMap<DeclarationRecord> {
        &self.responses
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
