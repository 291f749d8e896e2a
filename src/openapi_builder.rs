use crate::directive::{parse_meta, serialized_name, split_list, RouteRecord};
use crate::model::{clean_comment_line, CommentGroup, NamedType, SourceModel, StructType, TypeRef};
use crate::registry::{DeclarationRecord, MetaRecord, Registry};
use crate::schema_generator::{scalar_schema, SchemaGenerator, SchemaNode};
use log::{debug, info, warn};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Version written into documents created from scratch.
pub const SWAGGER_VERSION: &str = "2.0";

fn default_swagger_version() -> String {
    SWAGGER_VERSION.to_string()
}

/// Swagger 2.0 document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_swagger_version")]
    pub swagger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "basePath", skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produces: Option<Vec<String>>,
    /// Path template -> operations on that path
    #[serde(default)]
    pub paths: Paths,
    /// Named schemas referenced as `#/definitions/<name>`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, Response>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            swagger: default_swagger_version(),
            info: None,
            host: None,
            base_path: None,
            schemes: None,
            consumes: None,
            produces: None,
            paths: Paths::default(),
            definitions: BTreeMap::new(),
            responses: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path)?.operation(method)
    }

    pub fn operation_mut(&mut self, path: &str, method: HttpMethod) -> Option<&mut Operation> {
        self.paths.get_mut(path)?.slot_mut(method).as_mut()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// API metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// HTTP methods a path item has a slot for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Head,
    Delete,
    Options,
}

impl HttpMethod {
    /// Parses an HTTP method name case-insensitively.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "HEAD" => Some(HttpMethod::Head),
            "DELETE" => Some(HttpMethod::Delete),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `paths` object: path items by template, plus `x-` vendor extensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paths {
    pub items: BTreeMap<String, PathItem>,
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Deref for Paths {
    type Target = BTreeMap<String, PathItem>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl DerefMut for Paths {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl Serialize for Paths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len() + self.extensions.len()))?;
        for (path, item) in &self.items {
            map.serialize_entry(path, item)?;
        }
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Paths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut paths = Paths::default();
        for (key, value) in entries {
            if key.starts_with("x-") {
                paths.extensions.insert(key, value);
            } else {
                let item = serde_json::from_value(value)
                    .map_err(|e| D::Error::custom(format!("path {}: {}", key, e)))?;
                paths.items.insert(key, item);
            }
        }
        Ok(paths)
    }
}

/// All operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
        }
    }
}

/// A single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Status code -> response
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, Response>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Operation {
    pub fn new(id: &str) -> Self {
        Self {
            operation_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// Adds a parameter, replacing one with the same name and location.
    ///
    /// `$ref` parameters never match, so shared parameters of an input document stay.
    pub fn add_param(&mut self, param: Parameter) -> &mut Parameter {
        let position = self.parameters.iter().position(|p| {
            p.reference.is_none() && p.name == param.name && p.location == param.location
        });
        match position {
            Some(index) => {
                self.parameters[index] = param;
                &mut self.parameters[index]
            }
            None => {
                self.parameters.push(param);
                let last = self.parameters.len() - 1;
                &mut self.parameters[last]
            }
        }
    }

    pub fn respond_with(&mut self, code: u16, response: Response) {
        self.responses.insert(code.to_string(), response);
    }
}

/// Where a parameter is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    FormData,
}

/// Operation parameter, or a `$ref` to a shared one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Body parameters only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Parameter {
    fn new(name: &str, location: ParameterLocation) -> Self {
        Self {
            reference: None,
            name: name.to_string(),
            location: Some(location),
            description: None,
            required: false,
            param_type: None,
            format: None,
            schema: None,
            extra: BTreeMap::new(),
        }
    }

    /// Required string path parameter.
    pub fn path(name: &str) -> Self {
        Self {
            required: true,
            ..Self::new(name, ParameterLocation::Path)
        }
        .typed("string", None)
    }

    pub fn query(name: &str) -> Self {
        Self::new(name, ParameterLocation::Query)
    }

    pub fn body(name: &str, schema: SchemaNode) -> Self {
        Self {
            schema: Some(schema),
            ..Self::new(name, ParameterLocation::Body)
        }
    }

    pub fn typed(mut self, param_type: &str, format: Option<&str>) -> Self {
        self.param_type = Some(param_type.to_string());
        self.format = format.map(str::to_string);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Operation response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Names of the `{name}` and `:name` segments of a path template.
pub fn path_parameters(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .or_else(|| segment.strip_prefix(':'))
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Description of a bound declaration: its doc comment without the first line.
///
/// Never empty; a doc comment with nothing after the directive line yields a single space.
fn declaration_description(doc: Option<&CommentGroup>) -> String {
    let remainder = doc
        .map(|doc| doc.lines().skip(1).map(clean_comment_line).collect::<Vec<_>>().join("\n"))
        .unwrap_or_default();
    match remainder.trim() {
        "" => " ".to_string(),
        text => text.to_string(),
    }
}

/// Assembles a Swagger document from the records of a scan.
///
/// The builder starts from an existing document (or a fresh one) and merges into it, so
/// anything the directives do not describe survives.
pub struct DocumentBuilder<'m> {
    model: &'m SourceModel,
    schema_gen: SchemaGenerator<'m>,
    document: Document,
}

impl<'m> DocumentBuilder<'m> {
    pub fn new(model: &'m SourceModel, input: Option<Document>) -> Self {
        debug!("Initializing DocumentBuilder");
        Self {
            model,
            schema_gen: SchemaGenerator::new(model),
            document: input.unwrap_or_default(),
        }
    }

    /// Applies every record of `registry`: meta, then routes, then requests, then responses.
    pub fn build(mut self, registry: &Registry) -> Document {
        self.schema_gen.reserve(
            registry
                .requests()
                .iter()
                .chain(registry.responses().iter())
                .map(|(name, _)| name.to_string()),
        );
        self.apply_meta(registry.metas());

        for route in registry.routes() {
            self.add_route(route);
        }

        for decl in registry.requests().values() {
            let route = decl
                .request_binding()
                .and_then(|binding| registry.route(&binding.id));
            match route {
                Some(route) => self.add_request(route, decl),
                None => debug!("Request {} has no route", decl.type_name),
            }
        }

        for decl in registry.responses().values() {
            let route = decl
                .response_binding()
                .and_then(|binding| registry.route(&binding.id));
            match route {
                Some(route) => self.add_response(route, decl),
                None => debug!("Response {} has no route", decl.type_name),
            }
        }

        self.add_pending_definitions();

        info!(
            "Built document with {} paths and {} definitions",
            self.document.paths.len(),
            self.document.definitions.len()
        );
        self.document
    }

    /// Merges `swag:meta` fields into the document header.
    pub fn apply_meta(&mut self, metas: &[MetaRecord]) {
        let fields = parse_meta(metas.iter().map(|meta| &meta.comments));
        let info = self.document.info.get_or_insert_with(Info::default);

        for (key, value) in fields {
            match key.as_str() {
                "title" => info.title = value,
                "version" => info.version = value,
                "description" => info.description = Some(value),
                "host" => self.document.host = Some(value),
                "basepath" => self.document.base_path = Some(value),
                "schemes" => self.document.schemes = Some(split_list(&value)),
                "consumes" => self.document.consumes = Some(split_list(&value)),
                "produces" => self.document.produces = Some(split_list(&value)),
                _ => debug!("Ignoring meta key {}", key),
            }
        }
    }

    /// Creates or refreshes the operation of a route.
    ///
    /// An operation already registered under the same ID is kept, with its parameters and
    /// responses; an operation of another ID in the same slot is replaced.
    pub fn add_route(&mut self, route: &RouteRecord) {
        let Some(method) = HttpMethod::parse(&route.method) else {
            warn!("Route {} uses unsupported method {}, skipping", route.id, route.method);
            return;
        };
        debug!("Adding route {}: {} {}", route.id, method, route.path);

        let slot = self
            .document
            .paths
            .entry(route.path.clone())
            .or_default()
            .slot_mut(method);
        if slot
            .as_ref()
            .is_some_and(|op| op.operation_id.as_deref() != Some(route.id.as_str()))
        {
            *slot = None;
        }
        let operation = slot.get_or_insert_with(|| Operation::new(&route.id));

        let mut summary: Option<String> = None;
        let mut description = String::new();
        for line in route.remaining.iter().flat_map(|line| line.split('\n')) {
            let line = clean_comment_line(line);
            match &summary {
                Some(text) if !text.is_empty() => {
                    if !description.is_empty() {
                        description.push('\n');
                    }
                    description.push_str(line);
                }
                _ => summary = Some(line.to_string()),
            }
        }
        let description = description.trim_end_matches('\n');

        operation.summary = summary.filter(|text| !text.is_empty());
        operation.description = (!description.is_empty()).then(|| description.to_string());
        operation.tags = route.tags.clone();
    }

    /// Attaches a request-bound declaration to the operation of `route`.
    pub fn add_request(&mut self, route: &RouteRecord, decl: &DeclarationRecord) {
        let Some(binding) = decl.request_binding() else {
            return;
        };
        let Some(method) = HttpMethod::parse(&route.method) else {
            return;
        };
        if self.document.operation(&route.path, method).is_none() {
            debug!("No operation for {} {}", method, route.path);
            return;
        }

        let path_params = path_parameters(&route.path).into_iter().map(Parameter::path).collect();
        self.add_params(&route.path, method, path_params);

        if method == HttpMethod::Get {
            let query_params = self.query_parameters(decl);
            self.add_params(&route.path, method, query_params);
        } else {
            let name = binding.name();
            if !self.add_definition(name, decl) {
                return;
            }
            let description = declaration_description(decl.doc.as_ref());
            let body =
                Parameter::body("Body", SchemaNode::reference(name)).with_description(Some(description));
            self.add_params(&route.path, method, vec![body]);
        }
    }

    fn add_params(&mut self, path: &str, method: HttpMethod, params: Vec<Parameter>) {
        if let Some(operation) = self.document.operation_mut(path, method) {
            for param in params {
                operation.add_param(param);
            }
        }
    }

    /// Attaches a response-bound declaration to the operation of `route`.
    pub fn add_response(&mut self, route: &RouteRecord, decl: &DeclarationRecord) {
        let Some(binding) = decl.response_binding() else {
            return;
        };
        let Some(method) = HttpMethod::parse(&route.method) else {
            return;
        };
        if self.document.operation(&route.path, method).is_none() {
            debug!("No operation for {} {}", method, route.path);
            return;
        }

        if !self.add_definition(&binding.name, decl) {
            return;
        }

        let response = Response {
            description: declaration_description(decl.doc.as_ref()),
            schema: Some(SchemaNode::reference(&binding.name)),
            extra: BTreeMap::new(),
        };
        if let Some(operation) = self.document.operation_mut(&route.path, method) {
            operation.respond_with(binding.code, response);
        }
    }

    /// Query parameters for the scalar fields of a GET request struct.
    ///
    /// Aliases, pointers and newtypes are followed to the struct they stand for.
    fn query_parameters(&self, decl: &DeclarationRecord) -> Vec<Parameter> {
        let Some(st) = self.request_struct(&decl.type_name) else {
            debug!("GET request {} is not a struct, no query parameters", decl.type_name);
            return Vec::new();
        };

        st.fields
            .iter()
            .filter(|field| field.exported && !field.embedded)
            .filter_map(|field| {
                let name = serialized_name(field)?;
                let TypeRef::Scalar(kind) = &field.ty else {
                    return None;
                };
                let schema = scalar_schema(*kind)?;
                let description = field
                    .comment
                    .as_ref()
                    .map(|comment| comment.text())
                    .filter(|text| !text.is_empty());

                let mut param = Parameter::query(&name).with_description(description);
                param.param_type = schema.schema_type;
                param.format = schema.format;
                Some(param)
            })
            .collect()
    }

    fn request_struct(&self, named: &NamedType) -> Option<&'m StructType> {
        let mut visited = HashSet::new();
        let mut current = self.model.underlying(named)?;
        loop {
            match current {
                TypeRef::Struct(st) => return Some(st),
                TypeRef::Pointer(inner) => current = inner.as_ref(),
                TypeRef::Named(next) => {
                    if !visited.insert(next) {
                        return None;
                    }
                    current = self.model.underlying(next)?;
                }
                _ => return None,
            }
        }
    }

    /// Synthesizes `name` into the definitions, returning `false` when synthesis failed.
    fn add_definition(&mut self, name: &str, decl: &DeclarationRecord) -> bool {
        match self.schema_gen.generate_definition(name, &decl.type_name) {
            Ok(node) => {
                self.document
                    .definitions
                    .entry(name.to_string())
                    .or_default()
                    .merge(node);
                true
            }
            Err(e) => {
                warn!("Skipping {} from {}: {}", name, decl.file.display(), e);
                false
            }
        }
    }

    /// Emits the definitions of types that were only reachable through a cycle.
    fn add_pending_definitions(&mut self) {
        while let Some((named, name)) = self.schema_gen.next_pending() {
            match self.schema_gen.generate_definition(&name, &named) {
                Ok(node) => {
                    if self.document.definitions.contains_key(&name) {
                        debug!("Merging {} into existing definition {}", named, name);
                    }
                    self.document.definitions.entry(name).or_default().merge(node);
                }
                Err(e) => warn!("Skipping definition {}: {}", name, e),
            }
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}
