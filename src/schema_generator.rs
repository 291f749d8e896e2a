use crate::directive::serialized_name;
use crate::error::{Error, Result};
use crate::model::{NamedType, ScalarKind, SourceModel, StructType, TypeRef};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Prefix of every schema reference emitted into the document.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Named types serialized as RFC 3339 strings rather than expanded.
const TIMESTAMP_TYPES: &[(&str, &str)] = &[
    ("time", "Time"),
    ("std::time", "SystemTime"),
    ("chrono", "DateTime"),
    ("chrono", "NaiveDateTime"),
    ("time", "OffsetDateTime"),
    ("time", "PrimitiveDateTime"),
];

/// JSON-schema-shaped node as stored in `definitions` and in parameter/response schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaNode>>,
    /// Keys this generator never writes, kept from loaded documents
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SchemaNode {
    pub fn typed(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Self::default()
        }
    }

    /// A `$ref` node pointing at `#/definitions/<name>`.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{DEFINITIONS_PREFIX}{name}")),
            ..Self::default()
        }
    }

    fn array(items: SchemaNode) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array", None)
        }
    }

    /// Merges a freshly synthesized node into this one.
    ///
    /// `$ref`, type, format and items are overwritten, the description only when `other`
    /// has one. Properties are merged key by key; unknown keys of both sides are kept.
    pub fn merge(&mut self, other: SchemaNode) {
        self.reference = other.reference;
        self.schema_type = other.schema_type;
        self.format = other.format;
        self.items = other.items;
        if other.description.is_some() {
            self.description = other.description;
        }

        if let Some(properties) = other.properties {
            let existing = self.properties.get_or_insert_with(BTreeMap::new);
            for (name, node) in properties {
                match existing.entry(name) {
                    Entry::Occupied(mut entry) => entry.get_mut().merge(node),
                    Entry::Vacant(entry) => {
                        entry.insert(node);
                    }
                }
            }
        }

        self.extra.extend(other.extra);
    }
}

/// Schema of a scalar kind, or `None` for kinds without a mapping.
pub fn scalar_schema(kind: ScalarKind) -> Option<SchemaNode> {
    let (schema_type, format) = match kind {
        ScalarKind::Bool => ("boolean", None),
        ScalarKind::Int | ScalarKind::Int64 => ("integer", Some("int64")),
        ScalarKind::Int8 => ("integer", Some("int8")),
        ScalarKind::Int16 => ("integer", Some("int16")),
        ScalarKind::Int32 => ("integer", Some("int32")),
        ScalarKind::Uint | ScalarKind::Uint64 | ScalarKind::Uintptr => ("integer", Some("uint64")),
        ScalarKind::Uint8 => ("integer", Some("uint8")),
        ScalarKind::Uint16 => ("integer", Some("uint16")),
        ScalarKind::Uint32 => ("integer", Some("uint32")),
        ScalarKind::Float32 => ("number", Some("float")),
        ScalarKind::Float64 => ("number", Some("double")),
        ScalarKind::String | ScalarKind::Error => ("string", None),
        ScalarKind::Complex64 | ScalarKind::Complex128 | ScalarKind::Unsupported => return None,
    };
    Some(SchemaNode::typed(schema_type, format))
}

/// Whether a named type is a wall-clock timestamp.
pub fn is_timestamp(named: &NamedType) -> bool {
    TIMESTAMP_TYPES
        .iter()
        .any(|(package, name)| named.package == *package && named.name == *name)
}

/// Converts resolved types into schema nodes.
///
/// Named types currently being expanded are tracked on a stack. Meeting one of them again
/// emits a `$ref` instead of recursing: to the definition being built when it is the
/// definition's own type, otherwise to a definition named after the type, which is queued
/// so the caller can synthesize it too.
///
/// A queued type keeps its bare name unless that name is reserved or already given to another
/// type; it is then qualified with its package, and numbered if still taken.
pub struct SchemaGenerator<'m> {
    model: &'m SourceModel,
    expanding: Vec<NamedType>,
    root: Option<(NamedType, String)>,
    pending: VecDeque<(NamedType, String)>,
    assigned: HashMap<NamedType, String>,
    reserved: HashSet<String>,
}

impl<'m> SchemaGenerator<'m> {
    pub fn new(model: &'m SourceModel) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            model,
            expanding: Vec::new(),
            root: None,
            pending: VecDeque::new(),
            assigned: HashMap::new(),
            reserved: HashSet::new(),
        }
    }

    /// Marks definition names bound elsewhere so queued types never take them.
    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
    }

    /// Synthesizes the definition `name` for a declared type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedType`] when the model has no declaration for `named`.
    pub fn generate_definition(&mut self, name: &str, named: &NamedType) -> Result<SchemaNode> {
        debug!("Generating definition {} from {}", name, named);

        if is_timestamp(named) {
            return Ok(SchemaNode::typed("string", Some("date-time")));
        }

        let underlying = self
            .model
            .underlying(named)
            .ok_or_else(|| Error::UnresolvedType(named.to_string()))?;

        self.root = Some((named.clone(), name.to_string()));
        self.expanding.push(named.clone());
        let node = self.generate(underlying);
        self.expanding.pop();
        self.root = None;

        Ok(node)
    }

    /// Synthesizes the schema of any resolved type.
    pub fn generate(&mut self, ty: &TypeRef) -> SchemaNode {
        match ty {
            TypeRef::Scalar(kind) => scalar_schema(*kind).unwrap_or_default(),
            TypeRef::Pointer(inner) => self.generate(inner),
            TypeRef::Slice(inner) | TypeRef::Array(inner, _) => SchemaNode::array(self.generate(inner)),
            TypeRef::Struct(st) => self.generate_struct(st),
            TypeRef::Named(named) => self.generate_named(named),
        }
    }

    fn generate_named(&mut self, named: &NamedType) -> SchemaNode {
        if is_timestamp(named) {
            return SchemaNode::typed("string", Some("date-time"));
        }

        if self.expanding.contains(named) {
            let root_name = self
                .root
                .as_ref()
                .filter(|(root, _)| root == named)
                .map(|(_, name)| name.clone());
            let name = match root_name {
                Some(name) => name,
                None => self.schedule(named),
            };
            debug!("Cycle through {}, referencing {}", named, name);
            return SchemaNode::reference(&name);
        }

        let Some(underlying) = self.model.underlying(named) else {
            debug!("Unresolved type {}, leaving schema untyped", named);
            return SchemaNode::default();
        };

        self.expanding.push(named.clone());
        let node = self.generate(underlying);
        self.expanding.pop();
        node
    }

    fn generate_struct(&mut self, st: &StructType) -> SchemaNode {
        let mut properties = BTreeMap::new();

        for field in &st.fields {
            if !field.exported || field.embedded {
                continue;
            }
            let Some(name) = serialized_name(field) else {
                continue;
            };

            let mut property = self.generate(&field.ty);
            property.description = field
                .comment
                .as_ref()
                .map(|comment| comment.text())
                .filter(|text| !text.is_empty());
            properties.insert(name, property);
        }

        SchemaNode {
            properties: Some(properties),
            ..SchemaNode::typed("object", None)
        }
    }

    /// Queues `named` once and returns the definition name it is referenced by.
    fn schedule(&mut self, named: &NamedType) -> String {
        if let Some(name) = self.assigned.get(named) {
            return name.clone();
        }

        let mut base = named.name.clone();
        if self.is_taken(&base) && !matches!(named.package.as_str(), "" | ".") {
            base = format!("{}.{}", named.package.replace('/', "."), named.name);
        }
        let mut name = base.clone();
        let mut suffix = 2;
        while self.is_taken(&name) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        if name != named.name {
            debug!("Definition name {} is taken, using {} for {}", named.name, name, named);
        }

        self.assigned.insert(named.clone(), name.clone());
        self.pending.push_back((named.clone(), name.clone()));
        name
    }

    fn is_taken(&self, name: &str) -> bool {
        self.reserved.contains(name) || self.assigned.values().any(|assigned| assigned == name)
    }

    /// Next type referenced through a cycle that still needs its own definition, with the
    /// name its references use.
    pub fn next_pending(&mut self) -> Option<(NamedType, String)> {
        self.pending.pop_front()
    }
}
