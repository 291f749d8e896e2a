//! Grammars for `swag:*` directive comments and serialization tags.
//!
//! Four directive kinds are recognized:
//!
//! - `swag:meta` marks a package doc comment holding `key: value` document metadata
//! - `swag:route <ID> <METHOD> <PATH> [<TAGS>]` declares an operation
//! - `swag:req <ID>` binds a type as the request body of operation `ID`
//! - `swag:ans <ID> <CODE>` binds a type as the response of operation `ID` at status `CODE`

use crate::model::{clean_comment_line, CommentGroup, Field};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const ID_PATTERN: &str = r"((?:\p{L}[\p{L}\p{N}\p{Pd}\p{Pc}]+)+)";
const METHOD_PATTERN: &str = r"(\p{L}+)";
const PATH_PATTERN: &str =
    r"((?:/[\p{L}\p{N}\p{Pd}\p{Pc}\{\}\-\.\?_\~%!\$\&'\(\)\*\+,;=:@/]*)+/?)";
const TAGS_PATTERN: &str = r"(\p{L}[\p{L}\p{N}\p{Pd}\.\p{Pc}\p{Zs}]+)";
const STATUS_CODE_PATTERN: &str = r"(\p{N}+)";

static DIRECTIVE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"swag:([\p{L}\p{N}\p{Pd}\p{Pc}]+)").unwrap());

static ROUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"swag:route\p{Zs}*",
        ID_PATTERN,
        r"\p{Zs}*",
        METHOD_PATTERN,
        r"\p{Zs}*",
        PATH_PATTERN,
        r"(?:\p{Zs}+",
        TAGS_PATTERN,
        r")?\p{Zs}*$",
    ]
    .concat();
    Regex::new(&pattern).unwrap()
});

static REQ_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [r"swag:req\p{Zs}*", ID_PATTERN, r"\p{Zs}*$"].concat();
    Regex::new(&pattern).unwrap()
});

static ANS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = [
        r"swag:ans\p{Zs}*",
        ID_PATTERN,
        r"\p{Zs}*",
        STATUS_CODE_PATTERN,
        r"\p{Zs}*$",
    ]
    .concat();
    Regex::new(&pattern).unwrap()
});

static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Zs}+").unwrap());

static STRIP_COMMENTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\p{L}\p{N}\p{Pd}\p{Pc}\+]*").unwrap());

/// Set of directive kinds found in a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectiveKinds(u8);

impl DirectiveKinds {
    pub const META: Self = Self(1);
    pub const ROUTE: Self = Self(1 << 1);
    pub const REQ: Self = Self(1 << 2);
    pub const ANS: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Kind named by the text after `swag:`; unknown kinds are ignored.
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "meta" => Some(Self::META),
            "route" => Some(Self::ROUTE),
            "req" => Some(Self::REQ),
            "ans" => Some(Self::ANS),
            _ => None,
        }
    }
}

/// Classifies comment groups by the directive kinds they mention.
///
/// Only the first `swag:` marker of each line counts.
pub fn detect_directives<'a>(groups: impl IntoIterator<Item = &'a CommentGroup>) -> DirectiveKinds {
    let mut kinds = DirectiveKinds::default();
    for group in groups {
        for line in group.lines() {
            if let Some(kind) = DIRECTIVE_REGEX
                .captures(line)
                .and_then(|caps| DirectiveKinds::from_name(&caps[1]))
            {
                kinds.insert(kind);
            }
        }
    }
    kinds
}

/// A `swag:route` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRecord {
    /// Operation ID, unique across the scanned packages
    pub id: String,
    /// Upper-cased HTTP method
    pub method: String,
    /// Path template, may contain `{name}` or `:name` segments
    pub path: String,
    /// Tags in declaration order, empty when absent
    pub tags: Vec<String>,
    /// Raw comment lines captured after the directive
    pub remaining: Vec<String>,
}

/// Applies the route grammar to every line of a comment group.
///
/// Returns `None` when no line matches. A later matching line in the same group replaces
/// ID, method, path and tags; lines after a match are captured as description text.
pub fn parse_route(group: &CommentGroup) -> Option<RouteRecord> {
    let mut route: Option<RouteRecord> = None;
    let mut just_matched = false;

    for line in group.lines() {
        if let Some(caps) = ROUTE_REGEX.captures(line) {
            let record = route.get_or_insert_with(RouteRecord::default);
            record.id = caps[1].to_string();
            record.method = caps[2].to_uppercase();
            record.path = caps[3].to_string();
            record.tags = caps
                .get(4)
                .map(|tags| {
                    SPACE_REGEX
                        .split(tags.as_str())
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            just_matched = true;
        } else if let Some(record) = route.as_mut() {
            // Blank lines right after the directive are not description text.
            let blank = STRIP_COMMENTS_REGEX.replace(line, "").trim().is_empty();
            if !just_matched || !blank {
                record.remaining.push(line.to_string());
                just_matched = false;
            }
        }
    }

    route
}

/// Binding of a declaration to the request body of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBinding {
    /// Route ID the declaration binds to; doubles as the schema name
    pub id: String,
}

impl RequestBinding {
    pub fn name(&self) -> &str {
        &self.id
    }
}

/// Binding of a declaration to one response of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBinding {
    /// Route ID the declaration binds to
    pub id: String,
    /// HTTP status code
    pub code: u16,
    /// Schema name, `<ID>-<CODE>`
    pub name: String,
}

/// Finds the first `swag:req <ID>` line.
pub fn parse_request_binding(doc: &CommentGroup) -> Option<RequestBinding> {
    doc.lines().find_map(|line| {
        let caps = REQ_REGEX.captures(line)?;
        Some(RequestBinding {
            id: caps[1].to_string(),
        })
    })
}

/// Finds the first `swag:ans <ID> <CODE>` line whose code is a valid status number.
pub fn parse_response_binding(doc: &CommentGroup) -> Option<ResponseBinding> {
    doc.lines().find_map(|line| {
        let caps = ANS_REGEX.captures(line)?;
        let code = caps[2].parse::<u16>().ok()?;
        Some(ResponseBinding {
            id: caps[1].to_string(),
            code,
            name: format!("{}-{}", &caps[1], &caps[2]),
        })
    })
}

/// Parses package doc comments into lower-cased `key -> value` pairs.
///
/// A line containing a colon starts a new key (split at the first colon); a line without
/// one continues the current value on a new line. Later keys overwrite earlier ones.
pub fn parse_meta<'a>(groups: impl IntoIterator<Item = &'a CommentGroup>) -> HashMap<String, String> {
    let mut fields = HashMap::new();

    for group in groups {
        let mut current: Option<(String, String)> = None;
        for line in group.lines() {
            let line = clean_comment_line(line);
            if let Some((key, value)) = line.split_once(':') {
                if let Some((key, value)) = current.take() {
                    fields.insert(key, value);
                }
                current = Some((key.trim().to_lowercase(), value.trim().to_string()));
            } else if !line.is_empty() {
                if let Some((_, value)) = current.as_mut() {
                    value.push('\n');
                    value.push_str(line);
                }
            }
        }
        if let Some((key, value)) = current {
            fields.insert(key, value);
        }
    }

    fields
}

/// Splits a comma separated meta value into trimmed items.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|item| item.trim().to_string()).collect()
}

/// Looks up `key` in a `key:"value" key2:"value2"` tag string.
///
/// Parsing stops at the first malformed pair, mirroring how struct tags are read at runtime.
pub fn lookup_tag(tag: &str, key: &str) -> Option<String> {
    let mut rest = tag;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return None;
        }

        let colon = rest.find(|c: char| c == ':' || c == ' ' || c == '"' || c.is_control())?;
        if colon == 0 || !rest[colon..].starts_with(":\"") {
            return None;
        }
        let name = &rest[..colon];
        rest = &rest[colon + 2..];

        let mut escaped = false;
        let mut end = None;
        for (i, c) in rest.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end?;
        let value = &rest[..end];
        rest = &rest[end + 1..];

        if name == key {
            return Some(value.replace("\\\"", "\"").replace("\\\\", "\\"));
        }
    }
}

/// Serialized name of a struct field, or `None` when its `json` tag ignores it.
///
/// Only the first comma separated segment of the tag value matters: `-` ignores the
/// field and an empty segment keeps the declared name.
pub fn serialized_name(field: &Field) -> Option<String> {
    let Some(tag) = field.tag.as_deref().filter(|tag| !tag.trim().is_empty()) else {
        return Some(field.name.clone());
    };

    let json = lookup_tag(tag, "json").unwrap_or_default();
    match json.split(',').next().unwrap_or_default() {
        "-" => None,
        "" => Some(field.name.clone()),
        name => Some(name.to_string()),
    }
}
