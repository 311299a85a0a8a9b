use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Reserved path segment for map-key (additional-properties) descent.
pub const MAP_WILDCARD: &str = "*";

/// One flattened line describing a single field: its address, type, and
/// metadata. Rows are produced and consumed in pre-order; that ordering is
/// what makes reconstruction possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRow {
    pub path: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub required: bool,
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl PathRow {
    pub fn new(path: &str, type_name: &str, required: bool, description: &str) -> Self {
        Self {
            path: path.to_string(),
            type_name: type_name.to_string(),
            required,
            description: description.to_string(),
            enum_values: Vec::new(),
            example: None,
            reference: None,
        }
    }

    pub fn with_enum_values(mut self, enum_values: Vec<String>) -> Self {
        self.enum_values = enum_values;
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn with_reference(mut self, target: &str) -> Self {
        self.reference = Some(target.to_string());
        self
    }
}

/// One step of a parsed row path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object-member descent by name.
    Key(String),
    /// Array-item descent (the `[]` suffix).
    Items,
    /// Map-key descent (the `*` segment).
    Wildcard,
}

/// Parse a row path into segments. `a.b[].c` becomes
/// `[Key(a), Key(b), Items, Key(c)]`; a bare `[]` head denotes the root
/// itself being an array. Malformed pieces are dropped rather than rejected.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    if path.is_empty() {
        return segments;
    }
    for piece in path.split('.') {
        let mut name = piece;
        let mut item_depth = 0;
        while let Some(stripped) = name.strip_suffix("[]") {
            name = stripped;
            item_depth += 1;
        }
        if name == MAP_WILDCARD {
            segments.push(PathSegment::Wildcard);
        } else if !name.is_empty() {
            segments.push(PathSegment::Key(name.to_string()));
        }
        for _ in 0..item_depth {
            segments.push(PathSegment::Items);
        }
    }
    segments
}

/// Whether `path` sits at or below `prefix`, compared segment by segment.
/// A raw string prefix test would falsely match sibling keys that share a
/// textual prefix (`user` vs `user2`); this does not.
pub fn starts_with_segments(path: &[PathSegment], prefix: &[PathSegment]) -> bool {
    path.len() >= prefix.len() && path[..prefix.len()] == prefix[..]
}

/// Append an object-member key to a parent path.
pub fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Append an array-item suffix to a parent path.
pub fn join_items(parent: &str) -> String {
    format!("{}[]", parent)
}

/// Append the map-key wildcard segment to a parent path.
pub fn join_wildcard(parent: &str) -> String {
    join_key(parent, MAP_WILDCARD)
}
