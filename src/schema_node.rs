use serde_yaml::{Mapping, Value};

/// Primitive type of a scalar schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Integer => "integer",
            ScalarKind::Boolean => "boolean",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ScalarKind::String),
            "number" => Some(ScalarKind::Number),
            "integer" => Some(ScalarKind::Integer),
            "boolean" => Some(ScalarKind::Boolean),
            _ => None,
        }
    }
}

/// Structural shape of a schema node. Composition wrappers (`allOf`,
/// `oneOf`, `anyOf`) only exist between parsing and flattening; they are
/// resolved away before any row is emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object {
        /// Ordered member name to schema mapping.
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    },
    Array {
        items: Box<SchemaNode>,
    },
    /// The `additionalProperties` case: arbitrary keys, one value schema.
    Map {
        value_schema: Box<SchemaNode>,
    },
    Scalar {
        kind: ScalarKind,
        enum_values: Vec<Value>,
        example: Option<Value>,
    },
    Reference {
        target: String,
    },
    AllOf {
        branches: Vec<SchemaNode>,
    },
    OneOf {
        branches: Vec<SchemaNode>,
    },
    AnyOf {
        branches: Vec<SchemaNode>,
    },
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Object {
            properties: Vec::new(),
            required: Vec::new(),
        }
    }
}

/// A recursive structural description of a data shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub description: Option<String>,
}

impl SchemaNode {
    /// Empty object node, the default structural container.
    pub fn object() -> Self {
        SchemaNode::default()
    }

    pub fn object_with(properties: Vec<(String, SchemaNode)>, required: Vec<String>) -> Self {
        SchemaNode {
            kind: NodeKind::Object {
                properties,
                required,
            },
            description: None,
        }
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode {
            kind: NodeKind::Array {
                items: Box::new(items),
            },
            description: None,
        }
    }

    pub fn map_of(value_schema: SchemaNode) -> Self {
        SchemaNode {
            kind: NodeKind::Map {
                value_schema: Box::new(value_schema),
            },
            description: None,
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        SchemaNode {
            kind: NodeKind::Scalar {
                kind,
                enum_values: Vec::new(),
                example: None,
            },
            description: None,
        }
    }

    pub fn reference(target: &str) -> Self {
        SchemaNode {
            kind: NodeKind::Reference {
                target: target.to_string(),
            },
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Parse a schema object from a YAML value. Unknown or malformed input
    /// degrades to an empty object node rather than failing.
    pub fn from_value(value: &Value) -> SchemaNode {
        let map = match value.as_mapping() {
            Some(map) => map,
            None => return SchemaNode::object(),
        };

        let description = get_str(map, "description");

        if let Some(target) = get(map, "$ref").and_then(Value::as_str) {
            return SchemaNode {
                kind: NodeKind::Reference {
                    target: target.to_string(),
                },
                description,
            };
        }

        if let Some(branches) = get_branches(map, "allOf") {
            return SchemaNode {
                kind: NodeKind::AllOf { branches },
                description,
            };
        }
        if let Some(branches) = get_branches(map, "oneOf") {
            return SchemaNode {
                kind: NodeKind::OneOf { branches },
                description,
            };
        }
        if let Some(branches) = get_branches(map, "anyOf") {
            return SchemaNode {
                kind: NodeKind::AnyOf { branches },
                description,
            };
        }

        let type_name = get(map, "type").and_then(Value::as_str);
        let properties = get(map, "properties").and_then(Value::as_mapping);
        let additional = get(map, "additionalProperties").and_then(Value::as_mapping);

        let kind = match type_name {
            Some("array") => NodeKind::Array {
                items: Box::new(
                    get(map, "items")
                        .map(SchemaNode::from_value)
                        .unwrap_or_else(|| SchemaNode::scalar(ScalarKind::String)),
                ),
            },
            Some("object") | None => {
                if let Some(property_map) = properties {
                    NodeKind::Object {
                        properties: parse_properties(property_map),
                        required: parse_required(map),
                    }
                } else if let Some(value_map) = additional {
                    NodeKind::Map {
                        value_schema: Box::new(SchemaNode::from_value(&Value::Mapping(
                            value_map.clone(),
                        ))),
                    }
                } else if type_name.is_none() {
                    // No declared type and no member structure: defaults to
                    // string. Enum and example hints carry over when present.
                    scalar_kind_from(map, ScalarKind::String)
                } else {
                    NodeKind::Object {
                        properties: Vec::new(),
                        required: parse_required(map),
                    }
                }
            }
            Some(other) => scalar_kind_from(map, ScalarKind::parse(other).unwrap_or(ScalarKind::String)),
        };

        SchemaNode { kind, description }
    }

    /// Serialize the node back into a YAML schema object.
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();

        match &self.kind {
            NodeKind::Object {
                properties,
                required,
            } => {
                map.insert(key("type"), Value::String("object".to_string()));
                if !properties.is_empty() {
                    let mut property_map = Mapping::new();
                    for (name, node) in properties {
                        property_map.insert(key(name), node.to_value());
                    }
                    map.insert(key("properties"), Value::Mapping(property_map));
                }
                if !required.is_empty() {
                    let names = required.iter().map(|name| key(name)).collect();
                    map.insert(key("required"), Value::Sequence(names));
                }
            }
            NodeKind::Array { items } => {
                map.insert(key("type"), Value::String("array".to_string()));
                map.insert(key("items"), items.to_value());
            }
            NodeKind::Map { value_schema } => {
                map.insert(key("type"), Value::String("object".to_string()));
                map.insert(key("additionalProperties"), value_schema.to_value());
            }
            NodeKind::Scalar {
                kind,
                enum_values,
                example,
            } => {
                map.insert(key("type"), Value::String(kind.as_str().to_string()));
                if !enum_values.is_empty() {
                    map.insert(key("enum"), Value::Sequence(enum_values.clone()));
                }
                if let Some(example) = example {
                    map.insert(key("example"), example.clone());
                }
            }
            NodeKind::Reference { target } => {
                map.insert(key("$ref"), Value::String(target.clone()));
            }
            NodeKind::AllOf { branches } => {
                map.insert(key("allOf"), branch_values(branches));
            }
            NodeKind::OneOf { branches } => {
                map.insert(key("oneOf"), branch_values(branches));
            }
            NodeKind::AnyOf { branches } => {
                map.insert(key("anyOf"), branch_values(branches));
            }
        }

        if let Some(description) = &self.description {
            map.insert(key("description"), Value::String(description.clone()));
        }

        Value::Mapping(map)
    }
}

/// Read-only mapping from schema name to schema node. Insertion order is
/// preserved so that flattening output is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaRegistry {
    entries: Vec<(String, SchemaNode)>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a schema definition. A repeated name replaces the earlier
    /// definition in place, keeping its original position.
    pub fn insert(&mut self, name: &str, node: SchemaNode) {
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| existing == name) {
            entry.1 = node;
        } else {
            self.entries.push((name.to_string(), node));
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.entries
            .iter()
            .map(|(name, node)| (name.as_str(), node))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn get<'a>(map: &'a Mapping, name: &str) -> Option<&'a Value> {
    map.get(&key(name))
}

fn get_str(map: &Mapping, name: &str) -> Option<String> {
    get(map, name)
        .and_then(Value::as_str)
        .map(|text| text.to_string())
}

fn get_branches(map: &Mapping, name: &str) -> Option<Vec<SchemaNode>> {
    let sequence = get(map, name)?.as_sequence()?;
    Some(sequence.iter().map(SchemaNode::from_value).collect())
}

fn parse_properties(property_map: &Mapping) -> Vec<(String, SchemaNode)> {
    let mut properties = Vec::new();
    for (name, value) in property_map {
        if let Some(name) = name.as_str() {
            properties.push((name.to_string(), SchemaNode::from_value(value)));
        }
    }
    properties
}

fn parse_required(map: &Mapping) -> Vec<String> {
    let mut required = Vec::new();
    if let Some(sequence) = get(map, "required").and_then(Value::as_sequence) {
        for value in sequence {
            if let Some(name) = value.as_str() {
                required.push(name.to_string());
            }
        }
    }
    required
}

fn scalar_kind_from(map: &Mapping, kind: ScalarKind) -> NodeKind {
    NodeKind::Scalar {
        kind,
        enum_values: get(map, "enum")
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default(),
        example: get(map, "example").cloned(),
    }
}

fn branch_values(branches: &[SchemaNode]) -> Value {
    Value::Sequence(branches.iter().map(SchemaNode::to_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_schema() {
        let value: Value = serde_yaml::from_str(
            r#"
            type: object
            required: [id]
            properties:
              id:
                type: integer
              name:
                type: string
                description: Display name
            "#,
        )
        .unwrap();

        let node = SchemaNode::from_value(&value);
        match &node.kind {
            NodeKind::Object {
                properties,
                required,
            } => {
                assert_eq!(properties.len(), 2);
                assert_eq!(properties[0].0, "id");
                assert_eq!(properties[1].0, "name");
                assert_eq!(required, &vec!["id".to_string()]);
                assert_eq!(
                    properties[1].1.description.as_deref(),
                    Some("Display name")
                );
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_reference() {
        let value: Value = serde_yaml::from_str("$ref: '#/components/schemas/Pet'").unwrap();
        let node = SchemaNode::from_value(&value);
        assert_eq!(
            node.kind,
            NodeKind::Reference {
                target: "#/components/schemas/Pet".to_string()
            }
        );
    }

    #[test]
    fn test_parse_array_defaults_items_to_string() {
        let value: Value = serde_yaml::from_str("type: array").unwrap();
        let node = SchemaNode::from_value(&value);
        match node.kind {
            NodeKind::Array { items } => {
                assert_eq!(*items, SchemaNode::scalar(ScalarKind::String));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_additional_properties_as_map() {
        let value: Value = serde_yaml::from_str(
            r#"
            type: object
            additionalProperties:
              type: string
            "#,
        )
        .unwrap();

        let node = SchemaNode::from_value(&value);
        match node.kind {
            NodeKind::Map { value_schema } => {
                assert_eq!(*value_schema, SchemaNode::scalar(ScalarKind::String));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_untyped_enum_defaults_to_string() {
        let value: Value = serde_yaml::from_str("enum: [asc, desc]").unwrap();
        let node = SchemaNode::from_value(&value);
        match node.kind {
            NodeKind::Scalar {
                kind, enum_values, ..
            } => {
                assert_eq!(kind, ScalarKind::String);
                assert_eq!(enum_values.len(), 2);
            }
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_untyped_empty_schema_defaults_to_string() {
        let value: Value = serde_yaml::from_str("{}").unwrap();
        let node = SchemaNode::from_value(&value);
        assert_eq!(node, SchemaNode::scalar(ScalarKind::String));

        let value: Value = serde_yaml::from_str("description: free-form field").unwrap();
        let node = SchemaNode::from_value(&value);
        assert!(matches!(
            node.kind,
            NodeKind::Scalar {
                kind: ScalarKind::String,
                ..
            }
        ));

        // An explicit object type without members stays an object.
        let value: Value = serde_yaml::from_str("type: object").unwrap();
        let node = SchemaNode::from_value(&value);
        assert_eq!(node, SchemaNode::object());
    }

    #[test]
    fn test_value_round_trip() {
        let value: Value = serde_yaml::from_str(
            r#"
            type: object
            required: [id]
            properties:
              id:
                type: integer
              tags:
                type: array
                items:
                  type: string
            "#,
        )
        .unwrap();

        let node = SchemaNode::from_value(&value);
        let reparsed = SchemaNode::from_value(&node.to_value());
        assert_eq!(node, reparsed);
    }

    #[test]
    fn test_registry_insert_and_get() {
        let mut registry = SchemaRegistry::new();
        registry.insert("Pet", SchemaNode::object());
        registry.insert("Tag", SchemaNode::scalar(ScalarKind::String));
        registry.insert("Pet", SchemaNode::scalar(ScalarKind::Integer));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["Pet", "Tag"]);
        assert_eq!(
            registry.get("Pet"),
            Some(&SchemaNode::scalar(ScalarKind::Integer))
        );
        assert!(registry.get("Missing").is_none());
    }
}
