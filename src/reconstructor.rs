use serde_yaml::Value;

use crate::path_row::{parse_path, starts_with_segments, PathRow, PathSegment};
use crate::schema_node::{NodeKind, ScalarKind, SchemaNode};

/// Rebuild a schema tree from an ordered sequence of path rows. This is a
/// total function: inconsistent or out-of-order rows degrade to a
/// best-effort tree, never an error.
pub fn unflatten(rows: &[PathRow]) -> SchemaNode {
    let mut root = SchemaNode::object();
    let mut skipped: Vec<Vec<PathSegment>> = Vec::new();

    for row in rows {
        let segments = parse_path(&row.path);

        // Detail below a reference-terminated path is already represented
        // by the reference itself.
        if skipped
            .iter()
            .any(|prefix| starts_with_segments(&segments, prefix))
        {
            continue;
        }

        apply_row(&mut root, &segments, row);

        if row.reference.is_some() {
            skipped.push(segments);
        }
    }

    root
}

fn apply_row(root: &mut SchemaNode, segments: &[PathSegment], row: &PathRow) {
    let mut cursor = root;

    for (index, segment) in segments.iter().enumerate() {
        let is_last = index + 1 == segments.len();
        cursor = match segment {
            PathSegment::Key(name) => child_entry(cursor, name, is_last && row.required),
            PathSegment::Items => items_entry(cursor),
            PathSegment::Wildcard => value_entry(cursor),
        };
    }

    apply_leaf(cursor, row);
}

/// Descend into an object member, materializing the member (and converting
/// the current node to an object) as needed.
fn child_entry<'a>(node: &'a mut SchemaNode, name: &str, mark_required: bool) -> &'a mut SchemaNode {
    if !matches!(node.kind, NodeKind::Object { .. }) {
        node.kind = NodeKind::Object {
            properties: Vec::new(),
            required: Vec::new(),
        };
    }
    match &mut node.kind {
        NodeKind::Object {
            properties,
            required,
        } => {
            if mark_required && !required.iter().any(|entry| entry == name) {
                required.push(name.to_string());
            }
            let position = match properties.iter().position(|(key, _)| key == name) {
                Some(position) => position,
                None => {
                    properties.push((name.to_string(), SchemaNode::object()));
                    properties.len() - 1
                }
            };
            &mut properties[position].1
        }
        _ => unreachable!("node was just converted to an object"),
    }
}

/// Descend into array items, converting the current node to an array as
/// needed.
fn items_entry(node: &mut SchemaNode) -> &mut SchemaNode {
    if !matches!(node.kind, NodeKind::Array { .. }) {
        node.kind = NodeKind::Array {
            items: Box::new(SchemaNode::object()),
        };
    }
    match &mut node.kind {
        NodeKind::Array { items } => items,
        _ => unreachable!("node was just converted to an array"),
    }
}

/// Descend into the map value schema, converting the current node to a map
/// as needed.
fn value_entry(node: &mut SchemaNode) -> &mut SchemaNode {
    if !matches!(node.kind, NodeKind::Map { .. }) {
        node.kind = NodeKind::Map {
            value_schema: Box::new(SchemaNode::object()),
        };
    }
    match &mut node.kind {
        NodeKind::Map { value_schema } => value_schema,
        _ => unreachable!("node was just converted to a map"),
    }
}

fn apply_leaf(node: &mut SchemaNode, row: &PathRow) {
    if let Some(target) = &row.reference {
        // A reference replaces whatever was materialized here.
        node.kind = NodeKind::Reference {
            target: target.clone(),
        };
        set_description(node, row);
        return;
    }

    set_description(node, row);

    match row.type_name.as_str() {
        "object" => {
            // Keep children already materialized by earlier rows.
            if !matches!(node.kind, NodeKind::Object { .. } | NodeKind::Map { .. }) {
                node.kind = NodeKind::Object {
                    properties: Vec::new(),
                    required: Vec::new(),
                };
            }
        }
        "array" => {
            if !matches!(node.kind, NodeKind::Array { .. }) {
                node.kind = NodeKind::Array {
                    items: Box::new(SchemaNode::object()),
                };
            }
        }
        other => {
            // Scalar rows clear any container detail a malformed input may
            // have placed here first.
            node.kind = NodeKind::Scalar {
                kind: ScalarKind::parse(other).unwrap_or(ScalarKind::String),
                enum_values: row
                    .enum_values
                    .iter()
                    .map(|text| Value::String(text.clone()))
                    .collect(),
                example: row.example.clone(),
            };
        }
    }
}

fn set_description(node: &mut SchemaNode, row: &PathRow) {
    if !row.description.is_empty() {
        node.description = Some(row.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flattener::flatten;
    use crate::schema_node::SchemaRegistry;

    fn node_from(text: &str) -> SchemaNode {
        let value: serde_yaml::Value = serde_yaml::from_str(text).unwrap();
        SchemaNode::from_value(&value)
    }

    #[test]
    fn test_unflatten_reproduces_flattened_tree() {
        let original = node_from(
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
        );

        let rows = flatten(&original, &SchemaRegistry::new());
        let restored = unflatten(&rows);
        assert_eq!(restored, original);
    }

    #[test]
    fn test_round_trip_preserves_descriptions_and_required() {
        let original = node_from(
            r#"
            type: object
            required: [name]
            properties:
              name:
                type: string
                description: Display name
              address:
                type: object
                properties:
                  street:
                    type: string
                    description: Street line
            "#,
        );

        let rows = flatten(&original, &SchemaRegistry::new());
        assert_eq!(unflatten(&rows), original);
    }

    #[test]
    fn test_round_trip_map_schema() {
        let original = node_from(
            r#"
            type: object
            properties:
              labels:
                type: object
                additionalProperties:
                  type: string
            "#,
        );

        let rows = flatten(&original, &SchemaRegistry::new());
        assert_eq!(unflatten(&rows), original);
    }

    #[test]
    fn test_root_array_rows_rebuild_root_array() {
        let original = node_from(
            r#"
            type: array
            items:
              type: integer
            "#,
        );

        let rows = flatten(&original, &SchemaRegistry::new());
        assert_eq!(unflatten(&rows), original);
    }

    #[test]
    fn test_reference_row_suppresses_descendant_rows() {
        let rows = vec![
            PathRow::new("pet", "object", false, "").with_reference("#/components/schemas/Pet"),
            PathRow::new("pet.name", "string", true, "inlined detail"),
            PathRow::new("owner", "string", false, ""),
        ];

        let restored = unflatten(&rows);
        match &restored.kind {
            NodeKind::Object { properties, .. } => {
                assert_eq!(properties.len(), 2);
                assert_eq!(
                    properties[0].1.kind,
                    NodeKind::Reference {
                        target: "#/components/schemas/Pet".to_string()
                    }
                );
                assert_eq!(
                    properties[1].1,
                    SchemaNode::scalar(ScalarKind::String)
                );
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_skipped_prefix_does_not_swallow_textual_siblings() {
        let rows = vec![
            PathRow::new("user", "object", false, "").with_reference("#/components/schemas/User"),
            PathRow::new("user2", "string", false, "not below the reference"),
        ];

        let restored = unflatten(&rows);
        match &restored.kind {
            NodeKind::Object { properties, .. } => {
                assert_eq!(properties.len(), 2);
                assert_eq!(properties[1].0, "user2");
                assert!(matches!(properties[1].1.kind, NodeKind::Scalar { .. }));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_order_rows_degrade_without_error() {
        // Child row arrives before its parent declares a scalar type; the
        // later row wins and the container detail is dropped.
        let rows = vec![
            PathRow::new("config.timeout", "integer", false, ""),
            PathRow::new("config", "string", false, ""),
        ];

        let restored = unflatten(&rows);
        match &restored.kind {
            NodeKind::Object { properties, .. } => {
                assert_eq!(properties.len(), 1);
                assert_eq!(properties[0].0, "config");
                assert!(matches!(properties[0].1.kind, NodeKind::Scalar { .. }));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_recursive_marker_row_degrades_to_string_leaf() {
        let rows = vec![
            PathRow::new("next", "object", false, ""),
            PathRow::new("next.back", "Recursive(A)", false, "Recursive reference detected"),
        ];

        let restored = unflatten(&rows);
        match &restored.kind {
            NodeKind::Object { properties, .. } => match &properties[0].1.kind {
                NodeKind::Object {
                    properties: inner, ..
                } => {
                    assert!(matches!(
                        inner[0].1.kind,
                        NodeKind::Scalar {
                            kind: ScalarKind::String,
                            ..
                        }
                    ));
                }
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_rows_yield_empty_object() {
        assert_eq!(unflatten(&[]), SchemaNode::object());
    }
}
