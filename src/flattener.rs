use std::collections::HashSet;

use crate::path_row::{join_items, join_key, join_wildcard, PathRow};
use crate::reference_resolver::resolve;
use crate::schema_node::{NodeKind, SchemaNode, SchemaRegistry};

/// Flatten a schema tree into an ordered sequence of path rows. Output is
/// pre-order: a parent's row precedes all of its descendants' rows, and
/// identical input always yields an identical sequence.
pub fn flatten(node: &SchemaNode, registry: &SchemaRegistry) -> Vec<PathRow> {
    flatten_branch(node, registry, "", false, &HashSet::new())
}

fn flatten_branch(
    node: &SchemaNode,
    registry: &SchemaRegistry,
    path: &str,
    required: bool,
    visited: &HashSet<String>,
) -> Vec<PathRow> {
    let resolved = resolve(node, registry);

    // Cycle guard: only names on this branch's own descent count. Sibling
    // branches carry their own copy of the visited set.
    if let Some(name) = &resolved.resolved_name {
        if visited.contains(name) {
            return vec![PathRow::new(
                path,
                &format!("Recursive({})", name),
                required,
                "Recursive reference detected",
            )];
        }
    }

    let mut visited = visited.clone();
    if let Some(name) = &resolved.resolved_name {
        visited.insert(name.clone());
    }

    let current = resolved.node;
    match &current.kind {
        NodeKind::AllOf { branches } => {
            let merged = merge_all_of(branches, registry, current.description.clone());
            emit_and_descend(
                &merged,
                registry,
                path,
                required,
                &visited,
                resolved.original_ref,
            )
        }
        NodeKind::OneOf { branches } | NodeKind::AnyOf { branches } => {
            // Alternative shapes share the same path and required flag.
            // Each branch descends with its own copy of the visited set and
            // its own row buffer, merged here.
            let mut rows = Vec::new();
            for branch in branches {
                rows.extend(flatten_branch(branch, registry, path, required, &visited));
            }
            dedup_exact(&mut rows);
            // A composition reached through a pointer keeps that pointer as
            // its own leading row, so reconstruction can restore the
            // reference instead of the inlined alternatives.
            if let Some(target) = resolved.original_ref {
                let mut row = PathRow::new(
                    path,
                    "object",
                    required,
                    current.description.as_deref().unwrap_or(""),
                );
                row.reference = Some(target);
                rows.insert(0, row);
            }
            rows
        }
        NodeKind::Reference { target } => {
            // Unresolved reference: a single opaque marker row, no descent.
            let mut row = PathRow::new(
                path,
                "object",
                required,
                current.description.as_deref().unwrap_or(""),
            );
            row.reference = Some(target.clone());
            vec![row]
        }
        _ => emit_and_descend(
            &current,
            registry,
            path,
            required,
            &visited,
            resolved.original_ref,
        ),
    }
}

fn emit_and_descend(
    node: &SchemaNode,
    registry: &SchemaRegistry,
    path: &str,
    required: bool,
    visited: &HashSet<String>,
    original_ref: Option<String>,
) -> Vec<PathRow> {
    let mut rows = Vec::new();

    // A pure structural container at the root gets no row of its own;
    // scalars, arrays, and reference-arrived nodes always do.
    let is_container = matches!(node.kind, NodeKind::Object { .. } | NodeKind::Map { .. });
    let emit_row = !path.is_empty() || original_ref.is_some() || !is_container;

    if emit_row {
        let mut row = PathRow::new(
            path,
            type_name(node),
            required,
            node.description.as_deref().unwrap_or(""),
        );
        if let NodeKind::Scalar {
            enum_values,
            example,
            ..
        } = &node.kind
        {
            row.enum_values = enum_values.iter().map(literal_text).collect();
            row.example = example.clone();
        }
        row.reference = original_ref;
        rows.push(row);
    }

    match &node.kind {
        NodeKind::Object {
            properties,
            required: required_names,
        } => {
            for (name, child) in properties {
                let child_path = join_key(path, name);
                let child_required = required_names.iter().any(|entry| entry == name);
                rows.extend(flatten_branch(
                    child,
                    registry,
                    &child_path,
                    child_required,
                    visited,
                ));
            }
        }
        NodeKind::Map { value_schema } => {
            rows.extend(flatten_branch(
                value_schema,
                registry,
                &join_wildcard(path),
                false,
                visited,
            ));
        }
        NodeKind::Array { items } => {
            rows.extend(flatten_branch(
                items,
                registry,
                &join_items(path),
                false,
                visited,
            ));
        }
        _ => {}
    }

    rows
}

/// Merge `allOf` branches into one synthetic object or map node. Merge order
/// is branch order; when two branches define the same property name the
/// later definition wins.
fn merge_all_of(
    branches: &[SchemaNode],
    registry: &SchemaRegistry,
    description: Option<String>,
) -> SchemaNode {
    let mut properties: Vec<(String, SchemaNode)> = Vec::new();
    let mut required: Vec<String> = Vec::new();
    let mut value_schema: Option<SchemaNode> = None;
    let mut description = description;

    for branch in branches {
        let mut resolved = resolve(branch, registry).node;
        if let NodeKind::AllOf { branches: nested } = &resolved.kind {
            let nested = nested.clone();
            resolved = merge_all_of(&nested, registry, resolved.description.clone());
        }

        match resolved.kind {
            NodeKind::Object {
                properties: branch_properties,
                required: branch_required,
            } => {
                for (name, node) in branch_properties {
                    if let Some(entry) = properties.iter_mut().find(|(existing, _)| *existing == name)
                    {
                        entry.1 = node;
                    } else {
                        properties.push((name, node));
                    }
                }
                for name in branch_required {
                    if !required.contains(&name) {
                        required.push(name);
                    }
                }
            }
            NodeKind::Map {
                value_schema: branch_value,
            } => {
                value_schema = Some(*branch_value);
            }
            _ => {}
        }

        if description.is_none() {
            description = resolved.description;
        }
    }

    let kind = if properties.is_empty() {
        match value_schema {
            Some(value) => NodeKind::Map {
                value_schema: Box::new(value),
            },
            None => NodeKind::Object {
                properties,
                required,
            },
        }
    } else {
        NodeKind::Object {
            properties,
            required,
        }
    };

    SchemaNode { kind, description }
}

fn type_name(node: &SchemaNode) -> &str {
    match &node.kind {
        NodeKind::Object { .. } | NodeKind::Map { .. } | NodeKind::Reference { .. } => "object",
        NodeKind::Array { .. } => "array",
        NodeKind::Scalar { kind, .. } => kind.as_str(),
        NodeKind::AllOf { .. } | NodeKind::OneOf { .. } | NodeKind::AnyOf { .. } => "object",
    }
}

fn literal_text(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(text) => text.clone(),
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Drop rows that duplicate an earlier row exactly in path, type, and
/// description. Alternative branches may legitimately emit overlapping
/// paths; only byte-identical repeats are removed.
fn dedup_exact(rows: &mut Vec<PathRow>) {
    let mut seen = HashSet::new();
    rows.retain(|row| {
        seen.insert((
            row.path.clone(),
            row.type_name.clone(),
            row.description.clone(),
        ))
    });
}
