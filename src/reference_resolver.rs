use crate::schema_node::{NodeKind, SchemaNode, SchemaRegistry};

/// Result of resolving a node against the component registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub node: SchemaNode,
    /// Component name the node resolved to, when it was a known reference.
    pub resolved_name: Option<String>,
    /// Original reference pointer, when the node arrived via a `$ref`.
    pub original_ref: Option<String>,
}

/// Resolve a reference node against the registry. An unresolved reference is
/// not an error: it passes through unchanged as an opaque marker. A
/// non-reference node comes back as a plain copy.
pub fn resolve(node: &SchemaNode, registry: &SchemaRegistry) -> ResolvedNode {
    let target = match &node.kind {
        NodeKind::Reference { target } => target.clone(),
        _ => {
            return ResolvedNode {
                node: node.clone(),
                resolved_name: None,
                original_ref: None,
            }
        }
    };

    let name = reference_name(&target);
    match registry.get(name) {
        Some(definition) => {
            let mut resolved = definition.clone();
            if resolved.description.is_none() {
                resolved.description = node.description.clone();
            }
            ResolvedNode {
                node: resolved,
                resolved_name: Some(name.to_string()),
                original_ref: Some(target),
            }
        }
        None => ResolvedNode {
            node: node.clone(),
            resolved_name: None,
            original_ref: Some(target),
        },
    }
}

/// Final segment of a reference pointer, e.g. `Pet` from
/// `#/components/schemas/Pet`.
pub fn reference_name(target: &str) -> &str {
    target.rsplit('/').next().unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_node::ScalarKind;

    #[test]
    fn test_resolve_known_reference() {
        let mut registry = SchemaRegistry::new();
        registry.insert("Pet", SchemaNode::scalar(ScalarKind::Integer));

        let node = SchemaNode::reference("#/components/schemas/Pet");
        let resolved = resolve(&node, &registry);

        assert_eq!(resolved.node, SchemaNode::scalar(ScalarKind::Integer));
        assert_eq!(resolved.resolved_name.as_deref(), Some("Pet"));
        assert_eq!(
            resolved.original_ref.as_deref(),
            Some("#/components/schemas/Pet")
        );
    }

    #[test]
    fn test_unresolved_reference_passes_through() {
        let registry = SchemaRegistry::new();
        let node = SchemaNode::reference("#/components/schemas/Missing");
        let resolved = resolve(&node, &registry);

        assert_eq!(resolved.node, node);
        assert!(resolved.resolved_name.is_none());
        assert_eq!(
            resolved.original_ref.as_deref(),
            Some("#/components/schemas/Missing")
        );
    }

    #[test]
    fn test_non_reference_is_copied() {
        let registry = SchemaRegistry::new();
        let node = SchemaNode::scalar(ScalarKind::Boolean).with_description("flag");
        let resolved = resolve(&node, &registry);

        assert_eq!(resolved.node, node);
        assert!(resolved.resolved_name.is_none());
        assert!(resolved.original_ref.is_none());
    }

    #[test]
    fn test_reference_keeps_local_description() {
        let mut registry = SchemaRegistry::new();
        registry.insert("Pet", SchemaNode::object());

        let node = SchemaNode::reference("#/components/schemas/Pet")
            .with_description("A pet record");
        let resolved = resolve(&node, &registry);
        assert_eq!(resolved.node.description.as_deref(), Some("A pet record"));
    }
}
