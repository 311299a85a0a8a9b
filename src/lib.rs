// Specification and Markdown documentation codec
pub mod schema_node;
pub mod path_row;
pub mod reference_resolver;
pub mod flattener;
pub mod reconstructor;
pub mod spec_document;
pub mod markdown;
pub mod fidelity;

// Re-export core types for convenience
pub use schema_node::{NodeKind, ScalarKind, SchemaNode, SchemaRegistry};
pub use path_row::{PathRow, PathSegment};
pub use reference_resolver::{resolve, ResolvedNode};
pub use flattener::flatten;
pub use reconstructor::unflatten;
pub use spec_document::{ApiSpec, ParseError, SpecFormat};
pub use markdown::{extract, render, ExtractedDocument};
pub use fidelity::{restore, FidelityReport, FidelityValidator};
