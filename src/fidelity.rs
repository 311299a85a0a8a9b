use serde::Serialize;
use thiserror::Error;

use crate::markdown::{extract, render, ExtractedDocument};
use crate::reconstructor::unflatten;
use crate::spec_document::{ApiSpec, Operation, ParseError, PathItem, Response};

#[derive(Debug, Error)]
pub enum FidelityError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Outcome of a round-trip check. The report lists every discrepancy found;
/// the score starts at 100 and loses 5 points per counted deduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FidelityReport {
    pub score: u8,
    pub report: Vec<String>,
}

/// Measures how much of a specification survives projection to Markdown and
/// reconstruction back into a specification.
#[derive(Debug, Default)]
pub struct FidelityValidator;

impl FidelityValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run the full round trip on raw specification text and score the
    /// result. Never fails: an unparsable input scores 0 with a single
    /// failure line.
    pub fn validate(&self, spec_text: &str) -> FidelityReport {
        match round_trip(spec_text) {
            Ok((original, restored)) => {
                let (report, deductions) = diff(&original, &restored);
                FidelityReport {
                    score: score(deductions),
                    report,
                }
            }
            Err(error) => FidelityReport {
                score: 0,
                report: vec![format!("Validation Failed: {}", error)],
            },
        }
    }
}

/// Rebuild a full specification from an extracted document. Row tables are
/// folded back into schema trees; everything else carries over directly.
pub fn restore(document: &ExtractedDocument) -> ApiSpec {
    let mut spec = ApiSpec {
        openapi: "3.0.3".to_string(),
        title: document.title.clone(),
        description: document.description.clone(),
        version: document.version.clone(),
        servers: document.servers.clone(),
        tags: document.tags.clone(),
        security: document.security.clone(),
        ..ApiSpec::default()
    };

    for extracted in &document.operations {
        let operation = Operation {
            method: extracted.method.clone(),
            summary: extracted.summary.clone(),
            description: extracted.description.clone(),
            operation_id: extracted.operation_id.clone(),
            tags: extracted.tags.clone(),
            security: extracted.security.clone(),
            parameters: extracted.parameters.clone(),
            request_body: extracted
                .request_body
                .iter()
                .map(|(content_type, rows)| (content_type.clone(), unflatten(rows)))
                .collect(),
            responses: extracted
                .responses
                .iter()
                .map(|response| Response {
                    code: response.code.clone(),
                    description: response.description.clone(),
                    headers: response.headers.clone(),
                    content: response
                        .content
                        .iter()
                        .map(|(content_type, rows)| (content_type.clone(), unflatten(rows)))
                        .collect(),
                })
                .collect(),
        };

        match spec
            .paths
            .iter_mut()
            .find(|item| item.path == extracted.path)
        {
            Some(item) => item.operations.push(operation),
            None => spec.paths.push(PathItem {
                path: extracted.path.clone(),
                operations: vec![operation],
            }),
        }
    }

    for (name, rows) in &document.components {
        spec.components.insert(name, unflatten(rows));
    }

    spec
}

fn round_trip(spec_text: &str) -> Result<(ApiSpec, ApiSpec), FidelityError> {
    let original = ApiSpec::parse(spec_text)?;
    let document = render(&original);
    let restored = restore(&extract(&document));
    Ok((original, restored))
}

/// Compare original and restored specifications. Returns the report lines
/// and the number of counted deductions; some findings are reported without
/// affecting the score.
fn diff(original: &ApiSpec, restored: &ApiSpec) -> (Vec<String>, u32) {
    let mut report = Vec::new();
    let mut deductions: u32 = 0;

    if original.title != restored.title {
        report.push(format!(
            "Title mismatch: '{}' vs '{}'",
            original.title, restored.title
        ));
    }

    if original.servers.len() != restored.servers.len() {
        report.push(format!(
            "Server count mismatch: {} vs {}",
            original.servers.len(),
            restored.servers.len()
        ));
        deductions += 1;
    }

    if original.tags.len() != restored.tags.len() {
        report.push(format!(
            "Tag count mismatch: {} vs {}",
            original.tags.len(),
            restored.tags.len()
        ));
        deductions += 1;
    }

    if original.components.len() != restored.components.len() {
        report.push(format!(
            "Component schema count mismatch: {} vs {}",
            original.components.len(),
            restored.components.len()
        ));
        deductions += original.components.len().abs_diff(restored.components.len()) as u32;
    }

    for item in &original.paths {
        let Some(counterpart) = restored.paths.iter().find(|other| other.path == item.path)
        else {
            report.push(format!("Missing path: {}", item.path));
            deductions += 1;
            continue;
        };

        for operation in &item.operations {
            let label = format!("{} {}", operation.method.to_uppercase(), item.path);
            let Some(other) = counterpart
                .operations
                .iter()
                .find(|candidate| candidate.method == operation.method)
            else {
                report.push(format!("Missing method: {}", label));
                deductions += 1;
                continue;
            };

            if !operation.operation_id.is_empty()
                && !other.operation_id.is_empty()
                && operation.operation_id != other.operation_id
            {
                report.push(format!(
                    "Operation ID mismatch at {}: '{}' vs '{}'",
                    label, operation.operation_id, other.operation_id
                ));
            }
            if operation.security.len() != other.security.len() {
                report.push(format!(
                    "Security declaration count mismatch at {}: {} vs {}",
                    label,
                    operation.security.len(),
                    other.security.len()
                ));
            }
        }
    }

    (report, deductions)
}

fn score(deductions: u32) -> u8 {
    100u32.saturating_sub(deductions.saturating_mul(5)) as u8
}
