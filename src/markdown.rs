use regex::Regex;

use crate::flattener::flatten;
use crate::path_row::PathRow;
use crate::spec_document::{ApiSpec, Header, Parameter, SecurityRequirement, Server, Tag, METHODS};

/// A document section extracted back out of a rendered artifact. Row tables
/// carry the raw, unrendered path strings; reconstruction depends on that.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedDocument {
    pub title: String,
    pub description: String,
    pub version: String,
    pub servers: Vec<Server>,
    pub tags: Vec<Tag>,
    pub security: Vec<SecurityRequirement>,
    pub operations: Vec<ExtractedOperation>,
    pub components: Vec<(String, Vec<PathRow>)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedOperation {
    pub method: String,
    pub path: String,
    pub summary: String,
    pub description: String,
    pub operation_id: String,
    pub tags: Vec<String>,
    pub security: Vec<SecurityRequirement>,
    pub parameters: Vec<Parameter>,
    pub request_body: Vec<(String, Vec<PathRow>)>,
    pub responses: Vec<ExtractedResponse>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedResponse {
    pub code: String,
    pub description: String,
    pub headers: Vec<Header>,
    pub content: Vec<(String, Vec<PathRow>)>,
}

/// Render a specification into a Markdown document: overview tables for
/// servers, tags, and security, one section per operation, and one field
/// table per component schema.
pub fn render(spec: &ApiSpec) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", spec.title));
    if !spec.description.is_empty() {
        out.push_str(&format!("{}\n\n", clean_text(&spec.description)));
    }
    if !spec.version.is_empty() {
        out.push_str(&format!("**Version:** {}\n\n", spec.version));
    }

    if !spec.servers.is_empty() {
        out.push_str("## Servers\n\n");
        out.push_str("| URL | Description |\n| --- | --- |\n");
        for server in &spec.servers {
            out.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&server.url),
                escape_cell(&server.description)
            ));
        }
        out.push('\n');
    }

    if !spec.tags.is_empty() {
        out.push_str("## Tags\n\n");
        out.push_str("| Name | Description |\n| --- | --- |\n");
        for tag in &spec.tags {
            out.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&tag.name),
                escape_cell(&tag.description)
            ));
        }
        out.push('\n');
    }

    if !spec.security.is_empty() {
        out.push_str("## Security\n\n");
        out.push_str("| Scheme | Scopes |\n| --- | --- |\n");
        for requirement in &spec.security {
            out.push_str(&format!(
                "| {} | {} |\n",
                escape_cell(&requirement.scheme),
                escape_cell(&requirement.scopes.join(", "))
            ));
        }
        out.push('\n');
    }

    if !spec.paths.is_empty() {
        out.push_str("## Paths\n\n");
        for item in &spec.paths {
            for operation in &item.operations {
                render_operation(&mut out, spec, &item.path, operation);
            }
        }
    }

    if !spec.components.is_empty() {
        out.push_str("## Components\n\n");
        for (name, schema) in spec.components.iter() {
            out.push_str(&format!("### {}\n\n", name));
            if let Some(description) = &schema.description {
                if !description.is_empty() {
                    out.push_str(&format!("{}\n\n", clean_text(description)));
                }
            }
            render_row_table(&mut out, &flatten(schema, &spec.components));
        }
    }

    out
}

fn render_operation(
    out: &mut String,
    spec: &ApiSpec,
    path: &str,
    operation: &crate::spec_document::Operation,
) {
    out.push_str(&format!(
        "### {} {}\n\n",
        operation.method.to_uppercase(),
        path
    ));

    if !operation.summary.is_empty() {
        out.push_str(&format!("{}\n\n", clean_text(&operation.summary)));
    }
    if !operation.description.is_empty() {
        out.push_str(&format!("{}\n\n", clean_text(&operation.description)));
    }

    let mut bullets = String::new();
    if !operation.operation_id.is_empty() {
        bullets.push_str(&format!("- Operation ID: `{}`\n", operation.operation_id));
    }
    if !operation.tags.is_empty() {
        bullets.push_str(&format!("- Tags: {}\n", operation.tags.join(", ")));
    }
    if !operation.security.is_empty() {
        bullets.push_str(&format!(
            "- Security: {}\n",
            format_security(&operation.security)
        ));
    }
    if !bullets.is_empty() {
        out.push_str(&bullets);
        out.push('\n');
    }

    if !operation.parameters.is_empty() {
        out.push_str("#### Parameters\n\n");
        out.push_str("| Name | In | Required | Type | Description |\n");
        out.push_str("| --- | --- | --- | --- | --- |\n");
        for parameter in &operation.parameters {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                escape_cell(&parameter.name),
                escape_cell(&parameter.location),
                yes_no(parameter.required),
                escape_cell(&parameter.type_name),
                escape_cell(&parameter.description)
            ));
        }
        out.push('\n');
    }

    for (content_type, schema) in &operation.request_body {
        out.push_str(&format!("#### Request Body ({})\n\n", content_type));
        render_row_table(out, &flatten(schema, &spec.components));
    }

    for response in &operation.responses {
        out.push_str(&format!("#### Response {}\n\n", response.code));
        if !response.description.is_empty() {
            out.push_str(&format!("{}\n\n", clean_text(&response.description)));
        }
        if !response.headers.is_empty() {
            out.push_str("**Headers:**\n\n");
            out.push_str("| Name | Type | Description |\n| --- | --- | --- |\n");
            for header in &response.headers {
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    escape_cell(&header.name),
                    escape_cell(&header.type_name),
                    escape_cell(&header.description)
                ));
            }
            out.push('\n');
        }
        for (content_type, schema) in &response.content {
            out.push_str(&format!("##### Content ({})\n\n", content_type));
            render_row_table(out, &flatten(schema, &spec.components));
        }
    }
}

fn render_row_table(out: &mut String, rows: &[PathRow]) {
    out.push_str("| Path | Type | Required | Description | Enum | Reference |\n");
    out.push_str("| --- | --- | --- | --- | --- | --- |\n");
    for row in rows {
        let path = if row.path.is_empty() {
            String::new()
        } else {
            format!("`{}`", row.path)
        };
        let reference = row
            .reference
            .as_deref()
            .map(|target| format!("`{}`", target))
            .unwrap_or_default();
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            path,
            escape_cell(&row.type_name),
            yes_no(row.required),
            escape_cell(&row.description),
            escape_cell(&row.enum_values.join(", ")),
            reference
        ));
    }
    out.push('\n');
}

/// Parse a rendered document back into its extractable surface. The parser
/// is line driven and tolerant: unknown lines are ignored, missing sections
/// come back empty, and it never fails.
pub fn extract(document: &str) -> ExtractedDocument {
    let operation_heading = Regex::new(r"^### ([A-Z]+) (.+)$").unwrap();
    let request_body_heading = Regex::new(r"^#### Request Body \((.+)\)$").unwrap();
    let response_heading = Regex::new(r"^#### Response (\S+)$").unwrap();
    let content_heading = Regex::new(r"^##### Content \((.+)\)$").unwrap();

    #[derive(PartialEq, Clone, Copy)]
    enum Section {
        Preamble,
        Servers,
        Tags,
        Security,
        Paths,
        Components,
        Other,
    }

    #[derive(PartialEq, Clone, Copy)]
    enum Target {
        None,
        OperationMeta,
        Parameters,
        RequestBody,
        ResponseMeta,
        ResponseHeaders,
        ResponseContent,
        Component,
    }

    let mut doc = ExtractedDocument::default();
    let mut section = Section::Preamble;
    let mut target = Target::None;

    for line in document.lines() {
        let line = line.trim_end();

        if line.starts_with("##### ") {
            if let Some(captures) = content_heading.captures(line) {
                if let Some(response) = doc
                    .operations
                    .last_mut()
                    .and_then(|operation| operation.responses.last_mut())
                {
                    response.content.push((captures[1].to_string(), Vec::new()));
                    target = Target::ResponseContent;
                    continue;
                }
            }
            target = Target::None;
            continue;
        }

        if line.starts_with("#### ") {
            if line == "#### Parameters" {
                target = Target::Parameters;
            } else if let Some(captures) = request_body_heading.captures(line) {
                if let Some(operation) = doc.operations.last_mut() {
                    operation
                        .request_body
                        .push((captures[1].to_string(), Vec::new()));
                    target = Target::RequestBody;
                } else {
                    target = Target::None;
                }
            } else if let Some(captures) = response_heading.captures(line) {
                if let Some(operation) = doc.operations.last_mut() {
                    operation.responses.push(ExtractedResponse {
                        code: captures[1].to_string(),
                        ..ExtractedResponse::default()
                    });
                    target = Target::ResponseMeta;
                } else {
                    target = Target::None;
                }
            } else {
                target = Target::None;
            }
            continue;
        }

        if let Some(heading) = line.strip_prefix("### ") {
            if section == Section::Components {
                doc.components.push((heading.to_string(), Vec::new()));
                target = Target::Component;
                continue;
            }
            if let Some(captures) = operation_heading.captures(line) {
                let method = captures[1].to_lowercase();
                if METHODS.contains(&method.as_str()) {
                    doc.operations.push(ExtractedOperation {
                        method,
                        path: captures[2].to_string(),
                        ..ExtractedOperation::default()
                    });
                    target = Target::OperationMeta;
                    continue;
                }
            }
            target = Target::None;
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ") {
            section = match heading {
                "Servers" => Section::Servers,
                "Tags" => Section::Tags,
                "Security" => Section::Security,
                "Paths" => Section::Paths,
                "Components" => Section::Components,
                _ => Section::Other,
            };
            target = Target::None;
            continue;
        }

        if let Some(title) = line.strip_prefix("# ") {
            if section == Section::Preamble {
                doc.title = title.to_string();
            }
            continue;
        }

        if line == "**Headers:**" {
            target = Target::ResponseHeaders;
            continue;
        }

        if let Some(version) = line.strip_prefix("**Version:** ") {
            if section == Section::Preamble {
                doc.version = version.to_string();
            }
            continue;
        }

        if let Some(cells) = split_row(line) {
            if is_separator(&cells) || is_header(&cells) {
                continue;
            }
            match section {
                Section::Servers => doc.servers.push(Server {
                    url: cell(&cells, 0),
                    description: cell(&cells, 1),
                }),
                Section::Tags => doc.tags.push(Tag {
                    name: cell(&cells, 0),
                    description: cell(&cells, 1),
                }),
                Section::Security => doc.security.push(SecurityRequirement {
                    scheme: cell(&cells, 0),
                    scopes: split_list(&cell(&cells, 1)),
                }),
                _ => match target {
                    Target::Parameters => {
                        if let Some(operation) = doc.operations.last_mut() {
                            operation.parameters.push(Parameter {
                                name: cell(&cells, 0),
                                location: cell(&cells, 1),
                                required: cell(&cells, 2) == "yes",
                                type_name: cell(&cells, 3),
                                description: cell(&cells, 4),
                            });
                        }
                    }
                    Target::ResponseHeaders => {
                        if let Some(response) = doc
                            .operations
                            .last_mut()
                            .and_then(|operation| operation.responses.last_mut())
                        {
                            response.headers.push(Header {
                                name: cell(&cells, 0),
                                type_name: cell(&cells, 1),
                                description: cell(&cells, 2),
                            });
                        }
                    }
                    Target::RequestBody => {
                        if let Some(rows) = doc
                            .operations
                            .last_mut()
                            .and_then(|operation| operation.request_body.last_mut())
                        {
                            rows.1.push(parse_row(&cells));
                        }
                    }
                    Target::ResponseContent => {
                        if let Some(rows) = doc
                            .operations
                            .last_mut()
                            .and_then(|operation| operation.responses.last_mut())
                            .and_then(|response| response.content.last_mut())
                        {
                            rows.1.push(parse_row(&cells));
                        }
                    }
                    Target::Component => {
                        if let Some(component) = doc.components.last_mut() {
                            component.1.push(parse_row(&cells));
                        }
                    }
                    _ => {}
                },
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("- Operation ID: ") {
            if let Some(operation) = doc.operations.last_mut() {
                operation.operation_id = unbacktick(rest).to_string();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("- Tags: ") {
            if let Some(operation) = doc.operations.last_mut() {
                operation.tags = split_list(rest);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("- Security: ") {
            if let Some(operation) = doc.operations.last_mut() {
                operation.security = parse_security(rest);
            }
            continue;
        }

        // Plain text attaches to whatever description is open.
        match target {
            Target::OperationMeta => {
                if let Some(operation) = doc.operations.last_mut() {
                    if operation.summary.is_empty() {
                        operation.summary = line.to_string();
                    } else {
                        append_text(&mut operation.description, line);
                    }
                }
            }
            Target::ResponseMeta => {
                if let Some(response) = doc
                    .operations
                    .last_mut()
                    .and_then(|operation| operation.responses.last_mut())
                {
                    append_text(&mut response.description, line);
                }
            }
            _ => {
                if section == Section::Preamble && !line.starts_with('#') {
                    append_text(&mut doc.description, line);
                }
            }
        }
    }

    doc
}

fn format_security(requirements: &[SecurityRequirement]) -> String {
    requirements
        .iter()
        .map(|requirement| {
            if requirement.scopes.is_empty() {
                requirement.scheme.clone()
            } else {
                format!("{} ({})", requirement.scheme, requirement.scopes.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_security(text: &str) -> Vec<SecurityRequirement> {
    let pattern = Regex::new(r"^(\S+?)(?: \((.*)\))?$").unwrap();
    text.split("; ")
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let captures = pattern.captures(entry.trim())?;
            Some(SecurityRequirement {
                scheme: captures[1].to_string(),
                scopes: captures
                    .get(2)
                    .map(|scopes| split_list(scopes.as_str()))
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn parse_row(cells: &[String]) -> PathRow {
    let mut row = PathRow::new(
        unbacktick(&cell(cells, 0)),
        &cell(cells, 1),
        cell(cells, 2) == "yes",
        &cell(cells, 3),
    );
    row.enum_values = split_list(&cell(cells, 4));
    let reference = cell(cells, 5);
    if !reference.is_empty() {
        row.reference = Some(unbacktick(&reference).to_string());
    }
    row
}

fn split_row(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('|') || !trimmed.ends_with('|') {
        return None;
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek() == Some(&'|') {
            current.push('|');
            chars.next();
        } else if ch == '|' {
            cells.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    cells.push(current.trim().to_string());
    Some(cells)
}

fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|ch| ch == '-' || ch == ':'))
}

fn is_header(cells: &[String]) -> bool {
    matches!(
        cells.first().map(String::as_str),
        Some("Path") | Some("Name") | Some("URL") | Some("Scheme")
    )
}

fn cell(cells: &[String], index: usize) -> String {
    cells.get(index).cloned().unwrap_or_default()
}

fn split_list(text: &str) -> Vec<String> {
    text.split(", ")
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

fn unbacktick(text: &str) -> &str {
    text.trim().trim_matches('`')
}

fn escape_cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|")
}

fn clean_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn append_text(buffer: &mut String, line: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_document::ApiSpec;

    const SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Pet Store
  description: Manage pets
  version: 1.0.0
servers:
  - url: https://api.example.com/v1
    description: Production
tags:
  - name: pets
    description: Pet operations
security:
  - api_key: []
paths:
  /pets:
    get:
      summary: List pets
      operationId: listPets
      tags: [pets]
      security:
        - api_key: [read:pets]
      parameters:
        - name: limit
          in: query
          description: Page size
          schema:
            type: integer
      responses:
        '200':
          description: A list of pets
          headers:
            x-next:
              description: Next page token
              schema:
                type: string
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
    post:
      summary: Create a pet
      operationId: createPet
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        '201':
          description: Created
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
        name:
          type: string
          description: Display name
        status:
          type: string
          enum: [available, sold]
"#;

    #[test]
    fn test_render_contains_expected_sections() {
        let spec = ApiSpec::parse(SPEC).unwrap();
        let document = render(&spec);

        assert!(document.contains("# Pet Store"));
        assert!(document.contains("**Version:** 1.0.0"));
        assert!(document.contains("## Servers"));
        assert!(document.contains("### GET /pets"));
        assert!(document.contains("### POST /pets"));
        assert!(document.contains("- Operation ID: `listPets`"));
        assert!(document.contains("#### Request Body (application/json)"));
        assert!(document.contains("##### Content (application/json)"));
        assert!(document.contains("### Pet"));
        assert!(document.contains("| `id` | integer | yes |"));
    }

    #[test]
    fn test_extract_round_trips_document_surface() {
        let spec = ApiSpec::parse(SPEC).unwrap();
        let document = render(&spec);
        let extracted = extract(&document);

        assert_eq!(extracted.title, "Pet Store");
        assert_eq!(extracted.description, "Manage pets");
        assert_eq!(extracted.version, "1.0.0");
        assert_eq!(extracted.servers.len(), 1);
        assert_eq!(extracted.servers[0].url, "https://api.example.com/v1");
        assert_eq!(extracted.tags.len(), 1);
        assert_eq!(extracted.security.len(), 1);
        assert_eq!(extracted.components.len(), 1);
        assert_eq!(extracted.operations.len(), 2);

        let get = &extracted.operations[0];
        assert_eq!(get.method, "get");
        assert_eq!(get.path, "/pets");
        assert_eq!(get.summary, "List pets");
        assert_eq!(get.operation_id, "listPets");
        assert_eq!(get.tags, vec!["pets".to_string()]);
        assert_eq!(get.security.len(), 1);
        assert_eq!(get.security[0].scopes, vec!["read:pets".to_string()]);
        assert_eq!(get.parameters.len(), 1);
        assert_eq!(get.parameters[0].type_name, "integer");
        assert_eq!(get.responses.len(), 1);
        assert_eq!(get.responses[0].code, "200");
        assert_eq!(get.responses[0].description, "A list of pets");
        assert_eq!(get.responses[0].headers.len(), 1);
        assert_eq!(get.responses[0].content.len(), 1);
    }

    #[test]
    fn test_extract_preserves_raw_row_paths() {
        let spec = ApiSpec::parse(SPEC).unwrap();
        let extracted = extract(&render(&spec));

        let (_, rows) = &extracted.components[0];
        let paths: Vec<&str> = rows.iter().map(|row| row.path.as_str()).collect();
        assert_eq!(paths, vec!["id", "name", "status"]);
        assert_eq!(rows[0].type_name, "integer");
        assert!(rows[0].required);
        assert_eq!(rows[1].description, "Display name");
        assert_eq!(rows[2].enum_values, vec!["available", "sold"]);
    }

    #[test]
    fn test_extract_preserves_reference_markers_and_empty_paths() {
        let spec = ApiSpec::parse(SPEC).unwrap();
        let extracted = extract(&render(&spec));

        // GET /pets response body is an array of Pet references; the root
        // row keeps its empty raw path and the item row keeps its pointer.
        let rows = &extracted.operations[0].responses[0].content[0].1;
        assert_eq!(rows[0].path, "");
        assert_eq!(rows[0].type_name, "array");
        assert_eq!(rows[1].path, "[]");
        assert_eq!(
            rows[1].reference.as_deref(),
            Some("#/components/schemas/Pet")
        );
    }

    #[test]
    fn test_extract_on_adversarial_input_is_total() {
        let extracted = extract("not markdown at all\n|||\n### ???\n| a | b |");
        assert!(extracted.operations.is_empty());
        assert!(extracted.components.is_empty());

        let empty = extract("");
        assert_eq!(empty, ExtractedDocument::default());
    }

    #[test]
    fn test_pipe_characters_survive_table_cells() {
        let mut spec = ApiSpec::parse(SPEC).unwrap();
        spec.servers[0].description = "primary | fallback".to_string();

        let extracted = extract(&render(&spec));
        assert_eq!(extracted.servers[0].description, "primary | fallback");
    }
}
