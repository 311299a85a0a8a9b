use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::schema_node::{SchemaNode, SchemaRegistry};

/// HTTP methods recognized inside a path item, in emission order.
pub const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Errors from the textual codec. Only a malformed outer document is fatal;
/// missing or odd sections inside a parsed document default to empty.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse specification text: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("specification root must be a mapping")]
    NotAMapping,

    #[error("failed to serialize specification: {0}")]
    Serialize(String),
}

/// Output encoding for a serialized specification. YAML and JSON are
/// interchangeable; the parser accepts either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Server {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tag {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SecurityRequirement {
    pub scheme: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    pub name: String,
    pub location: String,
    pub required: bool,
    pub type_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub name: String,
    pub type_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: String,
    pub description: String,
    pub headers: Vec<Header>,
    /// Content type to body schema, in document order.
    pub content: Vec<(String, SchemaNode)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Lowercase HTTP method.
    pub method: String,
    pub summary: String,
    pub description: String,
    pub operation_id: String,
    pub tags: Vec<String>,
    pub security: Vec<SecurityRequirement>,
    pub parameters: Vec<Parameter>,
    pub request_body: Vec<(String, SchemaNode)>,
    pub responses: Vec<Response>,
}

impl Operation {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            summary: String::new(),
            description: String::new(),
            operation_id: String::new(),
            tags: Vec::new(),
            security: Vec::new(),
            parameters: Vec::new(),
            request_body: Vec::new(),
            responses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathItem {
    pub path: String,
    pub operations: Vec<Operation>,
}

/// Parsed API specification document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiSpec {
    pub openapi: String,
    pub title: String,
    pub description: String,
    pub version: String,
    pub servers: Vec<Server>,
    pub tags: Vec<Tag>,
    pub security: Vec<SecurityRequirement>,
    pub paths: Vec<PathItem>,
    pub components: SchemaRegistry,
}

impl ApiSpec {
    /// Parse a YAML or JSON specification document.
    pub fn parse(text: &str) -> Result<ApiSpec, ParseError> {
        let value: Value = serde_yaml::from_str(text)?;
        let root = value.as_mapping().ok_or(ParseError::NotAMapping)?;

        let mut spec = ApiSpec {
            openapi: get_str(root, "openapi"),
            ..ApiSpec::default()
        };
        if spec.openapi.is_empty() {
            spec.openapi = "3.0.3".to_string();
        }

        if let Some(info) = get_map(root, "info") {
            spec.title = get_str(info, "title");
            spec.description = get_str(info, "description");
            spec.version = get_str(info, "version");
        }

        for server in get_seq(root, "servers") {
            if let Some(map) = server.as_mapping() {
                spec.servers.push(Server {
                    url: get_str(map, "url"),
                    description: get_str(map, "description"),
                });
            }
        }

        for tag in get_seq(root, "tags") {
            if let Some(map) = tag.as_mapping() {
                spec.tags.push(Tag {
                    name: get_str(map, "name"),
                    description: get_str(map, "description"),
                });
            }
        }

        spec.security = parse_security(get(root, "security"));

        if let Some(paths) = get_map(root, "paths") {
            for (path, item) in paths {
                let (Some(path), Some(item)) = (path.as_str(), item.as_mapping()) else {
                    continue;
                };
                let mut operations = Vec::new();
                for method in METHODS {
                    if let Some(operation) = get_map(item, method) {
                        operations.push(parse_operation(method, operation));
                    }
                }
                spec.paths.push(PathItem {
                    path: path.to_string(),
                    operations,
                });
            }
        }

        if let Some(components) = get_map(root, "components") {
            if let Some(schemas) = get_map(components, "schemas") {
                for (name, schema) in schemas {
                    if let Some(name) = name.as_str() {
                        spec.components.insert(name, SchemaNode::from_value(schema));
                    }
                }
            }
        }

        Ok(spec)
    }

    /// Serialize the document in the requested encoding.
    pub fn serialize(&self, format: SpecFormat) -> Result<String, ParseError> {
        let value = self.to_value();
        match format {
            SpecFormat::Yaml => {
                serde_yaml::to_string(&value).map_err(|e| ParseError::Serialize(e.to_string()))
            }
            SpecFormat::Json => serde_json::to_string_pretty(&value)
                .map_err(|e| ParseError::Serialize(e.to_string())),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut root = Mapping::new();
        root.insert(key("openapi"), Value::String(self.openapi.clone()));

        let mut info = Mapping::new();
        info.insert(key("title"), Value::String(self.title.clone()));
        if !self.description.is_empty() {
            info.insert(key("description"), Value::String(self.description.clone()));
        }
        info.insert(key("version"), Value::String(self.version.clone()));
        root.insert(key("info"), Value::Mapping(info));

        if !self.servers.is_empty() {
            let servers = self
                .servers
                .iter()
                .map(|server| {
                    let mut map = Mapping::new();
                    map.insert(key("url"), Value::String(server.url.clone()));
                    if !server.description.is_empty() {
                        map.insert(key("description"), Value::String(server.description.clone()));
                    }
                    Value::Mapping(map)
                })
                .collect();
            root.insert(key("servers"), Value::Sequence(servers));
        }

        if !self.tags.is_empty() {
            let tags = self
                .tags
                .iter()
                .map(|tag| {
                    let mut map = Mapping::new();
                    map.insert(key("name"), Value::String(tag.name.clone()));
                    if !tag.description.is_empty() {
                        map.insert(key("description"), Value::String(tag.description.clone()));
                    }
                    Value::Mapping(map)
                })
                .collect();
            root.insert(key("tags"), Value::Sequence(tags));
        }

        if !self.security.is_empty() {
            root.insert(key("security"), security_value(&self.security));
        }

        let mut paths = Mapping::new();
        for item in &self.paths {
            let mut methods = Mapping::new();
            for operation in &item.operations {
                methods.insert(key(&operation.method), operation_value(operation));
            }
            paths.insert(key(&item.path), Value::Mapping(methods));
        }
        root.insert(key("paths"), Value::Mapping(paths));

        if !self.components.is_empty() {
            let mut schemas = Mapping::new();
            for (name, node) in self.components.iter() {
                schemas.insert(key(name), node.to_value());
            }
            let mut components = Mapping::new();
            components.insert(key("schemas"), Value::Mapping(schemas));
            root.insert(key("components"), Value::Mapping(components));
        }

        Value::Mapping(root)
    }
}

fn parse_operation(method: &str, map: &Mapping) -> Operation {
    let mut operation = Operation::new(method);
    operation.summary = get_str(map, "summary");
    operation.description = get_str(map, "description");
    operation.operation_id = get_str(map, "operationId");

    for tag in get_seq(map, "tags") {
        if let Some(name) = tag.as_str() {
            operation.tags.push(name.to_string());
        }
    }

    operation.security = parse_security(get(map, "security"));

    for parameter in get_seq(map, "parameters") {
        if let Some(map) = parameter.as_mapping() {
            let type_name = get_map(map, "schema")
                .map(|schema| get_str(schema, "type"))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "string".to_string());
            operation.parameters.push(Parameter {
                name: get_str(map, "name"),
                location: get_str(map, "in"),
                required: get(map, "required").and_then(Value::as_bool).unwrap_or(false),
                type_name,
                description: get_str(map, "description"),
            });
        }
    }

    if let Some(body) = get_map(map, "requestBody") {
        operation.request_body = parse_content(body);
    }

    if let Some(responses) = get_map(map, "responses") {
        for (code, value) in responses {
            let code = match code {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                _ => continue,
            };
            let Some(response_map) = value.as_mapping() else {
                continue;
            };
            let mut response = Response {
                code,
                description: get_str(response_map, "description"),
                headers: Vec::new(),
                content: parse_content(response_map),
            };
            if let Some(headers) = get_map(response_map, "headers") {
                for (name, header) in headers {
                    let (Some(name), Some(header)) = (name.as_str(), header.as_mapping()) else {
                        continue;
                    };
                    let type_name = get_map(header, "schema")
                        .map(|schema| get_str(schema, "type"))
                        .filter(|text| !text.is_empty())
                        .unwrap_or_else(|| "string".to_string());
                    response.headers.push(Header {
                        name: name.to_string(),
                        type_name,
                        description: get_str(header, "description"),
                    });
                }
            }
            operation.responses.push(response);
        }
    }

    operation
}

/// Pull `content: {content-type: {schema}}` pairs out of a request body or
/// response mapping.
fn parse_content(map: &Mapping) -> Vec<(String, SchemaNode)> {
    let mut entries = Vec::new();
    if let Some(content) = get_map(map, "content") {
        for (content_type, value) in content {
            let (Some(content_type), Some(media)) = (content_type.as_str(), value.as_mapping())
            else {
                continue;
            };
            let schema = get(media, "schema")
                .map(SchemaNode::from_value)
                .unwrap_or_else(SchemaNode::object);
            entries.push((content_type.to_string(), schema));
        }
    }
    entries
}

fn parse_security(value: Option<&Value>) -> Vec<SecurityRequirement> {
    let mut requirements = Vec::new();
    let Some(Value::Sequence(entries)) = value else {
        return requirements;
    };
    for entry in entries {
        let Some(map) = entry.as_mapping() else {
            continue;
        };
        for (scheme, scopes) in map {
            let Some(scheme) = scheme.as_str() else {
                continue;
            };
            let scopes = scopes
                .as_sequence()
                .map(|sequence| {
                    sequence
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|scope| scope.to_string())
                        .collect()
                })
                .unwrap_or_default();
            requirements.push(SecurityRequirement {
                scheme: scheme.to_string(),
                scopes,
            });
        }
    }
    requirements
}

fn operation_value(operation: &Operation) -> Value {
    let mut map = Mapping::new();
    if !operation.summary.is_empty() {
        map.insert(key("summary"), Value::String(operation.summary.clone()));
    }
    if !operation.description.is_empty() {
        map.insert(
            key("description"),
            Value::String(operation.description.clone()),
        );
    }
    if !operation.operation_id.is_empty() {
        map.insert(
            key("operationId"),
            Value::String(operation.operation_id.clone()),
        );
    }
    if !operation.tags.is_empty() {
        let tags = operation.tags.iter().map(|tag| key(tag)).collect();
        map.insert(key("tags"), Value::Sequence(tags));
    }
    if !operation.security.is_empty() {
        map.insert(key("security"), security_value(&operation.security));
    }
    if !operation.parameters.is_empty() {
        let parameters = operation
            .parameters
            .iter()
            .map(|parameter| {
                let mut entry = Mapping::new();
                entry.insert(key("name"), Value::String(parameter.name.clone()));
                entry.insert(key("in"), Value::String(parameter.location.clone()));
                if parameter.required {
                    entry.insert(key("required"), Value::Bool(true));
                }
                if !parameter.description.is_empty() {
                    entry.insert(
                        key("description"),
                        Value::String(parameter.description.clone()),
                    );
                }
                let mut schema = Mapping::new();
                schema.insert(key("type"), Value::String(parameter.type_name.clone()));
                entry.insert(key("schema"), Value::Mapping(schema));
                Value::Mapping(entry)
            })
            .collect();
        map.insert(key("parameters"), Value::Sequence(parameters));
    }
    if !operation.request_body.is_empty() {
        let mut body = Mapping::new();
        body.insert(key("content"), content_value(&operation.request_body));
        map.insert(key("requestBody"), Value::Mapping(body));
    }
    if !operation.responses.is_empty() {
        let mut responses = Mapping::new();
        for response in &operation.responses {
            let mut entry = Mapping::new();
            if !response.description.is_empty() {
                entry.insert(
                    key("description"),
                    Value::String(response.description.clone()),
                );
            }
            if !response.headers.is_empty() {
                let mut headers = Mapping::new();
                for header in &response.headers {
                    let mut header_map = Mapping::new();
                    if !header.description.is_empty() {
                        header_map.insert(
                            key("description"),
                            Value::String(header.description.clone()),
                        );
                    }
                    let mut schema = Mapping::new();
                    schema.insert(key("type"), Value::String(header.type_name.clone()));
                    header_map.insert(key("schema"), Value::Mapping(schema));
                    headers.insert(key(&header.name), Value::Mapping(header_map));
                }
                entry.insert(key("headers"), Value::Mapping(headers));
            }
            if !response.content.is_empty() {
                entry.insert(key("content"), content_value(&response.content));
            }
            responses.insert(key(&response.code), Value::Mapping(entry));
        }
        map.insert(key("responses"), Value::Mapping(responses));
    }
    Value::Mapping(map)
}

fn content_value(entries: &[(String, SchemaNode)]) -> Value {
    let mut content = Mapping::new();
    for (content_type, schema) in entries {
        let mut media = Mapping::new();
        media.insert(key("schema"), schema.to_value());
        content.insert(key(content_type), Value::Mapping(media));
    }
    Value::Mapping(content)
}

fn security_value(requirements: &[SecurityRequirement]) -> Value {
    let entries = requirements
        .iter()
        .map(|requirement| {
            let mut map = Mapping::new();
            let scopes = requirement.scopes.iter().map(|scope| key(scope)).collect();
            map.insert(key(&requirement.scheme), Value::Sequence(scopes));
            Value::Mapping(map)
        })
        .collect();
    Value::Sequence(entries)
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn get<'a>(map: &'a Mapping, name: &str) -> Option<&'a Value> {
    map.get(&key(name))
}

fn get_map<'a>(map: &'a Mapping, name: &str) -> Option<&'a Mapping> {
    get(map, name).and_then(Value::as_mapping)
}

fn get_seq<'a>(map: &'a Mapping, name: &str) -> &'a [Value] {
    get(map, name)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn get_str(map: &Mapping, name: &str) -> String {
    get(map, name)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}
