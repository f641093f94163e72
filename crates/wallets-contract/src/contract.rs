use std::{fmt, path::Path};

use http::{Method, StatusCode};
use jsonschema::{error::ValidationErrorKind, Draft, JSONSchema};
use serde_json::{json, Value};

use crate::{
    document::{MediaTypeObject, OpenApiDocument, OperationObject, ParameterObject},
    error::{ContractError, FieldError, ValidationFailure},
    WALLET_OPENAPI,
};

/// The parts of an HTTP request the contract inspects.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

/// The parts of an HTTP response the contract inspects, along with the
/// request line it answered.
#[derive(Debug, Clone, Copy)]
pub struct ResponseParts<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub status: StatusCode,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

/// A compiled OpenAPI document.
pub struct Contract {
    operations: Vec<Operation>,
}

struct Operation {
    method: Method,
    template: PathTemplate,
    operation_id: Option<String>,
    parameters: Vec<PathParameter>,
    request_body: Option<RequestBody>,
    responses: Vec<Response>,
}

struct PathParameter {
    name: String,
    kind: ScalarKind,
    schema: JSONSchema,
}

struct RequestBody {
    required: bool,
    content: Vec<MediaSchema>,
}

struct Response {
    status: StatusPattern,
    content: Vec<MediaSchema>,
}

struct MediaSchema {
    media_type: String,
    schema: Option<JSONSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Integer,
    Number,
    Boolean,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusPattern {
    Exact(u16),
    Class(u16),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl Contract {
    /// Compiles the contract bundled with this crate.
    pub fn embedded() -> Result<Self, ContractError> {
        Self::from_yaml_str(WALLET_OPENAPI)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Loads `path` when given, otherwise the embedded document.
    pub fn load(path: Option<&Path>) -> Result<Self, ContractError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    /// Parses a YAML (or JSON) OpenAPI 3.x document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ContractError> {
        let document: OpenApiDocument = serde_yaml::from_str(text)?;
        Self::compile(document)
    }

    fn compile(document: OpenApiDocument) -> Result<Self, ContractError> {
        if !document.openapi.starts_with("3.") {
            return Err(ContractError::UnsupportedVersion(document.openapi));
        }

        let components = document.components.unwrap_or_else(|| json!({}));
        let mut operations = Vec::new();

        for (raw_path, item) in &document.paths {
            let template = PathTemplate::parse(raw_path);
            for (method, op) in item.operations() {
                let location = format!("{} {}", method, raw_path);
                let operation = Operation::compile(
                    method,
                    template.clone(),
                    &item.parameters,
                    op,
                    &components,
                    &location,
                )?;
                operations.push(operation);
            }
        }

        tracing::debug!(operations = operations.len(), "contract compiled");
        Ok(Self { operations })
    }

    /// `(method, path template, operationId)` for every declared operation.
    pub fn operations(&self) -> impl Iterator<Item = (&Method, &str, Option<&str>)> {
        self.operations
            .iter()
            .map(|op| (&op.method, op.template.raw.as_str(), op.operation_id.as_deref()))
    }

    /// Checks the request line, path parameters and body.
    pub fn validate_request(&self, request: &RequestParts<'_>) -> Result<(), ValidationFailure> {
        let (operation, params) = self.resolve(request.method, request.path)?;

        let mut errors = Vec::new();
        operation.check_parameters(&params, &mut errors);

        if let Some(body) = &operation.request_body {
            body.check(request.content_type, request.body, &mut errors)?;
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::bad_request(errors))
        }
    }

    /// Checks that the response status is declared and the body matches its
    /// schema. Violations are reported with status 500.
    pub fn validate_response(&self, response: &ResponseParts<'_>) -> Result<(), ValidationFailure> {
        let (operation, _) = self
            .resolve(response.method, response.path)
            .map_err(|failure| ValidationFailure::internal(failure.errors))?;

        let Some(declared) = operation.response_for(response.status) else {
            return Err(ValidationFailure::internal(vec![FieldError::new(
                "/response",
                format!("no response declared for status {}", response.status.as_u16()),
            )
            .with_code("status.openapi.validation")]));
        };

        let mut errors = Vec::new();
        if declared.content.is_empty() {
            if !response.body.is_empty() {
                errors.push(
                    FieldError::new("/response", "response body is not declared for this status")
                        .with_code("body.openapi.validation"),
                );
            }
        } else {
            match find_media(&declared.content, response.content_type) {
                Some(media) => check_json("/response", media, response.body, &mut errors),
                None => errors.push(
                    FieldError::new(
                        "/response",
                        format!(
                            "unsupported media type {}",
                            response.content_type.unwrap_or("(none)")
                        ),
                    )
                    .with_code("content_type.openapi.validation"),
                ),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::internal(errors))
        }
    }

    fn resolve<'p>(
        &self,
        method: &Method,
        path: &'p str,
    ) -> Result<(&Operation, Vec<(&str, &'p str)>), ValidationFailure> {
        let mut path_known = false;
        for operation in &self.operations {
            if let Some(params) = operation.template.matches(path) {
                if &operation.method == method {
                    return Ok((operation, params));
                }
                path_known = true;
            }
        }

        if path_known {
            Err(ValidationFailure::method_not_allowed(method, path))
        } else {
            Err(ValidationFailure::not_found(path))
        }
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.operations().map(|(method, path, _)| format!("{} {}", method, path)))
            .finish()
    }
}

impl Operation {
    fn compile(
        method: Method,
        template: PathTemplate,
        shared_parameters: &[ParameterObject],
        op: &OperationObject,
        components: &Value,
        location: &str,
    ) -> Result<Self, ContractError> {
        // Operation-level parameters override path-level ones with the same name.
        let mut declared: Vec<&ParameterObject> = shared_parameters
            .iter()
            .filter(|p| !op.parameters.iter().any(|o| o.name == p.name && o.location == p.location))
            .collect();
        declared.extend(op.parameters.iter());

        let mut parameters = Vec::new();
        for param in declared {
            if param.location != "path" {
                tracing::debug!(name = %param.name, location = %param.location, "skipping non-path parameter");
                continue;
            }
            let schema = param.schema.clone().unwrap_or_else(|| json!({}));
            parameters.push(PathParameter {
                name: param.name.clone(),
                kind: ScalarKind::of(&schema),
                schema: compile_schema(
                    &schema,
                    components,
                    &format!("{} parameter {}", location, param.name),
                )?,
            });
        }

        let request_body = match &op.request_body {
            Some(body) => Some(RequestBody {
                required: body.required,
                content: compile_content(&body.content, components, location)?,
            }),
            None => None,
        };

        let mut responses = Vec::new();
        for (status, response) in &op.responses {
            let Some(pattern) = StatusPattern::parse(status) else {
                tracing::warn!(%location, %status, "ignoring unparseable response status");
                continue;
            };
            responses.push(Response {
                status: pattern,
                content: compile_content(
                    &response.content,
                    components,
                    &format!("{} response {}", location, status),
                )?,
            });
        }

        Ok(Self {
            method,
            template,
            operation_id: op.operation_id.clone(),
            parameters,
            request_body,
            responses,
        })
    }

    fn check_parameters(&self, values: &[(&str, &str)], errors: &mut Vec<FieldError>) {
        for param in &self.parameters {
            let Some((_, raw)) = values.iter().find(|(name, _)| *name == param.name) else {
                continue;
            };
            let value = param.kind.coerce(raw);
            collect_schema_errors(&format!("/params/{}", param.name), &param.schema, &value, errors);
        }
    }

    fn response_for(&self, status: StatusCode) -> Option<&Response> {
        let code = status.as_u16();
        self.responses
            .iter()
            .find(|r| r.status == StatusPattern::Exact(code))
            .or_else(|| self.responses.iter().find(|r| r.status == StatusPattern::Class(code / 100)))
            .or_else(|| self.responses.iter().find(|r| r.status == StatusPattern::Default))
    }
}

impl RequestBody {
    fn check(
        &self,
        content_type: Option<&str>,
        body: &[u8],
        errors: &mut Vec<FieldError>,
    ) -> Result<(), ValidationFailure> {
        if body.is_empty() {
            if self.required {
                errors.push(
                    FieldError::new("/body", "request body is required")
                        .with_code("required.openapi.validation"),
                );
            }
            return Ok(());
        }

        let media = find_media(&self.content, content_type)
            .ok_or_else(|| ValidationFailure::unsupported_media_type(content_type))?;
        check_json("/body", media, body, errors);
        Ok(())
    }
}

impl ScalarKind {
    fn of(schema: &Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("integer") => ScalarKind::Integer,
            Some("number") => ScalarKind::Number,
            Some("boolean") => ScalarKind::Boolean,
            _ => ScalarKind::String,
        }
    }

    /// Path segments arrive as text. Values that do not parse stay strings
    /// so the schema reports the type mismatch.
    fn coerce(self, raw: &str) -> Value {
        let parsed = match self {
            ScalarKind::Integer => raw.parse::<i64>().map(Value::from).ok(),
            ScalarKind::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ScalarKind::Boolean => raw.parse::<bool>().map(Value::Bool).ok(),
            ScalarKind::String => None,
        };
        parsed.unwrap_or_else(|| Value::String(raw.to_string()))
    }
}

impl StatusPattern {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("default") {
            return Some(StatusPattern::Default);
        }
        if raw.len() == 3 && raw.get(1..).is_some_and(|tail| tail.eq_ignore_ascii_case("XX")) {
            return raw.get(..1)?.parse().ok().map(StatusPattern::Class);
        }
        raw.parse().ok().map(StatusPattern::Exact)
    }
}

impl PathTemplate {
    fn parse(raw: &str) -> Self {
        let segments = split_path(raw)
            .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    fn matches<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.push((name.as_str(), part)),
            }
        }
        Some(params)
    }
}

/// Splits a path into segments. Outer slashes are trimmed the same way the
/// server normalizes a path before routing; empty inner segments are kept so
/// `/wallets//1` matches nothing.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    (!trimmed.is_empty())
        .then(|| trimmed.split('/'))
        .into_iter()
        .flatten()
}

fn compile_content(
    content: &std::collections::BTreeMap<String, MediaTypeObject>,
    components: &Value,
    location: &str,
) -> Result<Vec<MediaSchema>, ContractError> {
    content
        .iter()
        .map(|(media_type, media)| -> Result<MediaSchema, ContractError> {
            let schema = match &media.schema {
                Some(schema) => Some(compile_schema(
                    schema,
                    components,
                    &format!("{} {}", location, media_type),
                )?),
                None => None,
            };
            Ok(MediaSchema {
                media_type: media_type.to_ascii_lowercase(),
                schema,
            })
        })
        .collect()
}

/// Compiles `schema` with the document's components alongside it so that
/// `#/components/...` references resolve.
fn compile_schema(schema: &Value, components: &Value, location: &str) -> Result<JSONSchema, ContractError> {
    let root = json!({
        "allOf": [schema],
        "components": components,
    });
    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft4)
        .compile(&root)
        .map_err(|e| ContractError::Schema {
            location: location.to_string(),
            message: e.to_string(),
        })?;
    Ok(compiled)
}

fn find_media<'c>(content: &'c [MediaSchema], content_type: Option<&str>) -> Option<&'c MediaSchema> {
    let essence = content_type?
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    content
        .iter()
        .find(|media| media.media_type == essence)
        .or_else(|| content.iter().find(|media| media.media_type == "*/*"))
}

fn check_json(prefix: &str, media: &MediaSchema, body: &[u8], errors: &mut Vec<FieldError>) {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            errors.push(FieldError::new(prefix, e.to_string()).with_code("parse.openapi.validation"));
            return;
        }
    };
    if let Some(schema) = &media.schema {
        collect_schema_errors(prefix, schema, &value, errors);
    }
}

fn collect_schema_errors(prefix: &str, schema: &JSONSchema, instance: &Value, errors: &mut Vec<FieldError>) {
    let Err(violations) = schema.validate(instance) else {
        return;
    };

    for violation in violations {
        let mut path = format!("{}{}", prefix, violation.instance_path);
        if let ValidationErrorKind::Required { property } = &violation.kind {
            if let Some(name) = property.as_str() {
                path.push('/');
                path.push_str(name);
            }
        }

        let schema_path = violation.schema_path.to_string();
        let keyword = match schema_path.rsplit('/').next() {
            Some(keyword) if !keyword.is_empty() => keyword,
            _ => "schema",
        };

        errors.push(
            FieldError::new(path, violation.to_string())
                .with_code(format!("{}.openapi.validation", keyword)),
        );
    }
}
