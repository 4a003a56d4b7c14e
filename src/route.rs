//! Route layer: reads `apiSpec` / `httpRoute` / `httpRequest` objects and
//! turns them into OpenAPI operations.
use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use crate::doc::DocComment;
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::ir::{Literal, Schema, SchemaKind};
use crate::openapi::Serializer;
use crate::optimize::optimize;
use crate::registry::Deref;

const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub path: String,
    /// Lowercase HTTP method.
    pub method: String,
    pub operation_id: String,
    pub comment: Option<DocComment>,
    pub parameters: Vec<Parameter>,
    pub body: Option<Schema>,
    /// Status code → response body.
    pub responses: IndexMap<String, Schema>,
}

/// One `apiSpec` entry; routes fail independently of each other.
#[derive(Debug)]
pub struct RouteResult {
    /// `<operationKey>.<method>`
    pub key: String,
    /// `Ok(None)` for routes tagged `@private`.
    pub outcome: Result<Option<Operation>>,
}

// ————————————————————————————————————————————————————————————————————————————
// READING
// ————————————————————————————————————————————————————————————————————————————

/// Split an evaluated `apiSpec({...})` into routes.
pub fn read_api_spec(ev: &Evaluator<'_>, spec: &Schema) -> Result<Vec<RouteResult>> {
    let spec = ev.deref(spec)?;
    let SchemaKind::Object { properties, .. } = spec.kind else {
        let reason = format!("expected an object, got {}", spec.kind_name());
        return Err(Error::malformed("apiSpec", reason));
    };

    let mut out = Vec::new();
    for (operation_key, methods) in properties {
        let methods = match ev.deref(&methods) {
            Ok(m) => m,
            Err(e) => {
                out.push(RouteResult { key: operation_key, outcome: Err(e) });
                continue;
            }
        };
        let SchemaKind::Object { properties: methods, .. } = methods.kind else {
            out.push(RouteResult {
                key: operation_key,
                outcome: Err(Error::malformed("apiSpec", "each entry must map methods to routes")),
            });
            continue;
        };
        for (method, route) in methods {
            out.push(RouteResult {
                key: format!("{operation_key}.{method}"),
                outcome: read_route(ev, &operation_key, route),
            });
        }
    }
    Ok(out)
}

fn read_route(ev: &Evaluator<'_>, operation_key: &str, route: Schema) -> Result<Option<Operation>> {
    let (route, comment) = deref_with_doc(ev, route)?;
    if comment.as_ref().is_some_and(|c| c.has_tag("private")) {
        return Ok(None);
    }
    let SchemaKind::Object { properties, .. } = route.kind else {
        return Err(Error::malformed("httpRoute", "route must be an object"));
    };

    let path = properties
        .get("path")
        .and_then(string_literal)
        .ok_or_else(|| Error::malformed("httpRoute", "`path` must be a string literal"))?;
    let method = properties
        .get("method")
        .and_then(string_literal)
        .ok_or_else(|| Error::malformed("httpRoute", "`method` must be a string literal"))?
        .to_ascii_lowercase();
    let operation_id = comment
        .as_ref()
        .and_then(|c| c.tag("operationId"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| operation_key.to_string());

    let mut parameters = Vec::new();
    let mut body = None;
    if let Some(request) = properties.get("request") {
        let request = ev.deref(request)?;
        let SchemaKind::Object { properties: parts, .. } = request.kind else {
            return Err(Error::malformed("httpRequest", "request must be an object"));
        };
        for (part, location) in [
            ("params", ParamLocation::Path),
            ("query", ParamLocation::Query),
            ("headers", ParamLocation::Header),
        ] {
            if let Some(schema) = parts.get(part) {
                parameters.extend(read_parameters(ev, schema, location)?);
            }
        }
        body = parts.get("body").cloned().map(optimize);
    }

    let mut responses = IndexMap::new();
    if let Some(response) = properties.get("response") {
        let response = ev.deref(response)?;
        let SchemaKind::Object { properties: by_status, .. } = response.kind else {
            return Err(Error::malformed("httpRoute", "response must map status codes to codecs"));
        };
        for (status, schema) in by_status {
            responses.insert(status, optimize(schema));
        }
    }

    Ok(Some(Operation {
        path: openapi_path(&path),
        method,
        operation_id,
        comment,
        parameters,
        body,
        responses,
    }))
}

fn read_parameters(
    ev: &Evaluator<'_>,
    schema: &Schema,
    location: ParamLocation,
) -> Result<Vec<Parameter>> {
    let schema = optimize(ev.deref(schema)?);
    let SchemaKind::Object { properties, required } = schema.kind else {
        return Err(Error::malformed(
            "httpRequest",
            format!("parameters must be an object of codecs, got {}", schema.kind_name()),
        ));
    };
    Ok(properties
        .into_iter()
        .map(|(name, schema)| Parameter {
            required: location == ParamLocation::Path || required.contains(&name),
            name,
            location,
            schema,
        })
        .collect())
}

/// Dereference a route, keeping the nearest doc comment: the use site first,
/// then the declaration.
fn deref_with_doc(ev: &Evaluator<'_>, schema: Schema) -> Result<(Schema, Option<DocComment>)> {
    let site = schema.meta.comment.clone();
    let SchemaKind::Reference { name, origin } = &schema.kind else {
        return Ok((schema, site));
    };
    let (expanded, declared) = ev.expand(name, origin)?;
    let expanded = ev.deref(&expanded)?;
    let comment = site.or(declared).or_else(|| expanded.meta.comment.clone());
    Ok((expanded, comment))
}

fn string_literal(schema: &Schema) -> Option<String> {
    match &schema.kind {
        SchemaKind::Primitive { enum_: Some(values), .. } => match values.as_slice() {
            [Literal::String(s)] => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// `/users/:id` → `/users/{id}`; `{id}` segments are kept.
fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn reason_phrase(status: &str) -> &'static str {
    match status {
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "301" => "Moved Permanently",
        "302" => "Found",
        "304" => "Not Modified",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "409" => "Conflict",
        "422" => "Unprocessable Entity",
        "429" => "Too Many Requests",
        "500" => "Internal Server Error",
        "502" => "Bad Gateway",
        "503" => "Service Unavailable",
        _ => "Response",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// WIRE FORM
// ————————————————————————————————————————————————————————————————————————————

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
        }
    }
}

impl Operation {
    /// Every schema the operation serializes; their references must be
    /// visited before serialization.
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.parameters
            .iter()
            .map(|p| &p.schema)
            .chain(self.body.iter())
            .chain(self.responses.values())
    }

    pub fn to_wire(&self, serializer: &Serializer<'_>) -> Value {
        let mut op = Map::new();
        if let Some(comment) = &self.comment {
            if let Some(summary) = &comment.summary {
                op.insert("summary".into(), Value::from(summary.clone()));
            }
            if let Some(description) = &comment.description {
                op.insert("description".into(), Value::from(description.clone()));
            }
        }
        op.insert("operationId".into(), Value::from(self.operation_id.clone()));
        let tags: Vec<Value> = self
            .comment
            .iter()
            .flat_map(|c| c.tag_values("tag"))
            .filter(|t| !t.is_empty())
            .map(Value::from)
            .collect();
        if !tags.is_empty() {
            op.insert("tags".into(), Value::Array(tags));
        }

        let parameters: Vec<Value> = self
            .parameters
            .iter()
            .map(|p| p.to_wire(serializer))
            .collect();
        op.insert("parameters".into(), Value::Array(parameters));

        if let Some(body) = self.body.as_ref().and_then(|b| serializer.schema(b)) {
            op.insert(
                "requestBody".into(),
                json!({ "content": { JSON_MEDIA_TYPE: { "schema": body } } }),
            );
        }

        let mut responses = Map::new();
        for (status, schema) in &self.responses {
            let mut response = json!({ "description": reason_phrase(status) });
            if let Some(body) = serializer.schema(schema) {
                response["content"] = json!({ JSON_MEDIA_TYPE: { "schema": body } });
            }
            responses.insert(status.clone(), response);
        }
        op.insert("responses".into(), Value::Object(responses));
        Value::Object(op)
    }
}

impl Parameter {
    fn to_wire(&self, serializer: &Serializer<'_>) -> Value {
        // the description belongs to the parameter, not its schema
        let mut schema = self.schema.clone();
        let comment = schema.meta.comment.take();
        let mut p = json!({
            "name": self.name,
            "in": self.location.as_str(),
            "required": self.required,
            "schema": serializer.root(&schema),
        });
        if let Some(text) = comment.as_ref().and_then(DocComment::full_text) {
            p["description"] = Value::from(text);
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn express_style_paths_are_converted() {
        assert_eq!(openapi_path("/users/:id/posts/{post}"), "/users/{id}/posts/{post}");
        assert_eq!(openapi_path("/"), "/");
    }

    #[test]
    fn only_single_string_literals_count() {
        let get = Schema::literal(Literal::String("GET".into()));
        assert_eq!(string_literal(&get).as_deref(), Some("GET"));
        assert_eq!(string_literal(&Schema::string()), None);
        assert_eq!(string_literal(&Schema::literal(Literal::number(1.0))), None);
    }

    #[test]
    fn unknown_status_has_generic_description() {
        assert_eq!(reason_phrase("404"), "Not Found");
        assert_eq!(reason_phrase("299"), "Response");
    }
}
