//! Document build: roots → worklist drain → optimize → serialize.
//!
//! Each call to [`DocumentBuilder::build`] owns its own worklist and
//! evaluator, so builds for different entry files can run in parallel over
//! the same project.
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::Error;
use crate::eval::Evaluator;
use crate::ir::{Origin, Schema};
use crate::openapi::Serializer;
use crate::optimize::optimize;
use crate::project::Project;
use crate::registry::Registry;
use crate::resolve::{Declaration, TypeOracle};
use crate::route::{self, Operation};
use crate::syntax::ExprKind;
use crate::worklist::Worklist;

pub const OPENAPI_VERSION: &str = "3.0.3";

/// Name of the combinator whose declarations are document roots.
const API_SPEC: &str = "apiSpec";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Info {
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub info: Info,
    /// Also emit every exported codec of the entry module as a component.
    pub include_exports: bool,
}

/// First fatal error of one independent root (a route or a component).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub root: String,
    pub error: Error,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub entry: String,
    pub value: Value,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DocumentBuilder<'a> {
    project: &'a Project,
    registry: &'a Registry,
    oracle: Option<&'a dyn TypeOracle>,
    options: BuildOptions,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.root, self.error)
    }
}

impl Document {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(project: &'a Project, registry: &'a Registry, options: BuildOptions) -> Self {
        DocumentBuilder { project, registry, oracle: None, options }
    }

    pub fn with_oracle(mut self, oracle: &'a dyn TypeOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn build(&self, entry: &str) -> Document {
        let mut ev = Evaluator::new(self.project, self.registry);
        if let Some(oracle) = self.oracle {
            ev = ev.with_oracle(oracle);
        }
        let mut worklist = Worklist::new();
        let mut diagnostics = Vec::new();

        // 1) roots
        let mut operations: Vec<Operation> = Vec::new();
        for decl in self.project.exported_declarations(entry) {
            if is_api_spec(&decl) {
                self.read_spec(&ev, &decl, &mut operations, &mut diagnostics);
            } else if self.options.include_exports {
                worklist.visit(decl.name, &Origin::Module(decl.module.to_string()));
            }
        }
        for operation in &operations {
            operation.schemas().for_each(|s| worklist.visit_all(s));
        }

        // 2) expand every reachable component exactly once
        let mut components: IndexMap<String, Schema> = IndexMap::new();
        while let Some((name, origin)) = worklist.take_next() {
            let token = worklist.token(&name, &origin).unwrap_or(name.as_str()).to_string();
            debug!(component = %token, %origin, "expanding component");
            match ev.expand(&name, &origin) {
                Ok((schema, doc)) => {
                    let schema = optimize(schema.with_comment(doc));
                    worklist.visit_all(&schema);
                    components.insert(token, schema);
                }
                Err(error) => {
                    warn!(component = %token, %error, "component failed");
                    diagnostics.push(Diagnostic { root: token, error });
                }
            }
        }

        // 3) serialize
        let serializer = Serializer::new(&worklist);
        let mut paths: IndexMap<String, Map<String, Value>> = IndexMap::new();
        for operation in &operations {
            paths
                .entry(operation.path.clone())
                .or_default()
                .insert(operation.method.clone(), operation.to_wire(&serializer));
        }
        components.sort_keys();
        let schemas: Map<String, Value> = components
            .iter()
            .map(|(name, schema)| (name.clone(), serializer.root(schema)))
            .collect();

        let value = json!({
            "openapi": OPENAPI_VERSION,
            "info": self.info_value(entry),
            "paths": paths,
            "components": { "schemas": schemas },
        });
        Document {
            entry: entry.to_string(),
            value,
            diagnostics,
        }
    }

    fn read_spec(
        &self,
        ev: &Evaluator<'_>,
        decl: &Declaration<'_>,
        operations: &mut Vec<Operation>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let routes = ev
            .evaluate(decl.init, decl.module)
            .and_then(|spec| route::read_api_spec(ev, &spec));
        let routes = match routes {
            Ok(routes) => routes,
            Err(error) => {
                warn!(root = decl.name, %error, "api spec failed");
                diagnostics.push(Diagnostic { root: decl.name.to_string(), error });
                return;
            }
        };
        for route in routes {
            match route.outcome {
                Ok(Some(operation)) => {
                    debug!(
                        key = %route.key,
                        path = %operation.path,
                        method = %operation.method,
                        "route"
                    );
                    operations.push(operation);
                }
                Ok(None) => debug!(key = %route.key, "private route omitted"),
                Err(error) => {
                    warn!(key = %route.key, %error, "route failed");
                    diagnostics.push(Diagnostic { root: route.key, error });
                }
            }
        }
    }

    fn info_value(&self, entry: &str) -> Value {
        let info = &self.options.info;
        let mut out = json!({
            "title": info.title.clone().unwrap_or_else(|| entry.to_string()),
            "version": info.version.clone().unwrap_or_else(|| "0.0.0".to_string()),
        });
        if let Some(description) = &info.description {
            out["description"] = Value::from(description.clone());
        }
        out
    }
}

/// `export const Api = apiSpec({...})`, `h.apiSpec(...)` included.
fn is_api_spec(decl: &Declaration<'_>) -> bool {
    let ExprKind::Call { callee, .. } = &decl.init.kind else {
        return false;
    };
    match &callee.kind {
        ExprKind::Ident(name) => name == API_SPEC,
        ExprKind::Member { property, .. } => property == API_SPEC,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = r#"
import * as t from 'io-ts';
import * as h from '@api-ts/io-ts-http';

/** A user. */
const User = t.type({ id: t.string, name: t.string });

/**
 * Fetch one user.
 *
 * Looks the user up by id.
 * @tag users
 */
const GetUser = h.httpRoute({
  path: '/users/:id',
  method: 'GET',
  request: h.httpRequest({
    params: { id: t.string },
    query: { verbose: h.optional(t.boolean) },
  }),
  response: { 200: User, 404: t.type({ message: t.string }) },
});

/** @private */
const Hidden = h.httpRoute({
  path: '/hidden',
  method: 'POST',
  request: h.httpRequest({ body: User }),
  response: { 204: t.undefined },
});

export const Api = h.apiSpec({
  'api.v1.user': { get: GetUser },
  'api.v1.hidden': { post: Hidden },
});
"#;

    fn build(sources: &[(&str, &str)], options: BuildOptions) -> Document {
        let project = Project::from_sources(sources.iter().copied()).unwrap();
        let registry = Registry::with_builtins();
        DocumentBuilder::new(&project, &registry, options).build("index.ts")
    }

    #[test]
    fn routes_become_operations() {
        let doc = build(&[("index.ts", ROUTES)], BuildOptions::default());
        assert!(doc.is_ok(), "{:?}", doc.diagnostics);
        let op = &doc.value["paths"]["/users/{id}"]["get"];
        assert_eq!(op["operationId"], "api.v1.user");
        assert_eq!(op["summary"], "Fetch one user.");
        assert_eq!(op["description"], "Looks the user up by id.");
        assert_eq!(op["tags"], json!(["users"]));
        assert_eq!(
            op["parameters"],
            json!([
                { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
                {
                    "name": "verbose",
                    "in": "query",
                    "required": false,
                    "schema": { "type": "boolean" }
                }
            ])
        );
        assert_eq!(
            op["responses"]["200"],
            json!({
                "description": "OK",
                "content": {
                    "application/json": { "schema": { "$ref": "#/components/schemas/User" } }
                }
            })
        );
        let not_found = &op["responses"]["404"]["content"]["application/json"]["schema"];
        assert_eq!(not_found["required"], json!(["message"]));
        assert!(doc.value["paths"].get("/hidden").is_none());
        assert_eq!(
            doc.value["components"]["schemas"]["User"],
            json!({
                "type": "object",
                "properties": { "id": { "type": "string" }, "name": { "type": "string" } },
                "required": ["id", "name"],
                "description": "A user."
            })
        );
    }

    #[test]
    fn failing_route_does_not_abort_the_document() {
        let src = r#"
import * as t from 'io-ts';
import * as h from '@api-ts/io-ts-http';
const Ok = h.httpRoute({ path: '/ok', method: 'GET', request: h.httpRequest({}), response: { 200: t.string } });
const Broken = h.httpRoute({ path: '/broken', method: 'GET', request: h.httpRequest({}), response: { 200: Nope } });
export const Api = h.apiSpec({ ok: { get: Ok }, broken: { get: Broken } });
"#;
        let doc = build(&[("index.ts", src)], BuildOptions::default());
        assert_eq!(doc.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics[0].root, "broken.get");
        assert!(matches!(doc.diagnostics[0].error, Error::UnknownIdentifier { .. }));
        assert!(doc.value["paths"]["/ok"]["get"].is_object());
    }

    #[test]
    fn exports_become_components_when_asked() {
        let src = "import * as t from 'io-ts';\n\
                   export const B = t.type({ a: A });\n\
                   const A = t.number;\n\
                   export const C = t.string;";
        let options = BuildOptions {
            info: Info {
                title: Some("Demo".into()),
                version: Some("1.2.3".into()),
                description: None,
            },
            include_exports: true,
        };
        let doc = build(&[("index.ts", src)], options);
        assert_eq!(doc.value["info"], json!({ "title": "Demo", "version": "1.2.3" }));
        let schemas = doc.value["components"]["schemas"].as_object().unwrap();
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["B", "C"]);
        assert_eq!(schemas["B"]["properties"]["a"], json!({ "type": "number" }));
    }
}
