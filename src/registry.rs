//! Known-combinator registry: `(module, exportedName)` → pure function over
//! already-evaluated argument schemas.
//!
//! A miss is not an error. It only tells the evaluator the callee is not a
//! known combinator so it can fall back to a reference.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::ir::{Meta, Schema, SchemaKind};

mod io_ts;
mod io_ts_http;
mod io_ts_types;

/// Force-expands a `reference` argument. Anything else comes back as is.
pub trait Deref {
    fn deref(&self, schema: &Schema) -> Result<Schema>;
}

pub type CombinatorFn = dyn Fn(&dyn Deref, Vec<Schema>) -> Result<Schema> + Send + Sync;

#[derive(Clone)]
pub struct Combinator {
    pub module: String,
    pub name: String,
    f: Arc<CombinatorFn>,
}

#[derive(Debug, Error)]
#[error("no combinator `{name}` registered for module `{module}`")]
pub struct UnknownCombinator {
    pub module: String,
    pub name: String,
}

#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<(String, String), Combinator>,
}

impl Combinator {
    pub fn apply(&self, deref: &dyn Deref, args: Vec<Schema>) -> Result<Schema> {
        (self.f)(deref, args)
    }
}

impl fmt::Debug for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Combinator({}#{})", self.module, self.name)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("entries", &self.entries.len()).finish()
    }
}

impl Registry {
    /// Empty registry; every call falls back to references.
    pub fn new() -> Self {
        Self::default()
    }

    /// `io-ts`, `io-ts-types` and `@api-ts/io-ts-http`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        io_ts::register(&mut registry);
        io_ts_types::register(&mut registry);
        io_ts_http::register(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, module: &str, name: &str, f: F)
    where
        F: Fn(&dyn Deref, Vec<Schema>) -> Result<Schema> + Send + Sync + 'static,
    {
        let combinator = Combinator {
            module: module.to_string(),
            name: name.to_string(),
            f: Arc::new(f),
        };
        self.entries.insert((module.to_string(), name.to_string()), combinator);
    }

    /// A combinator that ignores its arguments and always yields `schema`.
    pub fn register_schema(&mut self, module: &str, name: &str, schema: Schema) {
        self.register(module, name, move |_, _| Ok(schema.clone()));
    }

    /// Make `module#name` behave exactly like an already registered combinator.
    pub fn alias(
        &mut self,
        module: &str,
        name: &str,
        target_module: &str,
        target_name: &str,
    ) -> Result<(), UnknownCombinator> {
        let target = self
            .resolve(target_module, target_name)
            .cloned()
            .ok_or_else(|| UnknownCombinator {
                module: target_module.to_string(),
                name: target_name.to_string(),
            })?;
        self.entries.insert(
            (module.to_string(), name.to_string()),
            Combinator {
                module: module.to_string(),
                name: name.to_string(),
                f: target.f,
            },
        );
        Ok(())
    }

    pub fn resolve(&self, module: &str, name: &str) -> Option<&Combinator> {
        self.entries.get(&(module.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ARGUMENT HELPERS
// ————————————————————————————————————————————————————————————————————————————

type ObjectParts = (IndexMap<String, Schema>, IndexSet<String>, Meta);

fn first_arg(combinator: &str, args: Vec<Schema>) -> Result<Schema> {
    args.into_iter()
        .next()
        .ok_or_else(|| Error::malformed(combinator, "expected at least one argument"))
}

/// Dereference and take apart an object argument.
fn object_arg(combinator: &str, deref: &dyn Deref, schema: &Schema) -> Result<ObjectParts> {
    let schema = deref.deref(schema)?;
    match schema.kind {
        SchemaKind::Object { properties, required } => Ok((properties, required, schema.meta)),
        _ => Err(Error::malformed(
            combinator,
            format!("expected an object of codecs, got {}", schema.kind_name()),
        )),
    }
}

/// The `[a, b, ...]` argument union/intersection/tuple take.
fn tuple_arg(combinator: &str, args: Vec<Schema>) -> Result<Vec<Schema>> {
    let first = first_arg(combinator, args)?;
    match first.kind {
        SchemaKind::Tuple(members) => Ok(members),
        _ => Err(Error::malformed(
            combinator,
            format!("expected a single array of codecs, got {}", first.kind_name()),
        )),
    }
}
