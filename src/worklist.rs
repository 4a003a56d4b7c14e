//! Deferred reference expansion.
//!
//! `visit` hands out a stable component name before anything is expanded,
//! so recursive and shared codecs terminate and are expanded exactly once.
use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::ir::{Origin, Schema, SchemaKind};

#[derive(Debug, Default)]
pub struct Worklist {
    /// `(name, location)` → component name, in discovery order.
    seen: IndexMap<(String, Origin), String>,
    taken: HashSet<String>,
    queue: VecDeque<(String, Origin)>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Component name for `(name, origin)`; queues it the first time.
    pub fn visit(&mut self, name: &str, origin: &Origin) -> String {
        let key = (name.to_string(), origin.clone());
        if let Some(token) = self.seen.get(&key) {
            return token.clone();
        }
        let token = self.fresh_token(name);
        self.taken.insert(token.clone());
        self.seen.insert(key.clone(), token.clone());
        self.queue.push_back(key);
        token
    }

    pub fn take_next(&mut self) -> Option<(String, Origin)> {
        self.queue.pop_front()
    }

    /// Name already assigned to `(name, origin)`, if visited.
    pub fn token(&self, name: &str, origin: &Origin) -> Option<&str> {
        self.seen.get(&(name.to_string(), origin.clone())).map(String::as_str)
    }

    /// Visit every reference inside `schema`.
    pub fn visit_all(&mut self, schema: &Schema) {
        match &schema.kind {
            SchemaKind::Reference { name, origin } => {
                self.visit(name, origin);
            }
            SchemaKind::Array(items) => self.visit_all(items),
            SchemaKind::Object { properties, .. } => {
                properties.values().for_each(|s| self.visit_all(s))
            }
            SchemaKind::Record { domain, codomain } => {
                if let Some(domain) = domain {
                    self.visit_all(domain);
                }
                self.visit_all(codomain);
            }
            SchemaKind::Union(members)
            | SchemaKind::Intersection(members)
            | SchemaKind::Tuple(members) => {
                members.iter().for_each(|s| self.visit_all(s))
            }
            SchemaKind::Primitive { .. } | SchemaKind::Any | SchemaKind::Undefined => {}
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn fresh_token(&self, name: &str) -> String {
        // component keys are restricted to [A-Za-z0-9._-]
        let base: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if !self.taken.contains(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or(base)
    }
}
