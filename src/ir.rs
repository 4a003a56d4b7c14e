//! Schema IR shared by the evaluator, worklist, optimizer and serializer.
//!
//! Pure data: constructors and structural equality. Everything here is built
//! bottom-up and never mutated after it leaves the producer.

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde::Deserialize;

use crate::doc::DocComment;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

/// One enumeration value. Floats are wrapped so literals compare and hash totally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    String(String),
    Number(OrderedFloat<f64>),
    Boolean(bool),
    Null,
}

/// Where a reference points: a module inside the analyzed tree, or an
/// external package specifier that only the host can describe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    Module(String),
    Package(String),
}

/// Carried through untouched; only the serializer reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub comment: Option<DocComment>,
    /// Passthrough wire keywords (title, format, minLength, ...).
    pub annotations: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    Primitive {
        kind: PrimitiveKind,
        enum_: Option<Vec<Literal>>,
    },
    Array(Box<Schema>),
    Object {
        /// Declaration order is kept for deterministic output.
        properties: IndexMap<String, Schema>,
        required: IndexSet<String>,
    },
    Record {
        domain: Option<Box<Schema>>,
        codomain: Box<Schema>,
    },
    Union(Vec<Schema>),
    Intersection(Vec<Schema>),
    Tuple(Vec<Schema>),
    Reference {
        name: String,
        origin: Origin,
    },
    Any,
    Undefined,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl Meta {
    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.annotations.is_empty()
    }
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self { kind, meta: Meta::default() }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(SchemaKind::Primitive { kind, enum_: None })
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn number() -> Self {
        Self::primitive(PrimitiveKind::Number)
    }

    pub fn integer() -> Self {
        Self::primitive(PrimitiveKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveKind::Boolean)
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null)
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn undefined() -> Self {
        Self::new(SchemaKind::Undefined)
    }

    /// A primitive constrained to exactly one value.
    pub fn literal(lit: Literal) -> Self {
        let kind = lit.kind();
        Self::new(SchemaKind::Primitive { kind, enum_: Some(vec![lit]) })
    }

    pub fn enumeration(kind: PrimitiveKind, values: Vec<Literal>) -> Self {
        Self::new(SchemaKind::Primitive { kind, enum_: Some(values) })
    }

    pub fn array(items: Schema) -> Self {
        Self::new(SchemaKind::Array(Box::new(items)))
    }

    /// Builds an object, dropping any required name that has no property so
    /// `required ⊆ keys(properties)` holds for every emitted object.
    pub fn object(properties: IndexMap<String, Schema>, required: IndexSet<String>) -> Self {
        let required = required
            .into_iter()
            .filter(|name| properties.contains_key(name))
            .collect();
        Self::new(SchemaKind::Object { properties, required })
    }

    /// Object whose every property is required.
    pub fn closed_object(properties: IndexMap<String, Schema>) -> Self {
        let required = properties.keys().cloned().collect();
        Self::new(SchemaKind::Object { properties, required })
    }

    pub fn record(domain: Option<Schema>, codomain: Schema) -> Self {
        Self::new(SchemaKind::Record {
            domain: domain.map(Box::new),
            codomain: Box::new(codomain),
        })
    }

    pub fn union(members: Vec<Schema>) -> Self {
        Self::new(SchemaKind::Union(members))
    }

    pub fn intersection(members: Vec<Schema>) -> Self {
        Self::new(SchemaKind::Intersection(members))
    }

    pub fn tuple(members: Vec<Schema>) -> Self {
        Self::new(SchemaKind::Tuple(members))
    }

    pub fn reference(name: impl Into<String>, origin: Origin) -> Self {
        Self::new(SchemaKind::Reference { name: name.into(), origin })
    }

    pub fn with_comment(mut self, comment: Option<DocComment>) -> Self {
        if comment.is_some() {
            self.meta.comment = comment;
        }
        self
    }

    pub fn with_annotation(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.meta.annotations.insert(key.to_string(), value.into());
        self
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, SchemaKind::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::Primitive { .. } => "primitive",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Union(_) => "union",
            SchemaKind::Intersection(_) => "intersection",
            SchemaKind::Tuple(_) => "tuple",
            SchemaKind::Reference { .. } => "reference",
            SchemaKind::Any => "any",
            SchemaKind::Undefined => "undefined",
        }
    }
}

impl Literal {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Literal::String(_) => PrimitiveKind::String,
            Literal::Number(_) => PrimitiveKind::Number,
            Literal::Boolean(_) => PrimitiveKind::Boolean,
            Literal::Null => PrimitiveKind::Null,
        }
    }

    pub fn number(n: f64) -> Self {
        Literal::Number(OrderedFloat(n))
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Literal::String(s) => Value::from(s.clone()),
            Literal::Number(n) => {
                let f = n.0;
                // prefer integer JSON where it is exact
                if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
                    Value::from(f as i64)
                } else {
                    Value::from(f)
                }
            }
            Literal::Boolean(b) => Value::from(*b),
            Literal::Null => Value::Null,
        }
    }
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Null => "null",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Module(m) => write!(f, "{m}"),
            Origin::Package(p) => write!(f, "package `{p}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_constructor_drops_dangling_required() {
        let mut props = IndexMap::new();
        props.insert("a".to_string(), Schema::string());
        let required: IndexSet<String> = ["a", "ghost"].iter().map(|s| s.to_string()).collect();
        let SchemaKind::Object { required, .. } = Schema::object(props, required).kind else {
            panic!("expected object");
        };
        assert_eq!(required.len(), 1);
        assert!(required.contains("a"));
    }

    #[test]
    fn equality_is_structural() {
        let foo = || Schema::reference("Foo", Origin::Module("a.ts".into()));
        let a = Schema::union(vec![Schema::string(), foo()]);
        let b = Schema::union(vec![Schema::string(), foo()]);
        assert_eq!(a, b);
        assert_ne!(a, Schema::union(vec![Schema::string()]));
    }

    #[test]
    fn integral_number_literals_serialize_as_integers() {
        assert_eq!(Literal::number(3.0).to_json(), serde_json::json!(3));
        assert_eq!(Literal::number(1.5).to_json(), serde_json::json!(1.5));
    }
}
