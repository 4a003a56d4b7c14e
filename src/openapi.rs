//! Wire serialization: canonical [`Schema`] → OpenAPI schema objects.
use serde_json::{Map, Value, json};

use crate::doc::DocComment;
use crate::ir::{Meta, Schema, SchemaKind};
use crate::worklist::Worklist;

pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// JSDoc tags that map onto schema keywords, and how their value is read.
const TAG_KEYWORDS: &[(&str, TagValue)] = &[
    ("title", TagValue::Text),
    ("example", TagValue::Json),
    ("default", TagValue::Json),
    ("format", TagValue::Text),
    ("pattern", TagValue::Text),
    ("minLength", TagValue::Number),
    ("maxLength", TagValue::Number),
    ("minimum", TagValue::Number),
    ("maximum", TagValue::Number),
    ("minItems", TagValue::Number),
    ("maxItems", TagValue::Number),
    ("deprecated", TagValue::Flag),
    ("readOnly", TagValue::Flag),
    ("writeOnly", TagValue::Flag),
];

#[derive(Debug, Clone, Copy)]
enum TagValue {
    Text,
    /// JSON when it parses, text otherwise
    Json,
    Number,
    Flag,
}

/// Reads component names out of a drained worklist.
pub struct Serializer<'w> {
    worklist: &'w Worklist,
}

impl<'w> Serializer<'w> {
    pub fn new(worklist: &'w Worklist) -> Self {
        Serializer { worklist }
    }

    /// Top-level form: a schema that maps to nothing becomes `{}`.
    pub fn root(&self, schema: &Schema) -> Value {
        self.schema(schema).unwrap_or_else(|| json!({}))
    }

    /// `None` when the schema has no wire form (`undefined`), so the parent
    /// drops the slot.
    pub fn schema(&self, schema: &Schema) -> Option<Value> {
        let mut out = match &schema.kind {
            SchemaKind::Reference { name, origin } => {
                let token = self.worklist.token(name, origin).unwrap_or(name.as_str());
                let reference = json!({ "$ref": format!("{COMPONENTS_PREFIX}{token}") });
                if schema.meta.is_empty() {
                    return Some(reference);
                }
                // never mutate the shared component: wrap it
                json!({ "allOf": [reference] })
            }

            SchemaKind::Primitive { kind, enum_ } => {
                let mut o = json!({ "type": kind.as_str() });
                if let Some(values) = enum_ {
                    o["enum"] = Value::Array(values.iter().map(|v| v.to_json()).collect());
                }
                o
            }

            SchemaKind::Object { properties, required } => {
                let mut props = Map::new();
                for (name, property) in properties {
                    if let Some(value) = self.schema(property) {
                        props.insert(name.clone(), value);
                    }
                }
                let required: Vec<Value> = required
                    .iter()
                    .filter(|name| props.contains_key(name.as_str()))
                    .map(|name| Value::from(name.clone()))
                    .collect();
                let mut o = json!({ "type": "object", "properties": props });
                if !required.is_empty() {
                    o["required"] = Value::Array(required);
                }
                o
            }

            SchemaKind::Array(items) => {
                let items = self.schema(items)?;
                json!({ "type": "array", "items": items })
            }

            SchemaKind::Tuple(members) => {
                let items: Vec<Value> = members.iter().filter_map(|m| self.schema(m)).collect();
                // trailing elided members are optional
                let min_items = members
                    .iter()
                    .rposition(|m| self.schema(m).is_some())
                    .map_or(0, |i| i + 1);
                let mut o = json!({ "type": "array" });
                match items.len() {
                    0 => {}
                    1 => o["items"] = items.into_iter().next().unwrap_or_default(),
                    _ => o["items"] = json!({ "oneOf": items }),
                }
                o["minItems"] = Value::from(min_items);
                o["maxItems"] = Value::from(members.len());
                o
            }

            SchemaKind::Union(members) => match self.members(members).as_slice() {
                [] => return None,
                [single] => wrap_bare_ref(single.clone(), &schema.meta),
                many => json!({ "oneOf": many }),
            },

            SchemaKind::Intersection(members) => match self.members(members).as_slice() {
                [] => return None,
                [single] => wrap_bare_ref(single.clone(), &schema.meta),
                many => json!({ "allOf": many }),
            },

            SchemaKind::Record { codomain, .. } => {
                let codomain = self.schema(codomain)?;
                json!({ "type": "object", "additionalProperties": codomain })
            }

            SchemaKind::Any => json!({}),
            SchemaKind::Undefined => return None,
        };
        apply_meta(&mut out, &schema.meta);
        Some(out)
    }

    fn members(&self, members: &[Schema]) -> Vec<Value> {
        members.iter().filter_map(|m| self.schema(m)).collect()
    }
}

// -------------------- metadata --------------------

/// Siblings of `$ref` are ignored by OpenAPI 3.0, so a bare reference that is
/// about to receive metadata goes under `allOf`.
fn wrap_bare_ref(value: Value, meta: &Meta) -> Value {
    if meta.is_empty() || value.get("$ref").is_none() {
        return value;
    }
    json!({ "allOf": [value] })
}

/// Doc comment first, then explicit annotations (which win on conflict).
fn apply_meta(out: &mut Value, meta: &Meta) {
    let Value::Object(map) = out else { return };
    if let Some(comment) = &meta.comment {
        apply_comment(map, comment);
    }
    for (key, value) in &meta.annotations {
        map.insert(key.clone(), value.clone());
    }
}

fn apply_comment(map: &mut Map<String, Value>, comment: &DocComment) {
    if let Some(text) = comment.full_text() {
        map.insert("description".into(), Value::from(text));
    }
    for (tag, how) in TAG_KEYWORDS {
        let Some(raw) = comment.tag(tag) else { continue };
        let value = match how {
            TagValue::Text => Value::from(raw),
            TagValue::Json => serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw)),
            TagValue::Number => match raw.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => match raw.parse::<f64>() {
                    Ok(f) => Value::from(f),
                    Err(_) => continue,
                },
            },
            TagValue::Flag => Value::Bool(raw != "false"),
        };
        map.insert((*tag).to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Literal, Origin, PrimitiveKind};
    use indexmap::{IndexMap, IndexSet};

    fn serialize(schema: &Schema) -> Value {
        let worklist = Worklist::new();
        Serializer::new(&worklist).root(schema)
    }

    #[test]
    fn primitives_and_enums() {
        assert_eq!(serialize(&Schema::string()), json!({ "type": "string" }));
        let values = vec![Literal::number(1.0), Literal::number(2.5)];
        let e = Schema::enumeration(PrimitiveKind::Number, values);
        assert_eq!(serialize(&e), json!({ "type": "number", "enum": [1, 2.5] }));
        assert_eq!(serialize(&Schema::any()), json!({}));
        assert_eq!(serialize(&Schema::undefined()), json!({}));
    }

    #[test]
    fn objects_drop_unrepresentable_properties() {
        let mut props = IndexMap::new();
        props.insert("a".to_string(), Schema::string());
        props.insert("gone".to_string(), Schema::undefined());
        props.insert("list".to_string(), Schema::array(Schema::undefined()));
        let required: IndexSet<String> = ["a", "gone"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            serialize(&Schema::object(props, required)),
            json!({
                "type": "object",
                "properties": { "a": { "type": "string" } },
                "required": ["a"]
            })
        );
    }

    #[test]
    fn references_use_worklist_tokens() {
        let mut worklist = Worklist::new();
        let origin = Origin::Module("b.ts".into());
        worklist.visit("Foo", &Origin::Module("a.ts".into()));
        worklist.visit("Foo", &origin);
        let serializer = Serializer::new(&worklist);
        assert_eq!(
            serializer.root(&Schema::reference("Foo", origin)),
            json!({ "$ref": "#/components/schemas/Foo_2" })
        );
    }

    #[test]
    fn documented_reference_is_wrapped() {
        let schema = Schema::reference("Foo", Origin::Package("pkg".into()))
            .with_comment(DocComment::parse("Who owns it.\n@deprecated"));
        assert_eq!(
            serialize(&schema),
            json!({
                "allOf": [{ "$ref": "#/components/schemas/Foo" }],
                "description": "Who owns it.",
                "deprecated": true
            })
        );
    }

    #[test]
    fn documented_union_of_one_reference_is_wrapped() {
        let reference = Schema::reference("User", Origin::Module("a.ts".into()));
        let union = Schema::union(vec![reference.clone(), Schema::undefined()])
            .with_comment(DocComment::parse("Maybe a user."));
        let expected = json!({
            "allOf": [{ "$ref": "#/components/schemas/User" }],
            "description": "Maybe a user."
        });
        assert_eq!(serialize(&union), expected);
        let intersection = Schema::intersection(vec![reference.clone()])
            .with_comment(DocComment::parse("Maybe a user."));
        assert_eq!(serialize(&intersection), expected);
        // no metadata, no wrapper
        assert_eq!(
            serialize(&Schema::union(vec![reference, Schema::undefined()])),
            json!({ "$ref": "#/components/schemas/User" })
        );
    }

    #[test]
    fn tags_map_to_keywords() {
        let schema = Schema::string()
            .with_comment(DocComment::parse(
                "Name.\n@example \"bob\"\n@minLength 2\n@pattern ^[a-z]+$\n@maximum nope",
            ))
            .with_annotation("format", "email");
        assert_eq!(
            serialize(&schema),
            json!({
                "type": "string",
                "description": "Name.",
                "example": "bob",
                "pattern": "^[a-z]+$",
                "minLength": 2,
                "format": "email"
            })
        );
    }

    #[test]
    fn containers() {
        let tuple = Schema::tuple(vec![Schema::string(), Schema::number(), Schema::undefined()]);
        assert_eq!(
            serialize(&tuple),
            json!({
                "type": "array",
                "items": { "oneOf": [{ "type": "string" }, { "type": "number" }] },
                "minItems": 2,
                "maxItems": 3
            })
        );
        let record = Schema::record(Some(Schema::string()), Schema::boolean());
        assert_eq!(
            serialize(&record),
            json!({ "type": "object", "additionalProperties": { "type": "boolean" } })
        );
        let union = Schema::union(vec![Schema::string(), Schema::null()]);
        assert_eq!(
            serialize(&union),
            json!({ "oneOf": [{ "type": "string" }, { "type": "null" }] })
        );
    }
}
