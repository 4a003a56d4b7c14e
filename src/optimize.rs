//! Canonicalization pass run on every component before serialization.
//!
//! Consumes the tree and builds a new one; nothing is shared with the input.
use indexmap::{IndexMap, IndexSet};

use crate::ir::{Meta, PrimitiveKind, Schema, SchemaKind};

/// Post-order rewrite. Idempotent: `optimize(optimize(s)) == optimize(s)`.
pub fn optimize(schema: Schema) -> Schema {
    let Schema { kind, meta } = schema;
    match kind {
        SchemaKind::Array(items) => Schema {
            kind: SchemaKind::Array(Box::new(optimize(*items))),
            meta,
        },
        SchemaKind::Record { domain, codomain } => Schema {
            kind: SchemaKind::Record {
                domain: domain.map(|d| Box::new(optimize(*d))),
                codomain: Box::new(optimize(*codomain)),
            },
            meta,
        },
        SchemaKind::Tuple(members) => Schema {
            kind: SchemaKind::Tuple(members.into_iter().map(optimize).collect()),
            meta,
        },
        SchemaKind::Object { properties, required } => optimize_object(properties, required, meta),
        SchemaKind::Union(members) => optimize_union(members, meta),
        SchemaKind::Intersection(members) => optimize_intersection(members, meta),
        kind @ (SchemaKind::Primitive { .. }
        | SchemaKind::Reference { .. }
        | SchemaKind::Any
        | SchemaKind::Undefined) => Schema { kind, meta },
    }
}

// -------------------- object --------------------

fn optimize_object(
    properties: IndexMap<String, Schema>,
    mut required: IndexSet<String>,
    meta: Meta,
) -> Schema {
    let mut out = IndexMap::with_capacity(properties.len());
    for (name, schema) in properties {
        let schema = optimize(schema);
        match schema.kind {
            // 1) vacuous property
            SchemaKind::Undefined => {
                required.shift_remove(&name);
            }
            // 2) `T | undefined` → optional `T`
            SchemaKind::Union(members) if members.iter().any(Schema::is_undefined) => {
                required.shift_remove(&name);
                let rest: Vec<Schema> = members.into_iter().filter(|m| !m.is_undefined()).collect();
                out.insert(name, collapse_union(rest, schema.meta));
            }
            kind => {
                out.insert(name, Schema { kind, meta: schema.meta });
            }
        }
    }
    let mut object = Schema::object(out, required);
    object.meta = meta;
    object
}

// -------------------- union --------------------

fn optimize_union(members: Vec<Schema>, mut meta: Meta) -> Schema {
    // 1) flatten; a nested union's metadata moves up unless already set
    let mut flat = Vec::with_capacity(members.len());
    for member in members.into_iter().map(optimize) {
        match member.kind {
            SchemaKind::Union(inner) => {
                lift_meta(&mut meta, member.meta);
                flat.extend(inner);
            }
            kind => flat.push(Schema { kind, meta: member.meta }),
        }
    }

    // 2) merge same-kind primitive enumerations
    let mut merged: Vec<Schema> = Vec::with_capacity(flat.len());
    for member in flat {
        let slot = match &member.kind {
            SchemaKind::Primitive { kind, .. } if member.meta.is_empty() => {
                merged.iter_mut().find(|m| m.meta.is_empty() && is_primitive_of(m, kind))
            }
            _ => None,
        };
        match slot {
            Some(existing) => merge_enum(existing, member),
            None => merged.push(member),
        }
    }

    // 3) structural dedup, first occurrence wins
    let mut unique: Vec<Schema> = Vec::with_capacity(merged.len());
    for member in merged {
        if !unique.contains(&member) {
            unique.push(member);
        }
    }

    collapse_union(unique, meta)
}

fn is_primitive_of(schema: &Schema, kind: &PrimitiveKind) -> bool {
    matches!(&schema.kind, SchemaKind::Primitive { kind: k, .. } if k == kind)
}

/// Absorb `other` into `existing`; an enum-less primitive absorbs any enum.
fn merge_enum(existing: &mut Schema, other: Schema) {
    let SchemaKind::Primitive { enum_: slot, .. } = &mut existing.kind else {
        return;
    };
    let SchemaKind::Primitive { enum_: incoming, .. } = other.kind else {
        return;
    };
    match (slot.as_mut(), incoming) {
        (Some(values), Some(more)) => {
            for value in more {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
        _ => *slot = None,
    }
}

/// Zero members → undefined, one member → the member, else a union.
fn collapse_union(mut members: Vec<Schema>, meta: Meta) -> Schema {
    match members.len() {
        0 => with_parent_meta(Schema::undefined(), meta),
        1 => with_parent_meta(members.remove(0), meta),
        _ => Schema { kind: SchemaKind::Union(members), meta },
    }
}

// -------------------- intersection --------------------

fn optimize_intersection(members: Vec<Schema>, meta: Meta) -> Schema {
    if members.is_empty() {
        // rejected by the combinator before it gets here
        return Schema { kind: SchemaKind::Intersection(members), meta };
    }

    let mut flat = Vec::with_capacity(members.len());
    for member in members.into_iter().map(optimize) {
        match member.kind {
            SchemaKind::Intersection(inner) if member.meta.is_empty() && !inner.is_empty() => {
                flat.extend(inner)
            }
            kind => flat.push(Schema { kind, meta: member.meta }),
        }
    }

    // fold every object into the first one, keeping its position
    let mut residual: Vec<Schema> = Vec::with_capacity(flat.len());
    let mut folded: Option<usize> = None;
    for member in flat {
        let Schema { kind, meta: member_meta } = member;
        match (kind, folded) {
            (SchemaKind::Object { properties, required }, Some(at)) => {
                if let SchemaKind::Object {
                    properties: acc,
                    required: acc_required,
                } = &mut residual[at].kind
                {
                    acc.extend(properties);
                    acc_required.extend(required);
                }
            }
            (kind @ SchemaKind::Object { .. }, None) => {
                folded = Some(residual.len());
                residual.push(Schema { kind, meta: member_meta });
            }
            (kind, _) => residual.push(Schema { kind, meta: member_meta }),
        }
    }

    match residual.len() {
        1 => with_parent_meta(residual.remove(0), meta),
        _ => Schema { kind: SchemaKind::Intersection(residual), meta },
    }
}

// -------------------- metadata --------------------

/// First found wins: `inner` only fills what `outer` leaves empty.
fn lift_meta(outer: &mut Meta, inner: Meta) {
    if outer.comment.is_none() {
        outer.comment = inner.comment;
    }
    for (key, value) in inner.annotations {
        outer.annotations.entry(key).or_insert(value);
    }
}

/// The parent's comment wins; otherwise whatever the child already has stays.
fn with_parent_meta(mut child: Schema, parent: Meta) -> Schema {
    if parent.comment.is_some() {
        child.meta.comment = parent.comment;
    }
    child.meta.annotations.extend(parent.annotations);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::DocComment;
    use crate::ir::{Literal, Origin, PrimitiveKind};

    fn obj(props: &[(&str, Schema)], required: &[&str]) -> Schema {
        let properties = props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let required = required.iter().map(|s| s.to_string()).collect();
        Schema::object(properties, required)
    }

    fn string_enum(values: &[&str]) -> Schema {
        Schema::enumeration(
            PrimitiveKind::String,
            values.iter().map(|v| Literal::String(v.to_string())).collect(),
        )
    }

    fn comment(text: &str) -> Option<DocComment> {
        DocComment::parse(text)
    }

    fn samples() -> Vec<Schema> {
        let reference = Schema::reference("R", Origin::Module("m.ts".into()));
        vec![
            Schema::union(vec![]),
            Schema::union(vec![
                Schema::union(vec![Schema::string(), Schema::number()]),
                Schema::string(),
            ]),
            Schema::union(vec![string_enum(&["a"]), Schema::number(), string_enum(&["b", "a"])]),
            Schema::intersection(vec![
                obj(&[("a", Schema::string())], &["a"]),
                reference.clone(),
                obj(&[("b", Schema::union(vec![Schema::number(), Schema::undefined()]))], &["b"]),
            ]),
            obj(
                &[
                    ("gone", Schema::undefined()),
                    (
                        "opt",
                        Schema::union(vec![Schema::string(), Schema::undefined(), Schema::null()]),
                    ),
                    ("nested", Schema::array(Schema::union(vec![reference.clone(), reference]))),
                ],
                &["gone", "opt", "nested"],
            ),
            Schema::tuple(vec![Schema::union(vec![Schema::boolean()]), Schema::undefined()]),
            obj(
                &[(
                    "p",
                    Schema::union(vec![
                        Schema::union(vec![Schema::string(), Schema::undefined()])
                            .with_comment(comment("inner")),
                        Schema::undefined(),
                    ]),
                )],
                &["p"],
            ),
        ]
    }

    #[test]
    fn idempotent() {
        for s in samples() {
            let once = optimize(s);
            assert_eq!(optimize(once.clone()), once);
        }
    }

    #[test]
    fn union_identity() {
        assert_eq!(optimize(Schema::union(vec![])), Schema::undefined());
        let x = obj(&[("a", Schema::string())], &["a"]);
        assert_eq!(optimize(Schema::union(vec![x.clone()])), optimize(x.clone()));
        assert_eq!(
            optimize(Schema::union(vec![x.clone(), x.clone()])),
            optimize(Schema::union(vec![x]))
        );
        assert_eq!(
            optimize(Schema::union(vec![Schema::string(), Schema::string()])),
            Schema::string()
        );
    }

    #[test]
    fn enums_merge_and_plain_primitive_absorbs() {
        let merged = optimize(Schema::union(vec![
            string_enum(&["a"]),
            Schema::number(),
            string_enum(&["b", "a"]),
        ]));
        assert_eq!(merged, Schema::union(vec![string_enum(&["a", "b"]), Schema::number()]));
        let absorbed = optimize(Schema::union(vec![string_enum(&["a"]), Schema::string()]));
        assert_eq!(absorbed, Schema::string());
    }

    #[test]
    fn disjoint_objects_merge_under_intersection() {
        let a = obj(&[("a", Schema::string())], &["a"]);
        let b = obj(&[("b", Schema::number())], &[]);
        let merged = optimize(Schema::intersection(vec![a, b]));
        assert_eq!(merged, obj(&[("a", Schema::string()), ("b", Schema::number())], &["a"]));
    }

    #[test]
    fn intersection_keeps_residual_members() {
        let reference = Schema::reference("R", Origin::Module("m.ts".into()));
        let out = optimize(Schema::intersection(vec![
            obj(&[("a", Schema::string())], &["a"]),
            reference.clone(),
            obj(&[("a", Schema::number())], &[]),
        ]));
        // later property overwrites; required is the union
        assert_eq!(
            out,
            Schema::intersection(vec![obj(&[("a", Schema::number())], &["a"]), reference])
        );
    }

    #[test]
    fn optional_collapses_to_not_required() {
        let out = optimize(obj(
            &[
                ("t", Schema::union(vec![Schema::string(), Schema::undefined()])),
                ("u", Schema::undefined()),
            ],
            &["t", "u"],
        ));
        assert_eq!(out, obj(&[("t", Schema::string())], &[]));
    }

    #[test]
    fn documented_nested_union_is_flattened() {
        let inner = Schema::union(vec![Schema::string(), Schema::undefined()])
            .with_comment(comment("inner"));
        let out = optimize(obj(&[("p", Schema::union(vec![inner, Schema::undefined()]))], &["p"]));
        let expected = obj(&[("p", Schema::string().with_comment(comment("inner")))], &[]);
        assert_eq!(out, expected);

        // the outer comment was found first
        let inner =
            Schema::union(vec![Schema::string(), Schema::number()]).with_comment(comment("inner"));
        let out =
            optimize(Schema::union(vec![inner, Schema::boolean()]).with_comment(comment("outer")));
        assert_eq!(
            out,
            Schema::union(vec![Schema::string(), Schema::number(), Schema::boolean()])
                .with_comment(comment("outer"))
        );
    }

    #[test]
    fn parent_comment_wins_when_collapsing() {
        let inner = Schema::string().with_comment(comment("inner"));
        let out = optimize(Schema::union(vec![inner.clone()]).with_comment(comment("outer")));
        assert_eq!(out.meta.comment, comment("outer"));
        // no parent comment: the member's survives
        let out = optimize(Schema::union(vec![inner]));
        assert_eq!(out.meta.comment, comment("inner"));
    }
}
