//! Core `io-ts` codecs and combinators.
use indexmap::IndexSet;

use super::{Registry, first_arg, object_arg, tuple_arg};
use crate::error::Error;
use crate::ir::{Literal, PrimitiveKind, Schema, SchemaKind};

const MODULE: &str = "io-ts";

pub(super) fn register(r: &mut Registry) {
    // ---- leaf codecs ----
    r.register_schema(MODULE, "string", Schema::string());
    r.register_schema(MODULE, "number", Schema::number());
    r.register_schema(MODULE, "bigint", Schema::integer());
    r.register_schema(MODULE, "Int", Schema::integer());
    r.register_schema(MODULE, "boolean", Schema::boolean());
    r.register_schema(MODULE, "null", Schema::null());
    r.register_schema(MODULE, "nullType", Schema::null());
    r.register_schema(MODULE, "undefined", Schema::undefined());
    r.register_schema(MODULE, "void", Schema::undefined());
    r.register_schema(MODULE, "unknown", Schema::any());
    r.register_schema(MODULE, "any", Schema::any());
    let unknown_record = Schema::record(Some(Schema::string()), Schema::any());
    r.register_schema(MODULE, "UnknownRecord", unknown_record);
    r.register_schema(MODULE, "UnknownArray", Schema::array(Schema::any()));

    // ---- object builders ----
    for name in ["type", "strict"] {
        r.register(MODULE, name, move |deref, args| {
            let props = first_arg(name, args)?;
            let (properties, _, meta) = object_arg(name, deref, &props)?;
            let mut out = Schema::closed_object(properties);
            out.meta = meta;
            Ok(out)
        });
    }
    r.register(MODULE, "partial", |deref, args| {
        let props = first_arg("partial", args)?;
        let (properties, _, meta) = object_arg("partial", deref, &props)?;
        let mut out = Schema::object(properties, IndexSet::new());
        out.meta = meta;
        Ok(out)
    });
    for name in ["exact", "readonly"] {
        r.register(MODULE, name, move |_, args| first_arg(name, args));
    }

    // ---- containers ----
    for name in ["array", "readonlyArray"] {
        r.register(MODULE, name, move |_, args| Ok(Schema::array(first_arg(name, args)?)));
    }
    r.register(MODULE, "record", |_, args| {
        let mut args = args.into_iter();
        let domain = args.next();
        let codomain = args
            .next()
            .ok_or_else(|| Error::malformed("record", "a codomain codec is required"))?;
        Ok(Schema::record(domain, codomain))
    });
    r.register(MODULE, "tuple", |_, args| Ok(Schema::tuple(tuple_arg("tuple", args)?)));

    // ---- composition ----
    r.register(MODULE, "union", |_, args| Ok(Schema::union(tuple_arg("union", args)?)));
    r.register(MODULE, "intersection", |_, args| {
        let members = tuple_arg("intersection", args)?;
        if members.is_empty() {
            return Err(Error::malformed("intersection", "no members to intersect"));
        }
        Ok(Schema::intersection(members))
    });

    // ---- values ----
    r.register(MODULE, "literal", |_, args| {
        let value = first_arg("literal", args)?;
        match &value.kind {
            SchemaKind::Primitive { enum_: Some(values), .. } if values.len() == 1 => Ok(value),
            _ => Err(Error::malformed(
                "literal",
                format!("expected a literal value, got {}", value.kind_name()),
            )),
        }
    });
    r.register(MODULE, "keyof", |deref, args| {
        let keys = first_arg("keyof", args)?;
        let (properties, _, meta) = object_arg("keyof", deref, &keys)?;
        if properties.is_empty() {
            return Err(Error::malformed("keyof", "object has no keys"));
        }
        let values = properties.into_keys().map(Literal::String).collect();
        let mut out = Schema::enumeration(PrimitiveKind::String, values);
        out.meta = meta;
        Ok(out)
    });
    // the refinement predicate and brand name carry no shape
    r.register(MODULE, "brand", |_, args| first_arg("brand", args));
}
