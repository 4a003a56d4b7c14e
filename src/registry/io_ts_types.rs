//! `io-ts-types`: string/number encodings of richer values.
//!
//! Each codec is registered both under the package root and under its
//! `io-ts-types/lib/<Name>` deep-import path.
use super::{Registry, first_arg};
use crate::ir::{Literal, PrimitiveKind, Schema};

const MODULE: &str = "io-ts-types";

fn fixed() -> Vec<(&'static str, Schema)> {
    vec![
        ("NumberFromString", Schema::string().with_annotation("format", "number")),
        ("BigIntFromString", Schema::string().with_annotation("format", "number")),
        ("IntFromString", Schema::string().with_annotation("format", "integer")),
        (
            "BooleanFromString",
            Schema::enumeration(
                PrimitiveKind::String,
                vec![Literal::String("true".into()), Literal::String("false".into())],
            ),
        ),
        ("DateFromISOString", Schema::string().with_annotation("format", "date-time")),
        ("DateFromNumber", Schema::number().with_annotation("format", "number")),
        ("DateFromUnixTime", Schema::number().with_annotation("format", "number")),
        ("NonEmptyString", Schema::string().with_annotation("minLength", 1)),
        ("UUID", Schema::string().with_annotation("format", "uuid")),
        ("JsonFromString", Schema::string()),
    ]
}

pub(super) fn register(r: &mut Registry) {
    for (name, schema) in fixed() {
        r.register_schema(MODULE, name, schema.clone());
        r.register_schema(&format!("{MODULE}/lib/{name}"), name, schema);
    }

    let combinators: [(&str, fn(Vec<Schema>) -> crate::error::Result<Schema>); 3] = [
        ("nonEmptyArray", |args| {
            Ok(Schema::array(first_arg("nonEmptyArray", args)?).with_annotation("minItems", 1))
        }),
        ("fromNullable", |args| {
            Ok(Schema::union(vec![first_arg("fromNullable", args)?, Schema::null()]))
        }),
        // the fallback value only matters at decode time
        ("withFallback", |args| first_arg("withFallback", args)),
    ];
    for (name, f) in combinators {
        r.register(MODULE, name, move |_, args| f(args));
        r.register(&format!("{MODULE}/lib/{name}"), name, move |_, args| f(args));
    }
}
