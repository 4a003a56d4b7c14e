//! `@api-ts/io-ts-http`: optionality helpers and the route/request builders.
//!
//! The builders only check shape and hand the object back; the route layer
//! reads `path`, `method`, `request` and `response` out of it.
use indexmap::IndexSet;

use super::{Registry, first_arg, object_arg};
use crate::error::Error;
use crate::ir::{Schema, SchemaKind};

const MODULE: &str = "@api-ts/io-ts-http";

const REQUEST_KEYS: [&str; 4] = ["params", "query", "headers", "body"];

pub(super) fn register(r: &mut Registry) {
    r.register(MODULE, "optional", |_, args| {
        Ok(Schema::union(vec![first_arg("optional", args)?, Schema::undefined()]))
    });
    // properties wrapped in `optional` lose `required` in the optimizer
    for name in ["optionalize", "optionalized"] {
        r.register(MODULE, name, move |deref, args| {
            let props = first_arg(name, args)?;
            let (properties, _, meta) = object_arg(name, deref, &props)?;
            let mut out = Schema::closed_object(properties);
            out.meta = meta;
            Ok(out)
        });
    }

    r.register(MODULE, "httpRequest", |deref, args| {
        let props = first_arg("httpRequest", args)?;
        let (properties, _, meta) = object_arg("httpRequest", deref, &props)?;
        if let Some(key) = properties.keys().find(|k| !REQUEST_KEYS.contains(&k.as_str())) {
            return Err(Error::malformed(
                "httpRequest",
                format!("unexpected key `{key}`, expected one of {}", REQUEST_KEYS.join(", ")),
            ));
        }
        let mut out = Schema::closed_object(properties);
        out.meta = meta;
        Ok(out)
    });

    r.register(MODULE, "httpRoute", |deref, args| {
        let props = first_arg("httpRoute", args)?;
        let (properties, required, meta) = object_arg("httpRoute", deref, &props)?;
        for key in ["path", "method"] {
            let is_string_literal = matches!(
                properties.get(key).map(|s| &s.kind),
                Some(SchemaKind::Primitive { enum_: Some(values), .. }) if values.len() == 1
            );
            if !is_string_literal {
                let reason = format!("`{key}` must be a string literal");
                return Err(Error::malformed("httpRoute", reason));
            }
        }
        for key in ["request", "response"] {
            if !properties.contains_key(key) {
                return Err(Error::malformed("httpRoute", format!("missing `{key}`")));
            }
        }
        let mut out = Schema::object(properties, required);
        out.meta = meta;
        Ok(out)
    });

    r.register(MODULE, "apiSpec", |deref, args| {
        let routes = first_arg("apiSpec", args)?;
        let (properties, _, meta) = object_arg("apiSpec", deref, &routes)?;
        let mut out = Schema::object(properties, IndexSet::new());
        out.meta = meta;
        Ok(out)
    });
}
