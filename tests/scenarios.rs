use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::{IndexMap, IndexSet};
use serde_json::{Value, json};

use codec_openapi::error::Result;
use codec_openapi::eval::Evaluator;
use codec_openapi::ir::{Literal, Origin, PrimitiveKind, Schema};
use codec_openapi::optimize::optimize;
use codec_openapi::resolve::TypeOracle;
use codec_openapi::syntax::Expr;
use codec_openapi::worklist::Worklist;
use codec_openapi::{BuildOptions, Document, DocumentBuilder, Project, Registry};

const ENTRY: &str = "index.ts";
const PRELUDE: &str = "import * as t from 'io-ts';\n";

// ---- helpers ----

fn expand(src: &str, name: &str) -> Schema {
    let project = Project::from_sources([(ENTRY, format!("{PRELUDE}{src}"))]).unwrap();
    let registry = Registry::with_builtins();
    let (schema, _) = Evaluator::new(&project, &registry)
        .expand(name, &Origin::Module(ENTRY.into()))
        .unwrap();
    schema
}

fn build_exports(src: &str, oracle: Option<&dyn TypeOracle>) -> Document {
    let project = Project::from_sources([(ENTRY, format!("{PRELUDE}{src}"))]).unwrap();
    let registry = Registry::with_builtins();
    let options = BuildOptions { include_exports: true, ..Default::default() };
    let mut builder = DocumentBuilder::new(&project, &registry, options);
    if let Some(oracle) = oracle {
        builder = builder.with_oracle(oracle);
    }
    builder.build(ENTRY)
}

fn schemas(doc: &Document) -> &serde_json::Map<String, Value> {
    doc.value["components"]["schemas"].as_object().unwrap()
}

fn object(props: &[(&str, Schema)], required: &[&str]) -> Schema {
    let properties: IndexMap<String, Schema> =
        props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    let required: IndexSet<String> = required.iter().map(|k| k.to_string()).collect();
    Schema::object(properties, required)
}

// ---- scenarios ----

#[test]
fn scenario_a_plain_object() {
    let schema = optimize(expand("const A = t.type({ foo: t.string });", "A"));
    assert_eq!(schema, object(&[("foo", Schema::string())], &["foo"]));
}

#[test]
fn scenario_b_partial_object() {
    let schema = optimize(expand("const B = t.partial({ foo: t.number });", "B"));
    let codec_openapi::ir::SchemaKind::Object { properties, required, .. } = &schema.kind else {
        panic!("expected object, got {schema:?}");
    };
    assert_eq!(properties["foo"], Schema::number());
    assert!(required.is_empty());
}

#[test]
fn scenario_c_union_of_duplicates_collapses() {
    let schema = optimize(expand("const C = t.union([t.string, t.string]);", "C"));
    assert_eq!(schema, Schema::string());
}

#[test]
fn scenario_d_unknown_external_codec_is_a_component() {
    let doc = build_exports(
        "import { Money } from 'money-codecs';\nexport const Price = t.type({ amount: Money });",
        None,
    );
    assert!(doc.is_ok(), "{:?}", doc.diagnostics);
    let schemas = schemas(&doc);
    assert_eq!(
        schemas["Price"]["properties"]["amount"],
        json!({ "$ref": "#/components/schemas/Money" })
    );
    assert_eq!(schemas["Money"], json!({}));
}

#[test]
fn scenario_e_shared_declaration_expands_once() {
    let doc = build_exports(
        "const Shared = t.type({ n: t.number });\n\
         export const Pair = t.type({ left: Shared, right: Shared });",
        None,
    );
    assert!(doc.is_ok(), "{:?}", doc.diagnostics);
    let schemas = schemas(&doc);
    assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["Pair", "Shared"]);
    let pair = &schemas["Pair"]["properties"];
    assert_eq!(pair["left"], json!({ "$ref": "#/components/schemas/Shared" }));
    assert_eq!(pair["left"], pair["right"]);
}

#[test]
fn documented_optional_reference_is_wrapped_in_all_of() {
    let doc = build_exports(
        "export const User = t.type({ id: t.string });\n\
         /** Maybe a user. */\n\
         export const MaybeUser = t.union([User, t.undefined]);",
        None,
    );
    assert!(doc.is_ok(), "{:?}", doc.diagnostics);
    assert_eq!(
        schemas(&doc)["MaybeUser"],
        json!({
            "allOf": [{ "$ref": "#/components/schemas/User" }],
            "description": "Maybe a user."
        })
    );
}

#[test]
fn shared_external_reference_is_described_once() {
    struct Counting(AtomicUsize);

    impl TypeOracle for Counting {
        fn infer(&self, _: &Expr, _: &str) -> Result<Schema> {
            Ok(Schema::any())
        }

        fn external(&self, package: &str, name: &str) -> Option<Result<Schema>> {
            assert_eq!((package, name), ("money-codecs", "Money"));
            self.0.fetch_add(1, Ordering::SeqCst);
            Some(Ok(Schema::string().with_annotation("format", "decimal")))
        }
    }

    let oracle = Counting(AtomicUsize::new(0));
    let doc = build_exports(
        "import { Money } from 'money-codecs';\n\
         export const A = t.type({ a: Money, b: Money });\n\
         export const B = t.array(Money);",
        Some(&oracle),
    );
    assert!(doc.is_ok(), "{:?}", doc.diagnostics);
    assert_eq!(oracle.0.load(Ordering::SeqCst), 1);
    assert_eq!(schemas(&doc)["Money"], json!({ "type": "string", "format": "decimal" }));
}

// ---- properties ----

#[test]
fn union_identities() {
    assert_eq!(optimize(Schema::union(vec![])), Schema::undefined());
    assert_eq!(optimize(Schema::union(vec![Schema::number()])), Schema::number());
    let x = Schema::array(Schema::string());
    assert_eq!(
        optimize(Schema::union(vec![x.clone(), x.clone()])),
        optimize(Schema::union(vec![x]))
    );
}

#[test]
fn optimize_is_idempotent_on_evaluated_codecs() {
    let src = "const Base = t.type({ id: t.string });\n\
               const A = t.intersection([\n\
                 Base,\n\
                 t.partial({ note: t.union([t.string, t.undefined]) }),\n\
                 t.type({ kind: t.union([t.literal('a'), t.literal('b'), t.literal('a')]) }),\n\
               ]);";
    let once = optimize(expand(src, "A"));
    assert_eq!(optimize(once.clone()), once);
}

#[test]
fn intersection_of_disjoint_objects_merges() {
    let schema = optimize(expand(
        "const A = t.intersection([t.type({ a: t.string }), t.partial({ b: t.number })]);",
        "A",
    ));
    let codec_openapi::ir::SchemaKind::Object { properties, required, .. } = &schema.kind else {
        panic!("expected object, got {schema:?}");
    };
    assert_eq!(properties.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(required.iter().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn optional_properties_collapse() {
    let schema = optimize(object(
        &[("x", Schema::union(vec![Schema::integer(), Schema::undefined()]))],
        &["x"],
    ));
    assert_eq!(schema, object(&[("x", Schema::integer())], &[]));
}

#[test]
fn reference_tokens_are_deterministic() {
    let mut worklist = Worklist::new();
    let origin = Origin::Module(ENTRY.into());
    let first = worklist.visit("User", &origin);
    let second = worklist.visit("User", &origin);
    assert_eq!(first, second);
    assert_eq!(worklist.take_next(), Some(("User".to_string(), origin)));
    assert_eq!(worklist.take_next(), None);
}

#[test]
fn string_literal_unions_merge_into_one_enum() {
    let schema = optimize(expand("const K = t.union([t.literal('a'), t.literal('b')]);", "K"));
    assert_eq!(
        schema,
        Schema::enumeration(
            PrimitiveKind::String,
            vec![Literal::String("a".into()), Literal::String("b".into())]
        )
    );
}
