//! `--jq-expr` post-processing of a finished document.
use anyhow::{Context, Result, anyhow};
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`, one JSON value per filter output.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(format_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let mut it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    while let Some(item) = it.next() {
        let v = item.map_err(|e| anyhow!(format!("{e:?}")))?;
        // Val: Display -> JSON text
        let text = format!("{v}");
        let value = serde_json::from_str(&text)
            .with_context(|| format!("jq produced non-JSON output: {text}"))?;
        out.push(value);
    }
    Ok(out)
}

/// Apply a filter to a whole document: a single output replaces it, several
/// outputs are collected into an array.
pub fn post_process(filter_src: &str, document: &Value) -> Result<Value> {
    let mut outputs = run_jaq(filter_src, document)?;
    Ok(match outputs.len() {
        1 => outputs.remove(0),
        _ => Value::Array(outputs),
    })
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(s)
}

fn format_undefined_errors(
    errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>,
) -> anyhow::Error {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!("undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    anyhow!(s)
}
