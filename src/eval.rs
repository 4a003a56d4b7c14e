//! Codec expression evaluator.
//!
//! Interprets one expression as a [`Schema`] by treating calls and member
//! accesses as a combinator language. Declarations inside the analyzed tree
//! become deferred references; the worklist expands them later.
use std::cell::RefCell;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::doc::DocComment;
use crate::error::{At, Error, Result, Unrepresentable};
use crate::ir::{Literal, Origin, Schema, SchemaKind};
use crate::registry::{Combinator, Deref, Registry};
use crate::resolve::{Declaration, Namespace, Resolved, SymbolResolver, TypeOracle};
use crate::syntax::{Expr, ExprKind, Function, Prop, PropKind, Span};

/// Alias chains longer than this are treated as cycles.
const MAX_ALIAS_DEPTH: usize = 64;

/// Longest source excerpt carried in diagnostics.
const EXCERPT_LEN: usize = 80;

/// What a callee or bare identifier turned out to be.
#[derive(Debug)]
enum Target<'a> {
    Combinator(&'a Combinator),
    Declaration(Declaration<'a>),
    External { package: String, name: String },
    Namespace(Namespace),
}

pub struct Evaluator<'a> {
    resolver: &'a dyn SymbolResolver,
    registry: &'a Registry,
    oracle: Option<&'a dyn TypeOracle>,
    /// References currently being expanded, innermost last.
    expanding: RefCell<Vec<(String, Origin)>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(resolver: &'a dyn SymbolResolver, registry: &'a Registry) -> Self {
        Evaluator {
            resolver,
            registry,
            oracle: None,
            expanding: RefCell::new(Vec::new()),
        }
    }

    pub fn with_oracle(mut self, oracle: &'a dyn TypeOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    // ————————————————————————————————————————————————————————————————————————
    // ENTRY POINTS
    // ————————————————————————————————————————————————————————————————————————

    /// Evaluate `expr` as written in `module`. Fatal errors carry the location
    /// of the innermost failing sub-expression.
    pub fn evaluate(&self, expr: &Expr, module: &str) -> Result<Schema> {
        self.eval(expr, module).map_err(|e| e.at(self.locate(expr.span, module)))
    }

    /// Expand a reference to its declaration's schema plus the declaration's
    /// doc comment.
    pub fn expand(&self, name: &str, origin: &Origin) -> Result<(Schema, Option<DocComment>)> {
        self.guarded(name, origin, || self.expand_unguarded(name, origin))
    }

    fn expand_unguarded(
        &self,
        name: &str,
        origin: &Origin,
    ) -> Result<(Schema, Option<DocComment>)> {
        match origin {
            Origin::Module(module) => match self.resolver.resolve(name, module)? {
                Resolved::Declaration(decl) => {
                    trace!(name = decl.name, module = decl.module, "expanding declaration");
                    let schema = self.evaluate(decl.init, decl.module)?;
                    Ok((schema, decl.doc.and_then(DocComment::parse)))
                }
                Resolved::External { package, name } => {
                    self.expand_unguarded(&name, &Origin::Package(package))
                }
                Resolved::Namespace(_) => {
                    Err(Error::unsupported(format!("namespace `{name}` used as a codec")))
                }
            },
            Origin::Package(package) => {
                let external = self.oracle.and_then(|oracle| oracle.external(package, name));
                match external {
                    Some(result) => result.map(|schema| (schema, None)),
                    // no type information: the component exists but says nothing
                    None => Ok((Schema::any(), None)),
                }
            }
        }
    }

    fn guarded<T>(&self, name: &str, origin: &Origin, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let key = (name.to_string(), origin.clone());
        if self.expanding.borrow().contains(&key) {
            return Err(Error::CircularDefinition {
                name: name.to_string(),
                module: origin.to_string(),
            });
        }
        self.expanding.borrow_mut().push(key);
        let result = f();
        self.expanding.borrow_mut().pop();
        result
    }

    // ————————————————————————————————————————————————————————————————————————
    // DECISION PROCEDURE
    // ————————————————————————————————————————————————————————————————————————

    fn eval(&self, expr: &Expr, module: &str) -> Result<Schema> {
        match &expr.kind {
            ExprKind::Str(s) => Ok(Schema::literal(Literal::String(s.clone()))),
            ExprKind::Num(n) => Ok(Schema::literal(Literal::number(*n))),
            ExprKind::Bool(b) => Ok(Schema::literal(Literal::Boolean(*b))),
            ExprKind::Null => Ok(Schema::literal(Literal::Null)),
            ExprKind::Ident(name) if name == "undefined" && self.is_global(name, module) => {
                Ok(Schema::undefined())
            }
            ExprKind::Unary { op, .. } if op == "void" => {
                Err(Error::unrepresentable(Unrepresentable::Undefined))
            }
            ExprKind::Array(elements) => {
                let members = elements
                    .iter()
                    .map(|e| self.eval_member(e, module))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Schema::tuple(members))
            }
            ExprKind::Object(props) => self.eval_object(props, module),
            ExprKind::Ident(_) | ExprKind::Member { .. } => self.eval_reference(expr, module),
            ExprKind::Call { callee, args } => self.eval_call(expr, callee, args, module),
            ExprKind::Function(function) => self.eval_function(function, module),
            _ => self.fallback(expr, module),
        }
    }

    /// Step 6: nothing structural matched.
    fn fallback(&self, expr: &Expr, module: &str) -> Result<Schema> {
        match self.oracle {
            Some(oracle) => oracle.infer(expr, module),
            None => Err(Error::unsupported(expr.kind.describe())),
        }
    }

    /// Tuple/argument element: an elided `undefined` stays as a marker.
    fn eval_member(&self, expr: &Expr, module: &str) -> Result<Schema> {
        if let ExprKind::Spread(_) = expr.kind {
            return self.fallback(expr, module);
        }
        match self.evaluate(expr, module) {
            Err(e) if e.is_unrepresentable_undefined() => Ok(Schema::undefined()),
            other => other,
        }
    }

    fn eval_function(&self, function: &Function, module: &str) -> Result<Schema> {
        match function.single_return() {
            Some(body) => self.evaluate(body, module),
            // refinement predicates, factories and statement bodies carry no shape
            None => Ok(Schema::any()),
        }
    }

    fn eval_reference(&self, expr: &Expr, module: &str) -> Result<Schema> {
        if self.is_symbol_access(expr, module) {
            return Err(Error::unrepresentable(Unrepresentable::Symbol));
        }
        match self.resolve_target(expr, module, 0)? {
            Target::Combinator(combinator) => self.apply(combinator, Vec::new()),
            Target::Declaration(decl) => {
                Ok(Schema::reference(decl.name, Origin::Module(decl.module.to_string())))
            }
            Target::External { package, name } => {
                Ok(Schema::reference(name, Origin::Package(package)))
            }
            Target::Namespace(_) => Err(Error::unsupported("namespace used as a codec")),
        }
    }

    fn eval_call(&self, expr: &Expr, callee: &Expr, args: &[Expr], module: &str) -> Result<Schema> {
        if self.is_symbol_access(callee, module) {
            return Err(Error::unrepresentable(Unrepresentable::Symbol));
        }
        let target = match &callee.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } => self.resolve_target(callee, module, 0)?,
            // immediately invoked `(() => codec)()`
            ExprKind::Function(function) => {
                return match function.single_return() {
                    Some(body) => self.evaluate(body, module),
                    None => self.fallback(expr, module),
                };
            }
            _ => return self.fallback(expr, module),
        };
        // arguments must evaluate even when the callee ends up as a reference
        let args = args
            .iter()
            .map(|arg| self.eval_arg(arg, module))
            .collect::<Result<Vec<_>>>()?;
        match target {
            Target::Combinator(combinator) => self.apply(combinator, args),
            Target::Declaration(decl) => {
                if let ExprKind::Function(function) = &decl.init.kind {
                    if let Some(body) = function.single_return() {
                        return self.evaluate(body, decl.module);
                    }
                }
                Ok(Schema::reference(decl.name, Origin::Module(decl.module.to_string())))
            }
            Target::External { package, name } => {
                Ok(Schema::reference(name, Origin::Package(package)))
            }
            Target::Namespace(_) => Err(Error::unsupported("call of a namespace")),
        }
    }

    fn eval_arg(&self, arg: &Expr, module: &str) -> Result<Schema> {
        match &arg.kind {
            ExprKind::Function(function) if !function.params.is_empty() => Ok(Schema::any()),
            _ => self.eval_member(arg, module),
        }
    }

    fn apply(&self, combinator: &Combinator, args: Vec<Schema>) -> Result<Schema> {
        trace!(
            module = %combinator.module,
            name = %combinator.name,
            args = args.len(),
            "applying combinator"
        );
        combinator.apply(self, args)
    }

    // ---- object literals ----

    fn eval_object(&self, props: &[Prop], module: &str) -> Result<Schema> {
        let mut properties: IndexMap<String, Schema> = IndexMap::new();
        let mut required: IndexSet<String> = IndexSet::new();

        for prop in props {
            match &prop.kind {
                PropKind::KeyValue { key, value } => {
                    let Some(name) = key.as_name() else {
                        let at = self.locate(prop.span, module);
                        return Err(Error::unsupported("computed property key").at(at));
                    };
                    match self.evaluate(value, module) {
                        Ok(schema) => {
                            let comment = prop.doc.as_deref().and_then(DocComment::parse);
                            properties.insert(name.clone(), schema.with_comment(comment));
                            required.insert(name);
                        }
                        Err(e) if e.is_unrepresentable_undefined() => {
                            properties.shift_remove(&name);
                            required.shift_remove(&name);
                        }
                        Err(e) => return Err(e),
                    }
                }
                PropKind::Shorthand(name) => {
                    let target = Expr {
                        kind: ExprKind::Ident(name.clone()),
                        span: prop.span,
                    };
                    self.spread_into(&target, module, &mut properties, &mut required)?;
                }
                PropKind::Spread(target) => {
                    self.spread_into(target, module, &mut properties, &mut required)?;
                }
                PropKind::Method(name) => {
                    return Err(Error::unsupported(format!("method `{name}` in object literal"))
                        .at(self.locate(prop.span, module)));
                }
            }
        }
        Ok(Schema::object(properties, required))
    }

    /// Merge another object's properties: later keys overwrite, and the later
    /// writer decides whether the key is required.
    fn spread_into(
        &self,
        target: &Expr,
        module: &str,
        properties: &mut IndexMap<String, Schema>,
        required: &mut IndexSet<String>,
    ) -> Result<()> {
        let schema = self.evaluate(target, module)?;
        let schema = self.deref(&schema).map_err(|e| e.at(self.locate(target.span, module)))?;
        let SchemaKind::Object { properties: more, required: more_required } = schema.kind else {
            let reason = format!("spread of {} (expected an object)", schema.kind_name());
            return Err(Error::unsupported(reason).at(self.locate(target.span, module)));
        };
        for (key, value) in more {
            if more_required.contains(&key) {
                required.insert(key.clone());
            } else {
                required.shift_remove(&key);
            }
            properties.insert(key, value);
        }
        Ok(())
    }

    // ————————————————————————————————————————————————————————————————————————
    // CALLEE RESOLUTION
    // ————————————————————————————————————————————————————————————————————————

    fn resolve_target(&self, expr: &Expr, module: &str, depth: usize) -> Result<Target<'a>> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(Error::unsupported("alias chain too deep"));
        }
        match &expr.kind {
            ExprKind::Ident(name) => {
                let resolved = self.resolver.resolve(name, module)?;
                self.classify(resolved, depth)
            }
            ExprKind::Member { object, property } => {
                match self.resolve_target(object, module, depth + 1)? {
                    Target::Namespace(Namespace::Module(target)) => {
                        let resolved = self.resolver.resolve_export(&target, property)?;
                        self.classify(resolved, depth)
                    }
                    Target::Namespace(Namespace::Package(package)) => self.classify(
                        Resolved::External {
                            package,
                            name: property.clone(),
                        },
                        depth,
                    ),
                    _ => Err(Error::unsupported(format!("member `.{property}` of a codec value"))),
                }
            }
            kind => Err(Error::unsupported(kind.describe())),
        }
    }

    fn classify(&self, resolved: Resolved<'a>, depth: usize) -> Result<Target<'a>> {
        match resolved {
            Resolved::Declaration(decl) => {
                // `const string = t.string` and `export default Foo` are
                // followed; anything else stays a named component
                if matches!(decl.init.kind, ExprKind::Ident(_) | ExprKind::Member { .. }) {
                    if let Ok(target) = self.resolve_target(decl.init, decl.module, depth + 1) {
                        let follow = match &target {
                            Target::Combinator(_) | Target::Namespace(_) => true,
                            Target::Declaration(_) | Target::External { .. } => {
                                decl.name == "default"
                            }
                        };
                        if follow {
                            return Ok(target);
                        }
                    }
                }
                Ok(Target::Declaration(decl))
            }
            Resolved::External { package, name } => match self.registry.resolve(&package, &name) {
                Some(combinator) => Ok(Target::Combinator(combinator)),
                None => Ok(Target::External { package, name }),
            },
            Resolved::Namespace(namespace) => Ok(Target::Namespace(namespace)),
        }
    }

    // ---- globals ----

    /// True when `name` is not shadowed by anything in scope.
    fn is_global(&self, name: &str, module: &str) -> bool {
        matches!(self.resolver.resolve(name, module), Err(Error::UnknownIdentifier { .. }))
    }

    /// `Symbol`, `Symbol.iterator`, `Symbol.for`, when `Symbol` is the global.
    fn is_symbol_access(&self, expr: &Expr, module: &str) -> bool {
        match &expr.kind {
            ExprKind::Ident(name) => name == "Symbol" && self.is_global(name, module),
            ExprKind::Member { object, .. } => self.is_symbol_access(object, module),
            _ => false,
        }
    }

    fn locate(&self, span: Span, module: &str) -> At {
        let text = self
            .resolver
            .source_text(module, span)
            .and_then(|text| text.lines().next())
            .map(|line| {
                let line = line.trim();
                match line.char_indices().nth(EXCERPT_LEN) {
                    Some((cut, _)) => format!("{}...", &line[..cut]),
                    None => line.to_string(),
                }
            })
            .unwrap_or_default();
        At {
            module: module.to_string(),
            line: span.line,
            col: span.col,
            text,
        }
    }
}

impl Deref for Evaluator<'_> {
    fn deref(&self, schema: &Schema) -> Result<Schema> {
        let SchemaKind::Reference { name, origin } = &schema.kind else {
            return Ok(schema.clone());
        };
        let mut out = self.guarded(name, origin, || {
            let (expanded, _) = self.expand_unguarded(name, origin)?;
            // follow `const A = B` chains while `A` is still marked
            self.deref(&expanded)
        })?;
        if schema.meta.comment.is_some() {
            out.meta.comment = schema.meta.comment.clone();
        }
        out.meta
            .annotations
            .extend(schema.meta.annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrimitiveKind;
    use crate::project::Project;

    const ENTRY: &str = "index.ts";

    fn project(sources: &[(&str, &str)]) -> Project {
        Project::from_sources(sources.iter().copied()).expect("load failed")
    }

    fn expand_in(project: &Project, name: &str) -> Result<Schema> {
        let registry = Registry::with_builtins();
        Evaluator::new(project, &registry)
            .expand(name, &Origin::Module(ENTRY.into()))
            .map(|(schema, _)| schema)
    }

    fn expand(src: &str, name: &str) -> Result<Schema> {
        expand_in(&project(&[(ENTRY, src)]), name)
    }

    fn props(schema: &Schema) -> (&IndexMap<String, Schema>, &IndexSet<String>) {
        match &schema.kind {
            SchemaKind::Object { properties, required } => (properties, required),
            other => panic!("expected object, got {other:?}"),
        }
    }

    const PRELUDE: &str = "import * as t from 'io-ts';\n";

    #[test]
    fn object_of_primitives() {
        let src = format!("{PRELUDE}const A = t.type({{ foo: t.string, n: t.number }});");
        let schema = expand(&src, "A").unwrap();
        let (properties, required) = props(&schema);
        assert_eq!(properties["foo"], Schema::string());
        assert_eq!(properties["n"], Schema::number());
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn local_declarations_become_references() {
        let src = format!(
            "{PRELUDE}const Id = t.string;\n\
             const Named = t.type({{ x: t.number }});\n\
             const A = t.type({{ id: Id, other: Named }});"
        );
        let schema = expand(&src, "A").unwrap();
        let (properties, _) = props(&schema);
        // `Id` is a pure alias of a combinator, so it evaluates in place
        assert_eq!(properties["id"], Schema::string());
        assert_eq!(properties["other"], Schema::reference("Named", Origin::Module(ENTRY.into())));
    }

    #[test]
    fn unknown_external_combinator_falls_back_to_reference() {
        let src = format!(
            "{PRELUDE}import {{ Money }} from 'money-codecs';\n\
             const A = t.type({{ price: Money, other: Money(2) }});"
        );
        let schema = expand(&src, "A").unwrap();
        let (properties, _) = props(&schema);
        let expected = Schema::reference("Money", Origin::Package("money-codecs".into()));
        assert_eq!(properties["price"], expected);
        assert_eq!(properties["other"], expected);
    }

    #[test]
    fn literals_and_property_docs() {
        let src = format!(
            "{PRELUDE}const A = t.type({{\n\
             \x20 /** The kind. */\n\
             \x20 kind: t.literal('a'),\n\
             \x20 n: t.literal(3),\n\
             }});"
        );
        let schema = expand(&src, "A").unwrap();
        let (properties, _) = props(&schema);
        let kind = &properties["kind"];
        assert_eq!(kind.kind, Schema::literal(Literal::String("a".into())).kind);
        let summary = kind.meta.comment.as_ref().and_then(|c| c.summary.as_deref());
        assert_eq!(summary, Some("The kind."));
        assert_eq!(properties["n"].kind, Schema::literal(Literal::number(3.0)).kind);
    }

    #[test]
    fn spreads_merge_with_later_writer_winning() {
        let src = format!(
            "{PRELUDE}const Base = {{ a: t.string, b: t.string }};\n\
             const Opt = t.partial({{ b: t.number }});\n\
             const A = t.type({{ ...Base, ...Opt }});\n\
             const B = {{ Base }};"
        );
        let schema = expand(&src, "A").unwrap();
        let (properties, required) = props(&schema);
        assert_eq!(properties["b"], Schema::number());
        // `type` marks every key required again
        assert!(required.contains("b"));

        let raw = format!(
            "{PRELUDE}const Opt = t.partial({{ b: t.number }});\n\
             const X = {{ a: t.string, ...Opt }};"
        );
        let raw = expand(&raw, "X").unwrap();
        let (_, required) = props(&raw);
        assert!(required.contains("a") && !required.contains("b"));

        // shorthand merges the named object the same way
        let shorthand = expand(&src, "B").unwrap();
        assert_eq!(props(&shorthand).0.len(), 2);
    }

    #[test]
    fn spread_of_non_object_fails() {
        let src = format!("{PRELUDE}const S = t.string;\nconst A = {{ ...S }};");
        let err = expand(&src, "A").unwrap_err();
        assert!(matches!(err, Error::UnsupportedExpression { .. }), "{err}");
    }

    #[test]
    fn unsupported_expression_reports_location() {
        let err = expand(&format!("{PRELUDE}const A = t.type({{ x: 1 + 2 }});"), "A").unwrap_err();
        match err {
            Error::UnsupportedExpression { kind, at: Some(at) } => {
                assert_eq!(kind, "binary expression");
                assert_eq!((at.line, at.col), (2, 23));
                assert_eq!(at.text, "1 + 2");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unresolved_identifier_is_fatal() {
        let src = format!("{PRELUDE}const A = t.type({{ x: Missing }});");
        let err = expand(&src, "A").unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier { name, .. } if name == "Missing"));
    }

    #[test]
    fn function_inlining_and_fallbacks() {
        let src = format!(
            "{PRELUDE}const make = () => t.string;\n\
             function build(x: number) {{ return t.number; }}\n\
             const A = t.type({{\n\
             \x20 a: make(),\n\
             \x20 b: build(1),\n\
             \x20 c: t.brand(t.number, (n) => n > 0, 'Positive'),\n\
             }});"
        );
        let schema = expand(&src, "A").unwrap();
        let (properties, _) = props(&schema);
        assert_eq!(properties["a"], Schema::string());
        assert_eq!(properties["b"], Schema::reference("build", Origin::Module(ENTRY.into())));
        assert_eq!(properties["c"], Schema::number());
    }

    #[test]
    fn void_removes_property_and_symbols_are_fatal() {
        let src = format!("{PRELUDE}const A = {{ a: t.string, gone: void 0 }};");
        let schema = expand(&src, "A").unwrap();
        assert_eq!(props(&schema).0.len(), 1);
        let tuple = expand(&format!("{PRELUDE}const T = [t.string, void 0];"), "T").unwrap();
        assert_eq!(tuple, Schema::tuple(vec![Schema::string(), Schema::undefined()]));
        let src = format!("{PRELUDE}const A = t.union([t.string, Symbol('x')]);");
        let err = expand(&src, "A").unwrap_err();
        match err {
            Error::Unrepresentable { kind: Unrepresentable::Symbol, at: Some(at) } => {
                assert_eq!((at.line, at.col), (2, 30));
                assert_eq!(at.text, "Symbol('x')");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arguments_of_unknown_calls_are_still_evaluated() {
        let money = format!("{PRELUDE}import {{ Money }} from 'money-codecs';\n");
        let src = format!("{money}const A = t.type({{ a: Money(1 + 2) }});");
        let err = expand(&src, "A").unwrap_err();
        let kind = match &err {
            Error::UnsupportedExpression { kind, .. } => kind.as_str(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(kind, "binary expression");

        let src = format!("{money}const A = t.type({{ a: Money(Missing) }});");
        let err = expand(&src, "A").unwrap_err();
        let missing = matches!(&err, Error::UnknownIdentifier { name, .. } if name == "Missing");
        assert!(missing, "{err}");

        let src = format!(
            "{PRELUDE}function build(x: number) {{ return t.number; }}\n\
             const A = t.type({{ b: build(1 + 2) }});"
        );
        assert!(expand(&src, "A").is_err());
    }

    #[test]
    fn keyof_through_reference_and_cross_module_namespace() {
        let p = project(&[
            (
                ENTRY,
                "import * as codecs from './codecs';\n\
                 import * as t from 'io-ts';\n\
                 const K = t.keyof(codecs.Keys);",
            ),
            ("codecs.ts", "import * as t from 'io-ts';\nexport const Keys = { x: null, y: null };"),
        ]);
        let schema = expand_in(&p, "K").unwrap();
        assert_eq!(
            schema,
            Schema::enumeration(
                PrimitiveKind::String,
                vec![Literal::String("x".into()), Literal::String("y".into())]
            )
        );
    }

    #[test]
    fn self_dereference_is_circular() {
        let err = expand(&format!("{PRELUDE}const A = t.partial(A);"), "A").unwrap_err();
        assert!(matches!(err, Error::CircularDefinition { name, .. } if name == "A"));
        // recursion through a reference is fine
        let src = format!("{PRELUDE}const Tree = t.type({{ children: t.array(Tree) }});");
        let ok = expand(&src, "Tree").unwrap();
        let (properties, _) = props(&ok);
        let tree = Schema::reference("Tree", Origin::Module(ENTRY.into()));
        assert_eq!(properties["children"], Schema::array(tree));
    }

    #[test]
    fn oracle_is_consulted_last() {
        struct Fixed;
        impl TypeOracle for Fixed {
            fn infer(&self, _: &Expr, _: &str) -> Result<Schema> {
                Ok(Schema::boolean())
            }
        }
        let p = project(&[(ENTRY, "const A = { x: a === b };")]);
        let registry = Registry::with_builtins();
        let ev = Evaluator::new(&p, &registry).with_oracle(&Fixed);
        let (schema, _) = ev.expand("A", &Origin::Module(ENTRY.into())).unwrap();
        assert_eq!(props(&schema).0["x"], Schema::boolean());
    }

    #[test]
    fn external_references_expand_to_any_without_oracle() {
        let p = project(&[(ENTRY, "")]);
        let (schema, doc) = expand_in_origin(&p, "Money", Origin::Package("money-codecs".into()));
        assert_eq!(schema, Schema::any());
        assert!(doc.is_none());
    }

    fn expand_in_origin(p: &Project, name: &str, origin: Origin) -> (Schema, Option<DocComment>) {
        let registry = Registry::with_builtins();
        Evaluator::new(p, &registry).expand(name, &origin).unwrap()
    }
}
