//! Interfaces the evaluator consumes: symbol resolution and the optional
//! type-driven fallback.
use crate::error::{Error, Result};
use crate::ir::Schema;
use crate::syntax::{Expr, Span};

/// A declaration found in the analyzed tree.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    /// Name in the defining module (not the importing alias).
    pub name: &'a str,
    pub module: &'a str,
    pub init: &'a Expr,
    pub doc: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub enum Namespace {
    Module(String),
    Package(String),
}

#[derive(Debug, Clone)]
pub enum Resolved<'a> {
    Declaration(Declaration<'a>),
    /// Export of a package outside the analyzed tree.
    External { package: String, name: String },
    Namespace(Namespace),
}

pub trait SymbolResolver: Sync {
    /// Resolve `name` as seen from inside `module`: local declarations first,
    /// then imports.
    fn resolve(&self, name: &str, module: &str) -> Result<Resolved<'_>>;

    /// Resolve what `module` exports under `name`, following re-exports.
    fn resolve_export(&self, module: &str, name: &str) -> Result<Resolved<'_>>;

    /// Source text for diagnostics.
    fn source_text(&self, module: &str, span: Span) -> Option<&str>;

    /// `namespace.name` as seen from `module`.
    fn resolve_member(&self, namespace: &str, name: &str, module: &str) -> Result<Resolved<'_>> {
        match self.resolve(namespace, module)? {
            Resolved::Namespace(Namespace::Module(target)) => self.resolve_export(&target, name),
            Resolved::Namespace(Namespace::Package(package)) => Ok(Resolved::External {
                package,
                name: name.to_string(),
            }),
            _ => Err(Error::unsupported(format!("member `{name}` of non-namespace `{namespace}`"))),
        }
    }
}

/// Full static-type inference, owned by the host. Only consulted for
/// expressions the evaluator cannot decompose, and for package exports no
/// combinator describes.
pub trait TypeOracle: Sync {
    fn infer(&self, expr: &Expr, module: &str) -> Result<Schema>;

    /// Schema for an external package export; `None` when unknown.
    fn external(&self, _package: &str, _name: &str) -> Option<Result<Schema>> {
        None
    }
}
