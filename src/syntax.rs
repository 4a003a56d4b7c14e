//! Front end for the TypeScript subset that codec modules are written in.
//!
//! Only value-level structure survives parsing: imports, exports, variable
//! and function declarations, and expressions. Type-level syntax (type
//! aliases, interfaces, annotations, `as` casts, type arguments) is skipped.
pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, LexerError, Token, TokenKind};
pub use parser::{ParseError, Parser};

/// Byte range plus the 1-based position of its first character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    /// Template literal with `${...}` substitutions (plain templates lex as `Str`).
    Template,
    Regex,
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<Prop>),
    Function(Box<Function>),
    Spread(Box<Expr>),
    Unary {
        op: String,
        arg: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub kind: PropKind,
    /// Doc block between the previous property and this key.
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKind {
    KeyValue { key: PropKey, value: Expr },
    Shorthand(String),
    Spread(Expr),
    Method(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(String),
    Str(String),
    Num(f64),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<String>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    /// `() => expr`
    Expr(Expr),
    /// `{ return expr; }` and nothing else
    Return(Expr),
    /// any other block
    Block,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import(Import),
    Decl(Decl),
    Export(Export),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub source: String,
    pub bindings: Vec<ImportBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportBinding {
    Default(String),
    Namespace(String),
    Named { imported: String, local: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub init: Option<Expr>,
    pub exported: bool,
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    /// `export { local as exported } [from 'source']`
    Named {
        specifiers: Vec<(String, String)>,
        source: Option<String>,
    },
    /// `export * [as alias] from 'source'`
    All {
        source: String,
        alias: Option<String>,
    },
}

impl ExprKind {
    /// Human-readable node kind for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            ExprKind::Str(_) => "string literal",
            ExprKind::Num(_) => "number literal",
            ExprKind::Bool(_) => "boolean literal",
            ExprKind::Null => "null literal",
            ExprKind::Template => "template literal with substitutions",
            ExprKind::Regex => "regular expression literal",
            ExprKind::Ident(_) => "identifier",
            ExprKind::Member { .. } => "member expression",
            ExprKind::Index { .. } => "computed member expression",
            ExprKind::Call { .. } => "call expression",
            ExprKind::New { .. } => "new expression",
            ExprKind::Array(_) => "array literal",
            ExprKind::Object(_) => "object literal",
            ExprKind::Function(_) => "function expression",
            ExprKind::Spread(_) => "spread element",
            ExprKind::Unary { .. } => "unary expression",
            ExprKind::Binary { .. } => "binary expression",
            ExprKind::Conditional { .. } => "conditional expression",
        }
    }
}

impl Function {
    /// The expression a zero-parameter function returns, if it has exactly one.
    pub fn single_return(&self) -> Option<&Expr> {
        if !self.params.is_empty() {
            return None;
        }
        match &self.body {
            FunctionBody::Expr(e) | FunctionBody::Return(e) => Some(e),
            FunctionBody::Block => None,
        }
    }
}

impl PropKey {
    pub fn as_name(&self) -> Option<String> {
        match self {
            PropKey::Ident(s) | PropKey::Str(s) => Some(s.clone()),
            PropKey::Num(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            PropKey::Num(n) => Some(n.to_string()),
            PropKey::Computed(_) => None,
        }
    }
}

/// Lex and parse one source file.
pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}
