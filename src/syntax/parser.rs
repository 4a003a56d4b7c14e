use thiserror::Error;

use super::lexer::{LexerError, Token, TokenKind};
use super::*;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error [{line}:{col}]: {msg}")]
    Error {
        msg: String,
        line: usize,
        col: usize,
    },
    #[error(transparent)]
    Lex(#[from] LexerError),
}

/// Statement keywords a skipped statement never runs into.
const STATEMENT_STARTS: &[&str] = &[
    "import", "export", "const", "let", "var", "function", "type", "interface", "class", "enum",
    "declare", "async", "abstract", "namespace", "module",
];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let end = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span { start: end.end, ..end },
                doc: None,
                newline_before: true,
            });
        }
        Parser { tokens, pos: 0 }
    }

    // ------------------------------ cursor ---------------------------------- //

    fn error(&self, msg: impl Into<String>) -> ParseError {
        let tok = self.current();
        ParseError::Error {
            msg: msg.into(),
            line: tok.span.line,
            col: tok.span.col,
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Punct(q) if *q == p)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(s) if s == w)
    }

    fn peek_is_punct(&self, offset: usize, p: &str) -> bool {
        matches!(&self.peek(offset).kind, TokenKind::Punct(q) if *q == p)
    }

    fn peek_is_word(&self, offset: usize, w: &str) -> bool {
        matches!(&self.peek(offset).kind, TokenKind::Ident(s) if s == w)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.is_word(w) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<Token, ParseError> {
        if self.is_punct(p) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected '{p}', found {:?}", self.current().kind)))
        }
    }

    fn expect_word(&mut self, w: &str) -> Result<Token, ParseError> {
        if self.is_word(w) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected '{w}', found {:?}", self.current().kind)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier, found {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            other => Err(self.error(format!("Expected string literal, found {other:?}"))),
        }
    }

    /// Identifier or string, as used in import/export specifiers.
    fn expect_name(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Str(s) = &self.current().kind {
            let s = s.clone();
            self.advance();
            return Ok(s);
        }
        self.expect_ident()
    }

    fn span_from(&self, start: Span) -> Span {
        let end = if self.pos > 0 { self.tokens[self.pos - 1].span.end } else { start.end };
        Span { end: end.max(start.start), ..start }
    }

    // ----------------------------- statements ------------------------------ //

    pub fn parse(&mut self) -> Result<Module, ParseError> {
        let mut items = Vec::new();
        while !self.is_eof() {
            self.parse_statement(&mut items)?;
        }
        Ok(Module { items })
    }

    fn parse_statement(&mut self, items: &mut Vec<Item>) -> Result<(), ParseError> {
        let doc = self.current().doc.clone();
        if self.eat_punct(";") {
            return Ok(());
        }
        let TokenKind::Ident(word) = &self.current().kind else {
            return self.skip_statement();
        };
        match word.as_str() {
            "import" if !self.peek_is_punct(1, "(") && !self.peek_is_punct(1, ".") => {
                if let Some(import) = self.parse_import()? {
                    items.push(Item::Import(import));
                }
                Ok(())
            }
            "export" => self.parse_export(items, doc),
            "const" | "let" | "var" => self.parse_var_decl(items, false, doc),
            "function" => self.parse_function_decl(items, false, doc),
            "async" if self.peek_is_word(1, "function") => {
                self.advance();
                self.parse_function_decl(items, false, doc)
            }
            _ => self.skip_statement(),
        }
    }

    fn parse_import(&mut self) -> Result<Option<Import>, ParseError> {
        self.expect_word("import")?;
        if let TokenKind::Str(source) = &self.current().kind {
            let source = source.clone();
            self.advance();
            self.eat_punct(";");
            return Ok(Some(Import { source, bindings: Vec::new() }));
        }
        // `import type ...` carries no values
        if self.is_word("type") && !self.peek_is_punct(1, ",") && !self.peek_is_word(1, "from") {
            self.skip_statement()?;
            return Ok(None);
        }

        let mut bindings = Vec::new();
        if matches!(self.current().kind, TokenKind::Ident(_)) && !self.is_word("from") {
            bindings.push(ImportBinding::Default(self.expect_ident()?));
            self.eat_punct(",");
        }
        if self.eat_punct("*") {
            self.expect_word("as")?;
            bindings.push(ImportBinding::Namespace(self.expect_ident()?));
        } else if self.eat_punct("{") {
            while !self.is_punct("}") {
                if self.is_word("type")
                    && matches!(self.peek(1).kind, TokenKind::Ident(_))
                    && !self.peek_is_word(1, "as")
                {
                    // inline `type Foo` specifier
                    self.advance();
                    self.advance();
                    if self.eat_word("as") {
                        self.expect_ident()?;
                    }
                } else {
                    let imported = self.expect_name()?;
                    let local = if self.eat_word("as") {
                        self.expect_ident()?
                    } else {
                        imported.clone()
                    };
                    bindings.push(ImportBinding::Named { imported, local });
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
        }
        self.expect_word("from")?;
        let source = self.expect_string()?;
        if self.is_word("assert") || self.is_word("with") {
            self.advance();
            self.skip_balanced()?;
        }
        self.eat_punct(";");
        Ok(Some(Import { source, bindings }))
    }

    fn parse_export(
        &mut self,
        items: &mut Vec<Item>,
        doc: Option<String>,
    ) -> Result<(), ParseError> {
        self.expect_word("export")?;
        let start = self.current().span;

        if self.eat_word("default") {
            if self.is_word("async") && self.peek_is_word(1, "function") {
                self.advance();
            }
            if self.is_word("function") {
                let func = self.parse_function_expr()?;
                items.push(Item::Decl(Decl {
                    name: "default".into(),
                    span: func.span,
                    init: Some(func),
                    exported: true,
                    doc,
                }));
                return Ok(());
            }
            if self.is_word("class") || self.is_word("interface") {
                return self.skip_statement();
            }
            let init = self.parse_expr()?;
            self.eat_punct(";");
            items.push(Item::Decl(Decl {
                name: "default".into(),
                init: Some(init),
                exported: true,
                doc,
                span: self.span_from(start),
            }));
            return Ok(());
        }

        if self.is_word("const") || self.is_word("let") || self.is_word("var") {
            return self.parse_var_decl(items, true, doc);
        }
        if self.is_word("async") && self.peek_is_word(1, "function") {
            self.advance();
        }
        if self.is_word("function") {
            return self.parse_function_decl(items, true, doc);
        }

        if self.eat_punct("{") {
            let mut specifiers = Vec::new();
            while !self.is_punct("}") {
                if self.is_word("type")
                    && matches!(self.peek(1).kind, TokenKind::Ident(_))
                    && !self.peek_is_word(1, "as")
                {
                    self.advance();
                    self.advance();
                    if self.eat_word("as") {
                        self.expect_name()?;
                    }
                } else {
                    let local = self.expect_name()?;
                    let exported = if self.eat_word("as") {
                        self.expect_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push((local, exported));
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct("}")?;
            let source = if self.eat_word("from") { Some(self.expect_string()?) } else { None };
            self.eat_punct(";");
            items.push(Item::Export(Export::Named { specifiers, source }));
            return Ok(());
        }

        if self.eat_punct("*") {
            let alias = if self.eat_word("as") { Some(self.expect_name()?) } else { None };
            self.expect_word("from")?;
            let source = self.expect_string()?;
            self.eat_punct(";");
            items.push(Item::Export(Export::All { source, alias }));
            return Ok(());
        }

        // type, interface, enum, class, declare, ...
        self.skip_statement()
    }

    fn parse_var_decl(
        &mut self,
        items: &mut Vec<Item>,
        exported: bool,
        doc: Option<String>,
    ) -> Result<(), ParseError> {
        self.advance(); // const | let | var
        loop {
            if self.is_punct("{") || self.is_punct("[") {
                // destructuring binds nothing we can name
                return self.skip_statement();
            }
            let start = self.current().span;
            let name = self.expect_ident()?;
            self.eat_punct("!");
            if self.eat_punct(":") {
                self.skip_type()?;
            }
            let init = if self.eat_punct("=") { Some(self.parse_expr()?) } else { None };
            items.push(Item::Decl(Decl {
                name,
                init,
                exported,
                doc: doc.clone(),
                span: self.span_from(start),
            }));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");
        Ok(())
    }

    fn parse_function_decl(
        &mut self,
        items: &mut Vec<Item>,
        exported: bool,
        doc: Option<String>,
    ) -> Result<(), ParseError> {
        let start = self.current().span;
        self.expect_word("function")?;
        self.eat_punct("*");
        let name = self.expect_ident()?;
        let func = self.parse_function_rest()?;
        let span = self.span_from(start);
        items.push(Item::Decl(Decl {
            name,
            init: Some(Expr { kind: ExprKind::Function(Box::new(func)), span }),
            exported,
            doc,
            span,
        }));
        Ok(())
    }

    /// Skip one statement we do not model. Stops after `;` at depth zero, or
    /// before a statement keyword that starts a new line.
    fn skip_statement(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut first = true;
        loop {
            if self.is_eof() {
                return Ok(());
            }
            if depth == 0 {
                if self.is_punct(";") {
                    self.advance();
                    return Ok(());
                }
                let tok = self.current();
                if !first && tok.newline_before {
                    if let TokenKind::Ident(w) = &tok.kind {
                        if STATEMENT_STARTS.contains(&w.as_str()) {
                            return Ok(());
                        }
                    }
                }
            }
            match &self.current().kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            first = false;
        }
    }

    /// Skip a bracketed group starting at the current `(`, `[` or `{`.
    fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match &self.current().kind {
                TokenKind::Eof => return Err(self.error("Unbalanced brackets")),
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Skip `<...>` type parameters or arguments.
    fn skip_angles(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match &self.current().kind {
                TokenKind::Eof | TokenKind::Punct(";") => {
                    return Err(self.error("Unterminated type arguments"));
                }
                TokenKind::Punct("(" | "[" | "{") => {
                    self.skip_balanced()?;
                    continue;
                }
                TokenKind::Punct("<") => depth += 1,
                TokenKind::Punct(">") => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }

    // -------------------------------- types --------------------------------- //

    fn skip_type(&mut self) -> Result<(), ParseError> {
        self.eat_punct("|");
        self.eat_punct("&");
        loop {
            self.skip_type_atom()?;
            while self.is_punct("[") {
                self.skip_balanced()?;
            }
            if self.eat_word("extends") {
                self.skip_type_atom()?;
                self.expect_punct("?")?;
                self.skip_type()?;
                self.expect_punct(":")?;
                return self.skip_type();
            }
            if self.eat_punct("|") || self.eat_punct("&") {
                continue;
            }
            return Ok(());
        }
    }

    fn skip_type_atom(&mut self) -> Result<(), ParseError> {
        const PREFIXES: [&str; 7] =
            ["typeof", "keyof", "readonly", "unique", "infer", "asserts", "new"];
        while PREFIXES.iter().any(|w| self.is_word(w)) {
            self.advance();
        }
        match &self.current().kind {
            TokenKind::Punct("(") => {
                self.skip_balanced()?;
                if self.eat_punct("=>") {
                    self.skip_type()?;
                }
            }
            TokenKind::Punct("<") => {
                self.skip_angles()?;
                self.skip_balanced()?;
                self.expect_punct("=>")?;
                self.skip_type()?;
            }
            TokenKind::Punct("{" | "[") => self.skip_balanced()?,
            TokenKind::Punct("-") => {
                self.advance();
                self.advance();
            }
            TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Num(_) | TokenKind::Template => {
                self.advance();
                while self.is_punct(".") {
                    self.advance();
                    self.advance();
                }
                if self.is_punct("<") {
                    self.skip_angles()?;
                }
            }
            other => return Err(self.error(format!("Expected type, found {other:?}"))),
        }
        Ok(())
    }

    /// Return-type annotation, including `x is T` predicates.
    fn skip_return_type(&mut self) -> Result<(), ParseError> {
        self.skip_type()?;
        if self.eat_word("is") {
            self.skip_type()?;
        }
        Ok(())
    }

    // ------------------------------ functions ------------------------------- //

    fn parse_function_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        self.expect_word("function")?;
        self.eat_punct("*");
        if matches!(self.current().kind, TokenKind::Ident(_)) {
            self.advance();
        }
        let func = self.parse_function_rest()?;
        Ok(Expr { kind: ExprKind::Function(Box::new(func)), span: self.span_from(start) })
    }

    /// Generics, parameters, return type and body after the function name.
    fn parse_function_rest(&mut self) -> Result<Function, ParseError> {
        if self.is_punct("<") {
            self.skip_angles()?;
        }
        self.expect_punct("(")?;
        let params = self.parse_params()?;
        if self.eat_punct(":") {
            self.skip_return_type()?;
        }
        let body = if self.is_punct("{") {
            self.parse_function_block()?
        } else {
            // overload signature
            self.eat_punct(";");
            FunctionBody::Block
        };
        Ok(Function { params, body })
    }

    /// Parameter list after the opening `(`; consumes the closing `)`.
    fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        while !self.is_punct(")") {
            self.eat_punct("...");
            while ["public", "private", "protected", "readonly"].iter().any(|w| self.is_word(w))
                && matches!(self.peek(1).kind, TokenKind::Ident(_))
            {
                self.advance();
            }
            if self.is_punct("{") || self.is_punct("[") {
                self.skip_balanced()?;
                params.push("_".to_string());
            } else {
                params.push(self.expect_ident()?);
            }
            self.eat_punct("?");
            if self.eat_punct(":") {
                self.skip_type()?;
            }
            if self.eat_punct("=") {
                self.parse_expr()?;
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    /// `{ return expr; }` becomes `Return`; any other block is skipped.
    fn parse_function_block(&mut self) -> Result<FunctionBody, ParseError> {
        let save = self.pos;
        self.expect_punct("{")?;
        if self.eat_word("return") && !self.is_punct(";") && !self.is_punct("}") {
            if let Ok(expr) = self.parse_expr() {
                self.eat_punct(";");
                if self.eat_punct("}") {
                    return Ok(FunctionBody::Return(expr));
                }
            }
        }
        self.pos = save;
        self.skip_balanced()?;
        Ok(FunctionBody::Block)
    }

    fn is_arrow_ahead(&self) -> bool {
        let mut i = self.pos;
        if matches!(&self.tokens[i].kind, TokenKind::Ident(w) if w == "async")
            && !self.tokens.get(i + 1).is_some_and(|t| t.newline_before)
            && matches!(
                self.tokens.get(i + 1).map(|t| &t.kind),
                Some(TokenKind::Ident(_) | TokenKind::Punct("("))
            )
        {
            i += 1;
        }
        let kind_at = |j: usize| self.tokens.get(j).map(|t| &t.kind);
        match kind_at(i) {
            Some(TokenKind::Ident(_)) => matches!(kind_at(i + 1), Some(TokenKind::Punct("=>"))),
            Some(TokenKind::Punct("(")) => {
                let Some(close) = self.matching_close(i) else {
                    return false;
                };
                match kind_at(close + 1) {
                    Some(TokenKind::Punct("=>")) => true,
                    Some(TokenKind::Punct(":")) => {
                        // return type annotation; look for `=>` before the expression ends
                        let mut depth = 0usize;
                        let mut j = close + 2;
                        while let Some(kind) = kind_at(j) {
                            match kind {
                                TokenKind::Punct("(" | "[" | "{" | "<") => depth += 1,
                                TokenKind::Punct(")" | "]" | "}" | ">") if depth > 0 => depth -= 1,
                                TokenKind::Punct("=>") if depth == 0 => return true,
                                TokenKind::Punct(";" | "," | ")" | "]" | "}" | "=")
                                    if depth == 0 =>
                                {
                                    return false;
                                }
                                TokenKind::Eof => return false,
                                _ => {}
                            }
                            j += 1;
                        }
                        false
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (j, tok) in self.tokens.iter().enumerate().skip(open) {
            match tok.kind {
                TokenKind::Punct("(" | "[" | "{") => depth += 1,
                TokenKind::Punct(")" | "]" | "}") => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(j);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    fn parse_arrow(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        self.eat_word("async");
        let params = if let TokenKind::Ident(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            vec![name]
        } else {
            self.expect_punct("(")?;
            self.parse_params()?
        };
        if self.eat_punct(":") {
            self.skip_return_type()?;
        }
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            self.parse_function_block()?
        } else {
            FunctionBody::Expr(self.parse_expr()?)
        };
        Ok(Expr {
            kind: ExprKind::Function(Box::new(Function { params, body })),
            span: self.span_from(start),
        })
    }

    // ----------------------------- expressions ------------------------------ //

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }
        let start = self.current().span;
        let left = self.parse_conditional()?;
        let assign = matches!(
            &self.current().kind,
            TokenKind::Punct(
                "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "**=" | "&=" | "|=" | "^=" | "&&=" | "||="
                    | "??="
            )
        );
        if assign {
            let TokenKind::Punct(op) = self.advance().kind else { unreachable!() };
            let right = self.parse_expr()?;
            return Ok(Expr {
                kind: ExprKind::Binary {
                    op: op.to_string(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span: self.span_from(start),
            });
        }
        Ok(left)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        let test = self.parse_binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let then = self.parse_expr()?;
        self.expect_punct(":")?;
        let otherwise = self.parse_expr()?;
        Ok(Expr {
            kind: ExprKind::Conditional {
                test: Box::new(test),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span: self.span_from(start),
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let start = self.current().span;
        let mut left = self.parse_unary()?;
        loop {
            // `x as T`, `x satisfies T`: keep the value, drop the type
            if self.is_word("as") || self.is_word("satisfies") {
                self.advance();
                if !self.eat_word("const") {
                    self.skip_type()?;
                }
                continue;
            }
            let op = match &self.current().kind {
                TokenKind::Punct(p) => *p,
                TokenKind::Ident(w) if w == "instanceof" => "instanceof",
                TokenKind::Ident(w) if w == "in" => "in",
                _ => break,
            };
            let Some(prec) = binary_precedence(op) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            left = Expr {
                kind: ExprKind::Binary {
                    op: op.to_string(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span: self.span_from(start),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        let op = match &self.current().kind {
            TokenKind::Punct(p @ ("-" | "+" | "!" | "~" | "++" | "--")) => p.to_string(),
            TokenKind::Ident(w) if matches!(w.as_str(), "typeof" | "void" | "delete" | "await") => {
                w.clone()
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let arg = self.parse_unary()?;
        let span = arg.span;
        let kind = match arg.kind {
            ExprKind::Num(n) if op == "-" => ExprKind::Num(-n),
            ExprKind::Num(n) if op == "+" => ExprKind::Num(n),
            kind => ExprKind::Unary { op, arg: Box::new(Expr { kind, span }) },
        };
        Ok(Expr { kind, span: self.span_from(start) })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        let mut expr = if self.is_word("new") { self.parse_new()? } else { self.parse_primary()? };
        loop {
            if self.eat_punct(".") || self.eat_punct("?.") {
                if self.is_punct("(") {
                    let args = self.parse_args()?;
                    expr = Expr {
                        kind: ExprKind::Call { callee: Box::new(expr), args },
                        span: self.span_from(start),
                    };
                    continue;
                }
                if self.is_punct("[") {
                    continue;
                }
                self.eat_punct("#");
                let property = self.expect_ident()?;
                expr = Expr {
                    kind: ExprKind::Member { object: Box::new(expr), property },
                    span: self.span_from(start),
                };
            } else if self.eat_punct("[") {
                let index = self.parse_expr()?;
                self.expect_punct("]")?;
                let kind = match index.kind {
                    ExprKind::Str(property) => {
                        ExprKind::Member { object: Box::new(expr), property }
                    }
                    kind => ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(Expr { kind, span: index.span }),
                    },
                };
                expr = Expr { kind, span: self.span_from(start) };
            } else if self.is_punct("(") {
                let args = self.parse_args()?;
                expr = Expr {
                    kind: ExprKind::Call { callee: Box::new(expr), args },
                    span: self.span_from(start),
                };
            } else if self.is_punct("<") {
                // type arguments only count when a call follows
                let save = self.pos;
                if self.skip_angles().is_ok() && self.is_punct("(") {
                    continue;
                }
                self.pos = save;
                break;
            } else if self.is_punct("!") && !self.current().newline_before {
                // non-null assertion
                self.advance();
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        self.expect_word("new")?;
        let mut callee = self.parse_primary()?;
        while self.eat_punct(".") {
            let property = self.expect_ident()?;
            callee = Expr {
                kind: ExprKind::Member { object: Box::new(callee), property },
                span: self.span_from(start),
            };
        }
        if self.is_punct("<") {
            self.skip_angles()?;
        }
        let args = if self.is_punct("(") { self.parse_args()? } else { Vec::new() };
        Ok(Expr {
            kind: ExprKind::New { callee: Box::new(callee), args },
            span: self.span_from(start),
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.is_punct(")") {
            args.push(self.parse_element()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    /// Array element or call argument, spread allowed.
    fn parse_element(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        if self.eat_punct("...") {
            let arg = self.parse_expr()?;
            return Ok(Expr { kind: ExprKind::Spread(Box::new(arg)), span: self.span_from(start) });
        }
        self.parse_expr()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.current().clone();
        let kind = match &tok.kind {
            TokenKind::Str(s) => ExprKind::Str(s.clone()),
            TokenKind::Template => ExprKind::Template,
            TokenKind::Num(n) => ExprKind::Num(*n),
            TokenKind::Regex => ExprKind::Regex,
            TokenKind::Ident(w) => match w.as_str() {
                "true" => ExprKind::Bool(true),
                "false" => ExprKind::Bool(false),
                "null" => ExprKind::Null,
                "function" => return self.parse_function_expr(),
                "async" if self.peek_is_word(1, "function") => {
                    self.advance();
                    return self.parse_function_expr();
                }
                "class" => return Err(self.error("Class expressions are not supported")),
                _ => ExprKind::Ident(w.clone()),
            },
            TokenKind::Punct("(") => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_punct(")")?;
                return Ok(inner);
            }
            TokenKind::Punct("[") => return self.parse_array(),
            TokenKind::Punct("{") => return self.parse_object(),
            other => return Err(self.error(format!("Unexpected token {other:?}"))),
        };
        self.advance();
        Ok(Expr { kind, span: tok.span })
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        self.expect_punct("[")?;
        let mut elems = Vec::new();
        while !self.is_punct("]") {
            if self.eat_punct(",") {
                continue; // hole
            }
            elems.push(self.parse_element()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("]")?;
        Ok(Expr { kind: ExprKind::Array(elems), span: self.span_from(start) })
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span;
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.is_punct("}") {
            props.push(self.parse_prop()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr { kind: ExprKind::Object(props), span: self.span_from(start) })
    }

    fn parse_prop(&mut self) -> Result<Prop, ParseError> {
        let doc = self.current().doc.clone();
        let start = self.current().span;

        if self.eat_punct("...") {
            let arg = self.parse_expr()?;
            return Ok(Prop { kind: PropKind::Spread(arg), doc, span: self.span_from(start) });
        }

        let is_modifier = ["get", "set", "async"].iter().any(|w| self.is_word(w))
            && !matches!(self.peek(1).kind, TokenKind::Punct(":" | "," | "}" | "(" | "="));
        if is_modifier {
            self.advance();
        }
        self.eat_punct("*");

        let key = match &self.current().kind {
            TokenKind::Ident(name) => PropKey::Ident(name.clone()),
            TokenKind::Str(s) => PropKey::Str(s.clone()),
            TokenKind::Num(n) => PropKey::Num(*n),
            TokenKind::Punct("[") => {
                self.advance();
                let computed = self.parse_expr()?;
                self.expect_punct("]")?;
                PropKey::Computed(Box::new(computed))
            }
            other => return Err(self.error(format!("Expected property key, found {other:?}"))),
        };
        if !matches!(key, PropKey::Computed(_)) {
            self.advance();
        }

        let kind = if self.eat_punct(":") {
            PropKind::KeyValue { key, value: self.parse_expr()? }
        } else if is_modifier || self.is_punct("(") || self.is_punct("<") || self.is_punct("?") {
            self.eat_punct("?");
            self.parse_function_rest()?;
            PropKind::Method(key.as_name().unwrap_or_default())
        } else {
            let PropKey::Ident(name) = key else {
                return Err(self.error("Expected ':' after property key"));
            };
            if self.eat_punct("=") {
                // `{ a = 1 }` only appears in patterns
                self.parse_expr()?;
            }
            PropKind::Shorthand(name)
        };
        Ok(Prop { kind, doc, span: self.span_from(start) })
    }
}

fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "??" => 1,
        "||" => 2,
        "&&" => 3,
        "|" => 4,
        "^" => 5,
        "&" => 6,
        "==" | "!=" | "===" | "!==" => 7,
        "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 8,
        "+" | "-" => 10,
        "*" | "/" | "%" => 11,
        "**" => 12,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Module {
        parse_module(src).expect("parse failed")
    }

    fn decl<'m>(module: &'m Module, name: &str) -> &'m Decl {
        module
            .items
            .iter()
            .find_map(|item| match item {
                Item::Decl(d) if d.name == name => Some(d),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no declaration `{name}`"))
    }

    #[test]
    fn import_forms() {
        let m = parse(
            "import * as t from 'io-ts';\n\
             import D, { a, b as c, type T } from './x';\n\
             import type { Only } from './types';\n\
             import './side-effect';",
        );
        assert_eq!(
            m.items,
            vec![
                Item::Import(Import {
                    source: "io-ts".into(),
                    bindings: vec![ImportBinding::Namespace("t".into())],
                }),
                Item::Import(Import {
                    source: "./x".into(),
                    bindings: vec![
                        ImportBinding::Default("D".into()),
                        ImportBinding::Named { imported: "a".into(), local: "a".into() },
                        ImportBinding::Named { imported: "b".into(), local: "c".into() },
                    ],
                }),
                Item::Import(Import { source: "./side-effect".into(), bindings: vec![] }),
            ]
        );
    }

    #[test]
    fn export_forms() {
        let m = parse(
            "export { A, B as C } from './a';\n\
             export * from './b';\n\
             export * as ns from './c';\n\
             export { local };",
        );
        assert_eq!(
            m.items,
            vec![
                Item::Export(Export::Named {
                    specifiers: vec![("A".into(), "A".into()), ("B".into(), "C".into())],
                    source: Some("./a".into()),
                }),
                Item::Export(Export::All { source: "./b".into(), alias: None }),
                Item::Export(Export::All { source: "./c".into(), alias: Some("ns".into()) }),
                Item::Export(Export::Named {
                    specifiers: vec![("local".into(), "local".into())],
                    source: None,
                }),
            ]
        );
    }

    #[test]
    fn type_level_syntax_is_skipped() {
        let m = parse(
            "export type Foo = t.TypeOf<typeof Foo>\n\
             export interface Bar { a: string; b?: number }\n\
             export const Foo: t.Type<{ a: string }, unknown> = t.string as unknown as t.Mixed\n\
             export const Baz = f<Array<string>>(x)!",
        );
        let foo = decl(&m, "Foo");
        assert!(foo.exported);
        assert!(matches!(
            &foo.init.as_ref().unwrap().kind,
            ExprKind::Member { property, .. } if property == "string"
        ));
        let baz = decl(&m, "Baz");
        assert!(matches!(
            &baz.init.as_ref().unwrap().kind,
            ExprKind::Call { args, .. } if args.len() == 1
        ));
        assert_eq!(m.items.len(), 2);
    }

    #[test]
    fn object_properties_keep_their_docs() {
        let m = parse(
            "const X = t.type({\n\
             \x20 /** first */\n\
             \x20 a: t.string,\n\
             \x20 b,\n\
             \x20 ...Rest,\n\
             \x20 'quoted-key': t.number,\n\
             \x20 [dyn]: t.null,\n\
             });",
        );
        let ExprKind::Call { args, .. } = &decl(&m, "X").init.as_ref().unwrap().kind else {
            panic!("expected call");
        };
        let ExprKind::Object(props) = &args[0].kind else { panic!("expected object") };
        assert_eq!(props.len(), 5);
        assert_eq!(props[0].doc.as_deref(), Some("first"));
        assert!(matches!(&props[1].kind, PropKind::Shorthand(n) if n == "b"));
        assert!(matches!(&props[2].kind, PropKind::Spread(_)));
        assert!(matches!(
            &props[3].kind,
            PropKind::KeyValue { key: PropKey::Str(k), .. } if k == "quoted-key"
        ));
        assert!(matches!(&props[4].kind, PropKind::KeyValue { key: PropKey::Computed(_), .. }));
    }

    #[test]
    fn arrow_and_function_bodies() {
        let m = parse(
            "const A = () => t.string;\n\
             const B = (): t.Mixed => { return t.number; };\n\
             const C = (x: number) => x + 1;\n\
             function D() { const y = 1; return y; }\n\
             const E = t.brand(t.string, (s): s is t.Branded<string, X> => s.length > 0, 'X');",
        );
        let body = |name: &str| match &decl(&m, name).init.as_ref().unwrap().kind {
            ExprKind::Function(f) => (f.params.clone(), f.body.clone()),
            other => panic!("expected function, got {other:?}"),
        };
        assert!(matches!(body("A"), (p, FunctionBody::Expr(_)) if p.is_empty()));
        assert!(matches!(body("B"), (p, FunctionBody::Return(_)) if p.is_empty()));
        assert!(matches!(body("C"), (p, FunctionBody::Expr(_)) if p == vec!["x".to_string()]));
        assert!(matches!(body("D"), (_, FunctionBody::Block)));
        let ExprKind::Call { args, .. } = &decl(&m, "E").init.as_ref().unwrap().kind else {
            panic!("expected call");
        };
        assert!(matches!(
            &args[1].kind,
            ExprKind::Function(f) if f.params == vec!["s".to_string()]
        ));
    }

    #[test]
    fn declaration_docs_and_negative_numbers() {
        let m = parse("/** The answer. */\nexport const N = -42;");
        let n = decl(&m, "N");
        assert_eq!(n.doc.as_deref(), Some("The answer."));
        assert_eq!(n.init.as_ref().unwrap().kind, ExprKind::Num(-42.0));
    }

    #[test]
    fn index_with_string_is_member_access() {
        let m = parse("const X = codecs['Foo'];");
        assert!(matches!(
            &decl(&m, "X").init.as_ref().unwrap().kind,
            ExprKind::Member { property, .. } if property == "Foo"
        ));
    }

    #[test]
    fn reports_position_of_errors() {
        let err = parse_module("const X = t.type({ a: });").unwrap_err();
        assert!(err.to_string().starts_with("Parse error [1:23]"), "{err}");
    }
}
