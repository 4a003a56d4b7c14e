use thiserror::Error;

use super::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    /// Template literal containing `${...}`; the text itself is not kept.
    Template,
    Num(f64),
    Regex,
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Nearest preceding `/** ... */` block, delimiters stripped.
    pub doc: Option<String>,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

#[derive(Debug, Error)]
pub enum LexerError {
    #[error("Lexer error [{line}:{col}]: {msg}")]
    Error {
        msg: String,
        line: usize,
        col: usize,
    },
}

// longest first
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "??=", "&&=", "||=",
    "=>", "?.", "??", "==", "!=", "<=", ">=", "&&", "||", "**", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
    "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

// keywords after which a `/` starts a regular expression
const REGEX_PRECEDING_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void",
    "throw", "yield", "await",
];

pub struct Lexer<'s> {
    src: &'s str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn error(&self, msg: impl Into<String>) -> LexerError {
        LexerError::Error { msg: msg.into(), line: self.line, col: self.col }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|(i, _)| *i).unwrap_or(self.src.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.offset()..].starts_with(s)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let (doc, newline_before) = self.skip_trivia(tokens.is_empty())?;
            let start = self.offset();
            let (line, col) = (self.line, self.col);
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span { start, end: start, line, col },
                    doc: None,
                    newline_before: true,
                });
                return Ok(tokens);
            };

            let kind = if c == '"' || c == '\'' {
                TokenKind::Str(self.lex_string(c)?)
            } else if c == '`' {
                self.lex_template()?
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
            {
                TokenKind::Num(self.lex_number()?)
            } else if is_ident_start(c) {
                TokenKind::Ident(self.lex_ident())
            } else if c == '/' && regex_allowed(tokens.last()) {
                self.lex_regex()?;
                TokenKind::Regex
            } else {
                let Some(p) = PUNCTUATORS.iter().find(|p| self.starts_with(p)) else {
                    return Err(self.error(format!("Unexpected character '{c}'")));
                };
                for _ in 0..p.chars().count() {
                    self.bump();
                }
                TokenKind::Punct(p)
            };

            tokens.push(Token {
                kind,
                span: Span { start, end: self.offset(), line, col },
                doc,
                newline_before,
            });
        }
    }

    /// Skip whitespace and comments, remembering the last doc block.
    fn skip_trivia(&mut self, at_start: bool) -> Result<(Option<String>, bool), LexerError> {
        let mut doc = None;
        let mut newline = at_start;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' {
                        newline = true;
                    }
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let is_doc = self.peek_at(2) == Some('*') && self.peek_at(3) != Some('/');
                    let body_start = self.offset() + if is_doc { 3 } else { 2 };
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => return Err(self.error("Unterminated comment")),
                            Some('*') if self.peek_at(1) == Some('/') => break,
                            Some('\n') => {
                                newline = true;
                                self.bump();
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                    let body_end = self.offset();
                    self.bump();
                    self.bump();
                    if is_doc {
                        doc = Some(clean_doc(&self.src[body_start.min(body_end)..body_end]));
                    }
                }
                _ => return Ok((doc, newline)),
            }
        }
    }

    fn lex_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn lex_number(&mut self) -> Result<f64, LexerError> {
        let start = self.offset();
        let radix = if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('x') | Some('X') => 16,
                Some('b') | Some('B') => 2,
                Some('o') | Some('O') => 8,
                _ => 10,
            }
        } else {
            10
        };
        if radix != 10 {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c.is_digit(radix) {
                    digits.push(c);
                } else if c != '_' {
                    break;
                }
                self.bump();
            }
            if self.peek() == Some('n') {
                self.bump();
            }
            return u64::from_str_radix(&digits, radix)
                .map(|v| v as f64)
                .map_err(|_| self.error("Invalid number literal"));
        }

        let mut text = String::new();
        let mut seen_exp = false;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.'
                && !seen_dot
                && !seen_exp
                && !self.peek_at(1).is_some_and(is_ident_start)
            {
                seen_dot = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                text.push(c);
                if let Some(sign @ ('+' | '-')) = self.peek_at(1) {
                    self.bump();
                    text.push(sign);
                }
            } else if c != '_' {
                break;
            }
            self.bump();
        }
        // bigint suffix
        if self.peek() == Some('n') {
            self.bump();
        }
        text.parse::<f64>().map_err(|_| {
            self.error(format!("Invalid number literal '{}'", &self.src[start..self.offset()]))
        })
    }

    fn lex_string(&mut self, quote: char) -> Result<String, LexerError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Unterminated string literal")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.lex_escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn lex_escape(&mut self, out: &mut String) -> Result<(), LexerError> {
        let Some(c) = self.bump() else {
            return Err(self.error("Unterminated escape sequence"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {} // line continuation
            'x' => {
                let hex: String = (0..2).filter_map(|_| self.bump()).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.error("Invalid \\x escape"))?;
                out.extend(char::from_u32(code));
            }
            'u' => {
                let hex: String = if self.peek() == Some('{') {
                    self.bump();
                    let mut h = String::new();
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                        h.push(c);
                    }
                    h
                } else {
                    (0..4).filter_map(|_| self.bump()).collect()
                };
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.error("Invalid \\u escape"))?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_template(&mut self) -> Result<TokenKind, LexerError> {
        self.bump();
        let mut text = String::new();
        let mut substitutions = false;
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => break,
                Some('\\') => self.lex_escape(&mut text)?,
                Some('$') if self.peek() == Some('{') => {
                    substitutions = true;
                    self.bump();
                    self.skip_substitution()?;
                }
                Some(c) => text.push(c),
            }
        }
        Ok(if substitutions { TokenKind::Template } else { TokenKind::Str(text) })
    }

    fn skip_substitution(&mut self) -> Result<(), LexerError> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => return Err(self.error("Unterminated template substitution")),
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump();
                }
                Some(q @ ('"' | '\'')) => {
                    self.lex_string(q)?;
                }
                Some('`') => {
                    self.lex_template()?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    fn lex_regex(&mut self) -> Result<(), LexerError> {
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Unterminated regular expression")),
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn regex_allowed(prev: Option<&Token>) -> bool {
    match prev.map(|t| &t.kind) {
        None => true,
        Some(TokenKind::Punct(p)) => !matches!(*p, ")" | "]" | "}"),
        Some(TokenKind::Ident(w)) => REGEX_PRECEDING_WORDS.contains(&w.as_str()),
        Some(_) => false,
    }
}

/// Strip the leading `*` gutter from every line of a doc block.
fn clean_doc(body: &str) -> String {
    body.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
