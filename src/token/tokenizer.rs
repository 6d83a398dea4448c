//! The dialect-aware SQL tokenizer (spec §4.1).

use super::keywords::is_keyword;
use super::{Dialect, Directive, DirectiveKind, Token, TokenKind, TokenizeResult};
use crate::diag::Diag;
use smol_str::SmolStr;

/// Scans source text into a [`TokenizeResult`].
///
/// `base_offset` shifts every reported byte position by a fixed amount,
/// which is how a markdown/front-matter reader (out of scope for this
/// crate) can hand the SQL body of a `.snap.md` document to the tokenizer
/// without the tokenizer needing to know about markdown at all (spec
/// §4.1.1).
pub fn tokenize(source: &str, dialect: Dialect) -> TokenizeResult {
    Tokenizer::new(source, dialect).scan()
}

/// A dialect-aware lexer for directive-annotated SQL.
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    dialect: Dialect,
    pos: usize,
    base_offset: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diag>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str, dialect: Dialect) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            dialect,
            pos: 0,
            base_offset: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Sets a byte offset added to every span this tokenizer reports.
    pub fn with_base_offset(mut self, base_offset: usize) -> Self {
        self.base_offset = base_offset;
        self
    }

    pub fn scan(mut self) -> TokenizeResult {
        while !self.is_at_end() {
            self.scan_token();
        }
        let eof_pos = self.offset(self.source.len());
        self.tokens.push(Token::new(TokenKind::Eof, eof_pos..eof_pos));
        TokenizeResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn offset(&self, pos: usize) -> usize {
        self.base_offset + pos
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> u8 {
        *self.bytes.get(self.pos).unwrap_or(&0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        *self.bytes.get(self.pos + offset).unwrap_or(&0)
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, self.offset(start)..self.offset(self.pos)));
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let c = self.advance();
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                while matches!(self.peek(), b' ' | b'\t' | b'\r' | b'\n') {
                    self.pos += 1;
                }
                self.push(TokenKind::Whitespace, start);
            }
            b'(' => self.push(TokenKind::LParen, start),
            b')' => self.push(TokenKind::RParen, start),
            b',' => self.push(TokenKind::Comma, start),
            b';' => self.push(TokenKind::Semicolon, start),
            b'\'' => self.scan_string(start),
            b'"' => self.scan_delimited_identifier(start, b'"'),
            b'`' => self.scan_delimited_identifier(start, b'`'),
            b'-' => {
                if self.match_byte(b'-') {
                    self.scan_line_comment(start);
                } else if self.match_byte(b'>') {
                    self.push(TokenKind::Operator("->".into()), start);
                } else {
                    self.push(TokenKind::Operator("-".into()), start);
                }
            }
            b'/' => {
                if self.match_byte(b'*') {
                    self.scan_block_comment(start);
                } else {
                    self.push(TokenKind::Operator("/".into()), start);
                }
            }
            b'+' | b'*' | b'%' | b'^' => {
                self.push(TokenKind::Operator((c as char).to_string().into()), start)
            }
            b'=' => self.push(TokenKind::Operator("=".into()), start),
            b'!' => {
                if self.match_byte(b'=') {
                    self.push(TokenKind::Operator("!=".into()), start);
                } else {
                    self.push(TokenKind::Operator("!".into()), start);
                }
            }
            b'<' => {
                if self.match_byte(b'=') {
                    self.push(TokenKind::Operator("<=".into()), start);
                } else if self.match_byte(b'>') {
                    self.push(TokenKind::Operator("<>".into()), start);
                } else if self.match_byte(b'@') {
                    self.push(TokenKind::Operator("<@".into()), start);
                } else {
                    self.push(TokenKind::Operator("<".into()), start);
                }
            }
            b'>' => {
                if self.match_byte(b'=') {
                    self.push(TokenKind::Operator(">=".into()), start);
                } else {
                    self.push(TokenKind::Operator(">".into()), start);
                }
            }
            b':' => {
                if self.match_byte(b':') {
                    self.push(TokenKind::Operator("::".into()), start);
                } else {
                    self.push(TokenKind::Operator(":".into()), start);
                }
            }
            b'.' => {
                if self.peek().is_ascii_digit() {
                    self.scan_number(start);
                } else if self.match_byte(b'.') {
                    self.push(TokenKind::Operator("..".into()), start);
                } else {
                    self.push(TokenKind::Operator(".".into()), start);
                }
            }
            b'|' => {
                if self.match_byte(b'|') {
                    self.push(TokenKind::Operator("||".into()), start);
                } else {
                    self.push(TokenKind::Operator("|".into()), start);
                }
            }
            b'#' => {
                if self.match_byte(b'>') {
                    if self.match_byte(b'>') {
                        self.push(TokenKind::Operator("#>>".into()), start);
                    } else {
                        self.push(TokenKind::Operator("#>".into()), start);
                    }
                } else {
                    self.push(TokenKind::Operator("#".into()), start);
                }
            }
            b'@' => {
                if self.match_byte(b'>') {
                    self.push(TokenKind::Operator("@>".into()), start);
                } else {
                    self.push(TokenKind::Operator("@".into()), start);
                }
            }
            b'?' => {
                if self.match_byte(b'&') {
                    self.push(TokenKind::Operator("?&".into()), start);
                } else if self.match_byte(b'|') {
                    self.push(TokenKind::Operator("?|".into()), start);
                } else {
                    self.push(TokenKind::Operator("?".into()), start);
                }
            }
            b'~' => self.push(TokenKind::Operator("~".into()), start),
            b'0'..=b'9' => self.scan_number(start),
            c if c.is_ascii_alphabetic() || c == b'_' => self.scan_word(start),
            _ => {
                self.diagnostics.push(
                    Diag::error(format!("unexpected character '{}'", c as char))
                        .with_primary_label(self.offset(start)..self.offset(self.pos), "here"),
                );
            }
        }
    }

    fn scan_string(&mut self, start: usize) {
        loop {
            if self.is_at_end() {
                self.diagnostics.push(
                    Diag::error("unterminated string literal")
                        .with_primary_label(self.offset(start)..self.offset(self.pos), "opened here")
                        .with_code("UnterminatedString"),
                );
                break;
            }
            let c = self.advance();
            if c == b'\'' {
                if self.peek() == b'\'' {
                    self.pos += 1; // escaped quote
                    continue;
                }
                break;
            }
        }
        let text = &self.source[start + 1..self.pos.saturating_sub(1).max(start + 1)];
        self.push(TokenKind::StringLiteral(SmolStr::new(text)), start);
    }

    fn scan_delimited_identifier(&mut self, start: usize, quote: u8) {
        loop {
            if self.is_at_end() {
                self.diagnostics.push(
                    Diag::error("unterminated delimited identifier")
                        .with_primary_label(self.offset(start)..self.offset(self.pos), "opened here"),
                );
                break;
            }
            let c = self.advance();
            if c == quote {
                break;
            }
        }
        let text = &self.source[start + 1..self.pos.saturating_sub(1).max(start + 1)];
        self.push(TokenKind::DelimitedIdentifier(SmolStr::new(text)), start);
    }

    fn scan_line_comment(&mut self, start: usize) {
        while !self.is_at_end() && self.peek() != b'\n' {
            self.pos += 1;
        }
        let text = &self.source[start + 2..self.pos];
        self.push(TokenKind::LineComment(SmolStr::new(text)), start);
    }

    fn scan_block_comment(&mut self, start: usize) {
        let body_start = self.pos;
        loop {
            if self.is_at_end() {
                self.diagnostics.push(
                    Diag::error("unterminated block comment")
                        .with_primary_label(self.offset(start)..self.offset(self.pos), "opened here")
                        .with_code("UnterminatedComment"),
                );
                break;
            }
            if self.peek() == b'*' && self.peek_at(1) == b'/' {
                break;
            }
            self.pos += 1;
        }
        let body_end = self.pos;
        let body = &self.source[body_start..body_end];
        if !self.is_at_end() {
            self.pos += 2; // consume */
        }
        let directive = classify_directive(body);
        self.push(
            TokenKind::BlockComment {
                text: SmolStr::new(body),
                directive,
            },
            start,
        );
    }

    fn scan_number(&mut self, start: usize) {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), b'e' | b'E') {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), b'+' | b'-') {
                self.pos += 1;
            }
            if self.peek().is_ascii_digit() {
                while self.peek().is_ascii_digit() {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text = &self.source[start..self.pos];
        self.push(TokenKind::Number(SmolStr::new(text)), start);
    }

    fn scan_word(&mut self, start: usize) {
        while matches!(self.peek(), c if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        let upper = text.to_ascii_uppercase();
        if upper == "TRUE" {
            self.push(TokenKind::BooleanLiteral(true), start);
        } else if upper == "FALSE" {
            self.push(TokenKind::BooleanLiteral(false), start);
        } else if is_keyword(text) {
            self.push(TokenKind::Keyword(SmolStr::new(&upper)), start);
        } else {
            self.push(TokenKind::Identifier(SmolStr::new(text)), start);
        }
    }
}

/// Classifies a block comment's body as a SnapSQL directive, if it is one.
///
/// The body is everything between `/*` and `*/`, e.g. `# if foo.bar` or
/// `= expr`. Leading whitespace is skipped before inspecting the marker
/// character.
fn classify_directive(body: &str) -> Option<Directive> {
    let trimmed = body.trim_start();
    let marker = trimmed.chars().next()?;
    let rest = &trimmed[marker.len_utf8()..];
    match marker {
        '#' => {
            let rest = rest.trim_start();
            if let Some(cond) = rest.strip_prefix("if") {
                return Some(Directive {
                    kind: DirectiveKind::If,
                    payload: SmolStr::new(cond.trim()),
                    loop_variable: None,
                });
            }
            if let Some(cond) = rest.strip_prefix("elseif") {
                return Some(Directive {
                    kind: DirectiveKind::ElseIf,
                    payload: SmolStr::new(cond.trim()),
                    loop_variable: None,
                });
            }
            if rest.trim() == "else" {
                return Some(Directive {
                    kind: DirectiveKind::Else,
                    payload: SmolStr::new(""),
                    loop_variable: None,
                });
            }
            if rest.trim() == "end" {
                return Some(Directive {
                    kind: DirectiveKind::End,
                    payload: SmolStr::new(""),
                    loop_variable: None,
                });
            }
            if let Some(forspec) = rest.strip_prefix("for") {
                let forspec = forspec.trim();
                let (var, list_expr) = forspec.split_once(':').unwrap_or((forspec, ""));
                return Some(Directive {
                    kind: DirectiveKind::For,
                    payload: SmolStr::new(list_expr.trim()),
                    loop_variable: Some(SmolStr::new(var.trim())),
                });
            }
            None
        }
        '=' => Some(Directive {
            kind: DirectiveKind::Substitution,
            payload: SmolStr::new(rest.trim()),
            loop_variable: None,
        }),
        '$' => Some(Directive {
            kind: DirectiveKind::Constant,
            payload: SmolStr::new(rest.trim()),
            loop_variable: None,
        }),
        '@' => Some(Directive {
            kind: DirectiveKind::Environment,
            payload: SmolStr::new(rest.trim()),
            loop_variable: None,
        }),
        _ => None,
    }
}
