//! Lexical analysis for directive-annotated SQL.
//!
//! This module implements a dialect-aware, directive-preserving tokenizer:
//! it turns SQL source text into a stream of [`Token`]s while classifying
//! the block comments that carry SnapSQL directives (`/*# if ... */`,
//! `/*= expr */`, `/*$ expr */`, `/*@ expr */`) instead of discarding them
//! the way an ordinary SQL lexer would.

pub mod keywords;
mod tokenizer;

use crate::ast::Span;
use crate::diag::Diag;
use smol_str::SmolStr;
use std::fmt;

pub use tokenizer::{Tokenizer, tokenize};

/// The SQL dialect a [`Tokenizer`] should assume when classifying
/// identifiers, quoting, and dialect-specific punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// The first-character classifier of a SnapSQL directive comment body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveMarker {
    /// `/*# ... */` — control directive (`if`, `elseif`, `else`, `end`, `for`).
    Control,
    /// `/*= expr */` — runtime substitution.
    Substitution,
    /// `/*$ expr */` — build-time constant substitution.
    Constant,
    /// `/*@ expr */` — environment reference, or a YAML header block.
    Environment,
}

/// The parsed shape of a control directive's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    If,
    ElseIf,
    Else,
    End,
    For,
    /// `/*= expr */`
    Substitution,
    /// `/*$ expr */`
    Constant,
    /// `/*@ expr */`
    Environment,
}

/// A directive descriptor attached to a block-comment token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// The raw expression text (condition, substitution expression, or
    /// `var : list-expr` payload for `for`).
    pub payload: SmolStr,
    /// For `for` directives: the loop variable name, split out of `payload`.
    pub loop_variable: Option<SmolStr>,
}

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(SmolStr),
    Identifier(SmolStr),
    DelimitedIdentifier(SmolStr),
    Number(SmolStr),
    StringLiteral(SmolStr),
    BooleanLiteral(bool),
    /// A `/* ... */` comment. Carries a [`Directive`] when its body is a
    /// recognized SnapSQL directive; otherwise `directive` is `None` and
    /// the comment is preserved verbatim.
    BlockComment {
        text: SmolStr,
        directive: Option<Directive>,
    },
    LineComment(SmolStr),
    Whitespace,
    Semicolon,
    LParen,
    RParen,
    Comma,
    Operator(SmolStr),
    /// Synthesized by parser stage 1 immediately after a substitution or
    /// constant directive when no literal already follows it.
    DummyLiteral(SmolStr),
    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::BooleanLiteral(_)
                | TokenKind::Identifier(_)
                | TokenKind::DummyLiteral(_)
        )
    }

    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment(_) | TokenKind::BlockComment { .. }
        )
    }

    /// Returns the directive carried by this token, if any.
    pub fn directive(&self) -> Option<&Directive> {
        match self {
            TokenKind::BlockComment { directive, .. } => directive.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "{}", k.to_uppercase()),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::DelimitedIdentifier(name) => write!(f, "\"{name}\""),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::StringLiteral(s) => write!(f, "'{s}'"),
            TokenKind::BooleanLiteral(b) => write!(f, "{b}"),
            TokenKind::BlockComment { text, .. } => write!(f, "/*{text}*/"),
            TokenKind::LineComment(text) => write!(f, "--{text}"),
            TokenKind::Whitespace => write!(f, " "),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Operator(op) => write!(f, "{op}"),
            TokenKind::DummyLiteral(name) => write!(f, "<dummy:{name}>"),
            TokenKind::Eof => write!(f, "<EOF>"),
        }
    }
}

/// A lexical token with its kind and source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Result of lexical analysis: the non-trivia-filtered token stream (still
/// carrying comments, since directive comments are structurally meaningful)
/// plus any diagnostics raised while scanning.
#[derive(Debug, Clone)]
pub struct TokenizeResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diag>,
}
