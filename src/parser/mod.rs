//! The seven-stage parsing pipeline (spec §4.3-§4.9).
//!
//! Each stage is a focused pass over either the token stream or the
//! AST built so far; [`parse`] threads a statement through all seven in
//! order and stops at the first stage that reports an *Error*-severity
//! diagnostic, except stage 7 (dependency analysis) which degrades
//! gracefully instead of aborting the whole pipeline.

mod stage1;
mod stage2;
mod stage3;
mod stage4;
mod stage5;
mod stage6;
mod stage7;

use crate::ast::{Span, Statement};
use crate::diag::{convert_diagnostics_to_reports, Diag, SourceFile};
use crate::namespace::{FunctionDefinition, ParamType};
use crate::token::{Dialect, Token};
use miette::Report;

/// The SQL clause section a token belongs to; used by stage 3's per-token
/// map and consulted by stage 5 to enforce (I4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseSection {
    With,
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Insert,
    Values,
    Update,
    Set,
    Delete,
    OnConflict,
    Returning,
}

/// Options threaded end-to-end through every parser stage without
/// per-stage reinterpretation (spec §9, "Inspect mode").
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Relaxes validations meant only for runtime correctness so tooling
    /// can still extract structure from otherwise-rejected input.
    pub inspect_mode: bool,
}

/// The result envelope `parse` returns.
pub struct ParseOutcome {
    pub statement: Option<Statement>,
    pub diagnostics: Vec<Report>,
}

/// A raw, pre-content-parsed clause: its section tag and the token range
/// (indices into the stage-1 token stream) it spans.
#[derive(Debug, Clone)]
pub(crate) struct RawClause {
    pub section: ClauseSection,
    pub range: std::ops::Range<usize>,
}

/// Runs the tokenize -> 7-stage parse pipeline.
pub fn parse(
    tokens: &[Token],
    source: &str,
    dialect: Dialect,
    function: &FunctionDefinition,
    environment: Vec<(String, ParamType)>,
    options: ParserOptions,
) -> ParseOutcome {
    let mut diagnostics: Vec<Diag> = Vec::new();

    let stage1_tokens = stage1::run(tokens, &mut diagnostics);
    if has_error(&diagnostics) {
        return finish(None, diagnostics, source);
    }

    let raw = match stage2::run(&stage1_tokens, &mut diagnostics) {
        Some(raw) => raw,
        None => return finish(None, diagnostics, source),
    };

    let section_map = stage3::run(&stage1_tokens, &raw.clauses);

    let mut statement = match stage4::run(&stage1_tokens, &raw, source, dialect, options, &mut diagnostics) {
        Some(statement) => statement,
        None => return finish(None, diagnostics, source),
    };
    if has_error(&diagnostics) {
        return finish(None, diagnostics, source);
    }

    stage5::run(&stage1_tokens, &section_map, &mut statement, &mut diagnostics, options);
    if has_error(&diagnostics) {
        return finish(Some(statement), diagnostics, source);
    }

    let mut namespace = crate::namespace::Namespace::new(function).with_environment(environment);
    stage6::run(&mut statement, &mut namespace, &mut diagnostics, options);

    stage7::run(&mut statement, &mut diagnostics);

    finish(Some(statement), diagnostics, source)
}

fn has_error(diagnostics: &[Diag]) -> bool {
    diagnostics.iter().any(|d| d.severity == crate::diag::DiagSeverity::Error)
}

fn finish(statement: Option<Statement>, diagnostics: Vec<Diag>, source: &str) -> ParseOutcome {
    let source_file = SourceFile::new(source.to_string());
    let reports = convert_diagnostics_to_reports(&diagnostics, &source_file);
    ParseOutcome { statement, diagnostics: reports }
}

pub(crate) fn span_of(tokens: &[Token], range: &std::ops::Range<usize>) -> Span {
    if range.is_empty() || range.start >= tokens.len() {
        return 0..0;
    }
    let start = tokens[range.start].span.start;
    let end = tokens[range.end.min(tokens.len()) - 1].span.end;
    start..end
}
