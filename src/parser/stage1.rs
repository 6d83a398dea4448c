//! Stage 1 — basic validation and dummy-literal injection (spec §4.3).

use crate::diag::Diag;
use crate::token::{DirectiveKind, Token, TokenKind};

/// Validates (I1) (I2) (I3), strips exactly one trailing semicolon, and
/// inserts a `DUMMY_LITERAL` token after any `/*= */`/`/*$ */` directive
/// not already followed by a literal. Returns the processed stream;
/// callers should treat a non-empty `diagnostics` containing an error as
/// reason to stop before stage 2.
pub fn run(tokens: &[Token], diagnostics: &mut Vec<Diag>) -> Vec<Token> {
    validate_parens(tokens, diagnostics);
    validate_directive_balance(tokens, diagnostics);
    let without_semicolon = validate_and_strip_semicolon(tokens, diagnostics);
    inject_dummy_literals(&without_semicolon)
}

fn validate_parens(tokens: &[Token], diagnostics: &mut Vec<Diag>) {
    let mut stack = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::LParen => stack.push(token.span.clone()),
            TokenKind::RParen => {
                if stack.pop().is_none() {
                    diagnostics.push(
                        SnapSqlDiag::unmatched_parens(token.span.clone()),
                    );
                }
            }
            _ => {}
        }
    }
    for span in stack {
        diagnostics.push(SnapSqlDiag::unmatched_parens(span));
    }
}

fn validate_directive_balance(tokens: &[Token], diagnostics: &mut Vec<Diag>) {
    let mut stack: Vec<(DirectiveKind, std::ops::Range<usize>)> = Vec::new();
    for token in tokens {
        let Some(directive) = token.kind.directive() else { continue };
        match directive.kind {
            DirectiveKind::If | DirectiveKind::For => stack.push((directive.kind.clone(), token.span.clone())),
            DirectiveKind::ElseIf | DirectiveKind::Else => {
                if !matches!(stack.last(), Some((DirectiveKind::If, _))) {
                    diagnostics.push(SnapSqlDiag::directive_without_if(token.span.clone(), &directive.kind));
                }
            }
            DirectiveKind::End => {
                if stack.pop().is_none() {
                    diagnostics.push(SnapSqlDiag::end_without_opener(token.span.clone()));
                }
            }
            DirectiveKind::Substitution | DirectiveKind::Constant | DirectiveKind::Environment => {}
        }
    }
    for (kind, span) in stack {
        diagnostics.push(SnapSqlDiag::unmatched_directive(span, &kind));
    }
}

fn validate_and_strip_semicolon(tokens: &[Token], diagnostics: &mut Vec<Diag>) -> Vec<Token> {
    let semicolon_positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| matches!(t.kind, TokenKind::Semicolon))
        .map(|(i, _)| i)
        .collect();

    if semicolon_positions.is_empty() {
        return tokens.to_vec();
    }

    let last_semicolon = *semicolon_positions.last().unwrap();
    let trailing_ok = tokens[last_semicolon + 1..].iter().all(|t| {
        matches!(t.kind, TokenKind::Whitespace | TokenKind::Eof)
            || matches!(&t.kind, TokenKind::BlockComment { directive: None, .. })
            || matches!(t.kind, TokenKind::LineComment(_))
    });

    let drop_index = if trailing_ok { Some(last_semicolon) } else { None };

    for &pos in &semicolon_positions {
        if Some(pos) != drop_index {
            diagnostics.push(SnapSqlDiag::semicolon_not_at_end(tokens[pos].span.clone()));
        }
    }

    tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != drop_index)
        .map(|(_, t)| t.clone())
        .collect()
}

fn inject_dummy_literals(tokens: &[Token]) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        out.push(token.clone());
        let Some(directive) = token.kind.directive() else { continue };
        if !matches!(directive.kind, DirectiveKind::Substitution | DirectiveKind::Constant) {
            continue;
        }
        let next_meaningful = tokens[i + 1..].iter().find(|t| !matches!(t.kind, TokenKind::Whitespace));
        let already_literal = matches!(next_meaningful, Some(t) if t.kind.is_literal());
        if !already_literal {
            let name = directive.payload.clone();
            let at = token.span.end;
            out.push(Token::new(TokenKind::DummyLiteral(name), at..at));
        }
    }
    out
}

/// Small local helper so stage 1 doesn't need to depend on the full
/// `SnapSqlError` enum for positional-only diagnostics; stage 4 onward
/// build `SnapSqlError` values directly and convert via `to_diag`.
struct SnapSqlDiag;

impl SnapSqlDiag {
    fn unmatched_parens(span: crate::ast::Span) -> Diag {
        crate::error::SnapSqlError::UnmatchedParens { span }.to_diag()
    }
    fn unmatched_directive(span: crate::ast::Span, kind: &DirectiveKind) -> Diag {
        crate::error::SnapSqlError::UnmatchedDirective { span, directive: format!("{kind:?}").to_lowercase() }
            .to_diag()
    }
    fn directive_without_if(span: crate::ast::Span, kind: &DirectiveKind) -> Diag {
        crate::error::SnapSqlError::DirectiveWithoutIf { span, directive: format!("{kind:?}").to_lowercase() }
            .to_diag()
    }
    fn end_without_opener(span: crate::ast::Span) -> Diag {
        crate::error::SnapSqlError::EndWithoutOpener { span }.to_diag()
    }
    fn semicolon_not_at_end(span: crate::ast::Span) -> Diag {
        crate::error::SnapSqlError::SemicolonNotAtEnd { span }.to_diag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{tokenize, Dialect};

    fn run_tokens(source: &str) -> (Vec<Token>, Vec<Diag>) {
        let result = tokenize(source, Dialect::Postgres);
        let mut diagnostics = result.diagnostics;
        let out = run(&result.tokens, &mut diagnostics);
        (out, diagnostics)
    }

    #[test]
    fn matched_parens_produce_no_error() {
        let (_, diags) = run_tokens("SELECT (1 + 2)");
        assert!(diags.is_empty());
    }

    #[test]
    fn unmatched_close_paren_is_an_error() {
        let (_, diags) = run_tokens("SELECT 1)");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some("UnmatchedParens"));
    }

    #[test]
    fn unmatched_open_paren_is_an_error() {
        let (_, diags) = run_tokens("SELECT (1");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some("UnmatchedParens"));
    }

    #[test]
    fn balanced_if_end_produces_no_error() {
        let (_, diags) = run_tokens("SELECT 1 /*# if x */ , 2 /*# end */");
        assert!(diags.is_empty());
    }

    #[test]
    fn end_without_opener_is_an_error() {
        let (_, diags) = run_tokens("SELECT 1 /*# end */");
        assert_eq!(diags[0].code.as_deref(), Some("EndWithoutOpener"));
    }

    #[test]
    fn elseif_without_if_is_an_error() {
        let (_, diags) = run_tokens("SELECT 1 /*# elseif x */");
        assert_eq!(diags[0].code.as_deref(), Some("DirectiveWithoutIf"));
    }

    #[test]
    fn trailing_semicolon_is_stripped() {
        let (out, diags) = run_tokens("SELECT 1;");
        assert!(diags.is_empty());
        assert!(!out.iter().any(|t| matches!(t.kind, TokenKind::Semicolon)));
    }

    #[test]
    fn non_trailing_semicolon_is_an_error() {
        let (_, diags) = run_tokens("SELECT 1; SELECT 2;");
        assert_eq!(diags.iter().filter(|d| d.code.as_deref() == Some("SemicolonNotAtEnd")).count(), 1);
    }

    #[test]
    fn dummy_literal_inserted_after_bare_substitution() {
        let (out, _) = run_tokens("SELECT /*= name */");
        assert!(out.iter().any(|t| matches!(t.kind, TokenKind::DummyLiteral(_))));
    }

    #[test]
    fn dummy_literal_not_inserted_when_literal_already_present() {
        let (out, _) = run_tokens("SELECT /*= name */'alice'");
        assert!(!out.iter().any(|t| matches!(t.kind, TokenKind::DummyLiteral(_))));
    }
}
