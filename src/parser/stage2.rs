//! Stage 2 — structural parsing (spec §4.4).
//!
//! A combinator-style scan that recognizes the four top-level statement
//! shapes and slices the token stream into clause ranges. Clause content
//! is left as opaque token ranges for stage 4 to parse; this stage only
//! decides where one clause ends and the next begins.

use super::{ClauseSection, RawClause};
use crate::ast::StatementKind;
use crate::diag::Diag;
use crate::token::{Token, TokenKind};

pub(crate) struct RawStatement {
    pub kind: StatementKind,
    pub clauses: Vec<RawClause>,
}

pub fn run(tokens: &[Token], diagnostics: &mut Vec<Diag>) -> Option<RawStatement> {
    let kind = detect_statement_kind(tokens)?;
    if kind.is_none() {
        diagnostics.push(
            Diag::error("expected one of SELECT, INSERT, UPDATE, DELETE")
                .with_primary_label(0..tokens.first().map(|t| t.span.end).unwrap_or(0), "here"),
        );
        return None;
    }
    let kind = kind.unwrap();
    let clauses = split_clauses(tokens, kind);
    Some(RawStatement { kind, clauses })
}

fn detect_statement_kind(tokens: &[Token]) -> Option<Option<StatementKind>> {
    for token in tokens {
        let TokenKind::Keyword(kw) = &token.kind else { continue };
        match kw.to_ascii_uppercase().as_str() {
            "SELECT" => return Some(Some(StatementKind::Select)),
            "INSERT" => return Some(Some(StatementKind::Insert)),
            "UPDATE" => return Some(Some(StatementKind::Update)),
            "DELETE" => return Some(Some(StatementKind::Delete)),
            "WITH" => continue,
            _ => continue,
        }
    }
    Some(None)
}

fn keyword_at(tokens: &[Token], i: usize) -> Option<String> {
    match &tokens.get(i)?.kind {
        TokenKind::Keyword(k) => Some(k.to_ascii_uppercase()),
        _ => None,
    }
}

fn next_nontrivia(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].kind.is_trivia())
}

/// Scans for a clause-starting keyword at depth 0, returning the section
/// and how many tokens the marker itself consumes (e.g. `GROUP BY` is 2
/// keyword tokens, possibly with trivia between them).
fn clause_marker(tokens: &[Token], i: usize, stmt_kind: StatementKind) -> Option<(ClauseSection, usize)> {
    let kw = keyword_at(tokens, i)?;
    match kw.as_str() {
        "WITH" => Some((ClauseSection::With, 1)),
        "SELECT" => Some((ClauseSection::Select, 1)),
        "FROM" if stmt_kind == StatementKind::Select => Some((ClauseSection::From, 1)),
        "WHERE" => Some((ClauseSection::Where, 1)),
        "HAVING" => Some((ClauseSection::Having, 1)),
        "LIMIT" => Some((ClauseSection::Limit, 1)),
        "OFFSET" => Some((ClauseSection::Offset, 1)),
        "INSERT" => Some((ClauseSection::Insert, 1)),
        "VALUES" => Some((ClauseSection::Values, 1)),
        "UPDATE" => Some((ClauseSection::Update, 1)),
        "SET" if stmt_kind == StatementKind::Update => Some((ClauseSection::Set, 1)),
        "DELETE" => Some((ClauseSection::Delete, 1)),
        "RETURNING" => Some((ClauseSection::Returning, 1)),
        "GROUP" => {
            let next = next_nontrivia(tokens, i + 1)?;
            if keyword_at(tokens, next).as_deref() == Some("BY") {
                Some((ClauseSection::GroupBy, next - i + 1))
            } else {
                None
            }
        }
        "ORDER" => {
            let next = next_nontrivia(tokens, i + 1)?;
            if keyword_at(tokens, next).as_deref() == Some("BY") {
                Some((ClauseSection::OrderBy, next - i + 1))
            } else {
                None
            }
        }
        "ON" => {
            let next = next_nontrivia(tokens, i + 1)?;
            if keyword_at(tokens, next).as_deref() == Some("CONFLICT") {
                Some((ClauseSection::OnConflict, next - i + 1))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn split_clauses(tokens: &[Token], stmt_kind: StatementKind) -> Vec<RawClause> {
    let mut boundaries: Vec<(ClauseSection, usize)> = Vec::new();
    let mut depth = 0i32;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            if let Some((section, consumed)) = clause_marker(tokens, i, stmt_kind) {
                boundaries.push((section, i));
                i += consumed;
                continue;
            }
        }
        i += 1;
    }

    let mut clauses = Vec::with_capacity(boundaries.len());
    for (idx, &(section, start)) in boundaries.iter().enumerate() {
        let end = boundaries.get(idx + 1).map(|&(_, s)| s).unwrap_or(tokens.len());
        clauses.push(RawClause { section, range: start..end });
    }
    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{tokenize, Dialect};

    fn clauses_for(source: &str) -> (StatementKind, Vec<ClauseSection>) {
        let result = tokenize(source, Dialect::Postgres);
        let raw = run(&result.tokens, &mut Vec::new()).unwrap();
        (raw.kind, raw.clauses.iter().map(|c| c.section).collect())
    }

    #[test]
    fn splits_simple_select_into_select_and_from() {
        let (kind, sections) = clauses_for("SELECT id FROM users");
        assert_eq!(kind, StatementKind::Select);
        assert_eq!(sections, vec![ClauseSection::Select, ClauseSection::From]);
    }

    #[test]
    fn splits_select_with_where_and_order_by() {
        let (_, sections) = clauses_for("SELECT id FROM users WHERE id > 1 ORDER BY id DESC");
        assert_eq!(
            sections,
            vec![ClauseSection::Select, ClauseSection::From, ClauseSection::Where, ClauseSection::OrderBy]
        );
    }

    #[test]
    fn recognizes_insert_statement() {
        let (kind, sections) = clauses_for("INSERT INTO users (id) VALUES (1)");
        assert_eq!(kind, StatementKind::Insert);
        assert_eq!(sections, vec![ClauseSection::Insert, ClauseSection::Values]);
    }

    #[test]
    fn recognizes_update_statement_with_set() {
        let (kind, sections) = clauses_for("UPDATE users SET name = 'x' WHERE id = 1");
        assert_eq!(kind, StatementKind::Update);
        assert_eq!(sections, vec![ClauseSection::Update, ClauseSection::Set, ClauseSection::Where]);
    }

    #[test]
    fn recognizes_delete_statement() {
        let (kind, sections) = clauses_for("DELETE FROM users WHERE id = 1");
        assert_eq!(kind, StatementKind::Delete);
        assert_eq!(sections, vec![ClauseSection::Delete, ClauseSection::Where]);
    }

    #[test]
    fn keyword_inside_parens_is_not_a_new_clause() {
        let (_, sections) = clauses_for("SELECT (SELECT 1 FROM dual) FROM users");
        assert_eq!(sections, vec![ClauseSection::Select, ClauseSection::From]);
    }
}
