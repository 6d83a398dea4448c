//! Stage 4 — clause-content validation (spec §4.6).
//!
//! Parses the interior of every clause range stage 2 found into the
//! fully-typed AST nodes used from stage 5 onward.

use super::stage2::{self, RawStatement};
use super::{span_of, ClauseSection, ParserOptions, RawClause};
use crate::ast::*;
use crate::diag::Diag;
use crate::token::{Dialect, Token, TokenKind};

pub fn run(
    tokens: &[Token],
    raw: &RawStatement,
    source: &str,
    dialect: Dialect,
    options: ParserOptions,
    diagnostics: &mut Vec<Diag>,
) -> Option<Statement> {
    let full_span = span_of(tokens, &(0..tokens.len()));
    let mut statement = Statement::new(raw.kind, full_span.clone());

    for clause in &raw.clauses {
        match clause.section {
            ClauseSection::Select | ClauseSection::Returning => {
                let fields = parse_field_list(tokens, source, clause, diagnostics, options);
                if clause.section == ClauseSection::Select {
                    statement.select = fields;
                } else {
                    statement.returning = fields;
                }
            }
            ClauseSection::From => statement.from = Some(parse_from(tokens, source, clause)),
            ClauseSection::Where => statement.where_clause = Some(parse_condition(tokens, source, clause)),
            ClauseSection::Having => statement.having = Some(parse_condition(tokens, source, clause)),
            ClauseSection::GroupBy => statement.group_by = Some(parse_group_by(tokens, source, clause)),
            ClauseSection::OrderBy => statement.order_by = Some(parse_order_by(tokens, source, clause)),
            ClauseSection::Limit => statement.limit = Some(parse_limit_offset(tokens, source, clause)),
            ClauseSection::Offset => statement.offset = Some(parse_limit_offset(tokens, source, clause)),
            ClauseSection::Insert => {
                statement.insert = Some(parse_insert_target(tokens, source, clause, raw));
            }
            ClauseSection::Values => {
                if let Some(insert) = statement.insert.as_mut() {
                    insert.values = parse_values(tokens, source, clause);
                }
            }
            ClauseSection::OnConflict => {
                if let Some(insert) = statement.insert.as_mut() {
                    insert.on_conflict = Some(parse_on_conflict(tokens, source, clause));
                }
            }
            ClauseSection::Update => statement.update = Some(parse_update_target(tokens, source, clause)),
            ClauseSection::Set => {
                if let Some(update) = statement.update.as_mut() {
                    update.assignments = parse_assignments(tokens, source, clause);
                }
            }
            ClauseSection::Delete => statement.delete = Some(parse_delete_target(tokens, source, clause)),
            ClauseSection::With => {
                statement.with = Some(parse_with(tokens, source, clause, dialect, options, diagnostics));
            }
        }
    }

    if raw.kind == StatementKind::Insert && statement.insert.is_none() {
        diagnostics.push(
            crate::error::SnapSqlError::MissingTargetTable { span: full_span.clone() }.to_diag(),
        );
    }

    Some(statement)
}

fn text_of(source: &str, tokens: &[Token], range: &std::ops::Range<usize>) -> String {
    let span = span_of(tokens, range);
    source.get(span.clone()).unwrap_or("").trim().to_string()
}

/// Splits a clause's inner tokens (after its own leading marker keywords)
/// on top-level (paren-depth 0) commas, returning one token-index range per
/// segment.
fn split_top_level_commas(tokens: &[Token], range: &std::ops::Range<usize>, skip_keywords: usize) -> Vec<std::ops::Range<usize>> {
    let mut start = range.start;
    let mut skipped = 0;
    while start < range.end && skipped < skip_keywords {
        if !tokens[start].kind.is_trivia() {
            skipped += 1;
        }
        start += 1;
    }
    let mut segments = Vec::new();
    let mut depth = 0i32;
    let mut seg_start = start;
    let mut i = start;
    while i < range.end {
        match tokens[i].kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            TokenKind::Comma if depth == 0 => {
                segments.push(seg_start..i);
                seg_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if seg_start < range.end {
        segments.push(seg_start..range.end);
    }
    segments.into_iter().filter(|r| !r.is_empty()).collect()
}

fn nontrivia_tokens<'a>(tokens: &'a [Token], range: &std::ops::Range<usize>) -> Vec<(usize, &'a Token)> {
    range.clone().filter_map(|i| (!tokens[i].kind.is_trivia()).then(|| (i, &tokens[i]))).collect()
}

fn parse_field_list(
    tokens: &[Token],
    source: &str,
    clause: &RawClause,
    _diagnostics: &mut [Diag],
    _options: ParserOptions,
) -> Vec<SelectField> {
    let segments = split_top_level_commas(tokens, &clause.range, 1);
    segments.iter().map(|seg| parse_select_field(tokens, source, seg)).collect()
}

fn parse_select_field(tokens: &[Token], source: &str, range: &std::ops::Range<usize>) -> SelectField {
    let span = span_of(tokens, range);
    let nontrivia = nontrivia_tokens(tokens, range);

    // Drop a trailing `AS alias` or bare trailing identifier alias.
    let mut body_end = nontrivia.len();
    let mut alias = None;
    if body_end >= 2 {
        let last = nontrivia[body_end - 1].1;
        let penult = nontrivia[body_end - 2].1;
        if matches!(&penult.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("AS")) {
            if let TokenKind::Identifier(name) = &last.kind {
                alias = Some(name.to_string());
                body_end -= 2;
            }
        } else if let TokenKind::Identifier(_) = &last.kind {
            // implicit alias only when more than one token precedes it and
            // the field isn't a single bare identifier or qualified column
            if body_end >= 2 && !matches!(penult.kind, TokenKind::Operator(_)) {
                if let TokenKind::Identifier(name) = &last.kind {
                    if body_end > 1 {
                        alias = Some(name.to_string());
                        body_end -= 1;
                    }
                }
            }
        }
    }
    let body = &nontrivia[..body_end.min(nontrivia.len())];

    let explicit_type = extract_cast_type(body);
    let kind = classify_field(body);
    let text = text_of(source, tokens, range);

    SelectField { kind, text, alias, explicit_type, span }
}

fn extract_cast_type(body: &[(usize, &Token)]) -> Option<String> {
    if let Some((_, first)) = body.first() {
        if matches!(&first.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("CAST")) {
            if let Some(pos) = body.iter().position(|(_, t)| matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("AS"))) {
                if let Some((_, ty)) = body.get(pos + 1) {
                    return Some(token_text(ty));
                }
            }
        }
    }
    if let Some((_, last)) = body.last() {
        if matches!(&last.kind, TokenKind::Identifier(_) | TokenKind::Keyword(_)) {
            if body.len() >= 2 {
                if let TokenKind::Operator(op) = &body[body.len() - 2].1.kind {
                    if op.as_str() == "::" {
                        return Some(token_text(last));
                    }
                }
            }
        }
    }
    None
}

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Identifier(s) | TokenKind::Keyword(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn classify_field(body: &[(usize, &Token)]) -> FieldKind {
    if body.is_empty() {
        return FieldKind::Complex;
    }
    if body.len() == 1 {
        return match &body[0].1.kind {
            TokenKind::Number(_) | TokenKind::StringLiteral(_) | TokenKind::BooleanLiteral(_) => FieldKind::Literal,
            TokenKind::Keyword(k) if k.eq_ignore_ascii_case("NULL") => FieldKind::Literal,
            TokenKind::Identifier(_) => FieldKind::Single,
            _ => FieldKind::Complex,
        };
    }
    if body.len() == 3 {
        if let (TokenKind::Identifier(_), TokenKind::Operator(op), TokenKind::Identifier(_)) =
            (&body[0].1.kind, &body[1].1.kind, &body[2].1.kind)
        {
            if op.as_str() == "." {
                return FieldKind::TableQualified;
            }
        }
    }
    if matches!(&body[0].1.kind, TokenKind::Identifier(_) | TokenKind::Keyword(_))
        && matches!(body.get(1).map(|(_, t)| &t.kind), Some(TokenKind::LParen))
    {
        return FieldKind::Function;
    }
    FieldKind::Complex
}

fn parse_from(tokens: &[Token], source: &str, clause: &RawClause) -> FromClause {
    // Split the clause (after the leading FROM keyword) on JOIN keywords at
    // depth 0 to separate the base table list from join clauses.
    let mut depth = 0i32;
    let mut join_starts = Vec::new();
    let mut i = clause.range.start + 1;
    while i < clause.range.end {
        match tokens[i].kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            TokenKind::Keyword(ref k) if depth == 0 && is_join_start(k) => join_starts.push(i),
            _ => {}
        }
        i += 1;
    }

    let base_end = join_starts.first().copied().unwrap_or(clause.range.end);
    let base_range = clause.range.start + 1..base_end;
    let tables = split_top_level_commas(tokens, &base_range, 0)
        .iter()
        .map(|r| parse_table_ref(tokens, source, r))
        .collect();

    let mut joins = Vec::new();
    for (idx, &start) in join_starts.iter().enumerate() {
        let end = join_starts.get(idx + 1).copied().unwrap_or(clause.range.end);
        joins.push(parse_join(tokens, source, start..end));
    }

    FromClause { tables, joins }
}

fn is_join_start(keyword: &str) -> bool {
    matches!(
        keyword.to_ascii_uppercase().as_str(),
        "JOIN" | "INNER" | "LEFT" | "RIGHT" | "FULL" | "CROSS" | "NATURAL"
    )
}

fn parse_join(tokens: &[Token], source: &str, range: std::ops::Range<usize>) -> Join {
    let nontrivia = nontrivia_tokens(tokens, &range);
    let mut kind = JoinKind::Inner;
    let mut cursor = 0;
    if let Some((_, t)) = nontrivia.first() {
        if let TokenKind::Keyword(k) = &t.kind {
            kind = match k.to_ascii_uppercase().as_str() {
                "LEFT" => JoinKind::Left,
                "RIGHT" => JoinKind::Right,
                "FULL" => JoinKind::Full,
                "CROSS" => JoinKind::Cross,
                "NATURAL" => JoinKind::Natural,
                _ => JoinKind::Inner,
            };
            cursor = 1;
        }
    }
    // Skip past any remaining qualifier + the JOIN keyword itself.
    while cursor < nontrivia.len() {
        if let TokenKind::Keyword(k) = &nontrivia[cursor].1.kind {
            cursor += 1;
            if k.eq_ignore_ascii_case("JOIN") {
                break;
            }
            continue;
        }
        break;
    }

    let on_pos = nontrivia[cursor..]
        .iter()
        .position(|(_, t)| matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("ON")))
        .map(|p| p + cursor);

    let table_end_idx = on_pos.unwrap_or(nontrivia.len());
    let table_range = if cursor < nontrivia.len() && table_end_idx > cursor {
        nontrivia[cursor].0..nontrivia[table_end_idx.min(nontrivia.len()) - 1].0 + 1
    } else {
        range.clone()
    };
    let table = parse_table_ref(tokens, source, &table_range);

    let on = on_pos.map(|p| {
        let on_token_idx = nontrivia[p].0;
        text_of(source, tokens, &(on_token_idx + 1..range.end))
    });

    Join { kind, table, on }
}

fn parse_table_ref(tokens: &[Token], source: &str, range: &std::ops::Range<usize>) -> TableRef {
    let span = span_of(tokens, range);
    let nontrivia = nontrivia_tokens(tokens, range);
    let names: Vec<&Token> = nontrivia
        .iter()
        .map(|(_, t)| *t)
        .filter(|t| matches!(t.kind, TokenKind::Identifier(_)))
        .collect();
    let has_as = nontrivia.iter().any(|(_, t)| matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("AS")));

    let (schema, table, alias) = match names.len() {
        0 => (None, String::new(), None),
        1 => (None, ident_text(names[0]), None),
        2 if has_as => (None, ident_text(names[0]), Some(ident_text(names[1]))),
        2 => {
            // Disambiguate `schema.table` (joined by a `.` operator) from
            // `table alias` (joined by nothing but whitespace).
            let dot_between = nontrivia
                .windows(3)
                .any(|w| matches!(&w[1].1.kind, TokenKind::Operator(op) if op.as_str() == "."));
            if dot_between {
                (Some(ident_text(names[0])), ident_text(names[1]), None)
            } else {
                (None, ident_text(names[0]), Some(ident_text(names[1])))
            }
        }
        _ => (Some(ident_text(names[0])), ident_text(names[1]), Some(ident_text(names[2]))),
    };

    TableRef { schema, table, alias, span }
}

fn ident_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Identifier(s) | TokenKind::DelimitedIdentifier(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn parse_condition(tokens: &[Token], source: &str, clause: &RawClause) -> ConditionClause {
    let range = clause.range.start + 1..clause.range.end;
    ConditionClause { text: text_of(source, tokens, &range), span: span_of(tokens, &range) }
}

fn parse_group_by(tokens: &[Token], source: &str, clause: &RawClause) -> GroupByClause {
    let segments = split_top_level_commas(tokens, &clause.range, 2);
    GroupByClause { fields: segments.iter().map(|r| text_of(source, tokens, r)).collect() }
}

fn parse_order_by(tokens: &[Token], source: &str, clause: &RawClause) -> OrderByClause {
    let segments = split_top_level_commas(tokens, &clause.range, 2);
    let items = segments
        .iter()
        .map(|range| {
            let nontrivia = nontrivia_tokens(tokens, range);
            let mut direction = None;
            let mut nulls = None;
            let mut expr_end = nontrivia.len();
            for (idx, (_, t)) in nontrivia.iter().enumerate() {
                if let TokenKind::Keyword(k) = &t.kind {
                    let upper = k.to_ascii_uppercase();
                    match upper.as_str() {
                        "ASC" => {
                            direction = Some(Direction::Asc);
                            expr_end = expr_end.min(idx);
                        }
                        "DESC" => {
                            direction = Some(Direction::Desc);
                            expr_end = expr_end.min(idx);
                        }
                        "NULLS" => {
                            expr_end = expr_end.min(idx);
                            if let Some((_, next)) = nontrivia.get(idx + 1) {
                                if let TokenKind::Keyword(k2) = &next.kind {
                                    nulls = match k2.to_ascii_uppercase().as_str() {
                                        "FIRST" => Some(NullsPlacement::First),
                                        "LAST" => Some(NullsPlacement::Last),
                                        _ => None,
                                    };
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            let expr_range = if expr_end > 0 && !nontrivia.is_empty() {
                nontrivia[0].0..nontrivia[expr_end.min(nontrivia.len()) - 1].0 + 1
            } else {
                range.clone()
            };
            OrderByItem { expr: text_of(source, tokens, &expr_range), direction, nulls }
        })
        .collect();
    OrderByClause { items }
}

fn parse_limit_offset(tokens: &[Token], source: &str, clause: &RawClause) -> LimitOffsetClause {
    let range = clause.range.start + 1..clause.range.end;
    let nontrivia = nontrivia_tokens(tokens, &range);
    let value = match nontrivia.as_slice() {
        [(_, t)] => match &t.kind {
            TokenKind::Number(n) => n.parse::<i64>().map(LimitValue::Literal).unwrap_or(LimitValue::Expression(n.to_string())),
            TokenKind::Identifier(name) => LimitValue::Param(name.to_string()),
            TokenKind::DummyLiteral(name) => LimitValue::Param(name.to_string()),
            _ => LimitValue::Expression(text_of(source, tokens, &range)),
        },
        _ => LimitValue::Expression(text_of(source, tokens, &range)),
    };
    LimitOffsetClause { value }
}

fn parse_insert_target(tokens: &[Token], source: &str, clause: &RawClause, _raw: &RawStatement) -> InsertClause {
    let nontrivia = nontrivia_tokens(tokens, &clause.range);
    // INSERT [INTO] table [(col, col, ...)]
    let mut cursor = 1; // skip INSERT
    if let Some((_, t)) = nontrivia.get(cursor) {
        if matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("INTO")) {
            cursor += 1;
        }
    }
    let table_start_idx = nontrivia.get(cursor).map(|(i, _)| *i).unwrap_or(clause.range.end);
    let paren_idx = nontrivia[cursor..].iter().position(|(_, t)| matches!(t.kind, TokenKind::LParen));
    let table_end_idx = match paren_idx {
        Some(p) => nontrivia[cursor + p].0,
        None => clause.range.end,
    };
    let table = parse_table_ref(tokens, source, &(table_start_idx..table_end_idx));

    let columns = if let Some(p) = paren_idx {
        let open = nontrivia[cursor + p].0;
        let close = find_matching_paren(tokens, open);
        split_top_level_commas(tokens, &(open + 1..close), 0)
            .iter()
            .map(|r| text_of(source, tokens, r))
            .collect()
    } else {
        Vec::new()
    };

    InsertClause { table, columns, values: ValuesClause::Tuples(Vec::new()), on_conflict: None }
}

fn find_matching_paren(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0i32;
    for i in open..tokens.len() {
        match tokens[i].kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    tokens.len().saturating_sub(1)
}

fn parse_values(tokens: &[Token], source: &str, clause: &RawClause) -> ValuesClause {
    let range = clause.range.start + 1..clause.range.end;
    let nontrivia = nontrivia_tokens(tokens, &range);
    if nontrivia.len() == 1 {
        if let TokenKind::DummyLiteral(name) = &nontrivia[0].1.kind {
            return ValuesClause::BulkVariable(name.to_string());
        }
        if let TokenKind::Identifier(name) = &nontrivia[0].1.kind {
            return ValuesClause::BulkVariable(name.to_string());
        }
    }
    let tuple_starts: Vec<usize> = nontrivia
        .iter()
        .filter(|(_, t)| matches!(t.kind, TokenKind::LParen))
        .map(|(i, _)| *i)
        .collect();
    let tuples = tuple_starts
        .iter()
        .map(|&open| {
            let close = find_matching_paren(tokens, open);
            split_top_level_commas(tokens, &(open + 1..close), 0)
                .iter()
                .map(|r| text_of(source, tokens, r))
                .collect()
        })
        .collect();
    ValuesClause::Tuples(tuples)
}

fn parse_on_conflict(tokens: &[Token], source: &str, clause: &RawClause) -> OnConflict {
    let nontrivia = nontrivia_tokens(tokens, &clause.range);
    let mut cursor = 2; // skip ON CONFLICT
    let mut target = None;
    if let Some((i, t)) = nontrivia.get(cursor) {
        if matches!(t.kind, TokenKind::LParen) {
            let close = find_matching_paren(tokens, *i);
            target = Some(text_of(source, tokens, &(i + 1..close)));
            while cursor < nontrivia.len() && nontrivia[cursor].0 <= close {
                cursor += 1;
            }
        }
    }
    let action = if nontrivia[cursor..].iter().any(|(_, t)| matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("NOTHING"))) {
        ConflictAction::DoNothing
    } else {
        let set_pos = nontrivia[cursor..]
            .iter()
            .position(|(_, t)| matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("SET")))
            .map(|p| p + cursor);
        match set_pos {
            Some(p) => {
                let start = nontrivia[p].0 + 1;
                ConflictAction::DoUpdate(parse_assignments_range(tokens, source, start..clause.range.end))
            }
            None => ConflictAction::DoNothing,
        }
    };
    OnConflict { target, action }
}

fn parse_update_target(tokens: &[Token], source: &str, clause: &RawClause) -> UpdateClause {
    let range = clause.range.start + 1..clause.range.end;
    UpdateClause { table: parse_table_ref(tokens, source, &range), assignments: Vec::new() }
}

fn parse_assignments(tokens: &[Token], source: &str, clause: &RawClause) -> Vec<(String, String)> {
    let range = clause.range.start + 1..clause.range.end;
    parse_assignments_range(tokens, source, range)
}

fn parse_assignments_range(tokens: &[Token], source: &str, range: std::ops::Range<usize>) -> Vec<(String, String)> {
    split_top_level_commas(tokens, &range, 0)
        .iter()
        .filter_map(|seg| {
            let nontrivia = nontrivia_tokens(tokens, seg);
            let eq_pos = nontrivia.iter().position(|(_, t)| matches!(&t.kind, TokenKind::Operator(op) if op.as_str() == "="))?;
            let column = text_of(source, tokens, &(nontrivia[0].0..nontrivia[eq_pos].0));
            let value = text_of(source, tokens, &(nontrivia[eq_pos].0 + 1..seg.end));
            Some((column, value))
        })
        .collect()
}

fn parse_delete_target(tokens: &[Token], source: &str, clause: &RawClause) -> DeleteClause {
    let nontrivia = nontrivia_tokens(tokens, &clause.range);
    let mut cursor = 1;
    if let Some((_, t)) = nontrivia.get(cursor) {
        if matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("FROM")) {
            cursor += 1;
        }
    }
    let start = nontrivia.get(cursor).map(|(i, _)| *i).unwrap_or(clause.range.end);
    DeleteClause { table: parse_table_ref(tokens, source, &(start..clause.range.end)) }
}

/// Parses `WITH [RECURSIVE] name [(cols)] AS (body) [, name2 AS (body2)]*`
/// into a [`WithClause`]. Each CTE body is re-entered through stage 2 and
/// this same stage so nested SELECTs get a real [`Statement`] rather than
/// opaque text, which is what lets stage 7 build real dependency edges.
fn parse_with(tokens: &[Token], source: &str, clause: &RawClause, dialect: Dialect, options: ParserOptions, diagnostics: &mut Vec<Diag>) -> WithClause {
    let nontrivia = nontrivia_tokens(tokens, &clause.range);
    let mut cursor = 1; // skip WITH
    let mut recursive = false;
    if let Some((_, t)) = nontrivia.get(cursor) {
        if matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("RECURSIVE")) {
            recursive = true;
            cursor += 1;
        }
    }

    let mut ctes = Vec::new();
    while let Some((name_idx, name_tok)) = nontrivia.get(cursor).copied() {
        let name = match &name_tok.kind {
            TokenKind::Identifier(n) | TokenKind::DelimitedIdentifier(n) => n.to_string(),
            _ => break,
        };
        cursor += 1;

        let mut columns = None;
        if let Some((i, t)) = nontrivia.get(cursor).copied() {
            if matches!(t.kind, TokenKind::LParen) {
                let close = find_matching_paren(tokens, i);
                columns = Some(
                    split_top_level_commas(tokens, &(i + 1..close), 0)
                        .into_iter()
                        .map(|range| text_of(source, tokens, &range))
                        .collect(),
                );
                while cursor < nontrivia.len() && nontrivia[cursor].0 <= close {
                    cursor += 1;
                }
            }
        }

        if let Some((_, t)) = nontrivia.get(cursor) {
            if matches!(&t.kind, TokenKind::Keyword(k) if k.eq_ignore_ascii_case("AS")) {
                cursor += 1;
            }
        }

        let Some((open, open_tok)) = nontrivia.get(cursor).copied() else { break };
        if !matches!(open_tok.kind, TokenKind::LParen) {
            break;
        }
        let close = find_matching_paren(tokens, open);
        let body_tokens = &tokens[open + 1..close];
        let body = stage2::run(body_tokens, diagnostics)
            .and_then(|raw| run(body_tokens, &raw, source, dialect, options, diagnostics))
            .unwrap_or_else(|| Statement::new(StatementKind::Select, span_of(body_tokens, &(0..body_tokens.len()))));

        ctes.push(CteDefinition {
            name,
            recursive,
            columns,
            body: Box::new(body),
            span: span_of(tokens, &(name_idx..close + 1)),
        });

        while cursor < nontrivia.len() && nontrivia[cursor].0 <= close {
            cursor += 1;
        }
        match nontrivia.get(cursor) {
            Some((_, t)) if matches!(t.kind, TokenKind::Comma) => cursor += 1,
            _ => break,
        }
    }

    WithClause { ctes }
}
