//! The closed error taxonomy (spec §7) and its conversion to [`Diag`].

use crate::ast::Span;
use crate::diag::Diag;

/// Every error/warning this crate can produce. One variant per taxonomy
/// entry; `#[non_exhaustive]` because the taxonomy is closed *for this
/// crate's own dispatch* but downstream matches should still handle
/// future additions gracefully.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum SnapSqlError {
    UnterminatedComment { span: Span },
    UnterminatedString { span: Span },

    UnmatchedParens { span: Span },
    UnmatchedDirective { span: Span, directive: String },
    DirectiveWithoutIf { span: Span, directive: String },
    EndWithoutOpener { span: Span },
    SemicolonNotAtEnd { span: Span },
    DirectiveSpansClauses { open_span: Span, close_span: Span },

    UnknownTable { span: Span, name: String, candidates: Vec<String> },
    UnknownColumn { span: Span, name: String, candidates: Vec<String> },
    AmbiguousColumn { span: Span, name: String, matches: Vec<String> },
    SchemaNotFound { span: Span, name: String },
    TypeMismatch { span: Span, expected: String, found: String },
    NullabilityViolation { span: Span, field: String },

    InvalidExpression { span: Span, expr: String, reason: String },
    ExpressionNotList { span: Span, expr: String },
    ParameterNotFound { span: Span, path: String, candidates: Vec<String> },

    CircularDependency { span: Span, cycle: Vec<String> },
    SubqueryNotResolved { span: Span, id: String },

    MissingTargetTable { span: Span },
    InvalidReturningClause { span: Span, reason: String },
}

impl SnapSqlError {
    /// Whether this error aborts its stage (an *Error*) or is attached to
    /// the result while inference degrades gracefully (a *Warning*).
    pub fn is_warning(&self) -> bool {
        matches!(self, SnapSqlError::TypeMismatch { .. } | SnapSqlError::NullabilityViolation { .. })
    }

    pub fn span(&self) -> Span {
        match self {
            SnapSqlError::UnterminatedComment { span }
            | SnapSqlError::UnterminatedString { span }
            | SnapSqlError::UnmatchedParens { span }
            | SnapSqlError::UnmatchedDirective { span, .. }
            | SnapSqlError::DirectiveWithoutIf { span, .. }
            | SnapSqlError::EndWithoutOpener { span }
            | SnapSqlError::SemicolonNotAtEnd { span }
            | SnapSqlError::UnknownTable { span, .. }
            | SnapSqlError::UnknownColumn { span, .. }
            | SnapSqlError::AmbiguousColumn { span, .. }
            | SnapSqlError::SchemaNotFound { span, .. }
            | SnapSqlError::TypeMismatch { span, .. }
            | SnapSqlError::NullabilityViolation { span, .. }
            | SnapSqlError::InvalidExpression { span, .. }
            | SnapSqlError::ExpressionNotList { span, .. }
            | SnapSqlError::ParameterNotFound { span, .. }
            | SnapSqlError::CircularDependency { span, .. }
            | SnapSqlError::SubqueryNotResolved { span, .. }
            | SnapSqlError::MissingTargetTable { span }
            | SnapSqlError::InvalidReturningClause { span, .. } => span.clone(),
            SnapSqlError::DirectiveSpansClauses { open_span, .. } => open_span.clone(),
        }
    }

    /// Renders this error as an internal [`Diag`], the single policy point
    /// deciding what each variant says.
    pub fn to_diag(&self) -> Diag {
        match self {
            SnapSqlError::UnterminatedComment { span } => Diag::error("unterminated block comment")
                .with_primary_label(span.clone(), "comment opened here is never closed")
                .with_code("UnterminatedComment"),
            SnapSqlError::UnterminatedString { span } => Diag::error("unterminated string literal")
                .with_primary_label(span.clone(), "string opened here is never closed")
                .with_code("UnterminatedString"),
            SnapSqlError::UnmatchedParens { span } => Diag::error("unmatched parenthesis")
                .with_primary_label(span.clone(), "this parenthesis has no match")
                .with_code("UnmatchedParens"),
            SnapSqlError::UnmatchedDirective { span, directive } => {
                Diag::error(format!("unmatched directive '{directive}'"))
                    .with_primary_label(span.clone(), "opened here, never closed")
                    .with_code("UnmatchedDirective")
            }
            SnapSqlError::DirectiveWithoutIf { span, directive } => {
                Diag::error(format!("'{directive}' without a matching 'if'"))
                    .with_primary_label(span.clone(), "no enclosing 'if'")
                    .with_code("DirectiveWithoutIf")
            }
            SnapSqlError::EndWithoutOpener { span } => Diag::error("'end' without a matching opener")
                .with_primary_label(span.clone(), "no enclosing 'if' or 'for'")
                .with_code("EndWithoutOpener"),
            SnapSqlError::SemicolonNotAtEnd { span } => {
                Diag::error("semicolon is only allowed once, at the very end of the statement")
                    .with_primary_label(span.clone(), "unexpected semicolon")
                    .with_code("SemicolonNotAtEnd")
            }
            SnapSqlError::DirectiveSpansClauses { open_span, close_span } => {
                Diag::error("directive block spans more than one SQL clause")
                    .with_primary_label(open_span.clone(), "block opened in one clause")
                    .with_secondary_label(close_span.clone(), "but closed in another")
                    .with_code("DirectiveSpansClauses")
            }
            SnapSqlError::UnknownTable { span, name, candidates } => {
                let mut diag = Diag::error(format!("unknown table '{name}'"))
                    .with_primary_label(span.clone(), "no such table in the provided schema")
                    .with_code("UnknownTable");
                if let Some(help) = suggestion_help(candidates) {
                    diag = diag.with_help(help);
                }
                diag
            }
            SnapSqlError::UnknownColumn { span, name, candidates } => {
                let mut diag = Diag::error(format!("unknown column '{name}'"))
                    .with_primary_label(span.clone(), "no such column in scope")
                    .with_code("UnknownColumn");
                if let Some(help) = suggestion_help(candidates) {
                    diag = diag.with_help(help);
                }
                diag
            }
            SnapSqlError::AmbiguousColumn { span, name, matches } => {
                Diag::error(format!("ambiguous column '{name}'"))
                    .with_primary_label(span.clone(), "could refer to more than one table")
                    .with_note(format!("candidates: {}", matches.join(", ")))
                    .with_code("AmbiguousColumn")
            }
            SnapSqlError::SchemaNotFound { span, name } => {
                Diag::error(format!("schema '{name}' was not provided"))
                    .with_primary_label(span.clone(), "referenced here")
                    .with_code("SchemaNotFound")
            }
            SnapSqlError::TypeMismatch { span, expected, found } => {
                Diag::warning(format!("type mismatch: expected {expected}, found {found}"))
                    .with_primary_label(span.clone(), "here")
                    .with_code("TypeMismatch")
            }
            SnapSqlError::NullabilityViolation { span, field } => {
                Diag::warning(format!("field '{field}' may be null in a context that assumes non-null"))
                    .with_primary_label(span.clone(), "here")
                    .with_code("NullabilityViolation")
            }
            SnapSqlError::InvalidExpression { span, expr, reason } => {
                Diag::error(format!("invalid expression '{expr}': {reason}"))
                    .with_primary_label(span.clone(), "here")
                    .with_code("InvalidExpression")
            }
            SnapSqlError::ExpressionNotList { span, expr } => {
                Diag::error(format!("expression '{expr}' did not evaluate to a list"))
                    .with_primary_label(span.clone(), "used as a 'for' loop source here")
                    .with_code("ExpressionNotList")
            }
            SnapSqlError::ParameterNotFound { span, path, candidates } => {
                let mut diag = Diag::error(format!("parameter '{path}' is not declared"))
                    .with_primary_label(span.clone(), "referenced here")
                    .with_code("ParameterNotFound");
                if let Some(help) = suggestion_help(candidates) {
                    diag = diag.with_help(help);
                }
                diag
            }
            SnapSqlError::CircularDependency { span, cycle } => {
                Diag::error(format!("circular dependency: {}", cycle.join(" -> ")))
                    .with_primary_label(span.clone(), "introduced here")
                    .with_code("CircularDependency")
            }
            SnapSqlError::SubqueryNotResolved { span, id } => {
                Diag::error(format!("subquery '{id}' could not be resolved"))
                    .with_primary_label(span.clone(), "here")
                    .with_code("SubqueryNotResolved")
            }
            SnapSqlError::MissingTargetTable { span } => Diag::error("statement is missing a target table")
                .with_primary_label(span.clone(), "here")
                .with_code("MissingTargetTable"),
            SnapSqlError::InvalidReturningClause { span, reason } => {
                Diag::error(format!("invalid RETURNING clause: {reason}"))
                    .with_primary_label(span.clone(), "here")
                    .with_code("InvalidReturningClause")
            }
        }
    }
}

/// Builds a "did you mean ...?" help string from up to 3 Levenshtein-close
/// candidates. `candidates` is assumed pre-filtered to distance ≤ 3 and
/// already sorted by distance.
fn suggestion_help(candidates: &[String]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let top: Vec<&str> = candidates.iter().take(3).map(|s| s.as_str()).collect();
    Some(format!("did you mean {}?", top.join(" or ")))
}

/// Finds the top-3 closest names to `target` within Levenshtein distance 3,
/// sorted by increasing distance.
pub fn closest_candidates<'a>(target: &str, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = names
        .into_iter()
        .map(|name| (levenshtein(target, name), name))
        .filter(|(dist, _)| *dist <= 3)
        .collect();
    scored.sort_by_key(|(dist, name)| (*dist, name.to_string()));
    scored.into_iter().take(3).map(|(_, name)| name.to_string()).collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + row[j].min(row[j - 1]).min(prev_diag)
            };
            prev_diag = temp;
        }
    }
    row[b.len()]
}
