//! Keyword recognition for directive-annotated SQL.
//!
//! Keywords are case-insensitive; the tokenizer preserves the source's
//! original casing in the token text and only uses this table to decide
//! whether a scanned word should be classified as
//! [`TokenKind::Keyword`](super::TokenKind::Keyword) rather than
//! [`TokenKind::Identifier`](super::TokenKind::Identifier).

/// SQL keywords recognized across the three supported dialects. This is a
/// union, not a per-dialect table: a word reserved in only one dialect is
/// still classified as a keyword everywhere, since SnapSQL only needs to
/// recognize clause/operator boundaries, not reject dialect-foreign SQL.
const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "LIMIT", "OFFSET", "WITH",
    "RECURSIVE", "AS", "DISTINCT", "ALL", "UNION", "INTERSECT", "EXCEPT", "JOIN", "INNER", "LEFT",
    "RIGHT", "FULL", "CROSS", "NATURAL", "ON", "USING", "INSERT", "INTO", "VALUES", "UPDATE",
    "SET", "DELETE", "RETURNING", "CONFLICT", "DO", "NOTHING", "FOR", "ASC", "DESC", "NULLS",
    "FIRST", "LAST", "AND", "OR", "NOT", "IS", "IN", "BETWEEN", "LIKE", "ILIKE", "EXISTS", "ANY",
    "SOME", "CASE", "WHEN", "THEN", "ELSE", "END", "CAST", "NULL", "TRUE", "FALSE", "ROLLUP",
    "CUBE", "GROUPING", "SETS", "OVER", "PARTITION", "WINDOW", "FILTER", "LATERAL",
];

/// Looks up whether `name` is a recognized SQL keyword (case-insensitive).
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}
