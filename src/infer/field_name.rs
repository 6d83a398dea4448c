//! Field-name generation (spec §4.11.1).
//!
//! Every produced field needs a unique, stable name: explicit aliases win,
//! otherwise one is derived from the field's shape. A running counter
//! disambiguates collisions (`name`, `name2`, ...).

use crate::ast::{FieldKind, SelectField};

const SQL_KEYWORDS: &[&str] = &["select", "from", "where", "order", "group", "limit", "offset", "as", "and", "or"];

#[derive(Debug, Default)]
pub struct FieldNameGenerator {
    seen: Vec<(String, u32)>,
}

impl FieldNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `base` and returns its disambiguated, final name.
    pub fn generate(&mut self, base: &str) -> String {
        let base = if SQL_KEYWORDS.contains(&base.to_ascii_lowercase().as_str()) { "value" } else { base };
        match self.seen.iter_mut().find(|(name, _)| name == base) {
            Some((_, count)) => {
                *count += 1;
                format!("{base}{count}")
            }
            None => {
                self.seen.push((base.to_string(), 1));
                base.to_string()
            }
        }
    }

    /// Derives the unqualified base name for a field before disambiguation.
    pub fn base_name_for(field: &SelectField) -> String {
        if let Some(alias) = &field.alias {
            return alias.clone();
        }
        match field.kind {
            FieldKind::Single => field.text.trim().to_string(),
            FieldKind::TableQualified => field.text.rsplit('.').next().unwrap_or(&field.text).trim().to_string(),
            FieldKind::Function => function_base_name(&field.text),
            FieldKind::Literal => literal_base_name(&field.text).to_string(),
            FieldKind::Complex => complex_base_name(&field.text),
        }
    }
}

fn function_base_name(text: &str) -> String {
    let Some(paren) = text.find('(') else { return "value".to_string() };
    let name = text[..paren].trim().to_ascii_lowercase();
    let inner = text[paren + 1..].trim_end_matches(')').trim();
    let first_arg = inner.split(',').next().unwrap_or("").trim();
    if !first_arg.is_empty() && first_arg.chars().all(|c| c.is_alphanumeric() || c == '_') {
        format!("{name}_{}", first_arg.to_ascii_lowercase())
    } else {
        format!("{name}_value")
    }
}

fn literal_base_name(text: &str) -> &'static str {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("null") {
        "null_value"
    } else if trimmed.starts_with('\'') || trimmed.starts_with('"') {
        "string_literal"
    } else if trimmed.contains('.') {
        "decimal_literal"
    } else {
        "literal"
    }
}

fn complex_base_name(text: &str) -> String {
    if text.contains("::") || text.to_ascii_uppercase().contains("CAST(") {
        return cast_base_name(text);
    }
    if let Some((left, right, op)) = split_binary_operator(text) {
        return match op {
            "+" => format!("{left}_plus_{right}"),
            "-" => format!("{left}_minus_{right}"),
            "*" => format!("{left}_times_{right}"),
            "/" => format!("{left}_divided_by_{right}"),
            "||" => format!("{left}_{right}_concat"),
            "=" => format!("{left}_equals_{right}"),
            ">" => format!("{left}_greater_{right}"),
            "<" => format!("{left}_less_{right}"),
            ">=" => format!("{left}_gte_{right}"),
            "<=" => format!("{left}_lte_{right}"),
            "<>" | "!=" => format!("{left}_not_equal_{right}"),
            "->" => format!("{left}_{right}_field"),
            "->>" => format!("{left}_{right}_text"),
            _ => "case_result".to_string(),
        };
    }
    if text.to_ascii_uppercase().contains("CASE") {
        return case_base_name(text);
    }
    "case_result".to_string()
}

fn cast_base_name(text: &str) -> String {
    let upper = text.to_ascii_uppercase();
    if let Some(cast_pos) = upper.find("CAST(") {
        if let Some(as_pos) = upper[cast_pos..].find(" AS ") {
            let base = text[cast_pos + 5..cast_pos + as_pos].trim();
            let rest = &text[cast_pos + as_pos + 4..];
            let target = rest.trim_end_matches(')').trim().split('(').next().unwrap_or(rest).trim();
            return format!("{}_as_{}", sanitize(base), sanitize(target).to_ascii_lowercase());
        }
    }
    if let Some(pos) = text.find("::") {
        let base = text[..pos].trim();
        let target = text[pos + 2..].trim();
        return format!("{}_as_{}", sanitize(base), sanitize(target).to_ascii_lowercase());
    }
    "case_result".to_string()
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
}

fn case_base_name(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    if lower.contains("status") {
        "status_category".to_string()
    } else if lower.contains("price") || lower.contains("amount") {
        "price_range".to_string()
    } else if lower.contains("age") {
        "age_group".to_string()
    } else if lower.contains("priority") {
        "priority_level".to_string()
    } else {
        "case_result".to_string()
    }
}

/// Splits `text` on a single top-level binary operator, returning
/// sanitized left/right operand names plus the matched operator. Only
/// handles the flat, no-parens case; anything else falls through to the
/// CASE/unrecognized path.
fn split_binary_operator(text: &str) -> Option<(String, String, &'static str)> {
    const OPERATORS: &[&str] = &["->>", "->", "<=", ">=", "<>", "!=", "=", "<", ">", "||", "+", "-", "*", "/"];
    for op in OPERATORS {
        if let Some(pos) = text.find(op) {
            if text.contains('(') {
                continue;
            }
            let left = sanitize(text[..pos].trim());
            let right = sanitize(text[pos + op.len()..].trim());
            if !left.is_empty() && !right.is_empty() {
                return Some((left, right, op));
            }
        }
    }
    None
}
