//! Expression cast analyzer (spec §4.11.2).
//!
//! A linear scan over a complex sub-expression's text detecting `CAST(x AS
//! T)` and `x::T` shapes; nested casts are supported by always taking the
//! outermost one. Absent a cast, callers fall back to the principal
//! operator (function call, binary operator, or single token) per §4.11.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCast {
    pub target_type: String,
    pub inner_expr: String,
}

/// Finds the outermost cast in `expr`, if any. `CAST(...)` is matched
/// before `::` since a `CAST` shape can itself contain a `::` cast nested
/// inside its source expression.
pub fn detect_cast(expr: &str) -> Option<DetectedCast> {
    detect_cast_call(expr).or_else(|| detect_cast_operator(expr))
}

fn detect_cast_call(expr: &str) -> Option<DetectedCast> {
    let upper = expr.to_ascii_uppercase();
    let start = upper.find("CAST(")?;
    let open = start + 4;
    let close = matching_paren(expr, open)?;
    let body = &expr[open + 1..close];
    let as_pos = find_top_level_as(body)?;
    Some(DetectedCast {
        inner_expr: body[..as_pos].trim().to_string(),
        target_type: body[as_pos + 4..].trim().to_string(),
    })
}

fn detect_cast_operator(expr: &str) -> Option<DetectedCast> {
    let pos = expr.rfind("::")?;
    let inner = expr[..pos].trim().to_string();
    let target = expr[pos + 2..].trim();
    let target_end = target.find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '(' || c == ')' || c == ',')).unwrap_or(target.len());
    Some(DetectedCast { inner_expr: inner, target_type: target[..target_end].to_string() })
}

fn find_top_level_as(body: &str) -> Option<usize> {
    let upper = body.to_ascii_uppercase();
    let mut depth = 0i32;
    let bytes = upper.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && upper[i..].starts_with(" AS ") {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn matching_paren(expr: &str, open: usize) -> Option<usize> {
    let bytes = expr.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
