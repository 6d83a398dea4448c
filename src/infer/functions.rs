//! SQL function return-type rules (spec §4.11, function table).

use super::operators::promote;
use crate::schema::{NormalizedType, TypeInfo};

/// Nullability rule attached to a function family: whether the result is
/// always non-null, always nullable, or follows (ORs) its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nullability {
    NonNull,
    Nullable,
    FollowsArgument,
}

fn any_arg_nullable(args: &[TypeInfo]) -> bool {
    args.iter().any(|a| a.nullable)
}

/// Looks up `name` (case-insensitive) in the closed function rule table and
/// computes its return type from `args`. Unknown functions fall back to
/// `Any`, nullable — matching the cast analyzer's "unrecognized shapes
/// yield `any`, nullable, without error" policy.
pub fn infer_function(name: &str, args: &[TypeInfo]) -> TypeInfo {
    let upper = name.to_ascii_uppercase();
    let first = args.first().copied().unwrap_or(TypeInfo { normalized: NormalizedType::Any, nullable: true });

    let (normalized, nullability) = match upper.as_str() {
        "COUNT" => (NormalizedType::Int, Nullability::NonNull),
        "SUM" => {
            let ty = if first.normalized == NormalizedType::Int { NormalizedType::Decimal } else { first.normalized };
            (ty, Nullability::Nullable)
        }
        "AVG" => (NormalizedType::Float, Nullability::Nullable),
        "MIN" | "MAX" => (first.normalized, Nullability::Nullable),
        "LENGTH" | "CHAR_LENGTH" => (NormalizedType::Int, Nullability::FollowsArgument),
        "UPPER" | "LOWER" | "TRIM" | "CONCAT" | "SUBSTRING" => (NormalizedType::String, Nullability::FollowsArgument),
        "COALESCE" => {
            let promoted = args.iter().skip(1).fold(first.normalized, |acc, a| promote(acc, a.normalized));
            let non_null = args.iter().any(|a| !a.nullable);
            return TypeInfo { normalized: promoted, nullable: !non_null };
        }
        "NULLIF" => (first.normalized, Nullability::Nullable),
        "ROW_NUMBER" | "RANK" | "DENSE_RANK" => (NormalizedType::Int, Nullability::NonNull),
        "LAG" | "LEAD" | "FIRST_VALUE" | "LAST_VALUE" => (first.normalized, Nullability::Nullable),
        "NOW" | "CURRENT_TIMESTAMP" => (NormalizedType::Timestamp, Nullability::NonNull),
        "CURRENT_DATE" => (NormalizedType::Date, Nullability::NonNull),
        "CURRENT_TIME" => (NormalizedType::Time, Nullability::NonNull),
        "EXTRACT" | "DATE_PART" => (NormalizedType::Int, Nullability::Nullable),
        "ABS" | "ROUND" | "FLOOR" | "CEIL" => (first.normalized, Nullability::FollowsArgument),
        "SQRT" | "EXP" | "LN" | "LOG" | "POWER" => (NormalizedType::Float, Nullability::Nullable),
        "JSON_EXTRACT_PATH" => (NormalizedType::Json, Nullability::Nullable),
        "JSON_EXTRACT_PATH_TEXT" => (NormalizedType::String, Nullability::Nullable),
        "JSON_OBJECT" | "JSON_ARRAY" => (NormalizedType::Json, Nullability::NonNull),
        _ => (NormalizedType::Any, Nullability::Nullable),
    };

    let nullable = match nullability {
        Nullability::NonNull => false,
        Nullability::Nullable => true,
        Nullability::FollowsArgument => any_arg_nullable(args),
    };
    TypeInfo { normalized, nullable }
}
