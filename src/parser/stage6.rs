//! Stage 6 — expression validation and implicit-conditional generation
//! (spec §4.8).
//!
//! Walks the directive tree stage 5 built, validating every condition,
//! substitution, and loop source against the [`Namespace`], then wraps
//! optional-parameter-driven WHERE/LIMIT/OFFSET clauses in a generated
//! presence check so a caller never has to spell one out by hand.

use super::ParserOptions;
use crate::ast::{DirectiveBlock, LimitValue, Statement};
use crate::diag::Diag;
use crate::error::SnapSqlError;
use crate::namespace::value::Value;
use crate::namespace::{Namespace, NamespaceError};

pub fn run(statement: &mut Statement, namespace: &mut Namespace, diagnostics: &mut Vec<Diag>, options: ParserOptions) {
    let mut blocks = std::mem::take(&mut statement.directives);
    validate_blocks(&mut blocks, namespace, diagnostics, options);
    statement.directives = blocks;

    generate_implicit_conditionals(statement, namespace);
}

fn validate_blocks(blocks: &mut [DirectiveBlock], namespace: &mut Namespace, diagnostics: &mut Vec<Diag>, options: ParserOptions) {
    for block in blocks {
        match block {
            DirectiveBlock::If { branches, else_branch, .. } => {
                for (condition, body) in branches.iter_mut() {
                    report_namespace_result(namespace.validate_parameter_expression(condition), condition, diagnostics, options);
                    validate_blocks(body, namespace, diagnostics, options);
                }
                if let Some(body) = else_branch {
                    validate_blocks(body, namespace, diagnostics, options);
                }
            }
            DirectiveBlock::For { loop_variable, list_expr, body, .. } => {
                let list_expr = list_expr.clone();
                let result = namespace.with_loop_variable(loop_variable, &list_expr, |inner| {
                    validate_blocks(body, inner, diagnostics, options);
                    Ok(())
                });
                if let Err(err) = result {
                    report_namespace_error(err, &list_expr, diagnostics, options);
                }
            }
            DirectiveBlock::Substitution { expr, .. } | DirectiveBlock::Constant { expr, .. } => {
                report_namespace_result(namespace.validate_parameter_expression(expr), expr, diagnostics, options);
            }
            DirectiveBlock::EnvironmentRef { expr, .. } => {
                report_namespace_result(namespace.validate_environment_expression(expr), expr, diagnostics, options);
            }
            DirectiveBlock::ImplicitConditional { condition, .. } => {
                report_namespace_result(namespace.validate_parameter_expression(condition), condition, diagnostics, options);
            }
        }
    }
}

fn report_namespace_result(result: Result<(), NamespaceError>, expr: &str, diagnostics: &mut Vec<Diag>, options: ParserOptions) {
    if let Err(err) = result {
        report_namespace_error(err, expr, diagnostics, options);
    }
}

fn report_namespace_error(err: NamespaceError, expr: &str, diagnostics: &mut Vec<Diag>, options: ParserOptions) {
    if options.inspect_mode {
        return;
    }
    let diag = match err {
        NamespaceError::Expression(_) => {
            SnapSqlError::InvalidExpression { span: 0..0, expr: expr.to_string(), reason: err.to_string() }.to_diag()
        }
        NamespaceError::ElementNotAList => {
            SnapSqlError::ExpressionNotList { span: 0..0, expr: expr.to_string() }.to_diag()
        }
    };
    diagnostics.push(diag);
}

/// Extracts the parameter path from a `/*= path */`-style substitution that
/// is the entire body of a clause, if any.
fn bare_substitution_path(text: &str) -> Option<String> {
    let start = text.find("/*=")?;
    let body = &text[start + 3..];
    let end = body.find("*/")?;
    let path = body[..end].trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

fn presence_predicate(path: &str, value: &Value) -> String {
    match value {
        Value::Str(_) => format!("{path} != null && {path} != ''"),
        Value::List(_) => format!("{path} != null && size({path}) > 0"),
        _ => format!("{path} != null"),
    }
}

fn generate_implicit_conditionals(statement: &mut Statement, namespace: &Namespace) {
    if let Some(where_clause) = &statement.where_clause {
        if let Some(path) = bare_substitution_path(&where_clause.text) {
            if let Ok(value) = namespace.evaluate_parameter_expression(&path) {
                statement.directives.push(DirectiveBlock::ImplicitConditional {
                    condition: presence_predicate(&path, &value),
                    span: where_clause.span.clone(),
                });
            }
        }
    }

    for limit in [statement.limit.as_ref(), statement.offset.as_ref()].into_iter().flatten() {
        if let LimitValue::Param(name) = &limit.value {
            if let Ok(value) = namespace.evaluate_parameter_expression(name) {
                statement.directives.push(DirectiveBlock::ImplicitConditional {
                    condition: presence_predicate(name, &value),
                    span: 0..0,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{FunctionDefinition, ParamType, PrimitiveType};
    use crate::parser::{stage1, stage2, stage3, stage4, stage5};
    use crate::token::{tokenize, Dialect};

    fn run_pipeline(source: &str, function: &FunctionDefinition) -> (Statement, Vec<Diag>) {
        let result = tokenize(source, Dialect::Postgres);
        let mut diagnostics = Vec::new();
        let tokens = stage1::run(&result.tokens, &mut diagnostics);
        let raw = stage2::run(&tokens, &mut diagnostics).unwrap();
        let section_map = stage3::run(&tokens, &raw.clauses);
        let mut statement = stage4::run(&tokens, &raw, source, Dialect::Postgres, ParserOptions::default(), &mut diagnostics).unwrap();
        stage5::run(&tokens, &section_map, &mut statement, &mut diagnostics, ParserOptions::default());
        let mut namespace = Namespace::new(function);
        run(&mut statement, &mut namespace, &mut diagnostics, ParserOptions::default());
        (statement, diagnostics)
    }

    #[test]
    fn valid_if_condition_produces_no_diagnostics() {
        let function = FunctionDefinition::new("f").with_parameter("active", ParamType::Primitive(PrimitiveType::Bool));
        let (_, diags) = run_pipeline(
            "SELECT id FROM users WHERE 1 = 1 /*# if active */ AND active = true /*# end */",
            &function,
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_condition_parameter_is_an_error() {
        let function = FunctionDefinition::new("f");
        let (_, diags) = run_pipeline(
            "SELECT id FROM users WHERE 1 = 1 /*# if missing */ AND 1 = 1 /*# end */",
            &function,
        );
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("InvalidExpression")));
    }

    #[test]
    fn for_loop_validates_body_against_loop_variable() {
        let function = FunctionDefinition::new("f")
            .with_parameter("tags", ParamType::List(Box::new(ParamType::Primitive(PrimitiveType::Str))));
        let (_, diags) = run_pipeline(
            "SELECT id FROM users WHERE id IN (/*# for t : tags */ /*= t */ , /*# end */ 0)",
            &function,
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn bare_where_substitution_generates_implicit_conditional() {
        let function = FunctionDefinition::new("f").with_parameter("name", ParamType::Primitive(PrimitiveType::Str));
        let (stmt, _) = run_pipeline("SELECT id FROM users WHERE name = /*= name */'x'", &function);
        assert!(stmt.directives.iter().any(|b| matches!(b, DirectiveBlock::ImplicitConditional { .. })));
    }
}
