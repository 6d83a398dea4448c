use snapsql_core::ast::{StatementKind, ValuesClause};
use snapsql_core::namespace::{FunctionDefinition, ParamType, PrimitiveType};
use snapsql_core::schema::{ColumnInfo, SchemaInfo, SchemaResolver, TableInfo};
use snapsql_core::token::Dialect;
use snapsql_core::{infer_field_types, parse, ParserOptions};

fn diagnostics_text(diags: &[miette::Report]) -> String {
    diags.iter().map(|d| format!("{d:?}")).collect::<Vec<_>>().join("\n")
}

fn users_resolver() -> SchemaResolver {
    SchemaResolver::new(vec![SchemaInfo {
        name: "public".to_string(),
        tables: vec![
            TableInfo {
                name: "users".to_string(),
                columns: vec![
                    ColumnInfo { name: "id".to_string(), data_type: "BIGINT".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: true },
                    ColumnInfo { name: "name".to_string(), data_type: "VARCHAR(255)".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: false },
                ],
            },
            TableInfo {
                name: "orders".to_string(),
                columns: vec![ColumnInfo { name: "amount".to_string(), data_type: "INTEGER".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: false }],
            },
        ],
    }])
}

#[test]
fn simple_select_infers_both_columns_non_null() {
    let function = FunctionDefinition::new("list_users");
    let outcome = parse("SELECT id, name FROM users", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {}", diagnostics_text(&outcome.diagnostics));
    let statement = outcome.statement.expect("statement");

    let resolver = users_resolver();
    let (fields, diags) = infer_field_types(&resolver, &statement);
    assert!(diags.is_empty());
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "id");
    assert!(!fields[0].type_info.nullable);
    assert_eq!(fields[1].name, "name");
    assert!(!fields[1].type_info.nullable);
}

#[test]
fn directive_driven_where_produces_implicit_conditional() {
    let function = FunctionDefinition::new("search_users").with_parameter("filters", ParamType::Map(vec![("active".to_string(), ParamType::Primitive(PrimitiveType::Bool))]));
    let source = "SELECT id FROM users WHERE active = /*= filters.active */true";
    let outcome = parse(source, Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {}", diagnostics_text(&outcome.diagnostics));
    let statement = outcome.statement.expect("statement");

    let implicit = statement
        .directives
        .iter()
        .any(|b| matches!(b, snapsql_core::ast::DirectiveBlock::ImplicitConditional { .. }));
    assert!(implicit, "expected an implicit conditional wrapping the WHERE substitution");
}

#[test]
fn directive_spanning_two_clauses_is_rejected() {
    let function = FunctionDefinition::new("conditional_select").with_parameter("include_name", ParamType::Primitive(PrimitiveType::Bool));
    let source = "SELECT id, /*# if include_name */ name FROM users /*# end */";
    let outcome = parse(source, Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(!outcome.diagnostics.is_empty(), "expected a DirectiveSpansClauses diagnostic");
    let text = diagnostics_text(&outcome.diagnostics);
    assert!(text.contains("clause") || text.contains("span"), "unexpected diagnostics: {text}");
}

#[test]
fn bulk_insert_values_becomes_a_variable_substitution() {
    let function = FunctionDefinition::new("bulk_insert_products");
    let source = "INSERT INTO products (name, price) VALUES /*= products */('A', 1.0)";
    let outcome = parse(source, Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {}", diagnostics_text(&outcome.diagnostics));
    let statement = outcome.statement.expect("statement");
    let insert = statement.insert.expect("insert clause");
    match insert.values {
        ValuesClause::BulkVariable(name) => assert_eq!(name, "products"),
        ValuesClause::Tuples(_) => panic!("expected a bulk variable substitution, got a literal tuple list"),
    }
}

#[test]
fn cast_around_an_aggregate_infers_the_cast_target_type() {
    let function = FunctionDefinition::new("order_totals");
    let outcome = parse("SELECT CAST(SUM(amount) AS DECIMAL) AS total FROM orders", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {}", diagnostics_text(&outcome.diagnostics));
    let statement = outcome.statement.expect("statement");

    let resolver = users_resolver();
    let (fields, diags) = infer_field_types(&resolver, &statement);
    assert!(diags.is_empty());
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "total");
    assert_eq!(fields[0].type_info.normalized, snapsql_core::schema::NormalizedType::Decimal);
    assert!(fields[0].type_info.nullable);
}

#[test]
fn cte_is_ordered_before_the_main_query_in_the_dependency_graph() {
    let function = FunctionDefinition::new("user_order_totals");
    let source = "WITH s AS (SELECT user_id, SUM(amount) AS total FROM orders GROUP BY user_id) \
                  SELECT u.name FROM users u JOIN s ON u.id = s.user_id";
    let outcome = parse(source, Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {}", diagnostics_text(&outcome.diagnostics));
    let statement = outcome.statement.expect("statement");

    let graph = statement.dependency_graph.expect("dependency graph");
    let order = graph.processing_order.clone();
    let main_pos = order.iter().position(|id| id == "main").expect("main node present");
    let cte_pos = order.iter().position(|id| id == "cte_s").expect("cte_s node present");
    assert!(cte_pos < main_pos, "expected cte_s to precede main, got {order:?}");
}

#[test]
fn insert_without_returning_yields_a_single_affected_rows_field() {
    let function = FunctionDefinition::new("delete_inactive_users");
    let outcome = parse("DELETE FROM users WHERE id = 1", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {}", diagnostics_text(&outcome.diagnostics));
    let statement = outcome.statement.expect("statement");
    assert_eq!(statement.kind, StatementKind::Delete);

    let resolver = users_resolver();
    let (fields, _) = infer_field_types(&resolver, &statement);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "affected_rows");
    assert!(fields[0].is_generated);
}

#[test]
fn keyword_case_does_not_change_the_parsed_shape() {
    let function = FunctionDefinition::new("list_users");
    let upper = parse("SELECT id FROM users WHERE id = 1", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    let lower = parse("select id from users where id = 1", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    let mixed = parse("Select id From users Where id = 1", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());

    let upper_statement = upper.statement.expect("statement");
    let lower_statement = lower.statement.expect("statement");
    let mixed_statement = mixed.statement.expect("statement");

    assert_eq!(upper_statement.select.len(), lower_statement.select.len());
    assert_eq!(upper_statement.select.len(), mixed_statement.select.len());
    assert_eq!(upper_statement.where_clause.is_some(), lower_statement.where_clause.is_some());
    assert_eq!(upper_statement.where_clause.is_some(), mixed_statement.where_clause.is_some());
}

#[test]
fn unknown_column_reference_is_reported_with_a_suggestion() {
    let function = FunctionDefinition::new("list_users");
    let outcome = parse("SELECT nam FROM users", Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
    let statement = outcome.statement.expect("statement parses even though the column is unknown");

    let resolver = users_resolver();
    let (_, diags) = infer_field_types(&resolver, &statement);
    assert_eq!(diags.len(), 1);
    let text = diagnostics_text(&diags);
    assert!(text.contains("nam"), "unexpected diagnostic: {text}");
}
