//! End-to-End Pipeline Benchmarks
//!
//! Measures tokenizing, parsing, and type inference across representative
//! template shapes:
//!
//! - **Simple queries**: bare SELECT/INSERT/UPDATE/DELETE
//! - **Directive-heavy queries**: `/*# if */`, `/*# for */`, substitutions
//! - **Joins and CTEs**: multi-table FROM clauses, dependency analysis
//! - **Stress**: wide SELECT lists, many WHERE conditions
//!
//! ## Running
//!
//! ```bash
//! cargo bench
//! cargo bench simple_queries
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use snapsql_core::namespace::FunctionDefinition;
use snapsql_core::schema::{ColumnInfo, SchemaInfo, SchemaResolver, TableInfo};
use snapsql_core::token::{tokenize, Dialect};
use snapsql_core::{infer_field_types, parse, ParserOptions};

fn sample_resolver() -> SchemaResolver {
    SchemaResolver::new(vec![SchemaInfo {
        name: "public".to_string(),
        tables: vec![
            TableInfo {
                name: "users".to_string(),
                columns: vec![
                    ColumnInfo { name: "id".to_string(), data_type: "BIGINT".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: true },
                    ColumnInfo { name: "name".to_string(), data_type: "VARCHAR(255)".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: false },
                    ColumnInfo { name: "active".to_string(), data_type: "BOOLEAN".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: false },
                ],
            },
            TableInfo {
                name: "orders".to_string(),
                columns: vec![
                    ColumnInfo { name: "user_id".to_string(), data_type: "BIGINT".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: false },
                    ColumnInfo { name: "amount".to_string(), data_type: "INTEGER".to_string(), nullable: false, max_length: None, precision: None, scale: None, is_primary_key: false },
                ],
            },
        ],
    }])
}

fn bench_simple_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_queries");
    let function = FunctionDefinition::new("bench");

    let queries = vec![
        ("select_star", "SELECT id, name FROM users"),
        ("select_where", "SELECT id FROM users WHERE id = 1"),
        ("insert", "INSERT INTO users (name) VALUES ('a')"),
        ("update", "UPDATE users SET name = 'a' WHERE id = 1"),
        ("delete", "DELETE FROM users WHERE id = 1"),
    ];

    for (name, query) in queries {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |b, q| {
            b.iter(|| parse(black_box(q), Dialect::Postgres, &function, Vec::new(), ParserOptions::default()));
        });
    }

    group.finish();
}

fn bench_directive_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("directive_queries");
    let function = FunctionDefinition::new("bench");

    let queries = vec![
        ("bare_substitution", "SELECT id FROM users WHERE active = /*= filters.active */true"),
        ("if_block", "SELECT id, /*# if include_name */ name /*# end */ FROM users"),
        ("for_loop", "SELECT id FROM users WHERE id IN (/*# for id : ids */ /*= id */1 /*# end */)"),
    ];

    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |b, q| {
            b.iter(|| parse(black_box(q), Dialect::Postgres, &function, Vec::new(), ParserOptions::default()));
        });
    }

    group.finish();
}

fn bench_joins_and_ctes(c: &mut Criterion) {
    let mut group = c.benchmark_group("joins_and_ctes");
    let function = FunctionDefinition::new("bench");

    let queries = vec![
        ("single_join", "SELECT u.name, o.amount FROM users u JOIN orders o ON u.id = o.user_id"),
        (
            "cte_with_join",
            "WITH s AS (SELECT user_id, SUM(amount) AS total FROM orders GROUP BY user_id) \
             SELECT u.name, s.total FROM users u JOIN s ON u.id = s.user_id",
        ),
    ];

    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |b, q| {
            b.iter(|| parse(black_box(q), Dialect::Postgres, &function, Vec::new(), ParserOptions::default()));
        });
    }

    group.finish();
}

fn bench_wide_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_select");
    group.sample_size(50);
    let function = FunctionDefinition::new("bench");

    let mut wide = String::from("SELECT ");
    for i in 0..100 {
        if i > 0 {
            wide.push_str(", ");
        }
        wide.push_str(&format!("col{i}"));
    }
    wide.push_str(" FROM users");

    group.bench_function("100_select_fields", |b| {
        b.iter(|| parse(black_box(&wide), Dialect::Postgres, &function, Vec::new(), ParserOptions::default()));
    });

    let mut many_conditions = String::from("SELECT id FROM users WHERE ");
    for i in 0..50 {
        if i > 0 {
            many_conditions.push_str(" AND ");
        }
        many_conditions.push_str(&format!("col{i} = {i}"));
    }

    group.bench_function("50_where_conditions", |b| {
        b.iter(|| parse(black_box(&many_conditions), Dialect::Postgres, &function, Vec::new(), ParserOptions::default()));
    });

    group.finish();
}

fn bench_lexer_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_only");

    let queries = vec![
        ("simple", "SELECT id FROM users WHERE active = true"),
        ("directive_heavy", "SELECT id, /*# if include_name */ name /*# end */ FROM users WHERE active = /*= filters.active */true"),
    ];

    for (name, query) in queries {
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |b, q| {
            b.iter(|| tokenize(black_box(q), Dialect::Postgres));
        });
    }

    group.finish();
}

fn bench_infer_field_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("infer_field_types");
    let function = FunctionDefinition::new("bench");
    let resolver = sample_resolver();

    let queries = vec![
        ("simple", "SELECT id, name FROM users"),
        ("cast_and_aggregate", "SELECT CAST(SUM(amount) AS DECIMAL) AS total FROM orders"),
    ];

    for (name, query) in queries {
        let outcome = parse(query, Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
        let statement = outcome.statement.expect("benchmark query must parse");
        group.bench_with_input(BenchmarkId::from_parameter(name), &statement, |b, s| {
            b.iter(|| infer_field_types(black_box(&resolver), black_box(s)));
        });
    }

    group.finish();
}

fn bench_pipeline_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_stages");
    let function = FunctionDefinition::new("bench");
    let resolver = sample_resolver();
    let query = "SELECT u.name, o.amount FROM users u JOIN orders o ON u.id = o.user_id WHERE u.active = true";

    group.bench_function("01_lexer_only", |b| {
        b.iter(|| tokenize(black_box(query), Dialect::Postgres));
    });

    group.bench_function("02_parse_only", |b| {
        b.iter(|| parse(black_box(query), Dialect::Postgres, &function, Vec::new(), ParserOptions::default()));
    });

    group.bench_function("03_parse_and_infer", |b| {
        b.iter(|| {
            let outcome = parse(black_box(query), Dialect::Postgres, &function, Vec::new(), ParserOptions::default());
            let statement = outcome.statement.unwrap();
            infer_field_types(&resolver, &statement)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_queries,
    bench_directive_queries,
    bench_joins_and_ctes,
    bench_wide_select,
    bench_lexer_only,
    bench_infer_field_types,
    bench_pipeline_stages,
);

criterion_main!(benches);
