//! Stage 7 — dependency graph construction (spec §4.9).
//!
//! Builds the CTE/subquery dependency graph and computes its processing
//! order. Failures here are non-fatal: a cycle is reported but the
//! statement is still returned, simply without a `dependency_graph`.

use crate::ast::{DependencyGraph, DependencyNode, NodeKind, Statement};
use crate::diag::Diag;
use crate::error::SnapSqlError;

pub fn run(statement: &mut Statement, diagnostics: &mut Vec<Diag>) {
    let mut graph = DependencyGraph::default();

    let main_tables: Vec<String> = statement.visible_tables().iter().map(|t| t.table.clone()).collect();
    let main_depends: Vec<String> = statement
        .with
        .as_ref()
        .map(|with| with.ctes.iter().map(|c| cte_id(&c.name)).collect())
        .unwrap_or_default();

    graph.add_node(DependencyNode {
        id: "main".to_string(),
        kind: NodeKind::Main,
        span: statement.span.clone(),
        table_references: main_tables,
        depends_on: main_depends,
    });

    if let Some(with) = &statement.with {
        let cte_names: Vec<String> = with.ctes.iter().map(|c| c.name.clone()).collect();
        for cte in &with.ctes {
            let nested_tables: Vec<String> = cte.body.visible_tables().iter().map(|t| t.table.clone()).collect();
            let depends_on: Vec<String> = nested_tables
                .iter()
                .filter(|t| cte_names.contains(t))
                .map(|t| cte_id(t))
                .collect();
            graph.add_node(DependencyNode {
                id: cte_id(&cte.name),
                kind: NodeKind::Cte,
                span: cte.span.clone(),
                table_references: nested_tables,
                depends_on,
            });
        }
    }

    match graph.compute_processing_order() {
        Ok(()) => statement.dependency_graph = Some(graph),
        Err(stuck) => {
            let cycle = stuck.split(", ").map(|s| s.to_string()).collect();
            diagnostics.push(SnapSqlError::CircularDependency { span: statement.span.clone(), cycle }.to_diag());
        }
    }
}

fn cte_id(name: &str) -> String {
    format!("cte_{name}")
}
