//! The subquery/CTE dependency graph built by parser stage 7 (spec §4.9).

use super::Span;

/// The kind of statement a dependency-graph node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Main,
    Cte,
    FromSubquery,
    SelectSubquery,
}

/// A single node in the dependency graph: one statement occurrence (the
/// main statement, a CTE body, or a nested subquery) plus the tables and
/// other nodes it depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub id: String,
    pub kind: NodeKind,
    pub span: Span,
    pub table_references: Vec<String>,
    pub depends_on: Vec<String>,
}

/// The full dependency graph for a statement: every CTE and subquery
/// occurrence plus the `main` node, with a topological processing order
/// type inference consumes so a node's dependencies are always inferred
/// before the node itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencyGraph {
    pub nodes: Vec<DependencyNode>,
    pub processing_order: Vec<String>,
}

impl DependencyGraph {
    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn add_node(&mut self, node: DependencyNode) {
        self.nodes.push(node);
    }

    /// Computes a topological order over `nodes`, treating a self-edge
    /// (a recursive CTE depending on itself) as allowed rather than a
    /// cycle. Returns `Err` with the id of a node that participates in a
    /// genuine cycle.
    pub fn compute_processing_order(&mut self) -> Result<(), String> {
        let mut in_degree: Vec<(String, usize)> = self
            .nodes
            .iter()
            .map(|n| {
                let degree = n.depends_on.iter().filter(|dep| *dep != &n.id).count();
                (n.id.clone(), degree)
            })
            .collect();

        let mut order = Vec::new();
        let mut remaining = self.nodes.len();
        while remaining > 0 {
            let Some(pos) = in_degree.iter().position(|(_, d)| *d == 0) else {
                let stuck = in_degree.into_iter().map(|(id, _)| id).collect::<Vec<_>>().join(", ");
                return Err(stuck);
            };
            let (ready_id, _) = in_degree.remove(pos);
            for (id, degree) in in_degree.iter_mut() {
                if let Some(node) = self.node(id) {
                    if node.depends_on.iter().any(|dep| dep == &ready_id) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
            order.push(ready_id);
            remaining -= 1;
        }
        self.processing_order = order;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, depends_on: &[&str]) -> DependencyNode {
        DependencyNode {
            id: id.to_string(),
            kind: NodeKind::Cte,
            span: 0..0,
            table_references: vec![],
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn linear_chain_orders_dependencies_first() {
        let mut graph = DependencyGraph::default();
        graph.add_node(node("main", &["cte_b"]));
        graph.add_node(node("cte_b", &["cte_a"]));
        graph.add_node(node("cte_a", &[]));
        graph.compute_processing_order().unwrap();
        assert_eq!(graph.processing_order, vec!["cte_a", "cte_b", "main"]);
    }

    #[test]
    fn recursive_cte_self_edge_is_not_a_cycle() {
        let mut graph = DependencyGraph::default();
        graph.add_node(node("cte_r", &["cte_r"]));
        assert!(graph.compute_processing_order().is_ok());
    }

    #[test]
    fn genuine_cycle_is_rejected() {
        let mut graph = DependencyGraph::default();
        graph.add_node(node("a", &["b"]));
        graph.add_node(node("b", &["a"]));
        assert!(graph.compute_processing_order().is_err());
    }
}
