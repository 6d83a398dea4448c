//! AST node types: spans, statements, clauses, and the dependency graph.

pub mod dependency;
pub mod span;
pub mod statement;

pub use dependency::{DependencyGraph, DependencyNode, NodeKind};
pub use span::{Span, Spanned};
pub use statement::{
    ConditionClause, ConflictAction, CteDefinition, DeleteClause, Direction, DirectiveBlock,
    FieldKind, FromClause, GroupByClause, InsertClause, Join, JoinKind, LimitOffsetClause,
    LimitValue, NullsPlacement, OnConflict, OrderByClause, OrderByItem, SelectField, Statement,
    StatementKind, TableRef, UpdateClause, ValuesClause, WithClause,
};
