//! Statement and clause node types (spec §3, AST node taxonomy).

use super::dependency::DependencyGraph;
use super::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// The classification of a SELECT/RETURNING field used by the inference
/// engine to pick a dispatch rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Single,
    TableQualified,
    Function,
    Literal,
    Complex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    pub kind: FieldKind,
    /// The field's original source text, e.g. `COUNT(id)` or `u.name`.
    pub text: String,
    pub alias: Option<String>,
    /// An explicit target type captured from a `CAST(... AS T)` / `::T`.
    pub explicit_type: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl TableRef {
    /// The name this table is referred to by elsewhere in the statement:
    /// its alias if it has one, otherwise its bare table name.
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FromClause {
    pub tables: Vec<TableRef>,
    pub joins: Vec<Join>,
}

impl FromClause {
    pub fn all_tables(&self) -> Vec<&TableRef> {
        self.tables.iter().chain(self.joins.iter().map(|j| &j.table)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionClause {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupByClause {
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsPlacement {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: String,
    pub direction: Option<Direction>,
    pub nulls: Option<NullsPlacement>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderByClause {
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LimitValue {
    Literal(i64),
    Param(String),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitOffsetClause {
    pub value: LimitValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteDefinition {
    pub name: String,
    pub recursive: bool,
    pub columns: Option<Vec<String>>,
    pub body: Box<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WithClause {
    pub ctes: Vec<CteDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValuesClause {
    Tuples(Vec<Vec<String>>),
    /// A `/*= rows */`-style bulk substitution driving a multi-row INSERT.
    BulkVariable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    pub target: Option<String>,
    pub action: ConflictAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertClause {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub values: ValuesClause,
    pub on_conflict: Option<OnConflict>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateClause {
    pub table: TableRef,
    pub assignments: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteClause {
    pub table: TableRef,
}

/// A SnapSQL directive block, nested to mirror the directive's structural
/// scope (spec §3, "Directive blocks").
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveBlock {
    If {
        /// `(condition, body)` pairs: the leading `if` plus any `elseif`s.
        branches: Vec<(String, Vec<DirectiveBlock>)>,
        else_branch: Option<Vec<DirectiveBlock>>,
        span: Span,
    },
    For {
        loop_variable: String,
        list_expr: String,
        body: Vec<DirectiveBlock>,
        span: Span,
    },
    /// Auto-generated by parser stage 6 wrapping a clause whose driving
    /// parameters may all be absent.
    ImplicitConditional {
        condition: String,
        span: Span,
    },
    Substitution {
        expr: String,
        span: Span,
    },
    Constant {
        expr: String,
        span: Span,
    },
    EnvironmentRef {
        expr: String,
        span: Span,
    },
}

impl DirectiveBlock {
    pub fn span(&self) -> &Span {
        match self {
            DirectiveBlock::If { span, .. }
            | DirectiveBlock::For { span, .. }
            | DirectiveBlock::ImplicitConditional { span, .. }
            | DirectiveBlock::Substitution { span, .. }
            | DirectiveBlock::Constant { span, .. }
            | DirectiveBlock::EnvironmentRef { span, .. } => span,
        }
    }
}

/// A single SQL statement: SELECT, INSERT, UPDATE, or DELETE, annotated
/// with its directive blocks and (after stage 7) its dependency graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
    pub with: Option<WithClause>,
    pub select: Vec<SelectField>,
    pub from: Option<FromClause>,
    pub where_clause: Option<ConditionClause>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<ConditionClause>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitOffsetClause>,
    pub offset: Option<LimitOffsetClause>,
    pub insert: Option<InsertClause>,
    pub update: Option<UpdateClause>,
    pub delete: Option<DeleteClause>,
    pub returning: Vec<SelectField>,
    pub directives: Vec<DirectiveBlock>,
    pub dependency_graph: Option<DependencyGraph>,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self {
            kind,
            span,
            with: None,
            select: Vec::new(),
            from: None,
            where_clause: None,
            group_by: None,
            having: None,
            order_by: None,
            limit: None,
            offset: None,
            insert: None,
            update: None,
            delete: None,
            returning: Vec::new(),
            directives: Vec::new(),
            dependency_graph: None,
        }
    }

    /// All tables directly visible to this statement's own clauses (not
    /// counting tables visible only inside nested subqueries).
    pub fn visible_tables(&self) -> Vec<&TableRef> {
        self.from.as_ref().map(|f| f.all_tables()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ref_reference_name_prefers_alias() {
        let t = TableRef { schema: None, table: "users".into(), alias: Some("u".into()), span: 0..0 };
        assert_eq!(t.reference_name(), "u");
        let t2 = TableRef { schema: None, table: "users".into(), alias: None, span: 0..0 };
        assert_eq!(t2.reference_name(), "users");
    }

    #[test]
    fn from_clause_all_tables_includes_joins() {
        let from = FromClause {
            tables: vec![TableRef { schema: None, table: "a".into(), alias: None, span: 0..0 }],
            joins: vec![Join {
                kind: JoinKind::Inner,
                table: TableRef { schema: None, table: "b".into(), alias: None, span: 0..0 },
                on: Some("a.id = b.a_id".into()),
            }],
        };
        assert_eq!(from.all_tables().len(), 2);
    }

    #[test]
    fn new_statement_has_empty_clauses() {
        let stmt = Statement::new(StatementKind::Select, 0..10);
        assert!(stmt.select.is_empty());
        assert!(stmt.from.is_none());
        assert!(stmt.dependency_graph.is_none());
    }
}
