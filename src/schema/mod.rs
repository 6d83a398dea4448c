//! Database schema resolution (spec §4.10).
//!
//! A [`SchemaResolver`] owns the column/table indexes built from whatever
//! schema description a caller supplies and answers the lookups the
//! type-inference engine needs: does this table exist, what type does this
//! column have, which tables could an unqualified column belong to.

use crate::ast::Span;
use crate::error::{closest_candidates, SnapSqlError};

/// A normalized scalar type, the target of the database-type mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedType {
    String,
    Int,
    Float,
    Decimal,
    Bool,
    Timestamp,
    Date,
    Time,
    Json,
    Any,
}

impl NormalizedType {
    /// Maps a raw database type name (type parameters already stripped by
    /// the caller, e.g. `VARCHAR(255)` -> `VARCHAR`) to its normalized
    /// counterpart.
    pub fn from_db_type(raw: &str) -> NormalizedType {
        match strip_type_parameters(raw).to_ascii_uppercase().as_str() {
            "VARCHAR" | "TEXT" | "CHAR" | "CHARACTER" | "CHARACTER VARYING" | "UUID" => NormalizedType::String,
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "SERIAL" | "BIGSERIAL" => NormalizedType::Int,
            "FLOAT" | "REAL" | "DOUBLE" | "DOUBLE PRECISION" => NormalizedType::Float,
            "NUMERIC" | "DECIMAL" | "MONEY" => NormalizedType::Decimal,
            "BOOL" | "BOOLEAN" => NormalizedType::Bool,
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => NormalizedType::Timestamp,
            "DATE" => NormalizedType::Date,
            "TIME" | "TIMETZ" => NormalizedType::Time,
            "JSON" | "JSONB" => NormalizedType::Json,
            _ => NormalizedType::Any,
        }
    }
}

fn strip_type_parameters(raw: &str) -> &str {
    raw.split('(').next().unwrap_or(raw).trim()
}

/// The normalized shape of a column used by the inference engine, derived
/// from a [`ColumnInfo`] via its raw database type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub normalized: NormalizedType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub is_primary_key: bool,
}

impl ColumnInfo {
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo { normalized: NormalizedType::from_db_type(&self.data_type), nullable: self.nullable }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaInfo {
    pub name: String,
    pub tables: Vec<TableInfo>,
}

impl SchemaInfo {
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Resolves table and column references against a fixed set of schemas
/// supplied up front. The default (unqualified) schema is the first one
/// provided, matching how most SQL dialects resolve a bare table name.
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    schemas: Vec<SchemaInfo>,
}

impl SchemaResolver {
    pub fn new(schemas: Vec<SchemaInfo>) -> Self {
        Self { schemas }
    }

    fn schema(&self, name: Option<&str>) -> Option<&SchemaInfo> {
        match name {
            Some(name) => self.schemas.iter().find(|s| s.name.eq_ignore_ascii_case(name)),
            None => self.schemas.first(),
        }
    }

    pub fn validate_table(&self, schema: Option<&str>, table: &str, span: Span) -> Result<(), SnapSqlError> {
        let Some(schema_info) = self.schema(schema) else {
            return Err(SnapSqlError::SchemaNotFound { span, name: schema.unwrap_or_default().to_string() });
        };
        if schema_info.table(table).is_some() {
            Ok(())
        } else {
            let candidates = closest_candidates(table, schema_info.tables.iter().map(|t| t.name.as_str()));
            Err(SnapSqlError::UnknownTable { span, name: table.to_string(), candidates })
        }
    }

    pub fn resolve_column(&self, schema: Option<&str>, table: &str, column: &str, span: Span) -> Result<ColumnInfo, SnapSqlError> {
        let schema_info = self
            .schema(schema)
            .ok_or_else(|| SnapSqlError::SchemaNotFound { span: span.clone(), name: schema.unwrap_or_default().to_string() })?;
        let table_info = schema_info.table(table).ok_or_else(|| SnapSqlError::UnknownTable {
            span: span.clone(),
            name: table.to_string(),
            candidates: closest_candidates(table, schema_info.tables.iter().map(|t| t.name.as_str())),
        })?;
        table_info.column(column).cloned().ok_or_else(|| SnapSqlError::UnknownColumn {
            span,
            name: column.to_string(),
            candidates: closest_candidates(column, table_info.columns.iter().map(|c| c.name.as_str())),
        })
    }

    /// Returns the qualified (`table.column`) names of every table among
    /// `tables` that has a column named `column`, used to detect an
    /// ambiguous unqualified reference.
    pub fn find_column_in_tables(&self, column: &str, schema: Option<&str>, tables: &[&str]) -> Vec<String> {
        let Some(schema_info) = self.schema(schema) else { return Vec::new() };
        tables
            .iter()
            .filter_map(|table_name| {
                let table = schema_info.table(table_name)?;
                table.column(column)?;
                Some(format!("{table_name}.{column}"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resolver() -> SchemaResolver {
        SchemaResolver::new(vec![SchemaInfo {
            name: "public".to_string(),
            tables: vec![
                TableInfo {
                    name: "users".to_string(),
                    columns: vec![
                        ColumnInfo {
                            name: "id".to_string(),
                            data_type: "BIGINT".to_string(),
                            nullable: false,
                            max_length: None,
                            precision: None,
                            scale: None,
                            is_primary_key: true,
                        },
                        ColumnInfo {
                            name: "email".to_string(),
                            data_type: "VARCHAR(255)".to_string(),
                            nullable: false,
                            max_length: Some(255),
                            precision: None,
                            scale: None,
                            is_primary_key: false,
                        },
                    ],
                },
                TableInfo {
                    name: "orders".to_string(),
                    columns: vec![ColumnInfo {
                        name: "id".to_string(),
                        data_type: "BIGINT".to_string(),
                        nullable: false,
                        max_length: None,
                        precision: None,
                        scale: None,
                        is_primary_key: true,
                    }],
                },
            ],
        }])
    }

    #[test]
    fn resolves_known_column() {
        let resolver = sample_resolver();
        let column = resolver.resolve_column(None, "users", "email", 0..0).unwrap();
        assert_eq!(column.type_info().normalized, NormalizedType::String);
    }

    #[test]
    fn unknown_column_suggests_closest_match() {
        let resolver = sample_resolver();
        let err = resolver.resolve_column(None, "users", "emial", 0..0).unwrap_err();
        match err {
            SnapSqlError::UnknownColumn { candidates, .. } => assert_eq!(candidates, vec!["email".to_string()]),
            other => panic!("expected UnknownColumn, got {other:?}"),
        }
    }

    #[test]
    fn unknown_table_is_an_error() {
        let resolver = sample_resolver();
        assert!(resolver.validate_table(None, "customers", 0..0).is_err());
    }

    #[test]
    fn ambiguous_id_column_found_in_both_tables() {
        let resolver = sample_resolver();
        let matches = resolver.find_column_in_tables("id", None, &["users", "orders"]);
        assert_eq!(matches, vec!["users.id".to_string(), "orders.id".to_string()]);
    }

    #[test]
    fn db_type_mapping_strips_parameters() {
        assert_eq!(NormalizedType::from_db_type("VARCHAR(255)"), NormalizedType::String);
        assert_eq!(NormalizedType::from_db_type("NUMERIC(10,2)"), NormalizedType::Decimal);
        assert_eq!(NormalizedType::from_db_type("JSONB"), NormalizedType::Json);
    }
}
