//! The type-inference engine (spec §4.11-§4.12).
//!
//! Produces one [`FieldInfo`] per SELECT/RETURNING field, in order,
//! dispatching on [`FieldKind`] the way stage 4 classified each field.

pub mod cast_analyzer;
pub mod dml;
pub mod field_name;
pub mod functions;
pub mod operators;

use crate::ast::{FieldKind, SelectField, Statement, TableRef};
use crate::diag::Diag;
use crate::error::SnapSqlError;
use crate::schema::{NormalizedType, SchemaResolver, TypeInfo};
use field_name::FieldNameGenerator;

/// Where a field's value ultimately comes from; carried alongside its type
/// so downstream codegen knows whether to expect a driver-reported column
/// or a value this crate synthesized itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Column,
    Function,
    Literal,
    Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub type_info: TypeInfo,
    pub is_generated: bool,
    pub source_kind: SourceKind,
}

pub struct TypeInferenceEngine<'a> {
    resolver: &'a SchemaResolver,
}

impl<'a> TypeInferenceEngine<'a> {
    pub fn new(resolver: &'a SchemaResolver) -> Self {
        Self { resolver }
    }

    pub fn infer_field_types(&self, statement: &Statement) -> (Vec<FieldInfo>, Vec<Diag>) {
        dml::infer_statement_fields(self, statement)
    }

    pub(crate) fn infer_select_fields(&self, fields: &[SelectField], tables: &[&TableRef]) -> (Vec<FieldInfo>, Vec<Diag>) {
        let mut generator = FieldNameGenerator::new();
        let mut diagnostics = Vec::new();
        let infos = fields
            .iter()
            .map(|field| {
                let (type_info, source_kind, diag) = self.infer_one(field, tables);
                if let Some(diag) = diag {
                    diagnostics.push(diag);
                }
                let base = FieldNameGenerator::base_name_for(field);
                FieldInfo { name: generator.generate(&base), type_info, is_generated: false, source_kind }
            })
            .collect();
        (infos, diagnostics)
    }

    fn infer_one(&self, field: &SelectField, tables: &[&TableRef]) -> (TypeInfo, SourceKind, Option<Diag>) {
        if let Some(explicit) = &field.explicit_type {
            return (
                TypeInfo { normalized: NormalizedType::from_db_type(explicit), nullable: true },
                SourceKind::Expression,
                None,
            );
        }
        match field.kind {
            FieldKind::Literal => (infer_literal(&field.text), SourceKind::Literal, None),
            FieldKind::Single => self.infer_single_column(&field.text, tables, field.span.clone()),
            FieldKind::TableQualified => self.infer_qualified_column(&field.text, tables, field.span.clone()),
            FieldKind::Function => (infer_function_text(&field.text), SourceKind::Function, None),
            FieldKind::Complex => self.infer_complex(&field.text),
        }
    }

    fn infer_single_column(&self, name: &str, tables: &[&TableRef], span: crate::ast::Span) -> (TypeInfo, SourceKind, Option<Diag>) {
        let table_names: Vec<&str> = tables.iter().map(|t| t.table.as_str()).collect();
        let matches = self.resolver.find_column_in_tables(name, None, &table_names);
        match matches.len() {
            1 => {
                let table = matches[0].split('.').next().unwrap_or_default();
                match self.resolver.resolve_column(None, table, name, span.clone()) {
                    Ok(column) => (column.type_info(), SourceKind::Column, None),
                    Err(err) => (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Column, Some(err.to_diag())),
                }
            }
            0 => {
                let err = SnapSqlError::UnknownColumn { span, name: name.to_string(), candidates: Vec::new() };
                (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Column, Some(err.to_diag()))
            }
            _ => {
                let err = SnapSqlError::AmbiguousColumn { span, name: name.to_string(), matches };
                (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Column, Some(err.to_diag()))
            }
        }
    }

    fn infer_qualified_column(&self, text: &str, tables: &[&TableRef], span: crate::ast::Span) -> (TypeInfo, SourceKind, Option<Diag>) {
        let Some((qualifier, column)) = text.split_once('.') else {
            return self.infer_single_column(text, tables, span);
        };
        let Some(table) = tables.iter().find(|t| t.reference_name() == qualifier) else {
            let err = SnapSqlError::UnknownTable { span, name: qualifier.to_string(), candidates: Vec::new() };
            return (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Column, Some(err.to_diag()));
        };
        match self.resolver.resolve_column(None, &table.table, column, span) {
            Ok(info) => (info.type_info(), SourceKind::Column, None),
            Err(err) => (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Column, Some(err.to_diag())),
        }
    }

    fn infer_complex(&self, text: &str) -> (TypeInfo, SourceKind, Option<Diag>) {
        if let Some(cast) = cast_analyzer::detect_cast(text) {
            return (TypeInfo { normalized: NormalizedType::from_db_type(&cast.target_type), nullable: true }, SourceKind::Expression, None);
        }
        if text.to_ascii_uppercase().trim_start().starts_with("CASE") {
            return (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Expression, None);
        }
        for op in ["->>", "->", "<=", ">=", "<>", "!=", "=", "<", ">", "||", "+", "-", "*", "/"] {
            if text.find(op).is_some() && !text.contains('(') {
                let left = TypeInfo { normalized: NormalizedType::Any, nullable: true };
                let right = TypeInfo { normalized: NormalizedType::Any, nullable: true };
                return (operators::infer_operator(op, left, Some(right)), SourceKind::Expression, None);
            }
        }
        (TypeInfo { normalized: NormalizedType::Any, nullable: true }, SourceKind::Expression, None)
    }
}

fn infer_literal(text: &str) -> TypeInfo {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("null") {
        TypeInfo { normalized: NormalizedType::Any, nullable: true }
    } else if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        TypeInfo { normalized: NormalizedType::Bool, nullable: false }
    } else if trimmed.starts_with('\'') || trimmed.starts_with('"') {
        TypeInfo { normalized: NormalizedType::String, nullable: false }
    } else if trimmed.contains('.') {
        TypeInfo { normalized: NormalizedType::Decimal, nullable: false }
    } else {
        TypeInfo { normalized: NormalizedType::Int, nullable: false }
    }
}

fn infer_function_text(text: &str) -> TypeInfo {
    let Some(paren) = text.find('(') else { return TypeInfo { normalized: NormalizedType::Any, nullable: true } };
    let name = &text[..paren];
    let inner = text[paren + 1..].trim_end_matches(')');
    let args: Vec<TypeInfo> = inner
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| infer_literal(s))
        .collect();
    functions::infer_function(name, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnInfo, SchemaInfo, TableInfo};

    fn resolver() -> SchemaResolver {
        SchemaResolver::new(vec![SchemaInfo {
            name: "public".to_string(),
            tables: vec![TableInfo {
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
                        nullable: true,
                        max_length: None,
                        precision: None,
                        scale: None,
                        is_primary_key: false,
                    },
                ],
            }],
        }])
    }

    fn field(kind: FieldKind, text: &str) -> SelectField {
        SelectField { kind, text: text.to_string(), alias: None, explicit_type: None, span: 0..0 }
    }

    #[test]
    fn infers_single_column_from_schema() {
        let schema = resolver();
        let engine = TypeInferenceEngine::new(&schema);
        let table = TableRef { schema: None, table: "users".to_string(), alias: None, span: 0..0 };
        let tables = vec![&table];
        let (infos, diags) = engine.infer_select_fields(&[field(FieldKind::Single, "email")], &tables);
        assert!(diags.is_empty());
        assert_eq!(infos[0].type_info.normalized, NormalizedType::String);
        assert!(infos[0].type_info.nullable);
        assert_eq!(infos[0].name, "email");
    }

    #[test]
    fn unknown_column_produces_a_diagnostic() {
        let schema = resolver();
        let engine = TypeInferenceEngine::new(&schema);
        let table = TableRef { schema: None, table: "users".to_string(), alias: None, span: 0..0 };
        let tables = vec![&table];
        let (_, diags) = engine.infer_select_fields(&[field(FieldKind::Single, "nickname")], &tables);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some("UnknownColumn"));
    }

    #[test]
    fn function_field_is_typed_via_function_table() {
        let schema = resolver();
        let engine = TypeInferenceEngine::new(&schema);
        let (infos, _) = engine.infer_select_fields(&[field(FieldKind::Function, "COUNT(id)")], &[]);
        assert_eq!(infos[0].type_info.normalized, NormalizedType::Int);
        assert!(!infos[0].type_info.nullable);
        assert_eq!(infos[0].name, "count_id");
    }

    #[test]
    fn literal_field_infers_from_syntax() {
        let schema = resolver();
        let engine = TypeInferenceEngine::new(&schema);
        let (infos, _) = engine.infer_select_fields(&[field(FieldKind::Literal, "'x'")], &[]);
        assert_eq!(infos[0].type_info.normalized, NormalizedType::String);
        assert_eq!(infos[0].name, "string_literal");
    }

    #[test]
    fn duplicate_field_names_get_disambiguated() {
        let schema = resolver();
        let engine = TypeInferenceEngine::new(&schema);
        let table = TableRef { schema: None, table: "users".to_string(), alias: None, span: 0..0 };
        let tables = vec![&table];
        let (infos, _) = engine.infer_select_fields(
            &[field(FieldKind::Single, "id"), field(FieldKind::Single, "id")],
            &tables,
        );
        assert_eq!(infos[0].name, "id");
        assert_eq!(infos[1].name, "id2");
    }
}
