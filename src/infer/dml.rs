//! DML field inference (spec §4.12).
//!
//! A RETURNING clause is inferred exactly like a SELECT list. Otherwise a
//! single synthetic `affected_rows : int (non-null)` field is produced.

use super::{FieldInfo, SourceKind, TypeInferenceEngine};
use crate::ast::{Statement, StatementKind};
use crate::diag::Diag;
use crate::schema::{NormalizedType, TypeInfo};

pub fn infer_statement_fields(engine: &TypeInferenceEngine<'_>, statement: &Statement) -> (Vec<FieldInfo>, Vec<Diag>) {
    let tables = statement.visible_tables();

    match statement.kind {
        StatementKind::Select => engine.infer_select_fields(&statement.select, &tables),
        StatementKind::Insert | StatementKind::Update | StatementKind::Delete => {
            if statement.returning.is_empty() {
                (vec![affected_rows_field()], Vec::new())
            } else {
                engine.infer_select_fields(&statement.returning, &tables)
            }
        }
    }
}

fn affected_rows_field() -> FieldInfo {
    FieldInfo {
        name: "affected_rows".to_string(),
        type_info: TypeInfo { normalized: NormalizedType::Int, nullable: false },
        is_generated: true,
        source_kind: SourceKind::Function,
    }
}
