#![allow(rustdoc::broken_intra_doc_links)]
//! A SQL template engine core: tokenizes directive-annotated SQL, runs it
//! through a seven-stage parser pipeline, and infers a result-shape field
//! list against a database schema.
//!
//! # Parse
//!
//! ```
//! use snapsql_core::namespace::FunctionDefinition;
//! use snapsql_core::token::Dialect;
//! use snapsql_core::{parse, ParserOptions};
//!
//! let function = FunctionDefinition::new("find_user");
//! let outcome = parse(
//!     "SELECT id FROM users WHERE id = 1",
//!     Dialect::Postgres,
//!     &function,
//!     Vec::new(),
//!     ParserOptions::default(),
//! );
//! assert!(outcome.statement.is_some());
//! ```
//!
//! # Infer field types
//!
//! ```
//! use snapsql_core::infer_field_types;
//! use snapsql_core::namespace::FunctionDefinition;
//! use snapsql_core::schema::{ColumnInfo, SchemaInfo, SchemaResolver, TableInfo};
//! use snapsql_core::token::Dialect;
//! use snapsql_core::ParserOptions;
//!
//! let function = FunctionDefinition::new("find_user");
//! let outcome = snapsql_core::parse(
//!     "SELECT id FROM users",
//!     Dialect::Postgres,
//!     &function,
//!     Vec::new(),
//!     ParserOptions::default(),
//! );
//! let statement = outcome.statement.unwrap();
//!
//! let resolver = SchemaResolver::new(vec![SchemaInfo {
//!     name: "public".to_string(),
//!     tables: vec![TableInfo {
//!         name: "users".to_string(),
//!         columns: vec![ColumnInfo {
//!             name: "id".to_string(),
//!             data_type: "BIGINT".to_string(),
//!             nullable: false,
//!             max_length: None,
//!             precision: None,
//!             scale: None,
//!             is_primary_key: true,
//!         }],
//!     }],
//! }]);
//!
//! let (fields, diagnostics) = infer_field_types(&resolver, &statement);
//! assert!(diagnostics.is_empty());
//! assert_eq!(fields[0].name, "id");
//! ```

pub mod ast;
pub mod diag;
pub mod error;
pub mod infer;
pub mod namespace;
pub mod parser;
pub mod schema;
pub mod token;

pub use ast::{Span, Spanned, Statement};
pub use diag::{Diag, DiagLabel, DiagSeverity, LabelRole};
pub use error::SnapSqlError;
pub use infer::{FieldInfo, SourceKind, TypeInferenceEngine};
pub use namespace::{FunctionDefinition, Namespace, ParamType};
pub use parser::{ParseOutcome, ParserOptions};
pub use schema::SchemaResolver;
pub use token::{tokenize, Dialect, Token, TokenKind, TokenizeResult};

use miette::Report;

/// Tokenizes `source` under `dialect` and runs it through the parsing
/// pipeline. This is the primary entry point external collaborators call.
pub fn parse(
    source: &str,
    dialect: Dialect,
    function: &FunctionDefinition,
    environment: Vec<(String, ParamType)>,
    options: ParserOptions,
) -> ParseOutcome {
    let tokenized = tokenize(source, dialect);
    parser::parse(&tokenized.tokens, source, dialect, function, environment, options)
}

/// Runs the inference engine over an already-parsed statement. Thin sugar
/// over [`TypeInferenceEngine`] so most callers never construct the engine
/// by hand.
pub fn infer_field_types(resolver: &SchemaResolver, statement: &Statement) -> (Vec<FieldInfo>, Vec<Report>) {
    let engine = TypeInferenceEngine::new(resolver);
    let (fields, diagnostics) = engine.infer_field_types(statement);
    let source_file = diag::SourceFile::new(String::new());
    let reports = diag::convert_diagnostics_to_reports(&diagnostics, &source_file);
    (fields, reports)
}

/// The combined result of tokenizing, parsing, and inferring in one call.
pub struct TemplateOutcome {
    pub statement: Option<Statement>,
    pub fields: Vec<FieldInfo>,
    pub diagnostics: Vec<Report>,
}

/// Tokenizes, parses, and (if parsing succeeded) infers field types in a
/// single call — pure sugar, performs no work the individual entry points
/// don't already do.
pub fn parse_and_infer(
    source: &str,
    dialect: Dialect,
    function: &FunctionDefinition,
    environment: Vec<(String, ParamType)>,
    resolver: &SchemaResolver,
    options: ParserOptions,
) -> TemplateOutcome {
    let outcome = parse(source, dialect, function, environment, options);

    let Some(statement) = &outcome.statement else {
        return TemplateOutcome { statement: None, fields: Vec::new(), diagnostics: outcome.diagnostics };
    };

    let (fields, infer_reports) = infer_field_types(resolver, statement);
    let mut diagnostics = outcome.diagnostics;
    diagnostics.extend(infer_reports);

    TemplateOutcome { statement: outcome.statement, fields, diagnostics }
}
