//! Stage 5 — directive structure validation (spec §4.7).
//!
//! Re-walks the stage-1 token stream, this time only looking at directive
//! comments, and builds the nested [`DirectiveBlock`] tree stage 6 will
//! walk. Also enforces (I4): an `if`/`for` block may not open in one
//! clause section and close in another, except when either end sits
//! inside a `WITH` clause (a CTE body is effectively its own statement).

use super::{span_of, ClauseSection, ParserOptions};
use crate::ast::{DirectiveBlock, Statement};
use crate::diag::Diag;
use crate::error::SnapSqlError;
use crate::token::{DirectiveKind, Token};

enum OpenFrame {
    If {
        branches: Vec<(String, Vec<DirectiveBlock>)>,
        else_body: Option<Vec<DirectiveBlock>>,
        open_idx: usize,
        open_section: Option<ClauseSection>,
    },
    For {
        loop_variable: String,
        list_expr: String,
        body: Vec<DirectiveBlock>,
        open_idx: usize,
        open_section: Option<ClauseSection>,
    },
}

pub fn run(
    tokens: &[Token],
    section_map: &[Option<ClauseSection>],
    statement: &mut Statement,
    diagnostics: &mut Vec<Diag>,
    _options: ParserOptions,
) {
    let mut stack: Vec<OpenFrame> = Vec::new();
    let mut top_level: Vec<DirectiveBlock> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Some(directive) = token.kind.directive() else { continue };
        let section = section_map.get(i).copied().flatten();

        match &directive.kind {
            DirectiveKind::If => stack.push(OpenFrame::If {
                branches: vec![(directive.payload.to_string(), Vec::new())],
                else_body: None,
                open_idx: i,
                open_section: section,
            }),
            DirectiveKind::ElseIf => {
                if let Some(OpenFrame::If { branches, .. }) = stack.last_mut() {
                    branches.push((directive.payload.to_string(), Vec::new()));
                }
            }
            DirectiveKind::Else => {
                if let Some(OpenFrame::If { else_body, .. }) = stack.last_mut() {
                    *else_body = Some(Vec::new());
                }
            }
            DirectiveKind::For => stack.push(OpenFrame::For {
                loop_variable: directive.loop_variable.clone().unwrap_or_default().to_string(),
                list_expr: directive.payload.to_string(),
                body: Vec::new(),
                open_idx: i,
                open_section: section,
            }),
            DirectiveKind::End => {
                let Some(frame) = stack.pop() else { continue };
                let (open_idx, open_section, block) = match frame {
                    OpenFrame::If { branches, else_body, open_idx, open_section } => (
                        open_idx,
                        open_section,
                        DirectiveBlock::If { branches, else_branch: else_body, span: span_of(tokens, &(open_idx..i + 1)) },
                    ),
                    OpenFrame::For { loop_variable, list_expr, body, open_idx, open_section } => (
                        open_idx,
                        open_section,
                        DirectiveBlock::For { loop_variable, list_expr, body, span: span_of(tokens, &(open_idx..i + 1)) },
                    ),
                };

                if let (Some(os), Some(cs)) = (open_section, section) {
                    let relaxed = os == ClauseSection::With || cs == ClauseSection::With;
                    if os != cs && !relaxed {
                        diagnostics.push(
                            SnapSqlError::DirectiveSpansClauses {
                                open_span: tokens[open_idx].span.clone(),
                                close_span: token.span.clone(),
                            }
                            .to_diag(),
                        );
                    }
                }

                push_block(&mut stack, &mut top_level, block);
            }
            DirectiveKind::Substitution => {
                let block = DirectiveBlock::Substitution { expr: directive.payload.to_string(), span: token.span.clone() };
                push_block(&mut stack, &mut top_level, block);
            }
            DirectiveKind::Constant => {
                let block = DirectiveBlock::Constant { expr: directive.payload.to_string(), span: token.span.clone() };
                push_block(&mut stack, &mut top_level, block);
            }
            DirectiveKind::Environment => {
                let block = DirectiveBlock::EnvironmentRef { expr: directive.payload.to_string(), span: token.span.clone() };
                push_block(&mut stack, &mut top_level, block);
            }
        }
    }

    statement.directives = top_level;
}

fn push_block(stack: &mut [OpenFrame], top_level: &mut Vec<DirectiveBlock>, block: DirectiveBlock) {
    current_body(stack, top_level).push(block);
}

fn current_body<'a>(stack: &'a mut [OpenFrame], top_level: &'a mut Vec<DirectiveBlock>) -> &'a mut Vec<DirectiveBlock> {
    match stack.last_mut() {
        None => top_level,
        Some(OpenFrame::If { branches, else_body, .. }) => {
            if let Some(body) = else_body {
                body
            } else {
                &mut branches.last_mut().expect("if frame always has a leading branch").1
            }
        }
        Some(OpenFrame::For { body, .. }) => body,
    }
}
