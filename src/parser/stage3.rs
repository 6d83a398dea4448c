//! Stage 3 — clause assignment & scoping (spec §4.5).
//!
//! Expands stage 2's clause ranges into a per-token clause-section map,
//! the structure stage 5 consults to enforce (I4) (a directive block may
//! not straddle clause boundaries, except inside WITH).

use super::{ClauseSection, RawClause};
use crate::token::Token;

/// `sections[i]` is the clause section token `i` belongs to, or `None` for
/// tokens before the first clause keyword (there should be none once
/// stage 2 has succeeded, but trivia before the statement is tolerated).
pub(crate) fn run(tokens: &[Token], clauses: &[RawClause]) -> Vec<Option<ClauseSection>> {
    let mut sections = vec![None; tokens.len()];
    for clause in clauses {
        for i in clause.range.clone() {
            if i < sections.len() {
                sections[i] = Some(clause.section);
            }
        }
    }
    sections
}
