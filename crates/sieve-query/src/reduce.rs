//! Reduction of a flat criteria sequence into one predicate.
//!
//! Grouping is in-band: at every nesting level the grammar is
//!
//! ```text
//! group    := and_chain (OR and_chain)*
//! and_chain := term+
//! term     := criterion | OPEN_PARENTHESES group CLOSE_PARENTHESES
//! ```
//!
//! Adjacency binds tighter than OR; there are no other precedence rules.

use crate::criteria::{Criterion, OperatorKind};
use crate::error::{QueryError, QueryResult};
use crate::predicate::{conjoin, disjoin, PredicateBuilder};

/// Accumulator for one nesting level
struct Frame<P> {
    /// Position of the OPEN_PARENTHESES that started this frame
    opened_at: usize,
    disjuncts: Vec<P>,
    chain: Vec<P>,
    /// Position of an OR still waiting for its right-hand side
    pending_or: Option<usize>,
}

impl<P> Frame<P> {
    fn new(opened_at: usize) -> Self {
        Self {
            opened_at,
            disjuncts: Vec::new(),
            chain: Vec::new(),
            pending_or: None,
        }
    }

    fn push(&mut self, predicate: P) {
        self.chain.push(predicate);
        self.pending_or = None;
    }

    fn is_empty(&self) -> bool {
        self.disjuncts.is_empty() && self.chain.is_empty()
    }

    /// Close out the level; `None` if nothing was accumulated.
    fn finish(
        mut self,
        builder: &mut dyn PredicateBuilder<Predicate = P>,
    ) -> QueryResult<Option<P>> {
        if let Some(position) = self.pending_or {
            return Err(QueryError::MisplacedOr { position });
        }
        if self.is_empty() {
            return Ok(None);
        }
        let chain = std::mem::take(&mut self.chain);
        self.disjuncts.push(conjoin(builder, chain));
        Ok(Some(disjoin(builder, self.disjuncts)))
    }
}

/// Reduce `criteria` to a single predicate.
///
/// `leaf` compiles each ordinary criterion. Returns `None` for a sequence with
/// no ordinary criteria at all (an unfiltered query).
pub fn reduce<P, F>(
    criteria: &[Criterion],
    builder: &mut dyn PredicateBuilder<Predicate = P>,
    mut leaf: F,
) -> QueryResult<Option<P>>
where
    F: FnMut(&mut dyn PredicateBuilder<Predicate = P>, &Criterion) -> QueryResult<P>,
{
    let mut root = Frame::new(0);
    let mut stack: Vec<Frame<P>> = Vec::new();

    for (position, criterion) in criteria.iter().enumerate() {
        match criterion.operator {
            OperatorKind::OpenParentheses => stack.push(Frame::new(position)),
            OperatorKind::CloseParentheses => {
                let Some(inner) = stack.pop() else {
                    return Err(QueryError::UnbalancedParentheses { position });
                };
                let grouped = inner
                    .finish(builder)?
                    .ok_or(QueryError::EmptyGroup { position })?;
                current(&mut root, &mut stack).push(grouped);
            }
            OperatorKind::Or => {
                let frame = current(&mut root, &mut stack);
                if frame.chain.is_empty() {
                    return Err(QueryError::MisplacedOr { position });
                }
                let chain = std::mem::take(&mut frame.chain);
                let conjunction = conjoin(builder, chain);
                frame.disjuncts.push(conjunction);
                frame.pending_or = Some(position);
            }
            _ => {
                let predicate = leaf(builder, criterion)?;
                current(&mut root, &mut stack).push(predicate);
            }
        }
    }

    if let Some(unclosed) = stack.first() {
        return Err(QueryError::UnbalancedParentheses {
            position: unclosed.opened_at,
        });
    }

    root.finish(builder)
}

/// Innermost open frame
fn current<'a, P>(root: &'a mut Frame<P>, stack: &'a mut [Frame<P>]) -> &'a mut Frame<P> {
    match stack.last_mut() {
        Some(frame) => frame,
        None => root,
    }
}
