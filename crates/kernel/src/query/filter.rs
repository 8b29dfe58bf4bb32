//! Filter compiler.
//!
//! Translates a filter tree into one parenthesized group on a queryable.
//! Operators are resolved for the whole tree before the queryable is
//! touched, so a rejected request never leaves a half-built query behind.

use crate::error::QueryResult;

use super::operators;
use super::queryable::{Predicate, Queryable};
use super::types::{FilterNode, Joiner};

/// Filter tree with every operator resolved.
#[derive(Debug, Clone, PartialEq)]
enum Resolved {
    Group {
        joiner: Joiner,
        children: Vec<Resolved>,
    },
    Leaf(Predicate),
}

/// Compile `node` onto `query` as a single grouped clause.
///
/// Every group combines its children with its own joiner, the root included.
/// A nested group is attached to its siblings with the enclosing group's
/// joiner. A bare comparison root becomes a one-element group combined with
/// `joiner`, which also attaches the whole group to existing clauses.
pub fn compile<Q: Queryable>(query: &mut Q, node: &FilterNode, joiner: Joiner) -> QueryResult<()> {
    let (resolved, inner) = match node {
        FilterNode::Group {
            joiner: own,
            children,
        } => (
            children
                .iter()
                .map(resolve)
                .collect::<QueryResult<Vec<_>>>()?,
            *own,
        ),
        FilterNode::Comparison { .. } => (vec![resolve(node)?], joiner),
    };

    tracing::trace!(
        joiner = inner.as_str(),
        children = resolved.len(),
        depth = node.depth(),
        "compiling filter group"
    );
    query.where_group(joiner, |q| apply(q, &resolved, inner));
    Ok(())
}

fn resolve(node: &FilterNode) -> QueryResult<Resolved> {
    match node {
        FilterNode::Group { joiner, children } => Ok(Resolved::Group {
            joiner: *joiner,
            children: children.iter().map(resolve).collect::<QueryResult<_>>()?,
        }),
        FilterNode::Comparison {
            field,
            operator,
            value,
        } => {
            let op = operators::resolve(operator)?;
            let value = op.prepare(value)?;
            Ok(Resolved::Leaf(Predicate {
                field: field.clone(),
                comparison: op.comparison,
                value,
            }))
        }
    }
}

fn apply<Q: Queryable>(query: &mut Q, children: &[Resolved], joiner: Joiner) {
    for child in children {
        match child {
            Resolved::Group {
                joiner: inner,
                children,
            } => query.where_group(joiner, |q| apply(q, children, *inner)),
            Resolved::Leaf(predicate) => query.where_predicate(predicate.clone(), joiner),
        }
    }
}
