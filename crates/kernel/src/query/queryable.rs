//! Query-building abstraction consumed by the compilers.
//!
//! A [`Queryable`] accumulates predicates, ordering and a window before it is
//! executed. Backends share [`WhereClause`] to record the predicate tree.

use serde::Serialize;

use super::operators::Comparison;
use super::types::{FilterValue, Joiner, SortDirection};

/// A resolved comparison ready to be added to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub comparison: Comparison,
    /// Operand after wildcard wrapping.
    pub value: FilterValue,
}

/// One entry of a where clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Predicate(Predicate),
    /// Parenthesized sub-clause.
    Group(WhereClause),
}

/// Ordered clauses, each attached to its predecessor with a joiner.
///
/// The joiner of the first clause is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    clauses: Vec<(Joiner, Clause)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn clauses(&self) -> &[(Joiner, Clause)] {
        &self.clauses
    }

    /// Append a predicate.
    pub fn push(&mut self, joiner: Joiner, predicate: Predicate) {
        self.clauses.push((joiner, Clause::Predicate(predicate)));
    }

    /// Build a nested group with `build` and append it.
    ///
    /// An empty group adds nothing, so it matches every row.
    pub fn group<F>(&mut self, joiner: Joiner, build: F)
    where
        F: FnOnce(&mut WhereClause),
    {
        let mut inner = WhereClause::new();
        build(&mut inner);
        if !inner.is_empty() {
            self.clauses.push((joiner, Clause::Group(inner)));
        }
    }

    /// Left fold over the clauses. Returns `None` for an empty clause.
    pub fn fold<T, L, J>(&self, leaf: &mut L, join: &mut J) -> Option<T>
    where
        L: FnMut(&Predicate) -> T,
        J: FnMut(Joiner, T, T) -> T,
    {
        let mut acc: Option<T> = None;
        for (joiner, clause) in &self.clauses {
            let value = match clause {
                Clause::Predicate(p) => leaf(p),
                Clause::Group(inner) => match inner.fold(leaf, join) {
                    Some(v) => v,
                    None => continue,
                },
            };
            acc = Some(match acc {
                None => value,
                Some(prev) => join(*joiner, prev, value),
            });
        }
        acc
    }

    /// Evaluate the clause with a per-predicate test. Empty clauses match.
    pub fn matches<F>(&self, mut test: F) -> bool
    where
        F: FnMut(&Predicate) -> bool,
    {
        self.fold(&mut test, &mut |joiner, l, r| match joiner {
            Joiner::And => l && r,
            Joiner::Or => l || r,
        })
        .unwrap_or(true)
    }
}

/// Mutable query-building handle.
///
/// Implementations must keep every instance independent: clauses added to
/// one queryable never show up in another.
pub trait Queryable {
    /// Record type returned by [`Queryable::get`].
    type Row: Serialize;

    /// Collaborator error raised while executing.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Add a predicate, joined to the preceding clause with `joiner`.
    fn where_predicate(&mut self, predicate: Predicate, joiner: Joiner);

    /// Add a parenthesized group whose content is produced by `build`.
    fn where_group<F>(&mut self, joiner: Joiner, build: F)
    where
        F: FnOnce(&mut Self);

    /// Append an ordering clause.
    fn order_by(&mut self, field: &str, direction: SortDirection);

    /// Skip the first `offset` rows.
    fn skip(&mut self, offset: u64);

    /// Return at most `limit` rows.
    fn take(&mut self, limit: u64);

    /// Execute and return rows in query order.
    fn get(self) -> Result<Vec<Self::Row>, Self::Error>;

    /// Execute a row count, ignoring ordering and window clauses.
    fn count(self) -> Result<u64, Self::Error>;
}

/// A data source that hands out fresh queryables rooted at one table.
pub trait Model {
    type Query: Queryable;

    fn new_query(&self) -> Self::Query;
}

/// Stack of open groups used by queryables built on [`WhereClause`].
///
/// `where_group` receives the queryable itself, so the clause being
/// built has to be swapped in and out around the callback.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClauseBuilder {
    current: WhereClause,
}

impl ClauseBuilder {
    pub(crate) fn push(&mut self, joiner: Joiner, predicate: Predicate) {
        self.current.push(joiner, predicate);
    }

    pub(crate) fn open(&mut self) -> WhereClause {
        std::mem::take(&mut self.current)
    }

    pub(crate) fn close(&mut self, outer: WhereClause, joiner: Joiner) {
        let inner = std::mem::replace(&mut self.current, outer);
        self.current.group(joiner, |g| *g = inner);
    }

    pub(crate) fn clause(&self) -> &WhereClause {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(field: &str) -> Predicate {
        Predicate {
            field: field.to_string(),
            comparison: Comparison::Equal,
            value: FilterValue::Boolean(true),
        }
    }

    fn eval(clause: &WhereClause, truthy: &[&str]) -> bool {
        clause.matches(|p| truthy.contains(&p.field.as_str()))
    }

    #[test]
    fn empty_clause_matches() {
        assert!(WhereClause::new().matches(|_| false));
    }

    #[test]
    fn empty_group_adds_nothing() {
        let mut clause = WhereClause::new();
        clause.group(Joiner::And, |_| {});
        assert!(clause.is_empty());
    }

    #[test]
    fn nested_group_keeps_precedence() {
        // a AND (b OR c)
        let mut clause = WhereClause::new();
        clause.push(Joiner::And, pred("a"));
        clause.group(Joiner::And, |g| {
            g.push(Joiner::Or, pred("b"));
            g.push(Joiner::Or, pred("c"));
        });

        assert!(eval(&clause, &["a", "c"]));
        assert!(!eval(&clause, &["c"]), "(a AND b) OR c would match here");
        assert!(!eval(&clause, &["a"]));
    }

    #[test]
    fn clause_builder_swaps_groups() {
        let mut builder = ClauseBuilder::default();
        builder.push(Joiner::And, pred("a"));
        let outer = builder.open();
        builder.push(Joiner::Or, pred("b"));
        builder.push(Joiner::Or, pred("c"));
        builder.close(outer, Joiner::And);

        let clause = builder.clause();
        assert_eq!(clause.len(), 2);
        assert!(matches!(clause.clauses()[1].1, Clause::Group(ref g) if g.len() == 2));
    }
}
