//! Filter operator registry.
//!
//! Maps the grid's client-facing operator names to comparison semantics.
//! The table is fixed; any other name rejects the whole request.

use crate::error::{QueryError, QueryResult};

use super::types::FilterValue;

/// Comparison performed by a resolved operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    /// SQL `LIKE` against a wildcard pattern.
    Like,
    /// SQL `NOT LIKE` against a wildcard pattern.
    NotLike,
}

impl Comparison {
    /// SQL spelling of the comparison.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Equal => "=",
            Comparison::NotEqual => "<>",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Like => "like",
            Comparison::NotLike => "not like",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            Comparison::Greater
                | Comparison::GreaterOrEqual
                | Comparison::Less
                | Comparison::LessOrEqual
        )
    }
}

/// Where `%` goes around a pattern operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    /// `%value%`
    Both,
    /// `value%`
    Trailing,
    /// `%value`
    Leading,
}

impl Wildcard {
    /// Wrap a literal. `%` and `_` already in the literal are not escaped.
    pub fn wrap(&self, literal: &str) -> String {
        match self {
            Wildcard::Both => format!("%{literal}%"),
            Wildcard::Trailing => format!("{literal}%"),
            Wildcard::Leading => format!("%{literal}"),
        }
    }
}

/// A registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub name: &'static str,
    pub comparison: Comparison,
    pub wildcard: Option<Wildcard>,
}

const fn op(name: &'static str, comparison: Comparison, wildcard: Option<Wildcard>) -> Operator {
    Operator {
        name,
        comparison,
        wildcard,
    }
}

/// Every operator the grid may send.
pub const OPERATORS: &[Operator] = &[
    op("equal", Comparison::Equal, None),
    op("notEqual", Comparison::NotEqual, None),
    op("greaterThan", Comparison::Greater, None),
    op("greaterThanOrEqual", Comparison::GreaterOrEqual, None),
    op("lessThan", Comparison::Less, None),
    op("lessThanOrEqual", Comparison::LessOrEqual, None),
    op("contains", Comparison::Like, Some(Wildcard::Both)),
    op("notContains", Comparison::NotLike, Some(Wildcard::Both)),
    op("startsWith", Comparison::Like, Some(Wildcard::Trailing)),
    op("endsWith", Comparison::Like, Some(Wildcard::Leading)),
];

/// Look up an operator by its client name (case-sensitive).
pub fn resolve(name: &str) -> QueryResult<Operator> {
    OPERATORS
        .iter()
        .find(|op| op.name == name)
        .copied()
        .ok_or_else(|| QueryError::UnknownOperator(name.to_string()))
}

impl Operator {
    /// Check the operand against this operator and apply wildcard wrapping.
    pub fn prepare(&self, value: &FilterValue) -> QueryResult<FilterValue> {
        let unsupported = || QueryError::UnsupportedValue {
            operator: self.name,
            kind: value.kind(),
        };

        if let Some(wildcard) = self.wildcard {
            let literal = value.as_string().ok_or_else(unsupported)?;
            return Ok(FilterValue::String(wildcard.wrap(&literal)));
        }

        if self.comparison.is_ordering()
            && matches!(value, FilterValue::Null | FilterValue::List(_))
        {
            return Err(unsupported());
        }

        if let FilterValue::List(items) = value
            && items
                .iter()
                .any(|v| matches!(v, FilterValue::List(_) | FilterValue::Null))
        {
            return Err(unsupported());
        }

        Ok(value.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_documented_name() {
        let expected = [
            ("equal", "="),
            ("notEqual", "<>"),
            ("greaterThan", ">"),
            ("greaterThanOrEqual", ">="),
            ("lessThan", "<"),
            ("lessThanOrEqual", "<="),
            ("contains", "like"),
            ("notContains", "not like"),
            ("startsWith", "like"),
            ("endsWith", "like"),
        ];
        for (name, symbol) in expected {
            let op = resolve(name).unwrap();
            assert_eq!(op.name, name);
            assert_eq!(op.comparison.symbol(), symbol, "symbol for {name}");
        }
        assert_eq!(OPERATORS.len(), expected.len());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        match resolve("bogus") {
            Err(QueryError::UnknownOperator(name)) => assert_eq!(name, "bogus"),
            other => panic!("expected UnknownOperator, got {other:?}"),
        }
        assert!(resolve("Equal").is_err(), "names are case-sensitive");
        assert!(resolve("=").is_err());
    }

    #[test]
    fn pattern_operators_wrap_values() {
        let v = FilterValue::from("ab");
        assert_eq!(
            resolve("contains").unwrap().prepare(&v).unwrap(),
            FilterValue::from("%ab%")
        );
        assert_eq!(
            resolve("notContains").unwrap().prepare(&v).unwrap(),
            FilterValue::from("%ab%")
        );
        assert_eq!(
            resolve("startsWith").unwrap().prepare(&v).unwrap(),
            FilterValue::from("ab%")
        );
        assert_eq!(
            resolve("endsWith").unwrap().prepare(&v).unwrap(),
            FilterValue::from("%ab")
        );
    }

    #[test]
    fn pattern_wildcards_in_value_are_not_escaped() {
        let op = resolve("contains").unwrap();
        assert_eq!(
            op.prepare(&FilterValue::from("100%_done")).unwrap(),
            FilterValue::from("%100%_done%")
        );
    }

    #[test]
    fn pattern_operators_stringify_numbers() {
        let op = resolve("startsWith").unwrap();
        assert_eq!(
            op.prepare(&FilterValue::Integer(12)).unwrap(),
            FilterValue::from("12%")
        );
    }

    #[test]
    fn value_shapes_are_checked() {
        let contains = resolve("contains").unwrap();
        assert!(matches!(
            contains.prepare(&FilterValue::Null),
            Err(QueryError::UnsupportedValue { kind: "null", .. })
        ));
        let gt = resolve("greaterThan").unwrap();
        assert!(gt.prepare(&FilterValue::List(vec![])).is_err());
        assert!(gt.prepare(&FilterValue::Null).is_err());

        let eq = resolve("equal").unwrap();
        assert!(eq.prepare(&FilterValue::Null).is_ok());
        assert!(
            eq.prepare(&FilterValue::List(vec![1.into(), 2.into()]))
                .is_ok()
        );
        assert!(
            eq.prepare(&FilterValue::List(vec![FilterValue::List(vec![])]))
                .is_err()
        );
    }
}
