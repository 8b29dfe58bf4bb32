//! In-memory data source.
//!
//! Evaluates compiled queries over JSON records with SQL-like semantics:
//! - Missing or `null` fields satisfy nothing except `IS NULL`
//! - Numbers compare numerically; numeric strings are coerced against numbers
//! - `LIKE` is case-insensitive with `%` and `_` wildcards
//! - Ascending order puts nulls first; sorting is stable

use std::cmp::Ordering;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::operators::Comparison;
use super::queryable::{ClauseBuilder, Model, Predicate, Queryable, WhereClause};
use super::types::{FilterValue, Joiner, SortDirection};

/// A table of JSON records.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Arc<Vec<Value>>,
}

impl MemoryTable {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows: Arc::new(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Model for MemoryTable {
    type Query = MemoryQuery;

    fn new_query(&self) -> MemoryQuery {
        MemoryQuery {
            rows: Arc::clone(&self.rows),
            builder: ClauseBuilder::default(),
            orders: Vec::new(),
            offset: 0,
            limit: None,
        }
    }
}

/// Query over a [`MemoryTable`].
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    rows: Arc<Vec<Value>>,
    builder: ClauseBuilder,
    orders: Vec<(String, SortDirection)>,
    offset: u64,
    limit: Option<u64>,
}

impl MemoryQuery {
    /// Predicates accumulated so far.
    pub fn clause(&self) -> &WhereClause {
        self.builder.clause()
    }

    /// Ordering clauses accumulated so far.
    pub fn orders(&self) -> &[(String, SortDirection)] {
        &self.orders
    }

    fn filtered(&self) -> Vec<&Value> {
        let mut patterns = PatternCache::default();
        self.rows
            .iter()
            .filter(|row| {
                self.builder
                    .clause()
                    .matches(|p| evaluate(p, row, &mut patterns))
            })
            .collect()
    }
}

impl Queryable for MemoryQuery {
    type Row = Value;
    type Error = Infallible;

    fn where_predicate(&mut self, predicate: Predicate, joiner: Joiner) {
        self.builder.push(joiner, predicate);
    }

    fn where_group<F>(&mut self, joiner: Joiner, build: F)
    where
        F: FnOnce(&mut Self),
    {
        let outer = self.builder.open();
        build(self);
        self.builder.close(outer, joiner);
    }

    fn order_by(&mut self, field: &str, direction: SortDirection) {
        self.orders.push((field.to_string(), direction));
    }

    fn skip(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn take(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn get(self) -> Result<Vec<Value>, Infallible> {
        let mut rows = self.filtered();
        if !self.orders.is_empty() {
            rows.sort_by(|a, b| {
                self.orders
                    .iter()
                    .map(|(field, direction)| {
                        let ord = compare_json(a.get(field), b.get(field));
                        match direction {
                            SortDirection::Asc => ord,
                            SortDirection::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count(self) -> Result<u64, Infallible> {
        Ok(self.filtered().len() as u64)
    }
}

/// Compiled `LIKE` patterns, keyed by pattern text.
#[derive(Default)]
struct PatternCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl PatternCache {
    fn is_match(&mut self, pattern: &str, subject: &str) -> bool {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| like_regex(pattern))
            .as_ref()
            .is_some_and(|re| re.is_match(subject))
    }
}

/// Translate a SQL `LIKE` pattern into an anchored regex.
fn like_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("(?is)^");
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    re.push('$');
    match Regex::new(&re) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "LIKE pattern rejected; treating as no match");
            None
        }
    }
}

fn evaluate(predicate: &Predicate, row: &Value, patterns: &mut PatternCache) -> bool {
    let field = row.get(&predicate.field).filter(|v| !v.is_null());
    let value = &predicate.value;

    let Some(field) = field else {
        return predicate.comparison == Comparison::Equal && *value == FilterValue::Null;
    };

    match predicate.comparison {
        Comparison::Equal => equals(field, value),
        Comparison::NotEqual => match value {
            FilterValue::Null => true,
            _ => !equals(field, value),
        },
        Comparison::Greater => compare_scalar(field, value) == Some(Ordering::Greater),
        Comparison::GreaterOrEqual => matches!(
            compare_scalar(field, value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Comparison::Less => compare_scalar(field, value) == Some(Ordering::Less),
        Comparison::LessOrEqual => matches!(
            compare_scalar(field, value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Comparison::Like | Comparison::NotLike => {
            let (Some(subject), Some(pattern)) = (json_text(field), value.as_string()) else {
                return false;
            };
            let hit = patterns.is_match(&pattern, &subject);
            if predicate.comparison == Comparison::Like {
                hit
            } else {
                !hit
            }
        }
    }
}

fn equals(field: &Value, value: &FilterValue) -> bool {
    match value {
        FilterValue::Null => false,
        FilterValue::List(items) => items.iter().any(|item| equals(field, item)),
        scalar => compare_scalar(field, scalar) == Some(Ordering::Equal),
    }
}

/// Compare a non-null record value against a scalar operand.
fn compare_scalar(field: &Value, value: &FilterValue) -> Option<Ordering> {
    match (field, value) {
        (Value::Number(n), FilterValue::Integer(i)) => match n.as_i64() {
            Some(m) => Some(m.cmp(i)),
            None => n.as_f64()?.partial_cmp(&(*i as f64)),
        },
        (Value::Number(n), FilterValue::Float(_) | FilterValue::String(_)) => {
            n.as_f64()?.partial_cmp(&value.as_f64()?)
        }
        (Value::String(s), FilterValue::String(t)) => Some(s.as_str().cmp(t.as_str())),
        (Value::String(s), FilterValue::Integer(_) | FilterValue::Float(_)) => {
            s.trim().parse::<f64>().ok()?.partial_cmp(&value.as_f64()?)
        }
        (Value::Bool(a), FilterValue::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over record values used for sorting.
fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
