//! Gridquery test utilities.
//!
//! Helpers for integration testing: record fixtures, a record builder,
//! and a reference boolean evaluator with proptest strategies.

use proptest::prelude::*;
use serde_json::{Map, Value, json};

/// Create a test record with only an `id`.
pub fn test_record(id: i64) -> TestRecord {
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!(id));
    TestRecord { fields }
}

/// A test record builder for creating fixtures.
#[derive(Debug, Clone)]
pub struct TestRecord {
    fields: Map<String, Value>,
}

impl TestRecord {
    /// Set a field.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Set a field to `null`.
    pub fn with_null(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), Value::Null);
        self
    }

    /// Finish as a JSON object.
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Records `1..=n` with a name and a bucket (`id % 5`).
pub fn numbered_records(n: i64) -> Vec<Value> {
    (1..=n)
        .map(|id| {
            test_record(id)
                .with("name", format!("record-{id:02}"))
                .with("bucket", id % 5)
                .build()
        })
        .collect()
}

/// Four people aged 20, 35, 40 and 50.
pub fn people() -> Vec<Value> {
    [20, 35, 40, 50]
        .into_iter()
        .zip(1..)
        .map(|(age, id)| test_record(id).with("age", age).build())
        .collect()
}

/// Ids of `rows`, in order.
pub fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|r| r["id"].as_i64()).collect()
}

/// Boolean expression over integer equality, evaluated by brute force.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Eq { field: String, value: i64 },
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Evaluate against a record. Empty groups contribute nothing.
    pub fn matches(&self, record: &Value) -> bool {
        self.eval(record).unwrap_or(true)
    }

    fn eval(&self, record: &Value) -> Option<bool> {
        match self {
            Expr::Eq { field, value } => {
                Some(record.get(field).and_then(Value::as_i64) == Some(*value))
            }
            Expr::And(children) => children
                .iter()
                .filter_map(|c| c.eval(record))
                .reduce(|l, r| l && r),
            Expr::Or(children) => children
                .iter()
                .filter_map(|c| c.eval(record))
                .reduce(|l, r| l || r),
        }
    }

    /// Object-form filter: `{"operator": "and", "filters": [...]}`.
    pub fn to_filter_json(&self) -> Value {
        match self {
            Expr::Eq { field, value } => {
                json!({"field": field, "operator": "equal", "value": value})
            }
            Expr::And(children) => json!({
                "operator": "and",
                "filters": children.iter().map(Expr::to_filter_json).collect::<Vec<_>>(),
            }),
            Expr::Or(children) => json!({
                "operator": "or",
                "filters": children.iter().map(Expr::to_filter_json).collect::<Vec<_>>(),
            }),
        }
    }

    /// Array-form filter: `[node, "and", node, ...]`.
    pub fn to_array_json(&self) -> Value {
        let (children, separator) = match self {
            Expr::Eq { field, value } => return json!([field, "equal", value]),
            Expr::And(children) => (children, "and"),
            Expr::Or(children) => (children, "or"),
        };
        let mut items = Vec::with_capacity(children.len() * 2);
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                items.push(json!(separator));
            }
            items.push(child.to_array_json());
        }
        Value::Array(items)
    }
}

/// Fields used by [`expr_strategy`] and [`records_strategy`].
pub const FIELDS: [&str; 3] = ["a", "b", "c"];

/// Random `and`/`or` trees of `equal` leaves, empty groups included.
pub fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = (prop::sample::select(FIELDS.to_vec()), 0i64..3).prop_map(|(field, value)| {
        Expr::Eq {
            field: field.to_string(),
            value,
        }
    });
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Expr::And),
            prop::collection::vec(inner, 0..4).prop_map(Expr::Or),
        ]
    })
}

/// Records with sequential ids and small, sometimes missing, field values.
pub fn records_strategy(max_len: usize) -> impl Strategy<Value = Vec<Value>> {
    let field = prop::option::of(0i64..3);
    prop::collection::vec((field.clone(), field.clone(), field), 0..max_len).prop_map(|rows| {
        rows.into_iter()
            .zip(1..)
            .map(|((a, b, c), id)| {
                let mut record = test_record(id);
                for (name, value) in FIELDS.iter().zip([a, b, c]) {
                    if let Some(v) = value {
                        record = record.with(name, v);
                    }
                }
                record.build()
            })
            .collect()
    })
}
