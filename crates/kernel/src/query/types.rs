//! Grid query types.
//!
//! Provides type definitions for the declarative grid request:
//! - FilterNode: Nested logical groups and comparison leaves
//! - SortSpec: Ordered sort keys
//! - PageWindow: Resolved skip/take window
//! - ResultEnvelope: Paging-friendly response

use serde::{Deserialize, Serialize};

/// Filter value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values (membership tests).
    List(Vec<FilterValue>),
    /// JSON `null`.
    Null,
}

impl FilterValue {
    /// Convert a scalar to its string representation.
    ///
    /// Lists and `null` have no scalar form.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FilterValue::String(s) => Some(s.clone()),
            FilterValue::Integer(i) => Some(i.to_string()),
            FilterValue::Float(f) => Some(f.to_string()),
            FilterValue::Boolean(b) => Some(b.to_string()),
            FilterValue::List(_) | FilterValue::Null => None,
        }
    }

    /// Convert to a number if possible. Numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Integer(i) => Some(*i as f64),
            FilterValue::Float(f) => Some(*f),
            FilterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Name of the concrete variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FilterValue::Boolean(_) => "boolean",
            FilterValue::Integer(_) => "integer",
            FilterValue::Float(_) => "float",
            FilterValue::String(_) => "string",
            FilterValue::List(_) => "list",
            FilterValue::Null => "null",
        }
    }

    /// Build a value from arbitrary JSON. Objects have no filter meaning.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value as J;
        match value {
            J::Null => Some(FilterValue::Null),
            J::Bool(b) => Some(FilterValue::Boolean(*b)),
            J::Number(n) => n
                .as_i64()
                .map(FilterValue::Integer)
                .or_else(|| n.as_f64().map(FilterValue::Float)),
            J::String(s) => Some(FilterValue::String(s.clone())),
            J::Array(items) => items
                .iter()
                .map(FilterValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(FilterValue::List),
            J::Object(_) => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        FilterValue::Integer(i)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        FilterValue::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Boolean(b)
    }
}

/// Combinator between sibling clauses of one group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Joiner {
    #[default]
    And,
    Or,
}

impl Joiner {
    /// Parse a joiner symbol. Only the two lowercase symbols are accepted.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "and" => Some(Joiner::And),
            "or" => Some(Joiner::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Joiner::And => "and",
            Joiner::Or => "or",
        }
    }
}

/// One node of a client filter tree.
///
/// The tree is read-only once parsed; comparison operators stay as the
/// client's names until the filter compiler resolves them.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Children combined with one joiner, rendered as one parenthesized unit.
    Group {
        joiner: Joiner,
        children: Vec<FilterNode>,
    },
    /// A single field comparison.
    Comparison {
        field: String,
        operator: String,
        value: FilterValue,
    },
}

impl FilterNode {
    /// Shorthand for a group node.
    pub fn group(joiner: Joiner, children: Vec<FilterNode>) -> Self {
        FilterNode::Group { joiner, children }
    }

    /// Shorthand for a comparison leaf.
    pub fn comparison(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        FilterNode::Comparison {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Maximum nesting depth of the tree (a single leaf has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            FilterNode::Comparison { .. } => 1,
            FilterNode::Group { children, .. } => {
                1 + children.iter().map(FilterNode::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One sort key. Position in the request is the tie-break order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by.
    #[serde(alias = "selector")]
    pub field: String,

    /// Descending when true.
    #[serde(default, rename = "desc")]
    pub descending: bool,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    pub fn direction(&self) -> SortDirection {
        if self.descending {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Resolved page window. `take: None` means no upper bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub take: Option<u64>,
}

/// A parsed grid request, owned by a single orchestration call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// Filter tree root.
    pub filter: Option<FilterNode>,

    /// Sort keys, primary first.
    pub sort: Option<Vec<SortSpec>>,

    /// Raw client skip bound; coerced by the pagination applier.
    pub skip: Option<serde_json::Value>,

    /// Raw client take bound; coerced by the pagination applier.
    pub take: Option<serde_json::Value>,

    /// Whether the response carries `totalCount`.
    pub require_total_count: bool,
}

/// Request shape as it arrives over the wire, before filter parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQueryRequest {
    #[serde(default)]
    pub filter: Option<serde_json::Value>,

    #[serde(default)]
    pub sort: Option<Vec<SortSpec>>,

    #[serde(default)]
    pub skip: Option<serde_json::Value>,

    #[serde(default)]
    pub take: Option<serde_json::Value>,

    #[serde(default)]
    pub require_total_count: Option<bool>,
}

/// Response envelope handed back to the grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope<R> {
    /// Rows of the requested page, in query order.
    pub data: Vec<R>,

    /// Row count of the full filtered set, independent of the page window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_value_untagged_deserialization() {
        let parsed: Vec<FilterValue> =
            serde_json::from_value(json!([true, 3, 2.5, "x", [1, "a"], null])).unwrap();
        assert_eq!(
            parsed,
            vec![
                FilterValue::Boolean(true),
                FilterValue::Integer(3),
                FilterValue::Float(2.5),
                FilterValue::String("x".to_string()),
                FilterValue::List(vec![
                    FilterValue::Integer(1),
                    FilterValue::String("a".to_string())
                ]),
                FilterValue::Null,
            ]
        );
    }

    #[test]
    fn filter_value_conversions() {
        assert_eq!(FilterValue::from("hello").as_string(), Some("hello".to_string()));
        assert_eq!(FilterValue::Integer(42).as_string(), Some("42".to_string()));
        assert_eq!(FilterValue::String(" 7 ".to_string()).as_f64(), Some(7.0));
        assert_eq!(FilterValue::Null.as_string(), None);
        assert_eq!(FilterValue::List(vec![]).as_f64(), None);
    }

    #[test]
    fn filter_value_from_json_rejects_objects() {
        assert_eq!(FilterValue::from_json(&json!({"a": 1})), None);
        assert_eq!(FilterValue::from_json(&json!([1, {"a": 1}])), None);
        assert_eq!(
            FilterValue::from_json(&json!(12)),
            Some(FilterValue::Integer(12))
        );
    }

    #[test]
    fn sort_spec_accepts_selector_alias() {
        let sorts: Vec<SortSpec> =
            serde_json::from_value(json!([{"selector": "age", "desc": true}, {"field": "id"}]))
                .unwrap();
        assert_eq!(sorts[0], SortSpec::desc("age"));
        assert_eq!(sorts[1], SortSpec::asc("id"));
        assert_eq!(sorts[1].direction(), SortDirection::Asc);
    }

    #[test]
    fn envelope_omits_missing_total_count() {
        let env = ResultEnvelope {
            data: vec![json!({"id": 1})],
            total_count: None,
        };
        assert_eq!(serde_json::to_value(&env).unwrap(), json!({"data": [{"id": 1}]}));

        let env = ResultEnvelope::<serde_json::Value> {
            data: vec![],
            total_count: Some(3),
        };
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"data": [], "totalCount": 3})
        );
    }

    #[test]
    fn filter_node_depth() {
        let leaf = FilterNode::comparison("a", "equal", 1);
        assert_eq!(leaf.depth(), 1);
        let tree = FilterNode::group(
            Joiner::And,
            vec![leaf.clone(), FilterNode::group(Joiner::Or, vec![leaf])],
        );
        assert_eq!(tree.depth(), 3);
        assert_eq!(FilterNode::group(Joiner::And, vec![]).depth(), 1);
    }
}
