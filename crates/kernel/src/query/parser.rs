//! Request parsing.
//!
//! Accepts the filter shapes the client grid emits:
//! - Object group: `{"operator": "and", "filters": [...]}`
//! - Object comparison: `{"field": "age", "operator": "greaterThan", "value": 30}`
//! - Array comparison: `["age", "greaterThan", 30]`
//! - Array group: `[node, "and", node, "or", node]`

use serde_json::Value;

use crate::error::{QueryError, QueryResult};

use super::types::{FilterNode, FilterValue, Joiner, QueryRequest, RawQueryRequest};

impl QueryRequest {
    /// Parse a request from its JSON text.
    pub fn from_json(input: &str) -> QueryResult<Self> {
        let raw: RawQueryRequest = serde_json::from_str(input)?;
        Self::from_raw(raw)
    }

    /// Parse a request from an already decoded JSON value.
    pub fn from_value(value: Value) -> QueryResult<Self> {
        let raw: RawQueryRequest = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawQueryRequest) -> QueryResult<Self> {
        let filter = match raw.filter {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_filter(&value)?),
        };
        Ok(QueryRequest {
            filter,
            sort: raw.sort,
            skip: raw.skip,
            take: raw.take,
            require_total_count: raw.require_total_count.unwrap_or(false),
        })
    }
}

/// Parse a filter tree rooted at `value`.
pub fn parse_filter(value: &Value) -> QueryResult<FilterNode> {
    parse_node(value, "filter")
}

fn parse_node(value: &Value, path: &str) -> QueryResult<FilterNode> {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::String(_)) => parse_array_comparison(items, path),
            _ => parse_array_group(items, path),
        },
        Value::Object(map) => {
            let children = ["filters", "children"]
                .into_iter()
                .find_map(|key| map.get(key).map(|c| (key, c)));
            if let Some((key, children)) = children {
                return parse_object_group(map.get("operator"), children, key, path);
            }
            if map.contains_key("field") {
                let value = map
                    .get("value")
                    .ok_or_else(|| QueryError::malformed(path, "comparison has no value"))?;
                return comparison(map.get("field"), map.get("operator"), value, path);
            }
            Err(QueryError::malformed(
                path,
                "expected a group with filters or a comparison with a field",
            ))
        }
        other => Err(QueryError::malformed(
            path,
            format!("expected an array or object, got {}", json_kind(other)),
        )),
    }
}

fn parse_object_group(
    operator: Option<&Value>,
    children: &Value,
    key: &str,
    path: &str,
) -> QueryResult<FilterNode> {
    let joiner = match operator {
        None => Joiner::And,
        Some(Value::String(s)) => Joiner::from_symbol(s).ok_or_else(|| {
            QueryError::malformed(path, format!("group operator must be \"and\" or \"or\", got {s:?}"))
        })?,
        Some(other) => {
            return Err(QueryError::malformed(
                path,
                format!("group operator must be a string, got {}", json_kind(other)),
            ));
        }
    };

    let Value::Array(items) = children else {
        return Err(QueryError::malformed(
            path,
            format!("{key} must be an array, got {}", json_kind(children)),
        ));
    };

    let children = items
        .iter()
        .enumerate()
        .map(|(i, child)| parse_node(child, &format!("{path}.{key}[{i}]")))
        .collect::<QueryResult<Vec<_>>>()?;
    Ok(FilterNode::group(joiner, children))
}

fn parse_array_comparison(items: &[Value], path: &str) -> QueryResult<FilterNode> {
    let [field, operator, value] = items else {
        return Err(QueryError::malformed(
            path,
            format!(
                "comparison must be [field, operator, value], got {} elements",
                items.len()
            ),
        ));
    };
    comparison(Some(field), Some(operator), value, path)
}

/// Parse `[node, sep, node, ...]`. `and` binds tighter than `or`, and two
/// nodes without a separator between them are joined with `and`.
fn parse_array_group(items: &[Value], path: &str) -> QueryResult<FilterNode> {
    if items.is_empty() {
        return Ok(FilterNode::group(Joiner::And, Vec::new()));
    }

    let mut terms: Vec<Vec<FilterNode>> = Vec::new();
    let mut current: Vec<FilterNode> = Vec::new();
    let mut expect_node = true;

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        if let Value::String(s) = item {
            let joiner = Joiner::from_symbol(s).ok_or_else(|| {
                QueryError::malformed(&item_path, format!("expected \"and\" or \"or\", got {s:?}"))
            })?;
            if expect_node {
                return Err(QueryError::malformed(
                    &item_path,
                    format!("separator {s:?} must follow a filter node"),
                ));
            }
            if joiner == Joiner::Or {
                terms.push(std::mem::take(&mut current));
            }
            expect_node = true;
        } else {
            current.push(parse_node(item, &item_path)?);
            expect_node = false;
        }
    }

    if expect_node {
        return Err(QueryError::malformed(path, "group ends with a separator"));
    }
    terms.push(current);

    if terms.len() == 1 {
        let only = terms.pop().unwrap_or_default();
        return Ok(FilterNode::group(Joiner::And, only));
    }

    let alternatives = terms
        .into_iter()
        .map(|mut term| {
            if term.len() == 1
                && let Some(node) = term.pop()
            {
                node
            } else {
                FilterNode::group(Joiner::And, term)
            }
        })
        .collect();
    Ok(FilterNode::group(Joiner::Or, alternatives))
}

fn comparison(
    field: Option<&Value>,
    operator: Option<&Value>,
    value: &Value,
    path: &str,
) -> QueryResult<FilterNode> {
    let field = match field {
        Some(Value::String(f)) if !f.is_empty() => f,
        _ => return Err(QueryError::malformed(path, "field must be a non-empty string")),
    };
    let Some(Value::String(operator)) = operator else {
        return Err(QueryError::malformed(path, "operator must be a string"));
    };
    let value = FilterValue::from_json(value).ok_or_else(|| {
        QueryError::malformed(path, "value must be a scalar, null or a list of scalars")
    })?;
    Ok(FilterNode::comparison(field.as_str(), operator.as_str(), value))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
