//! Pagination applier.
//!
//! Clients send `skip`/`take` loosely typed: numbers, fractional numbers or
//! numeric strings. Bounds are coerced explicitly here; anything that is not
//! a non-negative number is rejected instead of being cast silently.

use serde_json::Value;

use crate::error::{QueryError, QueryResult};

use super::queryable::Queryable;
use super::types::PageWindow;

/// Coerce one raw bound to a non-negative integer, truncating fractions.
///
/// `null`, a missing bound and an empty string all mean "not given".
pub fn coerce_bound(bound: &'static str, raw: Option<&Value>) -> QueryResult<Option<u64>> {
    let invalid = |reason: String| QueryError::InvalidPageBound { bound, reason };

    let number = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                return Ok(Some(u));
            }
            n.as_f64()
                .ok_or_else(|| invalid(format!("{n} is not representable")))?
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| invalid(format!("{s:?} is not a number")))?
        }
        Some(other) => return Err(invalid(format!("expected a number, got {other}"))),
    };

    if !number.is_finite() {
        return Err(invalid(format!("{number} is not finite")));
    }
    let truncated = number.trunc();
    if truncated < 0.0 {
        return Err(invalid(format!("{number} is negative")));
    }
    Ok(Some(truncated as u64))
}

/// Resolve the raw request bounds into a page window.
///
/// Returns `None` when neither bound is a positive number, in which case no
/// pagination is applied at all. Once either bound is positive a missing
/// `skip` means 0 and a missing or zero `take` means no upper bound.
pub fn resolve(skip: Option<&Value>, take: Option<&Value>) -> QueryResult<Option<PageWindow>> {
    let skip = coerce_bound("skip", skip)?.unwrap_or(0);
    let take = coerce_bound("take", take)?.unwrap_or(0);

    if skip == 0 && take == 0 {
        return Ok(None);
    }
    Ok(Some(PageWindow {
        skip,
        take: (take > 0).then_some(take),
    }))
}

/// Apply skip, then limit.
pub fn apply<Q: Queryable>(query: &mut Q, window: PageWindow) {
    query.skip(window.skip);
    if let Some(take) = window.take {
        query.take(take);
    }
}
