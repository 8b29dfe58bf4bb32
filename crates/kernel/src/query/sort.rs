//! Sort compiler.

use super::queryable::Queryable;
use super::types::SortSpec;

/// Apply each sort key in request order. Later keys break ties of earlier ones.
pub fn compile<Q: Queryable>(query: &mut Q, sorts: &[SortSpec]) {
    for sort in sorts {
        query.order_by(&sort.field, sort.direction());
    }
    if !sorts.is_empty() {
        tracing::trace!(keys = sorts.len(), "compiled sort");
    }
}
