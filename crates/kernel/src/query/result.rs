//! Result shaper.

use super::types::ResultEnvelope;

/// Wrap page rows into an envelope without a total count.
pub fn shape<R>(rows: Vec<R>) -> ResultEnvelope<R> {
    ResultEnvelope {
        data: rows,
        total_count: None,
    }
}

impl<R> ResultEnvelope<R> {
    /// Attach the count of the full filtered set.
    pub fn with_total_count(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
