//! Query orchestrator.
//!
//! Composes the filter, sort and pagination compilers over a model, runs the
//! page query and, when asked, an independent count query built from the
//! same filter.

use crate::error::{Phase, QueryError, QueryResult};

use super::filter;
use super::pagination;
use super::queryable::{Model, Queryable};
use super::result;
use super::sort;
use super::types::{Joiner, PageWindow, QueryRequest, ResultEnvelope};

/// Orchestrator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Upper bound on rows per page. `None` leaves requests uncapped.
    pub max_take: Option<u64>,
}

/// Fully compiled queries for one request, not yet executed.
#[derive(Debug, Clone)]
pub struct PreparedQuery<Q> {
    /// Filtered, sorted and windowed page query.
    pub page: Q,
    /// Filter-only count query, present when the total was requested.
    pub count: Option<Q>,
    /// Window applied to `page`, after any cap.
    pub window: Option<PageWindow>,
}

/// Runs grid requests with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct QueryOrchestrator {
    options: QueryOptions,
}

impl QueryOrchestrator {
    pub fn new(options: QueryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Compile the page query and, if requested, the count query.
    ///
    /// Both queryables come from separate `new_query` calls, so the page
    /// window can never reach the count.
    pub fn prepare<M: Model>(
        &self,
        model: &M,
        request: &QueryRequest,
    ) -> QueryResult<PreparedQuery<M::Query>> {
        let window = pagination::resolve(request.skip.as_ref(), request.take.as_ref())?;
        let window = self.cap(window);

        let mut page = model.new_query();
        if let Some(node) = &request.filter {
            filter::compile(&mut page, node, Joiner::And)?;
        }
        if let Some(sorts) = &request.sort {
            sort::compile(&mut page, sorts);
        }
        if let Some(window) = window {
            pagination::apply(&mut page, window);
        }

        let count = if request.require_total_count {
            let mut count = model.new_query();
            if let Some(node) = &request.filter {
                filter::compile(&mut count, node, Joiner::And)?;
            }
            Some(count)
        } else {
            None
        };

        tracing::debug!(
            filtered = request.filter.is_some(),
            sort_keys = request.sort.as_ref().map_or(0, Vec::len),
            skip = window.map(|w| w.skip),
            take = window.and_then(|w| w.take),
            total_count = request.require_total_count,
            "compiled grid request"
        );

        Ok(PreparedQuery {
            page,
            count,
            window,
        })
    }

    /// Compile and run a request.
    ///
    /// Translation errors reject the whole request before anything runs.
    /// Collaborator errors are passed through tagged with the failing phase.
    pub fn execute<M: Model>(
        &self,
        model: &M,
        request: &QueryRequest,
    ) -> QueryResult<ResultEnvelope<<M::Query as Queryable>::Row>> {
        let prepared = self.prepare(model, request).inspect_err(|e| {
            tracing::debug!(error = %e, "grid request rejected");
        })?;

        let rows = prepared
            .page
            .get()
            .map_err(|e| QueryError::execution(Phase::PageFetch, e))?;
        let rows_returned = rows.len();
        let mut envelope = result::shape(rows);

        if let Some(count) = prepared.count {
            let total = count
                .count()
                .map_err(|e| QueryError::execution(Phase::CountFetch, e))?;
            envelope = envelope.with_total_count(total);
        }

        tracing::debug!(
            rows = rows_returned,
            total_count = envelope.total_count,
            "grid request complete"
        );
        Ok(envelope)
    }

    fn cap(&self, window: Option<PageWindow>) -> Option<PageWindow> {
        let Some(max) = self.options.max_take else {
            return window;
        };
        match window {
            Some(w) if w.take.is_some_and(|take| take <= max) => Some(w),
            Some(w) => {
                tracing::warn!(
                    requested = ?w.take,
                    capped = max,
                    "take exceeds maximum, capping"
                );
                Some(PageWindow {
                    take: Some(max),
                    ..w
                })
            }
            None => {
                tracing::warn!(capped = max, "unpaged request, capping");
                Some(PageWindow {
                    skip: 0,
                    take: Some(max),
                })
            }
        }
    }
}

/// Run a request with default options.
pub fn execute<M: Model>(
    model: &M,
    request: &QueryRequest,
) -> QueryResult<ResultEnvelope<<M::Query as Queryable>::Row>> {
    QueryOrchestrator::default().execute(model, request)
}
