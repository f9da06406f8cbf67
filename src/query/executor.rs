use std::sync::Arc;
use std::time::{Duration, Instant};
use rayon::ThreadPool;
use tracing::{debug, trace};
use crate::bitmap::id_set::IdSet;
use crate::core::error::{Error, ErrorKind, Result};
use crate::facet::PartialResult;
use crate::index::facet_index::FacetIndex;
use crate::parallel::merger::QueryMerger;
use crate::query::types::FilterRequest;
use crate::search::free_text::FreeTextEngine;
use crate::search::results::SearchResults;

/// Fans a filter request out over the facet index and the text engine
pub struct QueryExecutor {
    pub index: Arc<FacetIndex>,
    pub text: Arc<FreeTextEngine>,
    pub pool: Arc<ThreadPool>,
}

impl QueryExecutor {
    pub fn new(index: Arc<FacetIndex>, text: Arc<FreeTextEngine>, pool: Arc<ThreadPool>) -> Self {
        QueryExecutor { index, text, pool }
    }

    /// Schedule one producer per clause.
    ///
    /// The live item set always narrows the result, so a request without
    /// positive clauses returns every live item minus the exclusions.
    fn plan(&self, request: &FilterRequest) -> QueryMerger {
        let merger = QueryMerger::with_pool(Arc::clone(&self.pool));
        let universe = self.index.all_items();

        for clause in &request.exact {
            let index = Arc::clone(&self.index);
            let field_id = clause.field_id;
            let filter = clause.facet_filter();
            trace!(field = field_id, negate = clause.negate, value = %clause.value, "exact clause");
            if clause.negate {
                let universe = universe.clone();
                merger.exclude(move || {
                    PartialResult::Ids(index.match_clause(field_id, &filter).resolve(&universe))
                });
            } else {
                merger.add(move || index.match_clause(field_id, &filter));
            }
        }

        for clause in &request.ranges {
            let index = Arc::clone(&self.index);
            let field_id = clause.field_id;
            let filter = clause.facet_filter();
            trace!(field = field_id, min = clause.min, max = clause.max, "range clause");
            merger.add(move || index.match_clause(field_id, &filter));
        }

        if !request.text.trim().is_empty() {
            let text = Arc::clone(&self.text);
            let query = request.text.clone();
            merger.add(move || text.matches(&query));
        }

        merger.intersect(move || PartialResult::Ids(universe));
        merger
    }

    fn finish(&self, request: &FilterRequest, ids: IdSet, start: Instant) -> SearchResults {
        let facets = if request.aggregate {
            let pinned = request.pinned_fields();
            self.pool.install(|| self.index.aggregate(&ids, &pinned))
        } else {
            Vec::new()
        };
        let took_ms = start.elapsed().as_millis() as u64;
        debug!(hits = ids.cardinality(), facets = facets.len(), took_ms, "query resolved");
        SearchResults { ids, facets, took_ms }
    }

    /// Must not be called from a thread of `pool`.
    pub fn execute(&self, request: &FilterRequest) -> SearchResults {
        let start = Instant::now();
        let ids = self.plan(request).wait();
        self.finish(request, ids, start)
    }

    /// Like `execute`, but fails with `Timeout` when the clauses do not all
    /// finish within `timeout`. Aggregation is not covered by the deadline.
    pub fn execute_with_deadline(&self, request: &FilterRequest, timeout: Duration) -> Result<SearchResults> {
        let start = Instant::now();
        let ids = self.plan(request).wait_timeout(timeout).ok_or_else(|| {
            Error::new(ErrorKind::Timeout, format!("Query did not finish within {:?}", timeout))
        })?;
        Ok(self.finish(request, ids, start))
    }
}
