use std::sync::Arc;
use tracing::debug;

use super::engine::{SearchResponse, SegmentSearchEngine};
use super::error::SearchError;
use super::request::SearchRequest;
use super::segment_store::SegmentStore;

/// Runs searches end to end: candidate fetch from the store, then ranking
#[derive(Debug)]
pub struct SegmentSearchService<S: SegmentStore> {
    store: Arc<S>,
    engine: SegmentSearchEngine,
}

impl<S: SegmentStore> SegmentSearchService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            engine: SegmentSearchEngine::new(),
        }
    }

    /// Execute a validated request. Store failures are passed through untouched.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let candidates = self.store.find_segments_containing(&request.query).await?;
        debug!(
            "Segment store returned {} candidates for '{}'",
            candidates.len(),
            request.query
        );

        self.engine.search_request(request, &candidates)
    }

    /// Validate raw query-string values and execute the search
    pub async fn search_raw(
        &self,
        query: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<SearchResponse, SearchError> {
        let request = SearchRequest::from_raw(query, limit, offset)?;
        self.search(&request).await
    }
}
