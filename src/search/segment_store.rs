use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

use super::engine::Segment;

/// Source of candidate segments for a search.
///
/// Implementations return every segment whose text contains `substring`,
/// ordered by segment id. Case handling of the filter is up to the store; the
/// search engine re-derives exact match positions itself.
#[async_trait]
pub trait SegmentStore: Send + Sync + Debug {
    async fn find_segments_containing(&self, substring: &str) -> Result<Vec<Segment>>;
}
