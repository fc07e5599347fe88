// Module declarations
pub mod engine;
pub mod error;
pub mod request;
pub mod segment_store;
pub mod service;
pub mod snippet;

// Re-export public APIs
pub use engine::{SearchResponse, SearchResult, Segment, SegmentSearchEngine};
pub use error::SearchError;
pub use request::SearchRequest;
pub use segment_store::SegmentStore;
pub use service::SegmentSearchService;
