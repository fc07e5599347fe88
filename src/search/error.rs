use thiserror::Error;

/// Errors produced while validating or executing a segment search
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query absent or shorter than two characters after trimming
    #[error("Query parameter \"q\" is required and must be at least 2 characters")]
    InvalidQuery,

    /// Non-numeric or out-of-range limit/offset
    #[error("Invalid limit or offset parameters: {0}")]
    InvalidParams(String),

    /// Candidate fetch from the segment store failed
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl SearchError {
    /// Machine-readable code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidQuery => "INVALID_QUERY",
            SearchError::InvalidParams(_) => "INVALID_PARAMS",
            SearchError::Store(_) => "SEARCH_FAILED",
        }
    }

    /// True when the request itself was rejected (as opposed to an infrastructure failure)
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, SearchError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SearchError::InvalidQuery.code(), "INVALID_QUERY");
        assert_eq!(
            SearchError::InvalidParams("limit".to_string()).code(),
            "INVALID_PARAMS"
        );
        assert_eq!(
            SearchError::Store(anyhow::anyhow!("db down")).code(),
            "SEARCH_FAILED"
        );
    }

    #[test]
    fn test_store_error_is_not_caller_error() {
        assert!(SearchError::InvalidQuery.is_caller_error());
        assert!(!SearchError::Store(anyhow::anyhow!("db down")).is_caller_error());
        // Store failures keep the upstream message
        assert_eq!(
            SearchError::Store(anyhow::anyhow!("db down")).to_string(),
            "db down"
        );
    }
}
