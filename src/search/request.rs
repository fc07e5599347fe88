use serde::{Deserialize, Serialize};

use super::error::SearchError;

/// Minimum query length in characters, ignoring surrounding whitespace
pub const MIN_QUERY_CHARS: usize = 2;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: usize = 50;

/// Largest page size a caller may request; larger values are clamped
pub const MAX_LIMIT: usize = 100;

/// A validated search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query as supplied by the caller (echoed back in the response)
    pub query: String,
    pub limit: usize,
    pub offset: usize,
}

impl SearchRequest {
    /// Build a request from typed parameters, applying defaults and the limit clamp
    pub fn new(query: &str, limit: Option<i64>, offset: Option<i64>) -> Result<Self, SearchError> {
        validate_query(query)?;

        let limit = limit
            .unwrap_or(DEFAULT_LIMIT as i64)
            .min(MAX_LIMIT as i64);
        let offset = offset.unwrap_or(0);

        if limit < 1 {
            return Err(SearchError::InvalidParams(format!(
                "limit must be at least 1, got {limit}"
            )));
        }
        if offset < 0 {
            return Err(SearchError::InvalidParams(format!(
                "offset must be non-negative, got {offset}"
            )));
        }

        Ok(Self {
            query: query.to_string(),
            limit: limit as usize,
            offset: offset as usize,
        })
    }

    /// Build a request from raw query-string values (`q`, `limit`, `offset`)
    pub fn from_raw(
        query: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<Self, SearchError> {
        let query = query.ok_or(SearchError::InvalidQuery)?;
        validate_query(query)?;

        let limit = limit.map(|raw| parse_number("limit", raw)).transpose()?;
        let offset = offset.map(|raw| parse_number("offset", raw)).transpose()?;

        Self::new(query, limit, offset)
    }

}

fn validate_query(query: &str) -> Result<(), SearchError> {
    if query.trim().chars().count() < MIN_QUERY_CHARS {
        return Err(SearchError::InvalidQuery);
    }
    Ok(())
}

fn parse_number(name: &str, raw: &str) -> Result<i64, SearchError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| SearchError::InvalidParams(format!("{name} must be an integer, got {raw:?}")))
}
