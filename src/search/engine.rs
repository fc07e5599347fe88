use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::SearchError;
use super::request::{MIN_QUERY_CHARS, SearchRequest};
use super::snippet::extract_snippet;

/// Segments shorter than this (in characters) get the short-text multiplier
const SHORT_TEXT_CHARS: usize = 500;

/// Matches starting at or before this position get the flat position bonus
const EARLY_MATCH_POSITION: usize = 10;

/// A timestamped span of transcript text, as handed over by the segment store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub meeting_id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub segment_id: i64,
    pub meeting_id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub snippet: String,
    pub score: i64,
}

/// A page of ranked results plus the size of the full result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub total_count: usize,
    pub results: Vec<SearchResult>,
}

/// Leftmost case-insensitive occurrence of the query inside a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMatch {
    /// Character offset of the match
    pub position: usize,
    /// Match length in characters
    pub length: usize,
}

/// Stateless snippet search and relevance ranking over a segment corpus.
///
/// Every call is a pure function of its inputs, so a single engine can be
/// shared freely between concurrent request handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentSearchEngine;

impl SegmentSearchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rank `corpus` against `query` and return the page `[offset, offset + limit)`
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        corpus: &[Segment],
    ) -> Result<SearchResponse, SearchError> {
        if query.trim().chars().count() < MIN_QUERY_CHARS {
            return Err(SearchError::InvalidQuery);
        }
        if limit < 1 {
            return Err(SearchError::InvalidParams(
                "limit must be at least 1".to_string(),
            ));
        }

        let ranked = self.rank(query, corpus);
        let total_count = ranked.len();
        let results: Vec<SearchResult> = ranked.into_iter().skip(offset).take(limit).collect();

        debug!(
            "Ranked {} of {} segments for '{}', returning {} from offset {}",
            total_count,
            corpus.len(),
            query,
            results.len(),
            offset
        );

        Ok(SearchResponse {
            query: query.to_string(),
            total_count,
            results,
        })
    }

    /// Run a validated request against a corpus
    pub fn search_request(
        &self,
        request: &SearchRequest,
        corpus: &[Segment],
    ) -> Result<SearchResponse, SearchError> {
        self.search(&request.query, request.limit, request.offset, corpus)
    }

    /// Score every segment containing `needle` and sort by score, highest first.
    /// Equal scores keep their corpus order.
    pub fn rank(&self, needle: &str, corpus: &[Segment]) -> Vec<SearchResult> {
        let folded_needle = fold_case(needle);

        let mut results: Vec<SearchResult> = corpus
            .iter()
            .filter_map(|segment| self.score_segment(&folded_needle, segment))
            .collect();

        // sort_by is stable
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results
    }

    fn score_segment(&self, folded_needle: &[char], segment: &Segment) -> Option<SearchResult> {
        let folded_text = fold_case(&segment.text);
        let best = find_best_match(&folded_text, folded_needle)?;

        Some(SearchResult {
            segment_id: segment.id,
            meeting_id: segment.meeting_id,
            start_ms: segment.start_ms,
            end_ms: segment.end_ms,
            snippet: extract_snippet(&segment.text, best.position, best.length),
            score: relevance_score(best, folded_text.len()),
        })
    }
}

/// Lowercase character by character, keeping a one-to-one mapping with the
/// input so match offsets stay valid for the original text.
fn fold_case(text: &str) -> Vec<char> {
    text.chars()
        .map(|ch| {
            let mut lower = ch.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(single), None) => single,
                _ => ch,
            }
        })
        .collect()
}

/// Leftmost occurrence of `needle` in `haystack`, both already case-folded
pub fn find_best_match(haystack: &[char], needle: &[char]) -> Option<BestMatch> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }

    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| BestMatch {
            position,
            length: needle.len(),
        })
}

/// Relevance of a match inside a segment of `text_len` characters.
///
/// Combines the share of the segment covered by the match, a bonus for early
/// matches (flat for the first ten positions) and a multiplier favouring
/// short segments.
pub fn relevance_score(best: BestMatch, text_len: usize) -> i64 {
    if text_len == 0 {
        return 0;
    }

    let base_score = best.length as f64 / text_len as f64 * 100.0;
    let raw_bonus = if best.position > EARLY_MATCH_POSITION {
        100.0 - best.position as f64
    } else {
        90.0
    };
    let position_bonus = raw_bonus.max(0.0) / 10.0;
    let text_size_bonus = if text_len < SHORT_TEXT_CHARS { 2.0 } else { 1.0 };

    ((base_score + position_bonus) * text_size_bonus).round() as i64
}
