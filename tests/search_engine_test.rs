use meeting_insights::meeting::MeetingDataset;
use meeting_insights::search::{
    SearchError, SearchRequest, Segment, SegmentSearchEngine, SegmentSearchService,
};
use meeting_insights::store::MeetingStore;
use std::sync::Arc;

const SAMPLE_DATA: &str = include_str!("../demos/sample_meetings.json");

fn sample_service() -> SegmentSearchService<MeetingStore> {
    let dataset: MeetingDataset = serde_json::from_str(SAMPLE_DATA).expect("sample data parses");
    SegmentSearchService::new(Arc::new(MeetingStore::in_memory(dataset)))
}

fn segment(id: i64, meeting_id: i64, text: &str) -> Segment {
    Segment {
        id,
        meeting_id,
        start_ms: id * 60_000,
        end_ms: id * 60_000 + 59_999,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_sample_data_ranking() {
    let service = sample_service();

    let response = service
        .search(&SearchRequest::new("setup", None, None).unwrap())
        .await
        .unwrap();

    assert_eq!(response.query, "setup");
    assert_eq!(response.total_count, 2);
    let ranked: Vec<(i64, i64)> = response
        .results
        .iter()
        .map(|r| (r.segment_id, r.score))
        .collect();
    // The earlier match in segment 6 outranks the late match in segment 5
    assert_eq!(ranked, vec![(6, 21), (5, 9)]);
    assert!(response.results.iter().all(|r| r.meeting_id == 2));
}

#[tokio::test]
async fn test_search_crosses_meetings() {
    let service = sample_service();

    let response = service.search_raw(Some("INDEXING"), None, None).await.unwrap();
    let hits: Vec<(i64, i64)> = response
        .results
        .iter()
        .map(|r| (r.segment_id, r.meeting_id))
        .collect();
    assert_eq!(hits, vec![(2, 1), (7, 2)]);
}

#[tokio::test]
async fn test_raw_parameters() {
    let service = sample_service();

    let page = service
        .search_raw(Some("report"), Some("1"), Some("1"))
        .await
        .unwrap();
    assert_eq!(page.total_count, 2);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].segment_id, 2);

    let err = service
        .search_raw(Some("report"), Some("-5"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidParams(_)));
    assert_eq!(err.code(), "INVALID_PARAMS");

    let err = service.search_raw(Some(" r "), None, None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_QUERY");
}

#[tokio::test]
async fn test_no_matches() {
    let service = sample_service();
    let response = service.search_raw(Some("kubernetes"), None, None).await.unwrap();
    assert_eq!(response.total_count, 0);
    assert!(response.results.is_empty());
}

#[test]
fn test_ranking_properties_on_mixed_corpus() {
    let engine = SegmentSearchEngine::new();
    let long_tail = "budget ".repeat(120);
    let corpus = vec![
        segment(1, 1, "budget"),
        segment(2, 1, &format!("{}budget review", "x".repeat(300))),
        segment(3, 2, &long_tail),
        segment(4, 2, "We went over the budget twice"),
        segment(5, 3, &format!("{}budget{}", "a".repeat(140), "b".repeat(140))),
        segment(6, 3, "nothing relevant"),
    ];

    let full = engine.search("budget", 100, 0, &corpus).unwrap();
    assert_eq!(full.total_count, 5);

    for result in &full.results {
        assert!(result.snippet.chars().count() <= 150, "{}", result.snippet);
        assert!(result.score >= 0);
        assert!(result.snippet.to_lowercase().contains("budget"));
    }
    for pair in full.results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    // Every page is a slice of the full ranking
    for offset in 0..7 {
        for limit in 1..4 {
            let page = engine.search("budget", limit, offset, &corpus).unwrap();
            let expected: Vec<_> = full.results.iter().skip(offset).take(limit).cloned().collect();
            assert_eq!(page.results, expected);
            assert_eq!(page.total_count, full.total_count);
        }
    }
}

#[test]
fn test_long_text_window_snippet() {
    let engine = SegmentSearchEngine::new();
    let before = "a".repeat(500);
    let after = "c".repeat(498);
    let text = format!("{before}zz{after}");

    let response = engine.search("zz", 10, 0, &[segment(1, 1, &text)]).unwrap();
    let snippet = &response.results[0].snippet;

    assert_eq!(snippet, &format!("...{}...", &text[450..552]));
    // (2 / 1000 * 100 + 0) * 1
    assert_eq!(response.results[0].score, 0);
}

#[test]
fn test_short_query_rejected_regardless_of_corpus() {
    let engine = SegmentSearchEngine::new();
    let corpus = vec![segment(1, 1, "a"), segment(2, 1, "aa")];
    assert!(matches!(
        engine.search("a", 10, 0, &corpus),
        Err(SearchError::InvalidQuery)
    ));
    assert!(matches!(
        engine.search("", 10, 0, &[]),
        Err(SearchError::InvalidQuery)
    ));
}
