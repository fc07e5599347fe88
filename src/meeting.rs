use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A processed meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub title: String,
    /// Meeting start, epoch milliseconds
    pub date: i64,
    pub duration_seconds: i64,
    pub summary: String,
    pub sentiment: f64,
    pub created_at: i64,
}

/// A transcript segment as stored, including speaker attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSegment {
    pub id: i64,
    pub meeting_id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub speaker: String,
    pub text: String,
    pub sentiment: f64,
}

impl StoredSegment {
    /// Segment text is non-empty and its time span is not reversed
    pub fn is_valid(&self) -> bool {
        !self.text.is_empty() && self.start_ms <= self.end_ms
    }
}

/// Workflow state of an action item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Todo,
    InProgress,
    Done,
}

impl ActionStatus {
    pub const ALL: [ActionStatus; 3] = [ActionStatus::Todo, ActionStatus::InProgress, ActionStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Todo => "todo",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Done => "done",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown action item status: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: i64,
    pub meeting_id: i64,
    pub title: String,
    pub owner: String,
    pub status: ActionStatus,
    #[serde(default)]
    pub due_date: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub meeting_id: i64,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: i64,
    pub meeting_id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub label: String,
    pub importance: f64,
}

/// Everything the store persists, in the shape of its JSON data file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingDataset {
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub segments: Vec<StoredSegment>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

// ============================================================================
// Wire shapes
// ============================================================================

/// Meeting list entry with the names of its top topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub id: i64,
    pub title: String,
    pub date: i64,
    pub duration_seconds: i64,
    pub sentiment: f64,
    pub topics: Vec<String>,
}

/// A page of records plus the total number of matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScore {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingActionItem {
    pub id: i64,
    pub title: String,
    pub owner: String,
    pub status: ActionStatus,
    pub due_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSegment {
    pub id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub speaker: String,
    pub text: String,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingHighlight {
    pub id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub label: String,
    pub importance: f64,
}

/// Full meeting view with all attached records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDetail {
    pub id: i64,
    pub title: String,
    pub date: i64,
    pub duration_seconds: i64,
    pub summary: String,
    pub sentiment: f64,
    pub topics: Vec<TopicScore>,
    pub action_items: Vec<MeetingActionItem>,
    pub segments: Vec<MeetingSegment>,
    pub highlights: Vec<MeetingHighlight>,
}

/// Filters for listing action items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionItemFilter {
    /// Raw status value, validated by the store
    #[serde(default)]
    pub status: Option<String>,
    /// Case-insensitive title substring
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Partial update of an action item. Absent fields are left alone;
/// `due_date: null` clears the due date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionItemPatch {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub due_date: Option<Option<i64>>,
}

impl ActionItemPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.owner.is_none() && self.title.is_none() && self.due_date.is_none()
    }
}

// Distinguishes an explicit null (Some(None)) from a missing field (None)
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_status_round_trip_names() {
        assert_eq!("in_progress".parse::<ActionStatus>(), Ok(ActionStatus::InProgress));
        assert!("open".parse::<ActionStatus>().is_err());
        assert_eq!(
            serde_json::to_value(ActionStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
    }

    #[test]
    fn test_patch_distinguishes_null_from_missing() {
        let cleared: ActionItemPatch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let untouched: ActionItemPatch = serde_json::from_str(r#"{"owner": "Lisa"}"#).unwrap();
        assert_eq!(untouched.due_date, None);
        assert_eq!(untouched.owner.as_deref(), Some("Lisa"));

        let set: ActionItemPatch = serde_json::from_str(r#"{"due_date": 1700000000000}"#).unwrap();
        assert_eq!(set.due_date, Some(Some(1_700_000_000_000)));
    }

    #[test]
    fn test_dataset_sections_are_optional() {
        let dataset: MeetingDataset = serde_json::from_str(r#"{"meetings": []}"#).unwrap();
        assert!(dataset.segments.is_empty());
        assert!(dataset.action_items.is_empty());
    }

    #[test]
    fn test_segment_validity() {
        let mut segment = StoredSegment {
            id: 1,
            meeting_id: 1,
            start_ms: 0,
            end_ms: 10,
            speaker: "Sarah".to_string(),
            text: "hello".to_string(),
            sentiment: 0.0,
        };
        assert!(segment.is_valid());
        segment.start_ms = 20;
        assert!(!segment.is_valid());
        segment.start_ms = 0;
        segment.text.clear();
        assert!(!segment.is_valid());
    }
}
