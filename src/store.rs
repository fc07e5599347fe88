use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::meeting::{
    ActionItem, ActionItemFilter, ActionItemPatch, ActionStatus, MeetingActionItem,
    MeetingDataset, MeetingDetail, MeetingHighlight, MeetingSegment, MeetingSummary, Page,
    TopicScore,
};
use crate::search::{Segment, SegmentStore};

/// Largest page any listing returns
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default page size for the meeting list
pub const DEFAULT_MEETING_PAGE: i64 = 20;

/// Default page size for the action item list
pub const DEFAULT_ACTION_ITEM_PAGE: i64 = 50;

/// Topic names listed per meeting summary
pub const TOP_TOPICS_PER_MEETING: usize = 5;

/// Errors returned by store queries and updates
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Limit must be between 1 and 100")]
    InvalidLimit,

    #[error("Offset must be non-negative")]
    InvalidOffset,

    #[error("Status must be one of: todo, in_progress, done")]
    InvalidStatus,

    #[error("Title must be a non-empty string")]
    InvalidTitle,

    #[error("Owner must be a non-empty string")]
    InvalidOwner,

    #[error("Due date must be a valid timestamp in milliseconds")]
    InvalidDueDate,

    #[error("Meeting {0} not found")]
    MeetingNotFound(i64),

    #[error("Action item {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Machine-readable code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidLimit => "INVALID_LIMIT",
            StoreError::InvalidOffset => "INVALID_OFFSET",
            StoreError::InvalidStatus => "INVALID_STATUS",
            StoreError::InvalidTitle => "INVALID_TITLE",
            StoreError::InvalidOwner => "INVALID_OWNER",
            StoreError::InvalidDueDate => "INVALID_DUE_DATE",
            StoreError::MeetingNotFound(_) => "MEETING_NOT_FOUND",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// In-memory meeting store backed by a JSON data file
#[derive(Debug)]
pub struct MeetingStore {
    data: RwLock<MeetingDataset>,
    path: Option<PathBuf>,
}

impl MeetingStore {
    /// Load the store from `path`. A missing file yields an empty store that
    /// will be created on the first update.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let dataset = if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read data file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse data file {}", path.display()))?
        } else {
            info!("No data file at {}, starting with an empty store", path.display());
            MeetingDataset::default()
        };

        Ok(Self::from_parts(dataset, Some(path)))
    }

    /// Store without a backing file; updates stay in memory
    pub fn in_memory(dataset: MeetingDataset) -> Self {
        Self::from_parts(dataset, None)
    }

    fn from_parts(mut dataset: MeetingDataset, path: Option<PathBuf>) -> Self {
        let before = dataset.segments.len();
        dataset.segments.retain(|segment| {
            let valid = segment.is_valid();
            if !valid {
                warn!(
                    "Skipping segment {} of meeting {}: empty text or reversed time span",
                    segment.id, segment.meeting_id
                );
            }
            valid
        });
        dataset.segments.sort_by_key(|segment| segment.id);

        info!(
            "Meeting store loaded: {} meetings, {} segments ({} skipped), {} action items",
            dataset.meetings.len(),
            dataset.segments.len(),
            before - dataset.segments.len(),
            dataset.action_items.len()
        );

        Self {
            data: RwLock::new(dataset),
            path,
        }
    }

    /// Backing data file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Meetings ordered by date (newest first), each with its top topic names
    pub async fn list_meetings(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<MeetingSummary>, StoreError> {
        let (limit, offset) = page_bounds(limit, offset, DEFAULT_MEETING_PAGE)?;
        let data = self.data.read().await;

        let mut meetings: Vec<_> = data.meetings.iter().collect();
        meetings.sort_by(|a, b| b.date.cmp(&a.date));
        let page: Vec<_> = meetings.into_iter().skip(offset).take(limit).collect();

        let mut topics: Vec<_> = data
            .topics
            .iter()
            .filter(|topic| page.iter().any(|m| m.id == topic.meeting_id))
            .collect();
        topics.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut top_topics: HashMap<i64, Vec<String>> = HashMap::new();
        for topic in topics {
            let names = top_topics.entry(topic.meeting_id).or_default();
            if names.len() < TOP_TOPICS_PER_MEETING {
                names.push(topic.name.clone());
            }
        }

        let data_page = page
            .into_iter()
            .map(|meeting| MeetingSummary {
                id: meeting.id,
                title: meeting.title.clone(),
                date: meeting.date,
                duration_seconds: meeting.duration_seconds,
                sentiment: meeting.sentiment,
                topics: top_topics.remove(&meeting.id).unwrap_or_default(),
            })
            .collect();

        Ok(Page {
            data: data_page,
            total: data.meetings.len(),
        })
    }

    /// Meeting with its topics, action items, segments and highlights
    pub async fn get_meeting(&self, id: i64) -> Result<MeetingDetail, StoreError> {
        let data = self.data.read().await;
        let meeting = data
            .meetings
            .iter()
            .find(|m| m.id == id)
            .ok_or(StoreError::MeetingNotFound(id))?;

        Ok(MeetingDetail {
            id: meeting.id,
            title: meeting.title.clone(),
            date: meeting.date,
            duration_seconds: meeting.duration_seconds,
            summary: meeting.summary.clone(),
            sentiment: meeting.sentiment,
            topics: data
                .topics
                .iter()
                .filter(|t| t.meeting_id == id)
                .map(|t| TopicScore {
                    name: t.name.clone(),
                    score: t.score,
                })
                .collect(),
            action_items: data
                .action_items
                .iter()
                .filter(|a| a.meeting_id == id)
                .map(|a| MeetingActionItem {
                    id: a.id,
                    title: a.title.clone(),
                    owner: a.owner.clone(),
                    status: a.status,
                    due_date: a.due_date,
                })
                .collect(),
            segments: data
                .segments
                .iter()
                .filter(|s| s.meeting_id == id)
                .map(|s| MeetingSegment {
                    id: s.id,
                    start_ms: s.start_ms,
                    end_ms: s.end_ms,
                    speaker: s.speaker.clone(),
                    text: s.text.clone(),
                    sentiment: s.sentiment,
                })
                .collect(),
            highlights: data
                .highlights
                .iter()
                .filter(|h| h.meeting_id == id)
                .map(|h| MeetingHighlight {
                    id: h.id,
                    start_ms: h.start_ms,
                    end_ms: h.end_ms,
                    label: h.label.clone(),
                    importance: h.importance,
                })
                .collect(),
        })
    }

    /// Action items matching the filter, newest first
    pub async fn list_action_items(
        &self,
        filter: &ActionItemFilter,
    ) -> Result<Page<ActionItem>, StoreError> {
        let status = filter
            .status
            .as_deref()
            .map(|raw| raw.parse::<ActionStatus>().map_err(|_| StoreError::InvalidStatus))
            .transpose()?;
        let (limit, offset) = page_bounds(filter.limit, filter.offset, DEFAULT_ACTION_ITEM_PAGE)?;
        let needle = filter
            .q
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let data = self.data.read().await;
        let mut matching: Vec<&ActionItem> = data
            .action_items
            .iter()
            .filter(|item| status.is_none_or(|s| item.status == s))
            .filter(|item| {
                needle
                    .as_deref()
                    .is_none_or(|n| item.title.to_lowercase().contains(n))
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        let data_page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(Page {
            data: data_page,
            total,
        })
    }

    /// Apply a partial update to an action item and persist the dataset
    pub async fn update_action_item(
        &self,
        id: i64,
        patch: &ActionItemPatch,
    ) -> Result<ActionItem, StoreError> {
        let status = patch
            .status
            .as_deref()
            .map(|raw| raw.parse::<ActionStatus>().map_err(|_| StoreError::InvalidStatus))
            .transpose()?;
        let title = patch
            .title
            .as_deref()
            .map(|t| non_empty(t, StoreError::InvalidTitle))
            .transpose()?;
        let owner = patch
            .owner
            .as_deref()
            .map(|o| non_empty(o, StoreError::InvalidOwner))
            .transpose()?;
        if let Some(Some(due)) = patch.due_date {
            if chrono::DateTime::from_timestamp_millis(due).is_none() {
                return Err(StoreError::InvalidDueDate);
            }
        }

        // The write guard is held until the file is written, so concurrent
        // updates reach the disk in the order they were applied
        let mut data = self.data.write().await;
        let index = data
            .action_items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let original = data.action_items[index].clone();
        if patch.is_empty() {
            return Ok(original);
        }

        let mut updated = original.clone();
        if let Some(status) = status {
            updated.status = status;
        }
        if let Some(title) = title {
            updated.title = title;
        }
        if let Some(owner) = owner {
            updated.owner = owner;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }

        data.action_items[index] = updated.clone();
        if let Some(path) = &self.path {
            let saved = match serde_json::to_string_pretty(&*data) {
                Ok(content) => persist(path, &content).await,
                Err(e) => Err(anyhow::Error::new(e).context("Failed to serialize dataset")),
            };
            if let Err(e) = saved {
                warn!("Action item {} not updated, data file write failed: {:#}", id, e);
                data.action_items[index] = original;
                return Err(e.into());
            }
        }

        debug!("Updated action item {}: {:?}", id, updated.status);
        Ok(updated)
    }
}

#[async_trait]
impl SegmentStore for MeetingStore {
    async fn find_segments_containing(&self, substring: &str) -> Result<Vec<Segment>> {
        let needle = substring.to_lowercase();
        let data = self.data.read().await;

        // Segments are kept sorted by id
        Ok(data
            .segments
            .iter()
            .filter(|s| s.text.to_lowercase().contains(&needle))
            .map(|s| Segment {
                id: s.id,
                meeting_id: s.meeting_id,
                start_ms: s.start_ms,
                end_ms: s.end_ms,
                text: s.text.clone(),
            })
            .collect())
    }
}

fn page_bounds(
    limit: Option<i64>,
    offset: Option<i64>,
    default_limit: i64,
) -> Result<(usize, usize), StoreError> {
    let limit = limit.unwrap_or(default_limit).min(MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0);
    if limit < 1 {
        return Err(StoreError::InvalidLimit);
    }
    if offset < 0 {
        return Err(StoreError::InvalidOffset);
    }
    Ok((limit as usize, offset as usize))
}

fn non_empty(value: &str, err: StoreError) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_string())
}

async fn persist(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write data file {}", path.display()))?;
    debug!("Saved dataset to {}", path.display());
    Ok(())
}
