use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Default address of the processing backend
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Processing state of an uploaded recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    /// `done` and `error` end a job; polling stops there
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendJob {
    pub id: String,
    pub meeting_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSegment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendActionItem {
    pub id: i64,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub due_date: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendTopic {
    pub id: i64,
    pub label: String,
}

/// Meeting as produced by the processing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendMeeting {
    pub id: String,
    pub title: String,
    pub duration_sec: f64,
    pub language: String,
    pub sentiment: String,
    pub summary: String,
    pub segments: Vec<BackendSegment>,
    pub actions: Vec<BackendActionItem>,
    pub topics: Vec<BackendTopic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSearchHit {
    pub meeting_id: String,
    pub segment_id: i64,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSearchResponse {
    pub query: String,
    pub results: Vec<BackendSearchHit>,
}

/// Interval and overall deadline for job polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// HTTP client for the external transcription/summarization backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid backend URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend URL cannot be used as a base: {base_url}");
        }
        // Keep any path prefix when appending endpoint segments
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Build an endpoint URL from path segments (each one percent-encoded)
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Backend URL cannot be used as a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Upload a recording; returns the id of the processing job
    pub async fn upload_file(&self, path: &Path) -> Result<UploadResponse> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.endpoint(&["v1", "uploads"])?;
        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Upload request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Upload failed: {}", status);
        }

        response
            .json()
            .await
            .context("Failed to decode upload response")
    }

    pub async fn get_job(&self, job_id: &str) -> Result<BackendJob> {
        let url = self.endpoint(&["v1", "jobs", job_id])?;
        self.get_json(url).await
    }

    pub async fn get_meeting(&self, meeting_id: &str) -> Result<BackendMeeting> {
        let url = self.endpoint(&["v1", "meetings", meeting_id])?;
        self.get_json(url).await
    }

    pub async fn search(&self, query: &str) -> Result<BackendSearchResponse> {
        let mut url = self.endpoint(&["v1", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        self.get_json(url).await
    }

    /// Poll a job until it reaches `done` or `error`
    pub async fn poll_job(&self, job_id: &str, options: PollOptions) -> Result<BackendJob> {
        poll_until_terminal(|| self.get_job(job_id), options).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            tracing::warn!("Backend request error for {}: {:?}", url, e);
            anyhow::anyhow!("Failed to reach backend: {} - Error: {}", url, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error for {}: status {}", url, status);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {url}"))
    }
}

/// Repeatedly fetch a job until it reaches a terminal status.
///
/// Waits `interval` between attempts and gives up with an error once
/// `timeout` has elapsed, including time spent inside a pending fetch.
/// Fetch errors end the loop immediately.
pub async fn poll_until_terminal<F, Fut>(mut fetch: F, options: PollOptions) -> Result<BackendJob>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<BackendJob>>,
{
    let deadline = Instant::now() + options.timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let job = match tokio::time::timeout(remaining, fetch()).await {
            Ok(result) => result?,
            Err(_) => break,
        };
        if job.status.is_terminal() {
            tracing::debug!("Job {} finished with status {:?}", job.id, job.status);
            return Ok(job);
        }

        tracing::debug!("Job {} is {:?}, checking again", job.id, job.status);
        tokio::time::sleep_until((Instant::now() + options.interval).min(deadline)).await;
    }

    anyhow::bail!("Job polling timed out after {:?}", options.timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job(status: JobStatus) -> BackendJob {
        BackendJob {
            id: "job-1".to_string(),
            meeting_id: "m-1".to_string(),
            status,
            error: None,
        }
    }

    fn fast_options() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_job_status_names() {
        let job: BackendJob = serde_json::from_str(
            r#"{"id": "abc", "meeting_id": "m1", "status": "processing"}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.error.is_none());

        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }

    #[test]
    fn test_endpoint_building() {
        let client = BackendClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.endpoint(&["v1", "jobs", "a b/c"]).unwrap().as_str(),
            "http://localhost:8000/v1/jobs/a%20b%2Fc"
        );

        let prefixed = BackendClient::new("https://example.com/api").unwrap();
        assert_eq!(
            prefixed.endpoint(&["v1", "uploads"]).unwrap().as_str(),
            "https://example.com/api/v1/uploads"
        );

        assert!(BackendClient::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_poll_stops_on_terminal_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = poll_until_terminal(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(match n {
                        0 => job(JobStatus::Queued),
                        1 => job(JobStatus::Processing),
                        _ => job(JobStatus::Done),
                    })
                }
            },
            fast_options(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, JobStatus::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_returns_failed_jobs() {
        let result = poll_until_terminal(
            || async {
                Ok(BackendJob {
                    error: Some("transcription failed".to_string()),
                    ..job(JobStatus::Error)
                })
            },
            fast_options(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, JobStatus::Error);
        assert_eq!(result.error.as_deref(), Some("transcription failed"));
    }

    #[tokio::test]
    async fn test_poll_times_out() {
        let options = PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(40),
        };

        let err = poll_until_terminal(|| async { Ok(job(JobStatus::Processing)) }, options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_poll_deadline_covers_slow_fetches() {
        let options = PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(50),
        };
        let started = Instant::now();

        let err = poll_until_terminal(
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(job(JobStatus::Done))
            },
            options,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_poll_propagates_fetch_errors() {
        let err = poll_until_terminal(
            || async { Err(anyhow::anyhow!("Job not found")) },
            fast_options(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Job not found");
    }
}
