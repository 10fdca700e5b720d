use crate::file::naming::{sanitize_filename, with_suffix};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

/// Container suffix for recorded event clips.
pub const CLIP_SUFFIX: &str = ".mkv";

/// Reference to a recorded media resource on the DVR server.
#[derive(Debug, Clone)]
pub struct MediaSource {
    pub media_id: u64,
    /// Fully resolved URL the transfer will fetch.
    pub request_url: Url,
    /// Base name (camera/event description) used to derive a default file name.
    pub base_name: String,
}

impl MediaSource {
    /// Build a source for `media_id` against the server base URL. The media
    /// endpoint is `media/request.php?id=<media_id>`.
    pub fn new(server_url: &Url, media_id: u64, base_name: impl Into<String>) -> Result<Self> {
        let mut request_url = server_url
            .join("media/request.php")
            .context("Invalid server URL")?;
        request_url
            .query_pairs_mut()
            .append_pair("id", &media_id.to_string());

        Ok(Self {
            media_id,
            request_url,
            base_name: base_name.into(),
        })
    }

    /// Default file name for this clip: sanitized base name plus the clip
    /// suffix (appended only when missing).
    pub fn default_file_name(&self) -> String {
        with_suffix(&sanitize_filename(&self.base_name), CLIP_SUFFIX)
    }
}

/// Lifecycle of a download task.
///
/// `Queued → Active` happens only at the queue's admission step,
/// `Active → Finished` when the transfer reports completion, and any state
/// can reach `Removed` through an explicit cancel/dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Active,
    Finished,
    Removed,
}

/// One queued or in-flight clip transfer.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub id: Uuid,
    pub source: MediaSource,
    /// Absolute destination path, resolved at request time.
    pub destination: PathBuf,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
}

impl DownloadTask {
    pub fn new(source: MediaSource, destination: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            destination,
            state: TaskState::Queued,
            created_at: Utc::now(),
        }
    }
}
