use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::id::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    Pending,
    #[serde(alias = "PROCESSING")]
    InProgress,
    Completed,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Pending => "PENDING",
            UploadStatus::InProgress => "IN_PROGRESS",
            UploadStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue entry for post-generation processing of a product. Server-owned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: ResourceId,
    pub product_id: ResourceId,
    pub status: UploadStatus,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default, with = "super::time::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "super::time::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-status counts over a set of upload tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl QueueSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a UploadTask>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut acc, task| {
            match task.status {
                UploadStatus::Pending => acc.pending += 1,
                UploadStatus::InProgress => acc.in_progress += 1,
                UploadStatus::Completed => acc.completed += 1,
            }
            acc
        })
    }
}
