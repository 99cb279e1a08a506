use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::generation::WorldviewFlag;
use super::id::ResourceId;

/// Tracks the lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    #[serde(alias = "IN_PROGRESS", alias = "PROCESSING")]
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of asynchronous work producing one or more products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: ResourceId,
    #[serde(default)]
    pub standard_id: Option<u64>,
    pub status: JobStatus,
    #[serde(default, rename = "job_type", alias = "product_type", alias = "template_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub grade_level: Option<u32>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub curriculum_board: Option<String>,
    #[serde(default)]
    pub ela_standard_type: Option<String>,
    #[serde(default)]
    pub ela_standard_code: Option<String>,
    #[serde(default)]
    pub worldview_flag: Option<WorldviewFlag>,
    #[serde(default)]
    pub total_products: u32,
    #[serde(default)]
    pub completed_products: u32,
    #[serde(default)]
    pub failed_products: u32,
    #[serde(default, with = "super::time::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "super::time::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Products neither completed nor failed yet.
    pub fn outstanding_products(&self) -> u32 {
        self.total_products
            .saturating_sub(self.completed_products)
            .saturating_sub(self.failed_products)
    }

    /// Finished share of the job in `0.0..=1.0`. Jobs without a known total
    /// count as done only once terminal.
    pub fn progress(&self) -> f64 {
        if self.total_products == 0 {
            return if self.status.is_terminal() { 1.0 } else { 0.0 };
        }
        let done = self.completed_products.saturating_add(self.failed_products);
        (f64::from(done) / f64::from(self.total_products)).min(1.0)
    }

    /// Label shown in listings, e.g. `RI.7.1` or `standard 12`.
    pub fn standard_label(&self) -> String {
        match (&self.ela_standard_code, self.standard_id) {
            (Some(code), _) if !code.is_empty() => code.clone(),
            (_, Some(id)) => format!("standard {id}"),
            _ => "-".to_string(),
        }
    }
}
