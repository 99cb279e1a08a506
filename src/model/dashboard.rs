use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::job::GenerationJob;
use super::product::Product;

/// Aggregate counts from `/dashboard/metrics` (or `/dashboard/stats`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_products: u64,
    #[serde(default, alias = "total_jobs")]
    pub total_generation_jobs: u64,
    #[serde(default)]
    pub products_by_status: BTreeMap<String, u64>,
    #[serde(default)]
    pub jobs_by_status: BTreeMap<String, u64>,
    #[serde(default)]
    pub templates_by_type: BTreeMap<String, u64>,
    #[serde(default)]
    pub content_by_worldview: BTreeMap<String, u64>,
    #[serde(default)]
    pub content_by_grade: BTreeMap<String, u64>,
    #[serde(default)]
    pub upload_queue_size: Option<u64>,
}

/// Everything the dashboard command prints.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub recent_products: Vec<Product>,
    pub recent_jobs: Vec<GenerationJob>,
}
