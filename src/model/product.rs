//! Generated products and their detail payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::generation::WorldviewFlag;
use super::id::ResourceId;

/// Lifecycle status of a product.
///
/// The first three belong to the generation schema, the last three to the
/// publishing schema some backend revisions use instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Draft,
    Generated,
    Failed,
    Review,
    Published,
    Archived,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "DRAFT",
            ProductStatus::Generated => "GENERATED",
            ProductStatus::Failed => "FAILED",
            ProductStatus::Review => "REVIEW",
            ProductStatus::Published => "PUBLISHED",
            ProductStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated content artifact as returned by `GET /products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ResourceId,
    /// Product or template type. Older revisions call it `product_type`,
    /// the ELA revision `template_type`.
    #[serde(default, rename = "product_type", alias = "template_type")]
    pub kind: String,
    pub status: ProductStatus,
    #[serde(default)]
    pub generation_job_id: Option<ResourceId>,
    #[serde(default)]
    pub standard_id: Option<u64>,
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
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default, with = "super::time::optional")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "super::time::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// True when the product was produced by the given job.
    pub fn belongs_to(&self, job_id: &ResourceId) -> bool {
        self.generation_job_id.as_ref() == Some(job_id)
    }
}

/// Free-form listing metadata attached to a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcVerdict {
    Pass,
    NeedsFix,
    Fail,
}

impl fmt::Display for QcVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QcVerdict::Pass => write!(f, "PASS"),
            QcVerdict::NeedsFix => write!(f, "NEEDS_FIX"),
            QcVerdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Coarse quality band for a QC score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

/// Quality-control report produced by the backend for a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QcReport {
    #[serde(default)]
    pub verdict: Option<QcVerdict>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl QcReport {
    /// Score rendered as a rounded percentage, or "No score".
    pub fn score_label(&self) -> String {
        match self.score {
            Some(score) => format!("{}%", score.round() as i64),
            None => "No score".to_string(),
        }
    }

    /// Scores of 80 and above are good, 60 and above fair.
    pub fn score_band(&self) -> Option<ScoreBand> {
        self.score.map(|score| {
            if score >= 80.0 {
                ScoreBand::Good
            } else if score >= 60.0 {
                ScoreBand::Fair
            } else {
                ScoreBand::Poor
            }
        })
    }
}

/// Full product record from `GET /products/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default)]
    pub metadata: Option<ProductMetadata>,
    #[serde(default)]
    pub raw_json: Option<Value>,
    #[serde(default)]
    pub final_json: Option<Value>,
    #[serde(default)]
    pub qc_report: Option<QcReport>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl ProductDetail {
    /// Human title: metadata title, then "<Kind> - Standard N", then a placeholder.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.metadata.as_ref().and_then(|m| m.title.as_deref()) {
            if !title.is_empty() {
                return title.to_string();
            }
        }
        match (self.product.kind.as_str(), self.product.standard_id) {
            (kind, Some(standard)) if !kind.is_empty() => {
                format!("{} - Standard {standard}", capitalize_kind(kind))
            }
            _ => "Untitled Product".to_string(),
        }
    }

    /// Price with currency symbol, or "Price not set".
    pub fn price_label(&self) -> String {
        let Some(meta) = &self.metadata else {
            return "Price not set".to_string();
        };
        let Some(price) = meta.price else {
            return "Price not set".to_string();
        };
        let currency = meta.currency.as_deref().unwrap_or("USD");
        match currency {
            "USD" => format!("${price:.2}"),
            "INR" => format!("₹{price:.2}"),
            other => format!("{price:.2} {other}"),
        }
    }
}

// "VOCABULARY_PACK" -> "Vocabulary pack", "worksheet" -> "Worksheet".
fn capitalize_kind(kind: &str) -> String {
    let lower = kind.replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Body of `PATCH /products/{id}/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: ProductStatus,
}
