use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::pagination::PaginationStyle;

/// Backend contract revision the client speaks.
///
/// The backend has shipped incompatible revisions of the same endpoints;
/// the two that are still deployed differ in paths and pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    #[default]
    V1,
    Legacy,
}

impl ApiVersion {
    pub fn jobs_path(self) -> &'static str {
        match self {
            ApiVersion::V1 => "/v1/generation-jobs",
            ApiVersion::Legacy => "/generation-jobs",
        }
    }

    pub fn dashboard_path(self) -> &'static str {
        match self {
            ApiVersion::V1 => "/dashboard/metrics",
            ApiVersion::Legacy => "/dashboard/stats",
        }
    }

    pub fn pagination(self) -> PaginationStyle {
        match self {
            ApiVersion::V1 => PaginationStyle::Offset,
            ApiVersion::Legacy => PaginationStyle::Page,
        }
    }

    /// Query parameter naming the product kind filter.
    pub fn kind_param(self) -> &'static str {
        match self {
            ApiVersion::V1 => "template_type",
            ApiVersion::Legacy => "product_type",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => write!(f, "v1"),
            ApiVersion::Legacy => write!(f, "legacy"),
        }
    }
}
