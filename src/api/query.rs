//! List filters for jobs, products and upload tasks.
//!
//! Each query renders its own query-string pairs for a given [`ApiVersion`]
//! and can re-check an item locally, so a filter narrows the listing even
//! when a backend revision ignores the parameter.

use crate::model::{
    Curriculum, ElaStandardType, GenerationJob, JobStatus, Product, ProductStatus, ResourceId,
    UploadStatus, UploadTask, WorldviewFlag,
};

use super::pagination::PageRequest;
use super::version::ApiVersion;

#[derive(Debug, Clone)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    pub page: PageRequest,
}

impl JobQuery {
    pub fn new(page: PageRequest) -> Self {
        Self { status: None, page }
    }

    pub fn pairs(&self, version: ApiVersion) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.to_string()));
        }
        pairs.extend(self.page.query_pairs(version.pagination()));
        pairs
    }

    pub fn matches(&self, job: &GenerationJob) -> bool {
        self.status.is_none_or(|status| job.status == status)
    }
}

#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub status: Option<ProductStatus>,
    pub kind: Option<String>,
    pub standard_id: Option<u64>,
    pub generation_job_id: Option<ResourceId>,
    pub grade_level: Option<u32>,
    pub worldview_flag: Option<WorldviewFlag>,
    pub ela_standard_type: Option<ElaStandardType>,
    pub curriculum_board: Option<Curriculum>,
    pub page: PageRequest,
}

impl ProductQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            status: None,
            kind: None,
            standard_id: None,
            generation_job_id: None,
            grade_level: None,
            worldview_flag: None,
            ela_standard_type: None,
            curriculum_board: None,
            page,
        }
    }

    /// All products of one generation job.
    pub fn for_job(job_id: ResourceId, page: PageRequest) -> Self {
        Self {
            generation_job_id: Some(job_id),
            ..Self::new(page)
        }
    }

    pub fn pairs(&self, version: ApiVersion) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.to_string()));
        }
        if let Some(kind) = &self.kind {
            pairs.push((version.kind_param().to_string(), kind.to_uppercase()));
        }
        if let Some(standard_id) = self.standard_id {
            pairs.push(("standard_id".to_string(), standard_id.to_string()));
        }
        if let Some(job_id) = &self.generation_job_id {
            pairs.push(("generation_job_id".to_string(), job_id.to_string()));
        }
        if let Some(grade) = self.grade_level {
            pairs.push(("grade_level".to_string(), grade.to_string()));
        }
        if let Some(flag) = self.worldview_flag {
            pairs.push(("worldview_flag".to_string(), flag.to_string()));
        }
        if let Some(ela) = self.ela_standard_type {
            pairs.push(("ela_standard_type".to_string(), ela.to_string()));
        }
        if let Some(board) = self.curriculum_board {
            pairs.push(("curriculum_board".to_string(), board.to_string()));
        }
        pairs.extend(self.page.query_pairs(version.pagination()));
        pairs
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.status.is_none_or(|s| product.status == s)
            && self
                .kind
                .as_ref()
                .is_none_or(|k| product.kind.eq_ignore_ascii_case(k))
            && self
                .standard_id
                .is_none_or(|id| product.standard_id == Some(id))
            && self
                .generation_job_id
                .as_ref()
                .is_none_or(|id| product.belongs_to(id))
            && self
                .grade_level
                .is_none_or(|g| product.grade_level == Some(g))
            && self
                .worldview_flag
                .is_none_or(|w| product.worldview_flag == Some(w))
            && self.ela_standard_type.is_none_or(|t| {
                product
                    .ela_standard_type
                    .as_deref()
                    .is_some_and(|p| p.eq_ignore_ascii_case(t.as_str()))
            })
            && self.curriculum_board.is_none_or(|c| {
                product
                    .curriculum_board
                    .as_deref()
                    .is_some_and(|p| p.eq_ignore_ascii_case(c.as_str()))
            })
    }
}

#[derive(Debug, Clone)]
pub struct UploadQuery {
    pub status: Option<UploadStatus>,
    pub assignee: Option<String>,
    pub page: PageRequest,
}

impl UploadQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            status: None,
            assignee: None,
            page,
        }
    }

    pub fn pairs(&self, version: ApiVersion) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.to_string()));
        }
        if let Some(assignee) = &self.assignee {
            pairs.push(("assignee".to_string(), assignee.clone()));
        }
        pairs.extend(self.page.query_pairs(version.pagination()));
        pairs
    }

    pub fn matches(&self, task: &UploadTask) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self
                .assignee
                .as_ref()
                .is_none_or(|a| task.assignee.as_deref() == Some(a.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(status: &str, kind: &str, job: u64) -> Product {
        serde_json::from_value(json!({
            "id": job * 10,
            "status": status,
            "product_type": kind,
            "generation_job_id": job,
            "standard_id": 3
        }))
        .unwrap()
    }

    #[test]
    fn job_query_pairs_per_version() {
        let q = JobQuery {
            status: Some(JobStatus::Failed),
            page: PageRequest::new(2, 20),
        };
        assert_eq!(
            q.pairs(ApiVersion::V1),
            vec![
                ("status".to_string(), "FAILED".to_string()),
                ("offset".to_string(), "20".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
        assert_eq!(q.pairs(ApiVersion::Legacy)[1], ("page".to_string(), "2".to_string()));
    }

    #[test]
    fn product_kind_param_follows_version() {
        let mut q = ProductQuery::new(PageRequest::first(10));
        q.kind = Some("worksheet".into());
        assert!(q.pairs(ApiVersion::Legacy).contains(&("product_type".into(), "WORKSHEET".into())));
        assert!(q.pairs(ApiVersion::V1).contains(&("template_type".into(), "WORKSHEET".into())));
    }

    #[test]
    fn product_filters_match_locally() {
        let mut q = ProductQuery::for_job(ResourceId::from(1), PageRequest::first(10));
        q.status = Some(ProductStatus::Generated);
        q.kind = Some("quiz".into());

        assert!(q.matches(&product("GENERATED", "QUIZ", 1)));
        assert!(!q.matches(&product("DRAFT", "QUIZ", 1)));
        assert!(!q.matches(&product("GENERATED", "WORKSHEET", 1)));
        assert!(!q.matches(&product("GENERATED", "QUIZ", 2)));

        let open = ProductQuery::new(PageRequest::first(10));
        assert!(open.matches(&product("FAILED", "PASSAGE", 9)));

        let mut ela: Product = serde_json::from_value(json!({
            "id": "p1", "status": "GENERATED", "template_type": "SHORT_QUIZ",
            "ela_standard_type": "RI", "curriculum_board": "COMMON_CORE"
        }))
        .unwrap();
        let mut q = ProductQuery::new(PageRequest::first(10));
        q.ela_standard_type = Some(ElaStandardType::Ri);
        q.curriculum_board = Some(Curriculum::CommonCore);
        assert!(q.matches(&ela));

        let pairs = q.pairs(ApiVersion::V1);
        assert!(pairs.contains(&("ela_standard_type".into(), "RI".into())));
        assert!(pairs.contains(&("curriculum_board".into(), "COMMON_CORE".into())));

        ela.ela_standard_type = Some("RL".into());
        assert!(!q.matches(&ela));
        ela.ela_standard_type = Some("RI".into());
        ela.curriculum_board = Some("CBSE".into());
        assert!(!q.matches(&ela));
        ela.curriculum_board = None;
        assert!(!q.matches(&ela));

        // Products without the fields only pass when the filter is unset.
        assert!(!q.matches(&product("GENERATED", "QUIZ", 1)));
        q.ela_standard_type = None;
        q.curriculum_board = None;
        assert!(q.matches(&product("GENERATED", "QUIZ", 1)));
    }

    #[test]
    fn upload_filters_match_locally() {
        let task: UploadTask = serde_json::from_value(json!({
            "id": 1, "product_id": 2, "status": "IN_PROGRESS", "assignee": "mira"
        }))
        .unwrap();
        let mut q = UploadQuery::new(PageRequest::first(10));
        assert!(q.matches(&task));
        q.assignee = Some("mira".into());
        q.status = Some(UploadStatus::InProgress);
        assert!(q.matches(&task));
        q.status = Some(UploadStatus::Completed);
        assert!(!q.matches(&task));
        assert!(q.pairs(ApiVersion::V1).contains(&("status".into(), "COMPLETED".into())));
    }
}
