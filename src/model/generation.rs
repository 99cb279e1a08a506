//! Generation requests and the receipts the backend returns for them.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ResourceId;

/// Product types of the worksheet generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Worksheet,
    Quiz,
    Passage,
    Assessment,
}

/// ELA template types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    BundleOverview,
    VocabularyPack,
    AnchorReadingPassage,
    ReadingComprehensionQuestions,
    ShortQuiz,
    ExitTickets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorldviewFlag {
    Christian,
    Neutral,
}

impl fmt::Display for WorldviewFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldviewFlag::Christian => write!(f, "CHRISTIAN"),
            WorldviewFlag::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Reading Informational / Reading Literature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElaStandardType {
    Ri,
    Rl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Locale {
    In,
    Us,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Curriculum {
    Cbse,
    CommonCore,
}

impl ElaStandardType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElaStandardType::Ri => "RI",
            ElaStandardType::Rl => "RL",
        }
    }
}

impl fmt::Display for ElaStandardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Curriculum {
    pub fn as_str(self) -> &'static str {
        match self {
            Curriculum::Cbse => "CBSE",
            Curriculum::CommonCore => "COMMON_CORE",
        }
    }
}

impl fmt::Display for Curriculum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::In => write!(f, "IN"),
            Locale::Us => write!(f, "US"),
        }
    }
}

impl Locale {
    /// Curriculum boards the backend accepts for this locale.
    pub fn supports(self, curriculum: Curriculum) -> bool {
        matches!(
            (self, curriculum),
            (Locale::In, Curriculum::Cbse) | (Locale::Us, Curriculum::CommonCore)
        )
    }
}

/// What a generation request asks for. Serialized as a single
/// `product_type` or `template_type` key in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationTarget {
    #[serde(rename = "product_type")]
    Product(ProductType),
    #[serde(rename = "template_type")]
    Template(TemplateType),
}

/// Why a request was refused before being sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("standard_id must be positive")]
    MissingStandard,

    #[error("grade level {0} is outside 1-12")]
    GradeOutOfRange(u32),

    #[error("ELA templates cover grades 6-8, got {0}")]
    TemplateGrade(u32),

    #[error("ELA templates need a standard type and code")]
    MissingElaStandard,

    #[error("curriculum {curriculum} is not offered for locale {locale}")]
    UnsupportedCurriculum {
        locale: Locale,
        curriculum: Curriculum,
    },

    #[error("offset {offset} is not a multiple of the page size {limit}")]
    MisalignedOffset { offset: u64, limit: u32 },
}

/// Body of `POST /generate-product` and `POST /generate-template`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub standard_id: u64,
    #[serde(flatten)]
    pub target: GenerationTarget,
    pub grade_level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curriculum_board: Option<Curriculum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ela_standard_type: Option<ElaStandardType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ela_standard_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worldview_flag: Option<WorldviewFlag>,
}

impl GenerateRequest {
    pub fn product(standard_id: u64, product_type: ProductType, grade_level: u32) -> Self {
        Self {
            standard_id,
            target: GenerationTarget::Product(product_type),
            grade_level,
            locale: None,
            curriculum_board: None,
            ela_standard_type: None,
            ela_standard_code: None,
            worldview_flag: None,
        }
    }

    pub fn template(
        standard_id: u64,
        template_type: TemplateType,
        grade_level: u32,
        ela_standard_type: ElaStandardType,
        ela_standard_code: impl Into<String>,
        worldview_flag: WorldviewFlag,
    ) -> Self {
        Self {
            standard_id,
            target: GenerationTarget::Template(template_type),
            grade_level,
            locale: None,
            curriculum_board: None,
            ela_standard_type: Some(ela_standard_type),
            ela_standard_code: Some(ela_standard_code.into()),
            worldview_flag: Some(worldview_flag),
        }
    }

    /// Endpoint this request is posted to.
    pub fn endpoint(&self) -> &'static str {
        match self.target {
            GenerationTarget::Product(_) => "/generate-product",
            GenerationTarget::Template(_) => "/generate-template",
        }
    }

    /// Checks the request before it leaves the client.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.standard_id == 0 {
            return Err(RequestError::MissingStandard);
        }
        match self.target {
            GenerationTarget::Product(_) => {
                if !(1..=12).contains(&self.grade_level) {
                    return Err(RequestError::GradeOutOfRange(self.grade_level));
                }
            }
            GenerationTarget::Template(_) => {
                if !(6..=8).contains(&self.grade_level) {
                    return Err(RequestError::TemplateGrade(self.grade_level));
                }
                let code = self.ela_standard_code.as_deref().unwrap_or("").trim();
                if code.is_empty() || self.ela_standard_type.is_none() {
                    return Err(RequestError::MissingElaStandard);
                }
            }
        }
        if let (Some(locale), Some(curriculum)) = (self.locale, self.curriculum_board) {
            if !locale.supports(curriculum) {
                return Err(RequestError::UnsupportedCurriculum { locale, curriculum });
            }
        }
        Ok(())
    }
}

/// Response to a generation request, normalised across backend revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawReceipt")]
pub struct GenerationReceipt {
    pub job_id: ResourceId,
    pub product_ids: Vec<ResourceId>,
    pub message: String,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
}

// Product revisions send `product_ids`, the template revision a single `product_id`.
#[derive(Deserialize)]
struct RawReceipt {
    job_id: ResourceId,
    #[serde(default)]
    product_ids: Option<Vec<ResourceId>>,
    #[serde(default)]
    product_id: Option<ResourceId>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    seo_title: Option<String>,
    #[serde(default)]
    seo_description: Option<String>,
}

impl From<RawReceipt> for GenerationReceipt {
    fn from(raw: RawReceipt) -> Self {
        let mut product_ids = raw.product_ids.unwrap_or_default();
        if let Some(id) = raw.product_id {
            if !product_ids.contains(&id) {
                product_ids.push(id);
            }
        }
        Self {
            job_id: raw.job_id,
            product_ids,
            message: raw.message.unwrap_or_default(),
            seo_title: raw.seo_title,
            seo_description: raw.seo_description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_request_serializes_product_type_key() {
        let mut req = GenerateRequest::product(12, ProductType::Worksheet, 5);
        req.locale = Some(Locale::In);
        req.curriculum_board = Some(Curriculum::Cbse);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "standard_id": 12,
                "product_type": "WORKSHEET",
                "grade_level": 5,
                "locale": "IN",
                "curriculum_board": "CBSE"
            })
        );
        assert_eq!(req.endpoint(), "/generate-product");
    }

    #[test]
    fn template_request_serializes_ela_fields() {
        let req = GenerateRequest::template(
            4,
            TemplateType::ExitTickets,
            7,
            ElaStandardType::Rl,
            "RL.7.2",
            WorldviewFlag::Christian,
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["template_type"], "EXIT_TICKETS");
        assert_eq!(value["ela_standard_type"], "RL");
        assert_eq!(value["worldview_flag"], "CHRISTIAN");
        assert!(value.get("product_type").is_none());
        assert!(value.get("locale").is_none());
        assert_eq!(req.endpoint(), "/generate-template");
    }

    #[test]
    fn validation_rejects_bad_grades_and_pairs() {
        assert_eq!(
            GenerateRequest::product(1, ProductType::Quiz, 13).validate(),
            Err(RequestError::GradeOutOfRange(13))
        );
        assert_eq!(
            GenerateRequest::product(0, ProductType::Quiz, 3).validate(),
            Err(RequestError::MissingStandard)
        );

        let mut req = GenerateRequest::product(1, ProductType::Quiz, 3);
        req.locale = Some(Locale::Us);
        req.curriculum_board = Some(Curriculum::Cbse);
        let err = req.validate().unwrap_err();
        assert_eq!(err.to_string(), "curriculum CBSE is not offered for locale US");
        req.curriculum_board = Some(Curriculum::CommonCore);
        assert!(req.validate().is_ok());

        let tpl = GenerateRequest::template(
            1,
            TemplateType::ShortQuiz,
            5,
            ElaStandardType::Ri,
            "RI.5.1",
            WorldviewFlag::Neutral,
        );
        assert_eq!(tpl.validate(), Err(RequestError::TemplateGrade(5)));

        let tpl = GenerateRequest::template(
            1,
            TemplateType::ShortQuiz,
            6,
            ElaStandardType::Ri,
            "  ",
            WorldviewFlag::Neutral,
        );
        assert_eq!(tpl.validate(), Err(RequestError::MissingElaStandard));
    }

    #[test]
    fn receipt_from_product_revision() {
        let r: GenerationReceipt = serde_json::from_value(json!({
            "job_id": 17,
            "product_ids": [101, 102, 103],
            "message": "queued"
        }))
        .unwrap();
        assert_eq!(r.job_id.as_str(), "17");
        assert_eq!(r.product_ids.len(), 3);
        assert_eq!(r.message, "queued");
    }

    #[test]
    fn receipt_from_template_revision() {
        let r: GenerationReceipt = serde_json::from_value(json!({
            "job_id": "job-a",
            "product_id": "prod-a",
            "message": "ok",
            "seo_title": "Vocabulary Pack RI.7.1"
        }))
        .unwrap();
        assert_eq!(r.product_ids, vec![ResourceId::from("prod-a")]);
        assert_eq!(r.seo_title.as_deref(), Some("Vocabulary Pack RI.7.1"));
    }

    #[test]
    fn receipt_without_products_is_empty_list() {
        let r: GenerationReceipt = serde_json::from_value(json!({"job_id": 1})).unwrap();
        assert!(r.product_ids.is_empty());
        assert!(r.message.is_empty());
    }
}
