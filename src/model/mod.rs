mod dashboard;
mod generation;
mod id;
mod job;
mod product;
mod standard;
pub mod time;
mod upload;

pub use dashboard::{DashboardOverview, DashboardStats};
pub use generation::{
    Curriculum, ElaStandardType, GenerateRequest, GenerationReceipt, GenerationTarget, Locale,
    ProductType, RequestError, TemplateType, WorldviewFlag,
};
pub use id::ResourceId;
pub use job::{GenerationJob, JobStatus};
pub use product::{
    Product, ProductDetail, ProductMetadata, ProductStatus, QcReport, QcVerdict, ScoreBand,
    StatusUpdate,
};
pub use standard::{Standard, StandardLookup};
pub use upload::{QueueSummary, UploadStatus, UploadTask};
