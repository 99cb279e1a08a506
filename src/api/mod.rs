pub mod client;
pub mod envelope;
pub mod error;
pub mod pagination;
pub mod query;
pub mod transport;
pub mod version;

pub use client::{Api, RetryPolicy};
pub use error::ApiError;
pub use pagination::{Page, PageInfo, PageRequest};
pub use query::{JobQuery, ProductQuery, UploadQuery};
pub use transport::{ApiRequest, HttpTransport, Transport};
pub use version::ApiVersion;
