use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey, StaleTimes, key};
use crate::model::{
    DashboardOverview, DashboardStats, GenerateRequest, GenerationJob, GenerationReceipt, Product,
    ProductDetail, ProductStatus, ResourceId, Standard, StandardLookup, StatusUpdate, UploadTask,
};

use super::envelope;
use super::error::ApiError;
use super::pagination::{Page, PageRequest, decode_page};
use super::query::{JobQuery, ProductQuery, UploadQuery};
use super::transport::{ApiRequest, Transport};
use super::version::ApiVersion;

const JOBS: &str = "generation-jobs";
const PRODUCTS: &str = "products";
const UPLOADS: &str = "upload-tasks";
const DASHBOARD: &str = "dashboard";

/// Retry behaviour for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Typed access to every backend endpoint.
pub struct Api<T> {
    transport: T,
    version: ApiVersion,
    retry: RetryPolicy,
    stale: StaleTimes,
    cache: QueryCache,
}

impl<T: Transport> Api<T> {
    pub fn new(transport: T, version: ApiVersion) -> Self {
        Self {
            transport,
            version,
            retry: RetryPolicy::default(),
            stale: StaleTimes::default(),
            cache: QueryCache::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_stale_times(mut self, stale: StaleTimes) -> Self {
        self.stale = stale;
        self
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    async fn read(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut attempt = 0;
        loop {
            match self.transport.execute(request).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay_ms = self.retry.delay_for_attempt(attempt);
                    warn!(
                        path = %request.path,
                        attempt,
                        max = self.retry.max_retries,
                        delay_ms,
                        error = %err,
                        "retrying read"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn cached_read(
        &self,
        cache_key: QueryKey,
        stale_after: Duration,
        request: &ApiRequest,
    ) -> Result<Value, ApiError> {
        if let Some(hit) = self.cache.get_fresh(&cache_key, stale_after) {
            debug!(key = ?cache_key, "cache hit");
            return Ok(hit);
        }
        let value = self.read(request).await?;
        self.cache.put(cache_key, value.clone());
        Ok(value)
    }

    // Single resources are cached with the envelope already opened so that
    // mutations can patch them in place.
    async fn fetch<R: DeserializeOwned>(
        &self,
        cache_key: QueryKey,
        stale_after: Duration,
        request: ApiRequest,
    ) -> Result<R, ApiError> {
        if let Some(hit) = self.cache.get_fresh(&cache_key, stale_after) {
            debug!(key = ?cache_key, "cache hit");
            return Ok(serde_json::from_value(hit)?);
        }
        let payload = envelope::open(self.read(&request).await?)?;
        self.cache.put(cache_key, payload.clone());
        Ok(serde_json::from_value(payload)?)
    }

    async fn fetch_page<R: DeserializeOwned>(
        &self,
        cache_key: QueryKey,
        stale_after: Duration,
        request: ApiRequest,
        page: PageRequest,
    ) -> Result<Page<R>, ApiError> {
        let value = self.cached_read(cache_key, stale_after, &request).await?;
        decode_page(value, page)
    }

    /// Submits a generation request. Job listings, products and dashboard
    /// numbers are stale afterwards.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerationReceipt, ApiError> {
        let body = serde_json::to_value(request)?;
        let value = self
            .transport
            .execute(&ApiRequest::post(request.endpoint(), body))
            .await?;
        let receipt: GenerationReceipt = envelope::decode(value)?;

        self.cache.invalidate(&[JOBS, "list"]);
        self.cache.invalidate(&[PRODUCTS]);
        self.cache.invalidate(&[DASHBOARD]);
        debug!(job_id = %receipt.job_id, products = receipt.product_ids.len(), "generation accepted");
        Ok(receipt)
    }

    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Page<GenerationJob>, ApiError> {
        let request =
            ApiRequest::get(self.version.jobs_path()).with_query(query.pairs(self.version));
        let cache_key = key([JOBS.to_string(), "list".to_string(), request.describe()]);
        let mut page = self
            .fetch_page(cache_key, self.stale.default_stale(), request, query.page)
            .await?;
        page.retain(|job| query.matches(job));
        Ok(page)
    }

    pub async fn get_job(&self, id: &ResourceId) -> Result<GenerationJob, ApiError> {
        let request = ApiRequest::get(format!("{}/{id}", self.version.jobs_path()));
        self.fetch(
            key([JOBS, "detail", id.as_str()]),
            self.stale.default_stale(),
            request,
        )
        .await
    }

    /// Fetches a job bypassing both cache and retries, then stores the fresh
    /// copy. Pollers own their retry budget.
    pub async fn poll_job(&self, id: &ResourceId) -> Result<GenerationJob, ApiError> {
        let request = ApiRequest::get(format!("{}/{id}", self.version.jobs_path()));
        let payload = envelope::open(self.transport.execute(&request).await?)?;
        self.cache.put(key([JOBS, "detail", id.as_str()]), payload.clone());
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let request = ApiRequest::get("/products").with_query(query.pairs(self.version));
        let cache_key = key([PRODUCTS.to_string(), "list".to_string(), request.describe()]);
        let mut page = self
            .fetch_page(cache_key, self.stale.default_stale(), request, query.page)
            .await?;
        page.retain(|product| query.matches(product));
        Ok(page)
    }

    pub async fn get_product(&self, id: &ResourceId) -> Result<ProductDetail, ApiError> {
        self.fetch(
            key([PRODUCTS, "detail", id.as_str()]),
            self.stale.default_stale(),
            ApiRequest::get(format!("/products/{id}")),
        )
        .await
    }

    /// The generated payload of a product, as arbitrary JSON.
    pub async fn get_product_content(&self, id: &ResourceId) -> Result<Value, ApiError> {
        self.fetch(
            key([PRODUCTS, "content", id.as_str()]),
            self.stale.default_stale(),
            ApiRequest::get(format!("/products/{id}/content")),
        )
        .await
    }

    /// Moves a product to `status`. The cached detail is patched with the
    /// returned fields; product listings are dropped.
    pub async fn update_product_status(
        &self,
        id: &ResourceId,
        status: ProductStatus,
    ) -> Result<Product, ApiError> {
        let body = serde_json::to_value(StatusUpdate { status })?;
        let value = self
            .transport
            .execute(&ApiRequest::patch(format!("/products/{id}/status"), body))
            .await?;
        let payload = envelope::open(value)?;
        let product: Product = serde_json::from_value(payload.clone())?;

        let patched = self
            .cache
            .update(&key([PRODUCTS, "detail", product.id.as_str()]), |cached| {
                if let (Some(target), Value::Object(fields)) = (cached.as_object_mut(), &payload) {
                    for (k, v) in fields {
                        target.insert(k.clone(), v.clone());
                    }
                }
            });
        self.cache.invalidate(&[PRODUCTS, "list"]);
        self.cache.invalidate(&[DASHBOARD]);
        debug!(product = %product.id, %status, patched, "product status updated");
        Ok(product)
    }

    pub async fn list_upload_tasks(&self, query: &UploadQuery) -> Result<Page<UploadTask>, ApiError> {
        let request = ApiRequest::get("/upload-tasks").with_query(query.pairs(self.version));
        let cache_key = key([UPLOADS.to_string(), "list".to_string(), request.describe()]);
        let mut page = self
            .fetch_page(cache_key, self.stale.uploads(), request, query.page)
            .await?;
        page.retain(|task| query.matches(task));
        Ok(page)
    }

    pub async fn get_upload_task(&self, id: &ResourceId) -> Result<UploadTask, ApiError> {
        self.fetch(
            key([UPLOADS, "detail", id.as_str()]),
            self.stale.uploads(),
            ApiRequest::get(format!("/upload-tasks/{id}")),
        )
        .await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.fetch(
            key([DASHBOARD, "metrics"]),
            self.stale.dashboard(),
            ApiRequest::get(self.version.dashboard_path()),
        )
        .await
    }

    pub async fn recent_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
        let page = PageRequest::first(limit);
        let request =
            ApiRequest::get("/products").with_query(page.query_pairs(self.version.pagination()));
        let page: Page<Product> = self
            .fetch_page(
                key([DASHBOARD.to_string(), "recent-products".to_string(), limit.to_string()]),
                self.stale.recent(),
                request,
                page,
            )
            .await?;
        Ok(page.items)
    }

    pub async fn recent_jobs(&self, limit: u32) -> Result<Vec<GenerationJob>, ApiError> {
        let page = PageRequest::first(limit);
        let request = ApiRequest::get(self.version.jobs_path())
            .with_query(page.query_pairs(self.version.pagination()));
        let page: Page<GenerationJob> = self
            .fetch_page(
                key([DASHBOARD.to_string(), "recent-jobs".to_string(), limit.to_string()]),
                self.stale.recent(),
                request,
                page,
            )
            .await?;
        Ok(page.items)
    }

    /// Metrics plus the most recent products and jobs.
    pub async fn dashboard(&self, recent: u32) -> Result<DashboardOverview, ApiError> {
        let stats = self.dashboard_stats().await?;
        let recent_products = self.recent_products(recent).await?;
        let recent_jobs = self.recent_jobs(recent).await?;
        Ok(DashboardOverview {
            stats,
            recent_products,
            recent_jobs,
        })
    }

    pub async fn lookup_standards(&self, lookup: &StandardLookup) -> Result<Vec<Standard>, ApiError> {
        let request = ApiRequest::get("/standards/lookup").with_query(lookup.query_pairs());
        let cache_key = key(["standards".to_string(), "lookup".to_string(), request.describe()]);
        let page: Page<Standard> = self
            .fetch_page(
                cache_key,
                self.stale.default_stale(),
                request,
                PageRequest::first(lookup.limit.unwrap_or(20)),
            )
            .await?;
        Ok(page.items)
    }

    pub async fn get_standard(&self, id: u64) -> Result<Standard, ApiError> {
        self.fetch(
            key(["standards".to_string(), "detail".to_string(), id.to_string()]),
            self.stale.default_stale(),
            ApiRequest::get(format!("/standards/{id}")),
        )
        .await
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        let value = self.read(&ApiRequest::get("/health")).await?;
        Ok(if value.is_null() { json!({"status": "ok"}) } else { value })
    }
}
