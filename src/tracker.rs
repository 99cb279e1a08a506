//! Generation-job lifecycle tracking.
//!
//! A job is created by a generation request, polled until it reaches a
//! terminal status, and finally correlated with the products it produced.
//! [`JobTracker`] folds successive observations of one job into a snapshot
//! that never moves backwards: product counts only grow and a terminal status
//! is final. [`watch_job`] drives the polling.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::api::pagination::MAX_LIMIT;
use crate::api::{Api, ApiError, PageRequest, ProductQuery, RetryPolicy, Transport};
use crate::model::{GenerationJob, GenerationReceipt, JobStatus, Product, ResourceId};

// Upper bound on listing pages fetched while correlating products.
const MAX_PRODUCT_PAGES: usize = 20;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("expected job {expected}, backend returned job {actual}")]
    IdMismatch {
        expected: ResourceId,
        actual: ResourceId,
    },

    #[error("job {job_id} still {status} after {waited_secs}s")]
    TimedOut {
        job_id: ResourceId,
        status: JobStatus,
        waited_secs: u64,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Where a job reads and lists its products from.
pub trait JobSource {
    async fn fetch_job(&self, id: &ResourceId) -> Result<GenerationJob, ApiError>;

    async fn job_products(&self, id: &ResourceId) -> Result<Vec<Product>, ApiError>;
}

impl<T: Transport> JobSource for Api<T> {
    async fn fetch_job(&self, id: &ResourceId) -> Result<GenerationJob, ApiError> {
        self.poll_job(id).await
    }

    async fn job_products(&self, id: &ResourceId) -> Result<Vec<Product>, ApiError> {
        let mut request = PageRequest::first(MAX_LIMIT);
        let mut products = Vec::new();
        for _ in 0..MAX_PRODUCT_PAGES {
            let page = self
                .list_products(&ProductQuery::for_job(id.clone(), request))
                .await?;
            let has_next = page.info.has_next;
            products.extend(page.items);
            if !has_next {
                return Ok(products);
            }
            request = request.next();
        }
        warn!(
            job_id = %id,
            pages = MAX_PRODUCT_PAGES,
            listed = products.len(),
            "stopped listing job products at the page cap; later products are not correlated"
        );
        Ok(products)
    }
}

/// Progress of a job as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub status: JobStatus,
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
}

impl Snapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn outstanding(&self) -> u32 {
        self.total
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}

/// Backend reports that contradicted what was already observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    CountRegressed {
        field: &'static str,
        reported: u32,
        kept: u32,
    },
    StatusReverted {
        reported: JobStatus,
        kept: JobStatus,
    },
}

/// Result of folding one observation into the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub snapshot: Snapshot,
    pub changed: bool,
    pub anomalies: Vec<Anomaly>,
}

fn status_rank(status: JobStatus) -> u8 {
    match status {
        JobStatus::Pending => 0,
        JobStatus::Running => 1,
        JobStatus::Completed | JobStatus::Failed => 2,
    }
}

pub struct JobTracker {
    job_id: ResourceId,
    expected_products: Vec<ResourceId>,
    current: Option<Snapshot>,
    last_job: Option<GenerationJob>,
    polls: u32,
}

impl JobTracker {
    pub fn new(job_id: ResourceId) -> Self {
        Self {
            job_id,
            expected_products: Vec::new(),
            current: None,
            last_job: None,
            polls: 0,
        }
    }

    /// Tracks the job a generation request created, expecting its products.
    pub fn from_receipt(receipt: &GenerationReceipt) -> Self {
        Self {
            expected_products: receipt.product_ids.clone(),
            ..Self::new(receipt.job_id.clone())
        }
    }

    pub fn job_id(&self) -> &ResourceId {
        &self.job_id
    }

    pub fn expected_products(&self) -> &[ResourceId] {
        &self.expected_products
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.current
    }

    /// Last observed job, with counts and status as the tracker holds them.
    pub fn last_job(&self) -> Option<&GenerationJob> {
        self.last_job.as_ref()
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_some_and(|s| s.is_terminal())
    }

    /// Folds a fresh observation of the job into the tracker.
    pub fn observe(&mut self, mut job: GenerationJob) -> Result<Update, TrackError> {
        if job.id != self.job_id {
            return Err(TrackError::IdMismatch {
                expected: self.job_id.clone(),
                actual: job.id,
            });
        }
        self.polls += 1;

        let reported = Snapshot {
            status: job.status,
            total: job
                .total_products
                .max(u32::try_from(self.expected_products.len()).unwrap_or(u32::MAX)),
            completed: job.completed_products,
            failed: job.failed_products,
        };
        let mut anomalies = Vec::new();
        let next = match self.current {
            None => reported,
            Some(prev) => {
                let mut next = reported;
                if reported.completed < prev.completed {
                    anomalies.push(Anomaly::CountRegressed {
                        field: "completed_products",
                        reported: reported.completed,
                        kept: prev.completed,
                    });
                    next.completed = prev.completed;
                }
                if reported.failed < prev.failed {
                    anomalies.push(Anomaly::CountRegressed {
                        field: "failed_products",
                        reported: reported.failed,
                        kept: prev.failed,
                    });
                    next.failed = prev.failed;
                }
                next.total = reported.total.max(prev.total);
                let reverted = if prev.is_terminal() {
                    reported.status != prev.status
                } else {
                    status_rank(reported.status) < status_rank(prev.status)
                };
                if reverted {
                    anomalies.push(Anomaly::StatusReverted {
                        reported: reported.status,
                        kept: prev.status,
                    });
                    next.status = prev.status;
                }
                next
            }
        };

        for anomaly in &anomalies {
            warn!(job_id = %self.job_id, ?anomaly, "ignoring regressive job report");
        }

        let changed = self.current != Some(next);
        self.current = Some(next);
        job.status = next.status;
        job.total_products = next.total;
        job.completed_products = next.completed;
        job.failed_products = next.failed;
        self.last_job = Some(job);

        Ok(Update {
            snapshot: next,
            changed,
            anomalies,
        })
    }
}

/// How often and how long to poll.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
    /// Consecutive retryable poll failures tolerated, with backoff.
    pub retry: RetryPolicy,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(600),
            retry: RetryPolicy {
                max_retries: 3,
                base_delay_ms: 1000,
            },
        }
    }
}

/// Polls the tracked job until it is terminal, calling `on_update` for every
/// observation. Returns the final snapshot.
pub async fn watch_job<S: JobSource>(
    source: &S,
    tracker: &mut JobTracker,
    policy: &PollPolicy,
    mut on_update: impl FnMut(&Update),
) -> Result<Snapshot, TrackError> {
    let started = Instant::now();
    let mut failures = 0u32;

    loop {
        match source.fetch_job(tracker.job_id()).await {
            Ok(job) => {
                failures = 0;
                let update = tracker.observe(job)?;
                debug!(job_id = %tracker.job_id(), snapshot = ?update.snapshot, "job polled");
                on_update(&update);
                if update.snapshot.is_terminal() {
                    return Ok(update.snapshot);
                }
            }
            Err(err) if err.is_retryable() && failures < policy.retry.max_retries => {
                failures += 1;
                let delay_ms = policy.retry.delay_for_attempt(failures);
                warn!(
                    job_id = %tracker.job_id(),
                    attempt = failures,
                    max = policy.retry.max_retries,
                    delay_ms,
                    error = %err,
                    "job poll failed"
                );
                sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(err.into()),
        }

        if started.elapsed() >= policy.max_wait {
            return Err(TrackError::TimedOut {
                job_id: tracker.job_id().clone(),
                status: tracker
                    .snapshot()
                    .map_or(JobStatus::Pending, |s| s.status),
                waited_secs: started.elapsed().as_secs(),
            });
        }
        sleep(policy.interval).await;
    }
}

/// Products of a job matched against the ids the generation receipt promised.
#[derive(Debug, Clone, Serialize)]
pub struct Correlation {
    pub products: Vec<Product>,
    /// Promised by the receipt but not listed by the backend.
    pub missing: Vec<ResourceId>,
    /// Listed for the job but absent from the receipt.
    pub unexpected: Vec<ResourceId>,
}

impl Correlation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub async fn correlate<S: JobSource>(
    source: &S,
    tracker: &JobTracker,
) -> Result<Correlation, TrackError> {
    let products: Vec<Product> = source
        .job_products(tracker.job_id())
        .await?
        .into_iter()
        .filter(|p| p.belongs_to(tracker.job_id()))
        .collect();

    let listed: BTreeSet<&ResourceId> = products.iter().map(|p| &p.id).collect();
    let expected: BTreeSet<&ResourceId> = tracker.expected_products().iter().collect();

    let missing = expected
        .iter()
        .filter(|id| !listed.contains(*id))
        .map(|id| (*id).clone())
        .collect();
    let unexpected = if expected.is_empty() {
        Vec::new()
    } else {
        listed
            .iter()
            .filter(|id| !expected.contains(*id))
            .map(|id| (*id).clone())
            .collect()
    };

    Ok(Correlation {
        products,
        missing,
        unexpected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::json;

    fn job(id: &str, status: &str, total: u32, completed: u32, failed: u32) -> GenerationJob {
        serde_json::from_value(json!({
            "id": id,
            "status": status,
            "total_products": total,
            "completed_products": completed,
            "failed_products": failed,
        }))
        .unwrap()
    }

    fn product(id: &str, job_id: &str) -> Product {
        serde_json::from_value(json!({
            "id": id, "status": "GENERATED", "generation_job_id": job_id
        }))
        .unwrap()
    }

    struct MockSource {
        jobs: Mutex<VecDeque<Result<GenerationJob, ApiError>>>,
        fallback: GenerationJob,
        products: Vec<Product>,
        calls: Mutex<u32>,
    }

    impl MockSource {
        fn new(jobs: Vec<Result<GenerationJob, ApiError>>, fallback: GenerationJob) -> Self {
            Self {
                jobs: Mutex::new(jobs.into()),
                fallback,
                products: Vec::new(),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl JobSource for MockSource {
        async fn fetch_job(&self, _id: &ResourceId) -> Result<GenerationJob, ApiError> {
            *self.calls.lock().unwrap() += 1;
            self.jobs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(self.fallback.clone()))
        }

        async fn job_products(&self, _id: &ResourceId) -> Result<Vec<Product>, ApiError> {
            Ok(self.products.clone())
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_secs(5),
            retry: RetryPolicy {
                max_retries: 2,
                base_delay_ms: 1,
            },
        }
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 503,
            message: "down".into(),
        }
    }

    #[test]
    fn completed_count_never_decreases() {
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        let reports = [(0, 0), (2, 0), (1, 0), (3, 1), (2, 0), (4, 1)];
        let mut last = 0;
        for (completed, failed) in reports {
            let update = tracker
                .observe(job("j", "RUNNING", 5, completed, failed))
                .unwrap();
            assert!(update.snapshot.completed >= last);
            last = update.snapshot.completed;
        }
        assert_eq!(last, 4);
        assert_eq!(tracker.polls(), 6);
    }

    #[test]
    fn regression_is_reported_and_clamped() {
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        tracker.observe(job("j", "RUNNING", 4, 3, 1)).unwrap();
        let update = tracker.observe(job("j", "RUNNING", 4, 1, 0)).unwrap();
        assert_eq!(update.snapshot.completed, 3);
        assert_eq!(update.snapshot.failed, 1);
        assert!(!update.changed);
        assert_eq!(
            update.anomalies,
            vec![
                Anomaly::CountRegressed {
                    field: "completed_products",
                    reported: 1,
                    kept: 3
                },
                Anomaly::CountRegressed {
                    field: "failed_products",
                    reported: 0,
                    kept: 1
                },
            ]
        );
        assert_eq!(tracker.last_job().unwrap().completed_products, 3);
    }

    #[test]
    fn terminal_status_is_sticky() {
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        tracker.observe(job("j", "COMPLETED", 2, 2, 0)).unwrap();
        let update = tracker.observe(job("j", "RUNNING", 2, 2, 0)).unwrap();
        assert_eq!(update.snapshot.status, JobStatus::Completed);
        let update = tracker.observe(job("j", "FAILED", 2, 2, 0)).unwrap();
        assert_eq!(update.snapshot.status, JobStatus::Completed);
        assert!(matches!(
            update.anomalies[0],
            Anomaly::StatusReverted {
                reported: JobStatus::Failed,
                kept: JobStatus::Completed
            }
        ));
        assert!(tracker.is_finished());
    }

    #[test]
    fn running_does_not_fall_back_to_pending() {
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        tracker.observe(job("j", "RUNNING", 2, 0, 0)).unwrap();
        let update = tracker.observe(job("j", "PENDING", 2, 0, 0)).unwrap();
        assert_eq!(update.snapshot.status, JobStatus::Running);
        let update = tracker.observe(job("j", "COMPLETED", 2, 2, 0)).unwrap();
        assert!(update.anomalies.is_empty());
        assert!(update.changed);
    }

    #[test]
    fn mismatched_job_is_rejected() {
        let mut tracker = JobTracker::new(ResourceId::from("a"));
        let err = tracker.observe(job("b", "RUNNING", 1, 0, 0)).unwrap_err();
        assert!(matches!(err, TrackError::IdMismatch { .. }));
        assert_eq!(tracker.polls(), 0);
    }

    #[test]
    fn receipt_products_set_the_minimum_total() {
        let receipt: GenerationReceipt =
            serde_json::from_value(json!({"job_id": "j", "product_ids": ["p1", "p2", "p3"]}))
                .unwrap();
        let mut tracker = JobTracker::from_receipt(&receipt);
        let update = tracker.observe(job("j", "PENDING", 0, 0, 0)).unwrap();
        assert_eq!(update.snapshot.total, 3);
        assert_eq!(update.snapshot.outstanding(), 3);
    }

    #[tokio::test]
    async fn watch_stops_at_terminal_status() {
        let source = MockSource::new(
            vec![
                Ok(job("j", "PENDING", 3, 0, 0)),
                Ok(job("j", "RUNNING", 3, 1, 0)),
                Ok(job("j", "RUNNING", 3, 2, 0)),
                Ok(job("j", "COMPLETED", 3, 3, 0)),
            ],
            job("j", "COMPLETED", 3, 3, 0),
        );
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        let mut seen = Vec::new();
        let last = watch_job(&source, &mut tracker, &fast_policy(), |u| {
            seen.push(u.snapshot.completed);
        })
        .await
        .unwrap();
        assert_eq!(last.status, JobStatus::Completed);
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn watch_tolerates_transient_errors() {
        let source = MockSource::new(
            vec![
                Ok(job("j", "RUNNING", 1, 0, 0)),
                Err(unavailable()),
                Err(unavailable()),
                Ok(job("j", "FAILED", 1, 0, 1)),
            ],
            job("j", "FAILED", 1, 0, 1),
        );
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        let last = watch_job(&source, &mut tracker, &fast_policy(), |_| {})
            .await
            .unwrap();
        assert_eq!(last.status, JobStatus::Failed);
        assert_eq!(last.failed, 1);
    }

    #[tokio::test]
    async fn watch_gives_up_after_error_budget() {
        let source = MockSource::new(
            vec![Err(unavailable()), Err(unavailable()), Err(unavailable())],
            job("j", "COMPLETED", 1, 1, 0),
        );
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        let err = watch_job(&source, &mut tracker, &fast_policy(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, TrackError::Api(_)));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn watch_fails_fast_on_client_errors() {
        let source = MockSource::new(
            vec![Err(ApiError::Status {
                status: 404,
                message: "Job not found".into(),
            })],
            job("j", "COMPLETED", 1, 1, 0),
        );
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        let err = watch_job(&source, &mut tracker, &fast_policy(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (status 404): Job not found");
    }

    #[tokio::test]
    async fn watch_times_out() {
        let source = MockSource::new(Vec::new(), job("j", "RUNNING", 2, 1, 0));
        let mut tracker = JobTracker::new(ResourceId::from("j"));
        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            max_wait: Duration::from_millis(20),
            ..fast_policy()
        };
        let err = watch_job(&source, &mut tracker, &policy, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackError::TimedOut {
                status: JobStatus::Running,
                ..
            }
        ));
        assert!(source.calls() >= 2);
    }

    // Every page is full and claims more follow.
    struct EndlessProducts {
        requests: Mutex<u32>,
    }

    impl Transport for EndlessProducts {
        async fn execute(
            &self,
            _request: &crate::api::ApiRequest,
        ) -> Result<serde_json::Value, ApiError> {
            let n = {
                let mut requests = self.requests.lock().unwrap();
                *requests += 1;
                *requests
            };
            let items: Vec<_> = (0..MAX_LIMIT)
                .map(|i| {
                    json!({
                        "id": format!("{n}-{i}"),
                        "status": "GENERATED",
                        "generation_job_id": "j"
                    })
                })
                .collect();
            Ok(json!({"data": items, "pagination": {"has_next": true}}))
        }
    }

    #[tokio::test]
    async fn product_listing_stops_at_page_cap() {
        let api = Api::new(
            EndlessProducts {
                requests: Mutex::new(0),
            },
            crate::api::ApiVersion::V1,
        );
        let products = api.job_products(&ResourceId::from("j")).await.unwrap();
        assert_eq!(products.len(), MAX_PRODUCT_PAGES * MAX_LIMIT as usize);
    }

    #[tokio::test]
    async fn correlate_reports_missing_and_unexpected() {
        let receipt: GenerationReceipt =
            serde_json::from_value(json!({"job_id": "j", "product_ids": ["p1", "p2"]})).unwrap();
        let tracker = JobTracker::from_receipt(&receipt);
        let mut source = MockSource::new(Vec::new(), job("j", "COMPLETED", 2, 2, 0));
        source.products = vec![product("p1", "j"), product("p9", "j"), product("x", "other")];

        let c = correlate(&source, &tracker).await.unwrap();
        assert_eq!(c.products.len(), 2);
        assert_eq!(c.missing, vec![ResourceId::from("p2")]);
        assert_eq!(c.unexpected, vec![ResourceId::from("p9")]);
        assert!(!c.is_complete());
    }

    #[tokio::test]
    async fn correlate_without_receipt_lists_everything() {
        let tracker = JobTracker::new(ResourceId::from("j"));
        let mut source = MockSource::new(Vec::new(), job("j", "COMPLETED", 1, 1, 0));
        source.products = vec![product("p1", "j")];
        let c = correlate(&source, &tracker).await.unwrap();
        assert!(c.is_complete());
        assert!(c.unexpected.is_empty());
    }
}
