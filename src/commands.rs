//! Dispatch of parsed CLI commands against the backend.

use console::Style;
use serde::Serialize;
use tracing::info;

use crate::api::{Api, HttpTransport, Page, ProductQuery, Transport, UploadQuery, JobQuery};
use crate::cli::{
    Command, GenerateCommand, JobsCommand, ProductsCommand, StandardsCommand, UploadsCommand,
};
use crate::config::GenboardConfig;
use crate::error::Result;
use crate::model::{
    GenerateRequest, GenerationJob, GenerationReceipt, JobStatus, QueueSummary, StandardLookup,
    UploadTask,
};
use crate::tracker::{Correlation, JobTracker, Snapshot, correlate, watch_job};
use crate::ui::{self, JobProgress};

/// Builds the HTTP-backed client described by `config`.
pub fn connect(config: &GenboardConfig) -> Result<Api<HttpTransport>> {
    let transport =
        HttpTransport::new(&config.base_url, config.timeout(), config.connect_timeout())?;
    Ok(Api::new(transport, config.api_version)
        .with_retry(config.retry_policy())
        .with_stale_times(config.cache))
}

/// Turns `generate product|template` arguments into a checked request.
/// Returns the request and whether to wait for the job.
pub fn generate_request(command: &GenerateCommand) -> Result<(GenerateRequest, bool)> {
    let (mut request, region, wait) = match command {
        GenerateCommand::Product(args) => (
            GenerateRequest::product(args.standard_id, args.product_type, args.grade),
            &args.region,
            args.wait,
        ),
        GenerateCommand::Template(args) => (
            GenerateRequest::template(
                args.standard_id,
                args.template_type,
                args.grade,
                args.ela_type,
                args.ela_code.trim(),
                args.worldview,
            ),
            &args.region,
            args.wait,
        ),
    };
    request.locale = region.locale;
    request.curriculum_board = region.curriculum;
    request.validate()?;
    Ok((request, wait))
}

/// What `generate --wait` and `jobs watch` report when done.
#[derive(Debug, Serialize)]
pub struct WatchReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<&'a GenerationReceipt>,
    pub job: Option<&'a GenerationJob>,
    pub products: &'a Correlation,
}

#[derive(Serialize)]
struct UploadListing<'a> {
    #[serde(flatten)]
    page: &'a Page<UploadTask>,
    summary: QueueSummary,
}

pub struct Session<T> {
    api: Api<T>,
    config: GenboardConfig,
    json: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(api: Api<T>, config: GenboardConfig, json: bool) -> Self {
        Self { api, config, json }
    }

    pub fn api(&self) -> &Api<T> {
        &self.api
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Generate { target } => self.generate(&target).await,
            Command::Jobs { command } => self.jobs(command).await,
            Command::Products { command } => self.products(command).await,
            Command::Uploads { command } => self.uploads(command).await,
            Command::Standards { command } => self.standards(command).await,
            Command::Dashboard { recent } => {
                let overview = self.api.dashboard(recent).await?;
                if self.json {
                    ui::print_json(&overview)?;
                } else {
                    print!("{}", ui::dashboard(&overview));
                }
                Ok(())
            }
            Command::Health => {
                let health = self.api.health().await?;
                if self.json {
                    ui::print_json(&health)?;
                } else {
                    let status = health
                        .get("status")
                        .and_then(|s| s.as_str())
                        .unwrap_or("ok");
                    println!(
                        "{} {} is up ({status}, api {})",
                        Style::new().green().bold().apply_to("✓"),
                        self.config.base_url,
                        self.api.version()
                    );
                }
                Ok(())
            }
        }
    }

    async fn generate(&self, command: &GenerateCommand) -> Result<()> {
        let (request, wait) = generate_request(command)?;
        info!(
            endpoint = request.endpoint(),
            standard_id = request.standard_id,
            grade = request.grade_level,
            "requesting generation"
        );
        let receipt = self.api.generate(&request).await?;

        if !wait {
            if self.json {
                ui::print_json(&receipt)?;
            } else {
                print!("{}", ui::receipt(&receipt));
            }
            return Ok(());
        }

        if !self.json {
            print!("{}", ui::receipt(&receipt));
        }
        let mut tracker = JobTracker::from_receipt(&receipt);
        self.follow(&mut tracker, Some(&receipt)).await
    }

    // Watches the tracked job to the end, then lists what it produced.
    async fn follow(
        &self,
        tracker: &mut JobTracker,
        receipt: Option<&GenerationReceipt>,
    ) -> Result<()> {
        let snapshot = self.watch(tracker).await?;
        let products = correlate(&self.api, tracker).await?;
        if self.json {
            ui::print_json(&WatchReport {
                receipt,
                job: tracker.last_job(),
                products: &products,
            })?;
        } else {
            print!("{}", ui::correlation(&products));
            if snapshot.status == JobStatus::Failed && products.products.is_empty() {
                println!("  no products were produced");
            }
        }
        Ok(())
    }

    async fn watch(&self, tracker: &mut JobTracker) -> Result<Snapshot> {
        let policy = self.config.poll_policy();
        if self.json {
            return Ok(watch_job(&self.api, tracker, &policy, |_| {}).await?);
        }
        let progress = JobProgress::start(tracker.job_id().as_str());
        match watch_job(&self.api, tracker, &policy, |update| progress.update(update)).await {
            Ok(snapshot) => {
                progress.finish(&snapshot);
                Ok(snapshot)
            }
            Err(err) => {
                progress.abandon();
                Err(err.into())
            }
        }
    }

    async fn jobs(&self, command: JobsCommand) -> Result<()> {
        match command {
            JobsCommand::List { status, page } => {
                let query = JobQuery {
                    status,
                    page: page.request(self.config.page_size)?,
                };
                let jobs = self.api.list_jobs(&query).await?;
                if self.json {
                    ui::print_json(&jobs)?;
                } else {
                    ui::print_table(
                        &ui::jobs_table(&jobs.items),
                        "No generation jobs found",
                        Some(&jobs.info),
                    );
                }
            }
            JobsCommand::Show { id } => {
                let job = self.api.get_job(&id).await?;
                if self.json {
                    ui::print_json(&job)?;
                } else {
                    print!("{}", ui::job_detail(&job));
                }
            }
            JobsCommand::Watch { id } => {
                let mut tracker = JobTracker::new(id);
                self.follow(&mut tracker, None).await?;
            }
        }
        Ok(())
    }

    async fn products(&self, command: ProductsCommand) -> Result<()> {
        match command {
            ProductsCommand::List {
                status,
                kind,
                standard_id,
                job,
                grade,
                worldview,
                ela_type,
                curriculum,
                page,
            } => {
                let query = ProductQuery {
                    status,
                    kind,
                    standard_id,
                    generation_job_id: job,
                    grade_level: grade,
                    worldview_flag: worldview,
                    ela_standard_type: ela_type,
                    curriculum_board: curriculum,
                    page: page.request(self.config.page_size)?,
                };
                let products = self.api.list_products(&query).await?;
                if self.json {
                    ui::print_json(&products)?;
                } else {
                    ui::print_table(
                        &ui::products_table(&products.items),
                        "No products found",
                        Some(&products.info),
                    );
                }
            }
            ProductsCommand::Show { id } => {
                let detail = self.api.get_product(&id).await?;
                if self.json {
                    ui::print_json(&detail)?;
                } else {
                    print!("{}", ui::product_detail(&detail));
                }
            }
            ProductsCommand::Content { id } => {
                ui::print_json(&self.api.get_product_content(&id).await?)?;
            }
            ProductsCommand::SetStatus { id, status } => {
                let product = self.api.update_product_status(&id, status).await?;
                if self.json {
                    ui::print_json(&product)?;
                } else {
                    println!(
                        "{} Product {} is now {}",
                        Style::new().green().bold().apply_to("✓"),
                        product.id,
                        product.status
                    );
                }
            }
        }
        Ok(())
    }

    async fn uploads(&self, command: UploadsCommand) -> Result<()> {
        match command {
            UploadsCommand::List {
                status,
                assignee,
                page,
            } => {
                let query = UploadQuery {
                    status,
                    assignee,
                    page: page.request(self.config.page_size)?,
                };
                let tasks = self.api.list_upload_tasks(&query).await?;
                let summary = QueueSummary::from_tasks(&tasks.items);
                if self.json {
                    ui::print_json(&UploadListing {
                        page: &tasks,
                        summary,
                    })?;
                } else {
                    ui::print_table(
                        &ui::uploads_table(&tasks.items),
                        "Upload queue is empty",
                        Some(&tasks.info),
                    );
                    if !tasks.is_empty() {
                        println!("{}", ui::queue_summary(&summary));
                    }
                }
            }
            UploadsCommand::Show { id } => {
                let task = self.api.get_upload_task(&id).await?;
                if self.json {
                    ui::print_json(&task)?;
                } else {
                    print!("{}", ui::upload_detail(&task));
                }
            }
        }
        Ok(())
    }

    async fn standards(&self, command: StandardsCommand) -> Result<()> {
        match command {
            StandardsCommand::Lookup {
                code,
                grade,
                curriculum,
                limit,
            } => {
                let lookup = StandardLookup {
                    code,
                    grade_level: grade,
                    curriculum_board: curriculum,
                    limit,
                };
                let standards = self.api.lookup_standards(&lookup).await?;
                if self.json {
                    ui::print_json(&standards)?;
                } else {
                    ui::print_table(
                        &ui::standards_table(&standards),
                        "No matching standards",
                        None,
                    );
                }
            }
            StandardsCommand::Show { id } => {
                let standard = self.api.get_standard(id).await?;
                if self.json {
                    ui::print_json(&standard)?;
                } else {
                    print!("{}", ui::standard_detail(&standard));
                }
            }
        }
        Ok(())
    }
}
