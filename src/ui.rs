//! Interface de terminal do genboard: tabelas, detalhes e progresso.
//!
//! Usa `console` para estilização com cores e alinhamento de colunas e
//! `indicatif` para a barra de progresso. O [`JobProgress`] acompanha
//! visualmente um job de geração no terminal.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use console::{Alignment, Style, measure_text_width, pad_str};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::api::PageInfo;
use crate::model::{
    DashboardOverview, GenerationJob, GenerationReceipt, JobStatus, Product, ProductDetail,
    ProductStatus, QueueSummary, ScoreBand, Standard, UploadStatus, UploadTask,
};
use crate::tracker::{Anomaly, Correlation, Snapshot, Update};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn job_status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Pending => Style::new().yellow(),
        JobStatus::Running => Style::new().cyan(),
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red().bold(),
    }
}

fn product_status_style(status: ProductStatus) -> Style {
    match status {
        ProductStatus::Draft | ProductStatus::Review => Style::new().yellow(),
        ProductStatus::Generated | ProductStatus::Published => Style::new().green(),
        ProductStatus::Failed => Style::new().red().bold(),
        ProductStatus::Archived => Style::new().dim(),
    }
}

fn upload_status_style(status: UploadStatus) -> Style {
    match status {
        UploadStatus::Pending => Style::new().yellow(),
        UploadStatus::InProgress => Style::new().cyan(),
        UploadStatus::Completed => Style::new().green(),
    }
}

fn styled(style: &Style, text: impl std::fmt::Display) -> String {
    style.apply_to(text).to_string()
}

fn date(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Column-aligned table. Cells may carry ANSI styling.
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(measure_text_width(cell));
                }
            }
        }

        let bold = Style::new().bold();
        let mut out = String::new();
        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad_str(&styled(&bold, h), *w, Alignment::Left, None).into_owned())
            .collect();
        let _ = writeln!(out, "{}", header.join("  ").trim_end());
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| pad_str(c, *w, Alignment::Left, None).into_owned())
                .collect();
            let _ = writeln!(out, "{}", cells.join("  ").trim_end());
        }
        out
    }
}

pub fn jobs_table(jobs: &[GenerationJob]) -> Table {
    let mut table = Table::new(vec!["ID", "STATUS", "KIND", "STANDARD", "PROGRESS", "CREATED"]);
    for job in jobs {
        table.row(vec![
            job.id.to_string(),
            styled(&job_status_style(job.status), job.status),
            job.kind.clone().unwrap_or_else(|| "-".to_string()),
            job.standard_label(),
            format!(
                "{}/{} ({} failed)",
                job.completed_products, job.total_products, job.failed_products
            ),
            date(job.created_at),
        ]);
    }
    table
}

pub fn products_table(products: &[Product]) -> Table {
    let mut table = Table::new(vec!["ID", "STATUS", "KIND", "GRADE", "JOB", "CREATED"]);
    for product in products {
        table.row(vec![
            product.id.to_string(),
            styled(&product_status_style(product.status), product.status),
            if product.kind.is_empty() {
                "-".to_string()
            } else {
                product.kind.clone()
            },
            opt(product.grade_level),
            opt(product.generation_job_id.as_ref()),
            date(product.created_at),
        ]);
    }
    table
}

pub fn uploads_table(tasks: &[UploadTask]) -> Table {
    let mut table = Table::new(vec!["ID", "STATUS", "PRODUCT", "TITLE", "ASSIGNEE", "UPDATED"]);
    for task in tasks {
        table.row(vec![
            task.id.to_string(),
            styled(&upload_status_style(task.status), task.status),
            task.product_id.to_string(),
            opt(task.title.as_deref()),
            opt(task.assignee.as_deref()),
            date(task.updated_at.or(task.created_at)),
        ]);
    }
    table
}

pub fn standards_table(standards: &[Standard]) -> Table {
    let mut table = Table::new(vec!["ID", "CODE", "GRADE", "BOARD", "DESCRIPTION"]);
    for standard in standards {
        table.row(vec![
            standard.id.to_string(),
            standard.code.clone(),
            opt(standard.grade_level),
            opt(standard.curriculum_board.as_deref()),
            standard
                .description
                .as_deref()
                .map(|d| console::truncate_str(d, 60, "…").into_owned())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

/// "page 2 of 5 (87 total)", or "page 2, more available" when the total is unknown.
pub fn page_footer(info: &PageInfo) -> String {
    let page = info.page_number();
    match (info.total_pages(), info.total) {
        (Some(pages), Some(total)) => format!("page {page} of {pages} ({total} total)"),
        _ if info.has_next => format!("page {page}, more available"),
        _ => format!("page {page}"),
    }
}

pub fn print_table(table: &Table, empty: &str, info: Option<&PageInfo>) {
    if table.is_empty() {
        println!("{}", styled(&Style::new().dim(), empty));
    } else {
        print!("{}", table.render());
    }
    if let Some(info) = info {
        println!("{}", styled(&Style::new().dim(), page_footer(info)));
    }
}

fn field(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<14} {value}", format!("{label}:"));
}

pub fn job_detail(job: &GenerationJob) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        styled(&Style::new().bold(), format!("Job {}", job.id)),
        styled(&job_status_style(job.status), job.status)
    );
    field(&mut out, "Kind", opt(job.kind.as_deref()));
    field(&mut out, "Standard", job.standard_label());
    field(&mut out, "Grade", opt(job.grade_level));
    field(&mut out, "Locale", opt(job.locale.as_deref()));
    field(&mut out, "Curriculum", opt(job.curriculum_board.as_deref()));
    field(&mut out, "Worldview", opt(job.worldview_flag));
    field(
        &mut out,
        "Progress",
        format!(
            "{}/{} completed, {} failed ({:.0}%)",
            job.completed_products,
            job.total_products,
            job.failed_products,
            job.progress() * 100.0
        ),
    );
    field(&mut out, "Created", date(job.created_at));
    field(&mut out, "Updated", date(job.updated_at));
    out
}

pub fn product_detail(detail: &ProductDetail) -> String {
    let product = &detail.product;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        styled(&Style::new().bold(), detail.display_title()),
        styled(&product_status_style(product.status), product.status)
    );
    field(&mut out, "ID", &product.id);
    let kind = if product.kind.is_empty() {
        "-"
    } else {
        product.kind.as_str()
    };
    field(&mut out, "Kind", kind);
    field(&mut out, "Standard", opt(product.standard_id));
    if let Some(code) = &product.ela_standard_code {
        field(&mut out, "ELA standard", code);
    }
    field(&mut out, "Grade", opt(product.grade_level));
    field(&mut out, "Job", opt(product.generation_job_id.as_ref()));
    field(&mut out, "Worldview", opt(product.worldview_flag));
    field(&mut out, "Price", detail.price_label());
    if let Some(seo) = &product.seo_title {
        field(&mut out, "SEO title", seo);
    }
    if let Some(meta) = &detail.metadata {
        if !meta.tags.is_empty() {
            field(&mut out, "Tags", meta.tags.join(", "));
        }
    }
    if let Some(qc) = &detail.qc_report {
        let style = match qc.score_band() {
            Some(ScoreBand::Good) => Style::new().green(),
            Some(ScoreBand::Fair) => Style::new().yellow(),
            Some(ScoreBand::Poor) => Style::new().red(),
            None => Style::new().dim(),
        };
        field(
            &mut out,
            "QC",
            format!("{} {}", opt(qc.verdict), styled(&style, qc.score_label())),
        );
        for issue in &qc.issues {
            let _ = writeln!(out, "    - {issue}");
        }
    }
    if !detail.files.is_empty() {
        field(&mut out, "Files", detail.files.join(", "));
    }
    field(&mut out, "Created", date(product.created_at));
    field(&mut out, "Updated", date(product.updated_at));
    out
}

pub fn upload_detail(task: &UploadTask) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        styled(&Style::new().bold(), format!("Upload task {}", task.id)),
        styled(&upload_status_style(task.status), task.status)
    );
    field(&mut out, "Product", &task.product_id);
    field(&mut out, "Title", opt(task.title.as_deref()));
    field(&mut out, "Assignee", opt(task.assignee.as_deref()));
    field(&mut out, "Created", date(task.created_at));
    field(&mut out, "Updated", date(task.updated_at));
    out
}

pub fn standard_detail(standard: &Standard) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        styled(&Style::new().bold(), format!("{} (#{})", standard.code, standard.id))
    );
    field(&mut out, "Grade", opt(standard.grade_level));
    field(&mut out, "ELA type", opt(standard.ela_standard_type.as_deref()));
    field(&mut out, "Board", opt(standard.curriculum_board.as_deref()));
    if let Some(description) = &standard.description {
        let _ = writeln!(out, "\n  {description}");
    }
    out
}

pub fn queue_summary(summary: &QueueSummary) -> String {
    format!(
        "{} pending, {} in progress, {} completed",
        styled(&upload_status_style(UploadStatus::Pending), summary.pending),
        styled(&upload_status_style(UploadStatus::InProgress), summary.in_progress),
        styled(&upload_status_style(UploadStatus::Completed), summary.completed),
    )
}

fn counts(out: &mut String, title: &str, map: &std::collections::BTreeMap<String, u64>) {
    if map.is_empty() {
        return;
    }
    let line: Vec<String> = map.iter().map(|(k, v)| format!("{k} {v}")).collect();
    field(out, title, line.join(", "));
}

pub fn dashboard(overview: &DashboardOverview) -> String {
    let stats = &overview.stats;
    let bold = Style::new().bold();
    let mut out = String::new();
    let _ = writeln!(out, "{}", styled(&bold, "Overview"));
    field(&mut out, "Products", stats.total_products);
    field(&mut out, "Jobs", stats.total_generation_jobs);
    if let Some(queue) = stats.upload_queue_size {
        field(&mut out, "Upload queue", queue);
    }
    counts(&mut out, "By status", &stats.products_by_status);
    counts(&mut out, "Job status", &stats.jobs_by_status);
    counts(&mut out, "Templates", &stats.templates_by_type);
    counts(&mut out, "Worldview", &stats.content_by_worldview);
    counts(&mut out, "Grade", &stats.content_by_grade);

    let _ = writeln!(out, "\n{}", styled(&bold, "Recent products"));
    if overview.recent_products.is_empty() {
        let _ = writeln!(out, "  none");
    } else {
        out.push_str(&products_table(&overview.recent_products).render());
    }
    let _ = writeln!(out, "\n{}", styled(&bold, "Recent jobs"));
    if overview.recent_jobs.is_empty() {
        let _ = writeln!(out, "  none");
    } else {
        out.push_str(&jobs_table(&overview.recent_jobs).render());
    }
    out
}

pub fn receipt(receipt: &GenerationReceipt) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Job {} created",
        styled(&Style::new().green().bold(), "✓"),
        receipt.job_id
    );
    if !receipt.message.is_empty() {
        field(&mut out, "Message", &receipt.message);
    }
    if !receipt.product_ids.is_empty() {
        let ids: Vec<String> = receipt.product_ids.iter().map(ToString::to_string).collect();
        field(&mut out, "Products", ids.join(", "));
    }
    out
}

pub fn correlation(correlation: &Correlation) -> String {
    let mut out = String::new();
    if !correlation.products.is_empty() {
        out.push_str(&products_table(&correlation.products).render());
    }
    if !correlation.missing.is_empty() {
        let ids: Vec<String> = correlation.missing.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{} not listed by the backend: {}",
            styled(&Style::new().yellow(), "!"),
            ids.join(", ")
        );
    }
    if !correlation.unexpected.is_empty() {
        let ids: Vec<String> = correlation
            .unexpected
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(
            out,
            "{} listed but not in the receipt: {}",
            styled(&Style::new().yellow(), "!"),
            ids.join(", ")
        );
    }
    out
}

/// Barra de progresso de um job de geração, dimensionada por `total_products`.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    pub fn start(job_id: &str) -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_message(format!("job {job_id}"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn update(&self, update: &Update) {
        let snapshot = update.snapshot;
        self.pb.set_length(u64::from(snapshot.total));
        self.pb
            .set_position(u64::from(snapshot.completed.saturating_add(snapshot.failed)));
        let mut message = snapshot.status.to_string();
        if snapshot.failed > 0 {
            let _ = write!(message, ", {} failed", snapshot.failed);
        }
        self.pb.set_message(message);
        for anomaly in &update.anomalies {
            self.pb.println(format!(
                "  {} {}",
                self.yellow.apply_to("↻"),
                describe_anomaly(anomaly)
            ));
        }
    }

    /// Finaliza a barra e exibe o resultado final do job.
    pub fn finish(&self, snapshot: &Snapshot) {
        self.pb.finish_and_clear();
        match snapshot.status {
            JobStatus::Completed => println!(
                "  {} Job completed: {}/{} products",
                self.green.apply_to("✓"),
                snapshot.completed,
                snapshot.total
            ),
            _ => println!(
                "  {} Job {}: {} completed, {} failed",
                self.red.apply_to("✗"),
                snapshot.status,
                snapshot.completed,
                snapshot.failed
            ),
        }
    }

    pub fn abandon(&self) {
        self.pb.abandon();
    }
}

pub fn describe_anomaly(anomaly: &Anomaly) -> String {
    match anomaly {
        Anomaly::CountRegressed {
            field,
            reported,
            kept,
        } => format!("backend reported {field}={reported}, keeping {kept}"),
        Anomaly::StatusReverted { reported, kept } => {
            format!("backend reported {reported} after {kept}, keeping {kept}")
        }
    }
}
