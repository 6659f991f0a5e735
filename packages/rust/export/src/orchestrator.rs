//! Walks the site hierarchy and drives the export.
//!
//! Fault containment is tiered: a failure exporting one page never fails its
//! space, and a failure exporting one space never fails the run. Only the
//! initial space listing and output-root creation are fatal. Within a page,
//! markdown conversion and attachment handling degrade independently; the
//! page still counts as exported if its metadata and raw content landed.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use wikimirror_client::ApiClient;
use wikimirror_markdown::PageFrontmatter;
use wikimirror_shared::{ExportConfig, Page, Result, Space};

use crate::ProgressReporter;
use crate::sample::Sampler;
use crate::sink::ExportSink;

/// Totals for one finished run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub spaces_exported: usize,
    pub spaces_skipped: usize,
    pub spaces_failed: usize,
    pub pages_exported: usize,
    pub pages_skipped: usize,
    pub pages_failed: usize,
    pub attachments_downloaded: usize,
    pub attachments_failed: usize,
    pub elapsed: Duration,
}

/// Per-space tally folded into the run summary.
#[derive(Debug, Default)]
struct SpaceSummary {
    pages_exported: usize,
    pages_skipped: usize,
    pages_failed: usize,
    attachments_downloaded: usize,
    attachments_failed: usize,
}

/// Outcome of one page worker.
#[derive(Debug, Default)]
struct PageOutcome {
    attachments_downloaded: usize,
    attachments_failed: usize,
}

/// Context cloned into each page worker.
#[derive(Debug, Clone)]
struct PageContext {
    space_key: String,
    domain: Option<String>,
    export_markdown: bool,
}

/// One-shot export run over a configured site.
pub struct Exporter {
    client: ApiClient,
    sink: ExportSink,
    config: ExportConfig,
    domain: Option<String>,
}

impl Exporter {
    pub fn new(client: ApiClient, config: ExportConfig) -> Self {
        let sink = ExportSink::new(&config.output_dir);
        Self {
            client,
            sink,
            config,
            domain: None,
        }
    }

    /// Site domain used to build canonical page URLs in markdown frontmatter.
    /// Without it, frontmatter carries no `url` field.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[instrument(skip_all)]
    pub async fn run(&self, progress: Arc<dyn ProgressReporter>) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        self.sink.create_root()?;

        progress.phase("Listing spaces");
        let all_spaces = self.client.spaces().await?;
        info!(count = all_spaces.len(), "space listing complete");

        let mut spaces = Vec::with_capacity(all_spaces.len());
        for space in all_spaces {
            if space.kind == "personal" {
                progress.notice(&format!(
                    "skipping personal space {} ({})",
                    space.name, space.key
                ));
                summary.spaces_skipped += 1;
            } else if space.status == "archived" {
                progress.notice(&format!(
                    "skipping archived space {} ({})",
                    space.name, space.key
                ));
                summary.spaces_skipped += 1;
            } else {
                spaces.push(space);
            }
        }

        let total_before_sample = spaces.len();
        let spaces = Sampler::new().sample(spaces, self.config.sample_spaces);
        if spaces.len() < total_before_sample {
            progress.notice(&format!(
                "sampled {} of {} spaces",
                spaces.len(),
                total_before_sample
            ));
        }

        for space in &spaces {
            progress.phase(&format!("Exporting space {}", space.key));
            match self.export_space(space, &progress).await {
                Ok(space_summary) => {
                    summary.spaces_exported += 1;
                    summary.pages_exported += space_summary.pages_exported;
                    summary.pages_skipped += space_summary.pages_skipped;
                    summary.pages_failed += space_summary.pages_failed;
                    summary.attachments_downloaded += space_summary.attachments_downloaded;
                    summary.attachments_failed += space_summary.attachments_failed;
                }
                Err(err) => {
                    warn!(space = %space.key, error = %err, "space export failed");
                    progress.notice(&format!("space {} failed: {err}", space.key));
                    summary.spaces_failed += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        progress.done(&summary);
        Ok(summary)
    }

    #[instrument(skip_all, fields(space = %space.key))]
    async fn export_space(
        &self,
        space: &Space,
        progress: &Arc<dyn ProgressReporter>,
    ) -> Result<SpaceSummary> {
        let space_dir = self.sink.write_space(space)?;
        let pages_dir = self.sink.pages_dir(&space_dir)?;

        let all_pages = self.client.space_pages(&space.id).await?;

        let mut space_summary = SpaceSummary::default();
        let mut pages = Vec::with_capacity(all_pages.len());
        for page in all_pages {
            if page.status == "archived" {
                progress.notice(&format!("skipping archived page {} ({})", page.title, page.id));
                space_summary.pages_skipped += 1;
            } else {
                pages.push(page);
            }
        }

        let total_before_sample = pages.len();
        let pages = Sampler::new().sample(pages, self.config.sample_pages);
        if pages.len() < total_before_sample {
            progress.notice(&format!(
                "sampled {} of {} pages in {}",
                pages.len(),
                total_before_sample,
                space.key
            ));
        }

        let semaphore = Arc::new(Semaphore::new(self.config.page_concurrency.max(1)));
        let context = PageContext {
            space_key: space.key.clone(),
            domain: self.domain.clone(),
            export_markdown: self.config.export_markdown,
        };

        let mut handles = Vec::with_capacity(pages.len());
        for page in pages {
            let semaphore = Arc::clone(&semaphore);
            let client = self.client.clone();
            let sink = self.sink.clone();
            let pages_dir = pages_dir.clone();
            let context = context.clone();
            let progress = Arc::clone(progress);

            let title = page.title.clone();
            let task_title = title.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                progress.status(&format!("page: {task_title}"));
                export_page(&client, &sink, &pages_dir, &page, &context, &progress).await
            });
            handles.push((title, handle));
        }

        for (title, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => {
                    space_summary.pages_exported += 1;
                    space_summary.attachments_downloaded += outcome.attachments_downloaded;
                    space_summary.attachments_failed += outcome.attachments_failed;
                }
                Ok(Err(err)) => {
                    warn!(page = %title, error = %err, "page export failed");
                    progress.notice(&format!("page {title} failed: {err}"));
                    space_summary.pages_failed += 1;
                }
                Err(join_err) => {
                    warn!(page = %title, error = %join_err, "page worker panicked");
                    progress.notice(&format!("page {title} failed: worker panicked"));
                    space_summary.pages_failed += 1;
                }
            }
        }

        Ok(space_summary)
    }
}

/// Export one page: full fetch, metadata, raw content, optional markdown,
/// attachments. Returns an error only when nothing usable was written.
async fn export_page(
    client: &ApiClient,
    sink: &ExportSink,
    pages_dir: &Path,
    summary_page: &Page,
    context: &PageContext,
    progress: &Arc<dyn ProgressReporter>,
) -> Result<PageOutcome> {
    let page = client.page(&summary_page.id).await?;

    let page_dir = sink.create_page_dir(pages_dir, &page)?;
    sink.write_page_metadata(&page_dir, &page)?;

    if let Some(storage_html) = page.storage_body() {
        sink.write_content_html(&page_dir, storage_html)?;

        if context.export_markdown {
            let meta = frontmatter_for(&page, context);
            match wikimirror_markdown::convert_with_metadata(storage_html, &meta) {
                Ok(markdown) => {
                    if let Err(err) = sink.write_content_markdown(&page_dir, &markdown) {
                        warn!(page = %page.id, error = %err, "markdown write failed");
                        progress.notice(&format!(
                            "markdown write failed for {}: {err}",
                            page.title
                        ));
                    }
                }
                Err(err) => {
                    warn!(page = %page.id, error = %err, "markdown conversion failed");
                    progress.notice(&format!(
                        "markdown conversion failed for {}: {err}",
                        page.title
                    ));
                }
            }
        }
    }

    let mut outcome = PageOutcome::default();

    let attachments = match client.page_attachments(&page.id).await {
        Ok(attachments) => attachments,
        Err(err) => {
            warn!(page = %page.id, error = %err, "attachment listing failed");
            progress.notice(&format!(
                "attachments unavailable for {}: {err}",
                page.title
            ));
            return Ok(outcome);
        }
    };

    if attachments.is_empty() {
        return Ok(outcome);
    }

    let attachments_dir = sink.create_attachments_dir(&page_dir)?;
    for attachment in &attachments {
        if attachment.download_url.is_empty() {
            warn!(attachment = %attachment.id, "attachment has no download link");
            progress.notice(&format!("no download link for {}", attachment.title));
            outcome.attachments_failed += 1;
            continue;
        }

        match client.download(&attachment.download_url).await {
            Ok(data) => {
                if let Err(err) = sink.write_attachment(&attachments_dir, attachment, &data) {
                    warn!(attachment = %attachment.id, error = %err, "attachment write failed");
                    progress.notice(&format!(
                        "write failed for {}: {err}",
                        attachment.title
                    ));
                    outcome.attachments_failed += 1;
                    continue;
                }
                if let Err(err) = sink.write_attachment_metadata(&attachments_dir, attachment) {
                    warn!(attachment = %attachment.id, error = %err, "attachment metadata write failed");
                }
                outcome.attachments_downloaded += 1;
            }
            Err(err) => {
                warn!(attachment = %attachment.id, error = %err, "attachment download failed");
                progress.notice(&format!(
                    "download failed for {}: {err}",
                    attachment.title
                ));
                outcome.attachments_failed += 1;
            }
        }
    }

    Ok(outcome)
}

fn frontmatter_for(page: &Page, context: &PageContext) -> PageFrontmatter {
    let (version, updated_at) = match &page.version {
        Some(v) => {
            let parsed = v
                .created_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc));
            (v.number, parsed)
        }
        None => (0, None),
    };

    let url = context.domain.as_deref().map(|domain| {
        format!(
            "https://{domain}/wiki/spaces/{}/pages/{}",
            context.space_key, page.id
        )
    });

    PageFrontmatter {
        title: page.title.clone(),
        page_id: page.id.clone(),
        space_key: context.space_key.clone(),
        version,
        updated_at,
        author: None,
        parent_id: page.parent_id.clone(),
        url,
    }
}
