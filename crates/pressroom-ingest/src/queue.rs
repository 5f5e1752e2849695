//! Serialized ingestion job queue.
//!
//! Many producers submit URLs; one worker drains them in FIFO order so at
//! most one extraction runs at a time. The worker is started lazily on the
//! first submission. Each scrape runs as its own supervised task under a
//! per-source timeout budget; on timeout the task is aborted and the store
//! is left untouched. Terminal job statuses are retained in a bounded
//! table, evicting oldest-first.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use pressroom_common::{FetchClient, PressroomError, Result};
use pressroom_extract::{ExtractedMetadata, Registry, ScrapedDocument};

use crate::reconcile::{ReconcileOutcome, Reconciler, RecordDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionJob {
    pub id: Uuid,
    pub url: String,
    pub status: JobStatus,
    pub message: String,
    pub article_id: Option<Uuid>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl IngestionJob {
    fn new(url: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.to_string(),
            status: JobStatus::Queued,
            message: "queued".to_string(),
            article_id: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Budget for plain article extraction.
    pub default_budget: Duration,
    /// Budget for sources that download and transcribe media.
    pub media_budget: Duration,
    /// Source slugs that get the media budget.
    pub media_slugs: Vec<String>,
    /// How many terminal jobs to keep queryable.
    pub max_terminal_jobs: usize,
    /// Corpus root holding `en/` and `zh/`.
    pub corpus_dir: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_budget: Duration::from_secs(600),
            media_budget: Duration::from_secs(3600),
            media_slugs: vec!["xiaoyuzhou".to_string()],
            max_terminal_jobs: 256,
            corpus_dir: PathBuf::from("data/html"),
        }
    }
}

#[derive(Default)]
struct JobTable {
    jobs: HashMap<Uuid, IngestionJob>,
    /// Terminal jobs in completion order, for eviction.
    terminal_order: VecDeque<Uuid>,
    /// Queued or processing jobs keyed by URL, for duplicate joining.
    active_by_url: HashMap<String, Uuid>,
}

pub struct IngestionQueue {
    registry: Arc<Registry>,
    reconciler: Arc<Reconciler>,
    client: FetchClient,
    config: QueueConfig,
    jobs: RwLock<JobTable>,
    tx: mpsc::UnboundedSender<Uuid>,
    rx: StdMutex<Option<mpsc::UnboundedReceiver<Uuid>>>,
    worker_started: AtomicBool,
}

impl IngestionQueue {
    pub fn new(
        registry: Arc<Registry>,
        reconciler: Arc<Reconciler>,
        client: FetchClient,
        config: QueueConfig,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            registry,
            reconciler,
            client,
            config,
            jobs: RwLock::new(JobTable::default()),
            tx,
            rx: StdMutex::new(Some(rx)),
            worker_started: AtomicBool::new(false),
        })
    }

    /// Enqueue a URL for ingestion.
    ///
    /// Rejected up front when no extractor claims the URL or when the URL is
    /// already archived. Submitting a URL that is currently queued or
    /// processing joins the existing job instead of creating a second one.
    pub async fn submit(self: &Arc<Self>, url: &str) -> Result<Uuid> {
        let url = url.trim();
        let extractor = self
            .registry
            .resolve(url)
            .ok_or_else(|| PressroomError::NoExtractor(url.to_string()))?;

        if let Some(existing) = self.reconciler.store().find_by_url(url).await? {
            return Err(PressroomError::Conflict(format!(
                "url already archived as article {}",
                existing.id
            )));
        }

        let id = {
            let mut table = self.jobs.write().await;
            if let Some(active) = table.active_by_url.get(url) {
                return Ok(*active);
            }
            let job = IngestionJob::new(url);
            let id = job.id;
            table.active_by_url.insert(url.to_string(), id);
            table.jobs.insert(id, job);
            id
        };

        self.tx
            .send(id)
            .map_err(|_| PressroomError::Extraction("ingestion worker channel closed".into()))?;
        info!(job_id = %id, url = %url, source = extractor.source_slug(), "ingestion job queued");
        self.ensure_worker();
        Ok(id)
    }

    /// Status snapshot of a job, if it is still retained.
    pub async fn job(&self, id: Uuid) -> Option<IngestionJob> {
        self.jobs.read().await.jobs.get(&id).cloned()
    }

    /// Start the worker exactly once, on first use.
    fn ensure_worker(self: &Arc<Self>) {
        if self
            .worker_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let rx = self.rx.lock().ok().and_then(|mut slot| slot.take());
        if let Some(rx) = rx {
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                worker_loop(queue, rx).await;
            });
        }
    }

    async fn process(&self, job_id: Uuid) {
        let Some(url) = self.job(job_id).await.map(|j| j.url) else {
            return;
        };
        self.set(job_id, |j| {
            j.status = JobStatus::Processing;
            j.started_at = Some(Utc::now());
            j.message = "fetching and extracting".to_string();
        })
        .await;

        match self.run_job(&url).await {
            Ok(outcome) => {
                info!(job_id = %job_id, url = %url, article_id = %outcome.article_id(),
                    "ingestion job completed");
                self.set(job_id, |j| {
                    j.status = JobStatus::Completed;
                    j.article_id = Some(outcome.article_id());
                    j.message = match outcome {
                        ReconcileOutcome::Created(_) => "article created".to_string(),
                        ReconcileOutcome::Updated(_) => "article updated".to_string(),
                    };
                    j.finished_at = Some(Utc::now());
                })
                .await;
            }
            Err(e) => {
                warn!(job_id = %job_id, url = %url, error = %e, "ingestion job failed");
                self.set(job_id, |j| {
                    j.status = JobStatus::Error;
                    j.error = Some(e.to_string());
                    j.message = "ingestion failed".to_string();
                    j.finished_at = Some(Utc::now());
                })
                .await;
            }
        }

        self.retire(job_id, &url).await;
    }

    /// Supervised fetch-and-extract, then corpus write and reconciliation.
    async fn run_job(&self, url: &str) -> Result<ReconcileOutcome> {
        let extractor = self
            .registry
            .resolve(url)
            .ok_or_else(|| PressroomError::NoExtractor(url.to_string()))?;
        let slug = extractor.source_slug();
        let source_name = extractor.source_name();
        let budget = if self.config.media_slugs.iter().any(|s| s == slug) {
            self.config.media_budget
        } else {
            self.config.default_budget
        };

        let client = self.client.clone();
        let task_url = url.to_string();
        let task_extractor = Arc::clone(&extractor);
        let handle =
            tokio::spawn(async move { task_extractor.scrape(&client, &task_url).await });
        let abort = handle.abort_handle();

        let doc = match tokio::time::timeout(budget, handle).await {
            Err(_) => {
                abort.abort();
                return Err(PressroomError::ExtractionTimeout {
                    url: url.to_string(),
                    budget_secs: budget.as_secs(),
                });
            }
            Ok(Err(join_err)) => {
                return Err(PressroomError::Extraction(format!(
                    "extraction task aborted: {join_err}"
                )));
            }
            Ok(Ok(scraped)) => scraped?,
        };

        if doc.body.is_none() {
            return Err(PressroomError::Extraction(format!("no usable body: {url}")));
        }

        let (body_file, body_file_zh) = self.archive(&doc).await?;
        let draft = RecordDraft {
            title: doc.meta.title.clone(),
            title_zh: doc.title_zh.clone(),
            date: doc.meta.date,
            category: doc.meta.category.clone(),
            author: doc.meta.author.clone(),
            source: source_name.to_string(),
            url: doc.meta.url.clone(),
            body_file,
            body_file_zh,
            starred: true,
        };
        self.reconciler.reconcile(&draft).await
    }

    /// Write the fetched page (and secondary body, if any) into the corpus.
    /// Returns the stored locators.
    async fn archive(&self, doc: &ScrapedDocument) -> Result<(String, Option<String>)> {
        let file_name = corpus_filename(&doc.meta);

        let en_dir = self.config.corpus_dir.join("en");
        tokio::fs::create_dir_all(&en_dir).await?;
        tokio::fs::write(en_dir.join(&file_name), &doc.page_html).await?;
        let body_file = format!("en/{file_name}");

        let body_file_zh = match &doc.body_zh {
            Some(region) => {
                let zh_dir = self.config.corpus_dir.join("zh");
                tokio::fs::create_dir_all(&zh_dir).await?;
                tokio::fs::write(zh_dir.join(&file_name), &region.html).await?;
                Some(format!("zh/{file_name}"))
            }
            None => None,
        };
        Ok((body_file, body_file_zh))
    }

    async fn set<F: FnOnce(&mut IngestionJob)>(&self, id: Uuid, f: F) {
        let mut table = self.jobs.write().await;
        if let Some(job) = table.jobs.get_mut(&id) {
            f(job);
        }
    }

    /// Move a finished job into the bounded terminal set.
    async fn retire(&self, id: Uuid, url: &str) {
        let mut table = self.jobs.write().await;
        if table.active_by_url.get(url) == Some(&id) {
            table.active_by_url.remove(url);
        }
        table.terminal_order.push_back(id);
        while table.terminal_order.len() > self.config.max_terminal_jobs {
            if let Some(evicted) = table.terminal_order.pop_front() {
                table.jobs.remove(&evicted);
            }
        }
    }
}

async fn worker_loop(queue: Arc<IngestionQueue>, mut rx: mpsc::UnboundedReceiver<Uuid>) {
    info!("ingestion worker started");
    while let Some(job_id) = rx.recv().await {
        queue.process(job_id).await;
    }
    info!("ingestion worker stopped");
}

/// Corpus filename: `YYYY-MM-DD_category_author_title.html`, each field
/// slugged with underscores for spaces and punctuation.
pub fn corpus_filename(meta: &ExtractedMetadata) -> String {
    format!(
        "{}_{}_{}_{}.html",
        meta.date.format("%Y-%m-%d"),
        slugify(&meta.category, 40),
        slugify(&meta.author, 40),
        slugify(&meta.title, 80),
    )
}

fn slugify(s: &str, max_chars: usize) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let slug = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let slug: String = slug.chars().take(max_chars).collect();
    if slug.is_empty() {
        "na".to_string()
    } else {
        slug
    }
}
