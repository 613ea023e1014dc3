use crate::audit::{AuditOptions, PageAuditor, PageResult, host_key};
use crate::checks::Checks;
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::events::{AuditEvent, EventBus, Subscription};
use crate::report::CrawlReport;
use serde::{Deserialize, Serialize};
use siteaudit_scanner::{LinkVerifier, PageRenderer, TaskResult, WorkPool};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Lifecycle of one crawl. The last three are terminal and each produces a
/// report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Idle,
    Running,
    /// The page cap was reached.
    Completed,
    /// No pages left to visit.
    Exhausted,
    Cancelled,
}

impl CrawlState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CrawlState::Completed | CrawlState::Exhausted | CrawlState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlState::Idle => "idle",
            CrawlState::Running => "running",
            CrawlState::Completed => "completed",
            CrawlState::Exhausted => "exhausted",
            CrawlState::Cancelled => "cancelled",
        }
    }
}

/// Input for one crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlRequest {
    pub url: String,
    pub keywords: Vec<String>,
    pub checks: Checks,
    /// Task id used on the event bus. Generated when absent.
    pub task_id: Option<String>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_checks(mut self, checks: Checks) -> Self {
        self.checks = checks;
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// Breadth-first site crawler that audits each same-host page it finds.
pub struct Crawler {
    renderer: Arc<dyn PageRenderer>,
    verifier: Option<Arc<LinkVerifier>>,
    config: AuditConfig,
    events: Option<EventBus>,
}

impl Crawler {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: AuditConfig) -> Self {
        Self {
            renderer,
            verifier: None,
            config,
            events: None,
        }
    }

    /// Share a verifier (and its liveness cache) instead of creating one per
    /// crawl.
    pub fn with_verifier(mut self, verifier: Arc<LinkVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub async fn crawl(&self, request: CrawlRequest) -> Result<CrawlReport> {
        let start = parse_start_url(&request.url)?;
        let start_url = start.to_string();
        let Some(base_host) = host_key(&start) else {
            return Err(AuditError::InvalidUrl(format!("{}: missing host", request.url)));
        };

        let task_id = request
            .task_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let page_cap = self.config.page_cap;

        let verifier = match &self.verifier {
            Some(verifier) => verifier.clone(),
            None => Arc::new(self.config.link_verifier()?),
        };
        let auditor = Arc::new(PageAuditor::new(
            self.renderer.clone(),
            verifier,
            self.config.page_timeout,
        ));
        let options = Arc::new(AuditOptions::new(request.keywords.clone(), request.checks));

        // Subscribe before any work so a cancel sent right away is seen.
        let mut subscription = self.events.as_ref().map(|bus| bus.subscribe(&task_id));

        let mut state = CrawlState::Idle;
        let pool: WorkPool<PageResult> = WorkPool::new(self.config.workers);
        let pages_done = Arc::new(AtomicUsize::new(0));

        {
            let auditor = auditor.clone();
            let options = options.clone();
            let events = self.events.clone();
            let task_id = task_id.clone();
            let pages_done = pages_done.clone();

            pool.start(move |url: String| {
                let auditor = auditor.clone();
                let options = options.clone();
                let events = events.clone();
                let task_id = task_id.clone();
                let pages_done = pages_done.clone();

                async move {
                    let result = auditor.audit(&url, &options).await;
                    let total = pages_done.fetch_add(1, Ordering::SeqCst) + 1;

                    if let Some(bus) = events {
                        bus.publish(AuditEvent::page(
                            &task_id,
                            &url,
                            result.warnings.total(),
                            total,
                        ));
                    }

                    Ok(result)
                }
            })
            .await;
        }

        info!(
            "Starting crawl {} of {} with {} workers (cap {})",
            task_id,
            start_url,
            pool.worker_count(),
            page_cap
        );
        pool.schedule(&start_url).await;
        state = transition(state, CrawlState::Running);

        let mut cursor = 0;
        let terminal = loop {
            let results = pool.results().await;

            if results.len() >= page_cap {
                break CrawlState::Completed;
            }

            let mut added = 0;
            for task in &results[cursor..] {
                let Some(page) = &task.result else {
                    continue;
                };
                for link in &page.links {
                    if pool.scheduled_count().await >= page_cap {
                        break;
                    }
                    if !is_same_host(link, &base_host) {
                        continue;
                    }
                    if pool.schedule(link).await {
                        added += 1;
                    }
                }
            }
            cursor = results.len();

            if added > 0 {
                debug!("Crawl {}: scheduled {} new pages", task_id, added);
            }

            let idle = added == 0 && pool.scheduled_count().await == results.len();
            if idle {
                if wait_or_cancel(&mut subscription, self.config.grace_period).await {
                    break CrawlState::Cancelled;
                }
                if pool.completed_count().await == results.len() {
                    break CrawlState::Exhausted;
                }
                continue;
            }

            if wait_or_cancel(&mut subscription, self.config.poll_interval).await {
                break CrawlState::Cancelled;
            }
        };

        if terminal == CrawlState::Cancelled {
            info!("Crawl {} cancelled, waiting for in-flight pages", task_id);
            pool.cancel();
        }
        pool.stop().await;
        state = transition(state, terminal);

        let pages: Vec<PageResult> = pool
            .results()
            .await
            .into_iter()
            .map(into_page_result)
            .take(page_cap)
            .collect();

        info!(
            "Crawl {} {}: {} pages audited",
            task_id,
            state.as_str(),
            pages.len()
        );

        Ok(CrawlReport::build(
            task_id,
            state,
            &start_url,
            &pages,
            &request.keywords,
            &request.checks,
        ))
    }
}

/// Parse and validate a crawl's start URL.
pub fn parse_start_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| AuditError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(AuditError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            url, other
        ))),
    }
}

fn is_same_host(link: &str, base_host: &(String, Option<u16>)) -> bool {
    Url::parse(link)
        .ok()
        .and_then(|u| host_key(&u))
        .is_some_and(|key| &key == base_host)
}

fn into_page_result(task: TaskResult<PageResult>) -> PageResult {
    match (task.result, task.error) {
        (Some(page), _) => page,
        (None, error) => PageResult::with_error(
            task.data,
            error.unwrap_or_else(|| "unknown failure".to_string()),
        ),
    }
}

fn transition(from: CrawlState, to: CrawlState) -> CrawlState {
    debug!("Crawl state {} -> {}", from.as_str(), to.as_str());
    to
}

/// Sleep for `duration`, returning early with `true` if a cancel arrives.
async fn wait_or_cancel(subscription: &mut Option<Subscription>, duration: Duration) -> bool {
    match subscription {
        Some(sub) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => false,
                _ = sub.cancelled() => true,
            }
        }
        None => {
            tokio::time::sleep(duration).await;
            false
        }
    }
}
