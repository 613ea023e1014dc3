use siteaudit_scanner::links::{DEFAULT_LINK_WORKERS, DEFAULT_MAX_REDIRECTS, DEFAULT_PROBE_TIMEOUT};
use siteaudit_scanner::{LinkVerifier, ScanError};
use std::time::Duration;
use tracing::warn;

pub const WORKERS_ENV: &str = "SITEAUDIT_WORKERS";
pub const TABS_ENV: &str = "SITEAUDIT_TABS";

pub const MAX_AUDIT_PAGES: usize = 20;
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_LIST_TABS: usize = 2;
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Tunables for crawls and page-list audits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub workers: usize,
    pub page_cap: usize,
    pub page_timeout: Duration,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    pub link_workers: usize,
    pub probe_timeout: Duration,
    pub max_redirects: usize,
    pub list_tabs: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            page_cap: MAX_AUDIT_PAGES,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            link_workers: DEFAULT_LINK_WORKERS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            list_tabs: DEFAULT_LIST_TABS,
        }
    }
}

impl AuditConfig {
    /// Defaults overridden by `SITEAUDIT_WORKERS` and `SITEAUDIT_TABS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workers) = positive_setting(&lookup, WORKERS_ENV) {
            config.workers = workers;
        }
        if let Some(tabs) = positive_setting(&lookup, TABS_ENV) {
            config.list_tabs = tabs;
        }

        config
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap.max(1);
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_list_tabs(mut self, tabs: usize) -> Self {
        self.list_tabs = tabs.max(1);
        self
    }

    /// A fresh verifier whose cache lives as long as the returned value.
    pub fn link_verifier(&self) -> Result<LinkVerifier, ScanError> {
        LinkVerifier::with_settings(self.link_workers, self.probe_timeout, self.max_redirects)
    }
}

fn positive_setting<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!("Ignoring {}={:?}: expected a positive integer", key, raw);
            None
        }
    }
}
