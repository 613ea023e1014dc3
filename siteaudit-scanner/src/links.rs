use crate::error::Result;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::RANGE;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

pub const DEFAULT_LINK_WORKERS: usize = 5;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Concurrent link liveness checker with a crawl-lifetime cache.
///
/// Every URL is probed at most once: the first caller for a URL installs a
/// cell under the cache lock and probes, later and concurrent callers await
/// the same cell. Cached answers are never invalidated.
pub struct LinkVerifier {
    client: Client,
    workers: usize,
    cache: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
    probes: AtomicUsize,
}

impl LinkVerifier {
    pub fn new() -> Result<Self> {
        Self::with_settings(
            DEFAULT_LINK_WORKERS,
            DEFAULT_PROBE_TIMEOUT,
            DEFAULT_MAX_REDIRECTS,
        )
    }

    pub fn with_settings(
        workers: usize,
        probe_timeout: Duration,
        max_redirects: usize,
    ) -> Result<Self> {
        // Past the hop limit the last response is used as-is.
        let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= max_redirects {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .user_agent("siteaudit/0.1")
            .timeout(probe_timeout)
            .connect_timeout(probe_timeout)
            .redirect(redirect_policy)
            .build()?;

        Ok(Self {
            client,
            workers: workers.max(1),
            cache: Mutex::new(HashMap::new()),
            probes: AtomicUsize::new(0),
        })
    }

    /// Liveness of `url`, probing the network only on first sight.
    pub async fn is_alive(&self, url: &str) -> bool {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        *cell.get_or_init(|| self.probe(url)).await
    }

    /// Check `links` with at most `workers` probes in flight and return the
    /// dead ones in input order, each reported once.
    pub async fn dead_links(&self, links: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = links
            .iter()
            .filter(|l| seen.insert(l.as_str()))
            .cloned()
            .collect();

        let checked: Vec<(String, bool)> = stream::iter(unique)
            .map(|link| async move {
                let alive = self.is_alive(&link).await;
                (link, alive)
            })
            .buffered(self.workers)
            .collect()
            .await;

        checked
            .into_iter()
            .filter(|(_, alive)| !alive)
            .map(|(link, _)| link)
            .collect()
    }

    /// Cached answer for `url`, if it has been probed.
    pub async fn cached(&self, url: &str) -> Option<bool> {
        let cache = self.cache.lock().await;
        cache.get(url).and_then(|cell| cell.get().copied())
    }

    /// Number of network probes issued so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    async fn probe(&self, url: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);

        match self
            .client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                debug!("Probed {} -> {}", url, status.as_u16());
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                debug!("Probe of {} failed: {}", url, e);
                false
            }
        }
    }
}
