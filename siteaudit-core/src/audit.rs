// Single-page audit: render, run the enabled checks, collect same-host links

use crate::checks::{
    Checks, check_broken_links, check_description, check_headings, check_keywords,
    check_link_protocol, check_title,
};
use crate::error::{AuditError, Result};
use crate::warning::WarningMap;
use serde::{Deserialize, Serialize};
use siteaudit_scanner::{LinkVerifier, PageData, PageRenderer};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Extensions that are fetched as pages. Any other extension is skipped.
pub const PAGE_EXTENSIONS: [&str; 7] = ["html", "htm", "xml", "aspx", "php", "asp", "jsp"];

/// What to check on each page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditOptions {
    pub keywords: Vec<String>,
    pub checks: Checks,
    /// Link paths verified elsewhere; links under them are not probed.
    pub checked_paths: Vec<String>,
}

impl AuditOptions {
    pub fn new(keywords: Vec<String>, checks: Checks) -> Self {
        Self {
            keywords,
            checks,
            checked_paths: Vec::new(),
        }
    }

    pub fn with_checked_paths(mut self, checked_paths: Vec<String>) -> Self {
        self.checked_paths = checked_paths;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub title: String,
    pub h1s: Vec<String>,
    pub warnings: WarningMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Same-host outbound links.
    pub links: Vec<String>,
    pub keyword_matches: BTreeMap<String, usize>,
    /// True when the URL was not page-like and was never fetched.
    #[serde(default)]
    pub skipped: bool,
}

impl PageResult {
    pub fn skipped(url: String) -> Self {
        Self {
            url,
            skipped: true,
            ..Self::default()
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            url,
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Lower-cased extension of the last path segment, if it has one.
pub fn file_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

pub fn is_page_like(url: &str) -> bool {
    match file_extension(url) {
        Some(ext) => ext.is_empty() || PAGE_EXTENSIONS.contains(&ext.as_str()),
        None => true,
    }
}

/// Host and effective port, the identity used for same-host filtering.
pub fn host_key(url: &Url) -> Option<(String, Option<u16>)> {
    let host = url.host_str()?.to_lowercase();
    Some((host, url.port_or_known_default()))
}

pub fn same_host_links(base: &Url, links: &[String]) -> Vec<String> {
    let Some(base_key) = host_key(base) else {
        return Vec::new();
    };

    links
        .iter()
        .filter(|link| {
            Url::parse(link)
                .ok()
                .and_then(|u| host_key(&u))
                .is_some_and(|key| key == base_key)
        })
        .cloned()
        .collect()
}

/// Renders pages and runs the enabled checks on them.
///
/// One auditor is shared by every worker of a crawl so the link liveness
/// cache spans the whole crawl.
#[derive(Clone)]
pub struct PageAuditor {
    renderer: Arc<dyn PageRenderer>,
    verifier: Arc<LinkVerifier>,
    page_timeout: Duration,
}

impl PageAuditor {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        verifier: Arc<LinkVerifier>,
        page_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            verifier,
            page_timeout,
        }
    }

    pub fn verifier(&self) -> &Arc<LinkVerifier> {
        &self.verifier
    }

    /// Audit one URL given by a caller, rejecting an unparseable URL.
    pub async fn audit_url(&self, url: &str, options: &AuditOptions) -> Result<PageResult> {
        let parsed =
            Url::parse(url).map_err(|e| AuditError::InvalidUrl(format!("{}: {}", url, e)))?;
        if parsed.host_str().is_none() {
            return Err(AuditError::InvalidUrl(format!("{}: missing host", url)));
        }

        Ok(self.audit(url, options).await)
    }

    /// Audit one page. Render failures are recorded on the result.
    pub async fn audit(&self, url: &str, options: &AuditOptions) -> PageResult {
        if !is_page_like(url) {
            debug!("Skipping non-page URL {}", url);
            return PageResult::skipped(url.to_string());
        }

        let page = match self.renderer.render(url, self.page_timeout).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to render {}: {}", url, e);
                return PageResult::with_error(url.to_string(), e.to_string());
            }
        };

        let warnings = self.run_checks(url, &page, options).await;

        let keyword_matches = if options.checks.keywords && !options.keywords.is_empty() {
            check_keywords(&page.searchable_text(), &options.keywords)
        } else {
            BTreeMap::new()
        };

        let links = Url::parse(url)
            .map(|base| same_host_links(&base, &page.links))
            .unwrap_or_default();

        PageResult {
            url: url.to_string(),
            title: page.title,
            h1s: page.h1s,
            warnings,
            error: None,
            links,
            keyword_matches,
            skipped: false,
        }
    }

    async fn run_checks(&self, url: &str, page: &PageData, options: &AuditOptions) -> WarningMap {
        let checks = &options.checks;
        let mut warnings = WarningMap::new();

        if checks.headings {
            warnings.extend(check_headings(&page.h1s, url));
        }
        if checks.title {
            warnings.extend(check_title(&page.title, url));
        }
        if checks.description {
            warnings.extend(check_description(&page.meta_description, url));
        }
        if checks.links {
            warnings.extend(
                check_broken_links(&self.verifier, url, &page.links, &options.checked_paths)
                    .await,
            );
        }
        if checks.security {
            warnings.extend(check_link_protocol(&page.links, url));
        }

        warnings
    }
}
