use crate::error::{Result, ScanError};
use crate::page::PageData;
use futures::future::BoxFuture;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Turns a URL into extracted page content.
///
/// Implementations must bound the whole render by `timeout` and report a
/// failed or timed-out render as an error.
pub trait PageRenderer: Send + Sync {
    fn render<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<PageData>>;
}

/// Renderer backed by a plain HTTP GET and static HTML extraction.
///
/// Only the document itself is fetched, so images, fonts and media never
/// cost a request. Scripts are not executed.
#[derive(Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("siteaudit/0.1")
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> Result<PageData> {
        debug!("Rendering {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::RenderError(format!(
                "{} returned HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        if !content_type.is_empty()
            && !content_type.contains("html")
            && !content_type.contains("xml")
        {
            return Err(ScanError::RenderError(format!(
                "{} is not a markup document ({})",
                url, content_type
            )));
        }

        // Resolve relative links against the final URL after redirects.
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(extract_page(url, &final_url, &body))
    }
}

impl PageRenderer for HttpRenderer {
    fn render<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<PageData>> {
        Box::pin(async move {
            match tokio::time::timeout(timeout, self.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout(timeout.as_millis() as u64)),
            }
        })
    }
}

/// Extract title, description, headings, text and links from an HTML document.
pub fn extract_page(url: &str, base_url: &str, html: &str) -> PageData {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title");

    let meta_description = selector("meta[name=\"description\"]")
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|c| c.trim().to_string())
        })
        .unwrap_or_default();

    let h1s = selector("h1")
        .map(|s| document.select(&s).map(|el| element_text(&el)).collect())
        .unwrap_or_default();

    let body_text = selector("body")
        .and_then(|s| document.select(&s).next().map(visible_text))
        .unwrap_or_default();

    let links = selector("a[href]")
        .map(|s| {
            document
                .select(&s)
                .filter_map(|el| el.value().attr("href"))
                .filter_map(|href| resolve_url(base_url, href))
                .collect()
        })
        .unwrap_or_default();

    PageData {
        url: url.to_string(),
        title,
        meta_description,
        body_text,
        h1s,
        links,
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first_text(document: &Html, css: &str) -> String {
    selector(css)
        .and_then(|s| document.select(&s).next().map(|el| element_text(&el)))
        .unwrap_or_default()
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

fn visible_text(element: ElementRef) -> String {
    let mut words = Vec::new();
    collect_visible_words(element, &mut words);
    words.join(" ")
}

fn collect_visible_words<'a>(element: ElementRef<'a>, words: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            words.extend(text.split_whitespace());
        } else if let Some(child) = ElementRef::wrap(child) {
            if !HIDDEN_ELEMENTS.contains(&child.value().name()) {
                collect_visible_words(child, words);
            }
        }
    }
}

/// Resolve `href` against `base`, dropping the fragment.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();

    // Skip empty, javascript:, mailto:, tel:, etc.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let base_url = Url::parse(base).ok()?;
    let mut resolved = base_url.join(href).ok()?;
    resolved.set_fragment(None);

    Some(resolved.to_string())
}
