// Audit an explicit list of pages without crawling

use crate::audit::{AuditOptions, PageAuditor, PageResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Split `urls` into `lanes` contiguous runs whose sizes differ by at most
/// one. Earlier lanes take the remainder; lanes may be empty.
pub fn divide_urls(urls: &[String], lanes: usize) -> Vec<Vec<String>> {
    let lanes = lanes.max(1);
    let base = urls.len() / lanes;
    let remainder = urls.len() % lanes;

    let mut output = Vec::with_capacity(lanes);
    let mut start = 0;
    for i in 0..lanes {
        let count = base + usize::from(i < remainder);
        output.push(urls[start..start + count].to_vec());
        start += count;
    }

    output
}

/// Audit `urls` across `lanes` parallel lanes, streaming each result as it
/// finishes.
///
/// Each lane audits its pages one after another. Dropping the receiver stops
/// every lane before its next page.
pub fn audit_list(
    auditor: Arc<PageAuditor>,
    urls: Vec<String>,
    options: AuditOptions,
    lanes: usize,
) -> mpsc::Receiver<PageResult> {
    let (tx, rx) = mpsc::channel(lanes.max(1));
    let options = Arc::new(options);

    for (lane, urls) in divide_urls(&urls, lanes).into_iter().enumerate() {
        if urls.is_empty() {
            continue;
        }

        let auditor = auditor.clone();
        let options = options.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            debug!("List lane {} started with {} pages", lane, urls.len());

            for url in urls {
                if tx.is_closed() {
                    debug!("List lane {} stopping: receiver closed", lane);
                    return;
                }

                let result = auditor.audit(&url, &options).await;
                if tx.send(result).await.is_err() {
                    debug!("List lane {} stopping: receiver closed", lane);
                    return;
                }
            }

            debug!("List lane {} finished", lane);
        });
    }

    rx
}
