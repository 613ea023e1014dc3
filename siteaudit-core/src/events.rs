// Crawl-scoped progress and cancel events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Page,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub task_id: String,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<serde_json::Value>,
    pub published_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Progress for one completed page: its warning count and the number of
    /// pages completed so far in the crawl.
    pub fn page(task_id: &str, url: &str, warnings: usize, total: usize) -> Self {
        Self {
            task_id: task_id.to_string(),
            event: EventKind::Page,
            message: Some(json!({
                "url": url,
                "warnings": warnings,
                "total": total,
            })),
            published_at: Utc::now(),
        }
    }

    pub fn cancel(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            event: EventKind::Cancel,
            message: None,
            published_at: Utc::now(),
        }
    }

    pub fn at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.message.as_ref()?.get("url")?.as_str()
    }

    pub fn total(&self) -> Option<u64> {
        self.message.as_ref()?.get("total")?.as_u64()
    }
}

/// In-process publish/subscribe channel shared by every crawl.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuditEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to current subscribers. Returns how many received it.
    pub fn publish(&self, event: AuditEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for event");
                0
            }
        }
    }

    pub fn subscribe(&self, task_id: &str) -> Subscription {
        Subscription {
            task_id: task_id.to_string(),
            since: Utc::now(),
            receiver: self.sender.subscribe(),
        }
    }
}

/// Events for one task id published after the subscription started.
pub struct Subscription {
    task_id: String,
    since: DateTime<Utc>,
    receiver: broadcast::Receiver<AuditEvent>,
}

impl Subscription {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    fn accepts(&self, event: &AuditEvent) -> bool {
        event.task_id == self.task_id && event.published_at >= self.since
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<AuditEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscription for {} dropped {} events", self.task_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<AuditEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Subscription for {} dropped {} events", self.task_id, skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Resolves when a cancel event for this task arrives. Never resolves if
    /// the bus shuts down first.
    pub async fn cancelled(&mut self) {
        while let Some(event) = self.recv().await {
            if event.event == EventKind::Cancel {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}
