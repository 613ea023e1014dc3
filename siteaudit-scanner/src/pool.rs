use crate::error::{Result, ScanError};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outcome of processing one scheduled task.
#[derive(Debug, Clone)]
pub struct TaskResult<T> {
    pub data: String,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> TaskResult<T> {
    pub fn succeeded(data: String, result: T) -> Self {
        Self {
            data,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(data: String, error: String) -> Self {
        Self {
            data,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded pool of async workers over a self-growing, deduplicated set of
/// string tasks.
///
/// A task is accepted at most once per pool lifetime. Workers pull tasks off
/// an unbounded queue, so `schedule` never waits for a free worker.
pub struct WorkPool<T> {
    workers: usize,
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    scheduled: Mutex<HashSet<String>>,
    results: Arc<RwLock<Vec<TaskResult<T>>>>,
    cancelled: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<T> WorkPool<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            workers: workers.max(1),
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(Mutex::new(receiver)),
            scheduled: Mutex::new(HashSet::new()),
            results: Arc::new(RwLock::new(Vec::new())),
            cancelled: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Queue `data` unless it was seen before. Returns whether it was accepted.
    pub async fn schedule(&self, data: &str) -> bool {
        // The seen-set lock is held across the send so two callers can never
        // both accept the same task.
        let mut scheduled = self.scheduled.lock().await;
        if scheduled.contains(data) {
            return false;
        }

        let sender = self.sender.lock().await;
        let Some(tx) = sender.as_ref() else {
            debug!("Pool stopped, dropping {}", data);
            return false;
        };

        if tx.send(data.to_string()).is_err() {
            return false;
        }

        scheduled.insert(data.to_string());
        true
    }

    /// Schedule every item, returning how many were newly accepted.
    pub async fn schedule_all<I, S>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for item in items {
            if self.schedule(item.as_ref()).await {
                added += 1;
            }
        }
        added
    }

    pub async fn is_scheduled(&self, data: &str) -> bool {
        self.scheduled.lock().await.contains(data)
    }

    pub async fn scheduled_count(&self) -> usize {
        self.scheduled.lock().await.len()
    }

    /// Launch the workers. Call once per pool.
    pub async fn start<F, Fut>(&self, process: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let process = Arc::new(process);
        let mut handles = self.handles.lock().await;

        for worker_id in 0..self.workers {
            let process = process.clone();
            let receiver = self.receiver.clone();
            let results = self.results.clone();
            let cancelled = self.cancelled.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                loop {
                    let next = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };

                    let Some(data) = next else {
                        break;
                    };

                    if cancelled.load(Ordering::SeqCst) {
                        debug!("Worker {} skipping {} after cancel", worker_id, data);
                        continue;
                    }

                    // Run the task on its own tokio task so a panic is reported
                    // as this task's error instead of killing the worker.
                    let outcome = tokio::spawn((*process)(data.clone())).await;

                    let task_result = match outcome {
                        Ok(Ok(value)) => TaskResult::succeeded(data, value),
                        Ok(Err(e)) => {
                            warn!("Worker {}: error processing {}: {}", worker_id, data, e);
                            TaskResult::failed(data, e.to_string())
                        }
                        Err(join_error) => {
                            let e = ScanError::from(join_error);
                            warn!("Worker {}: task for {} failed: {}", worker_id, data, e);
                            TaskResult::failed(data, e.to_string())
                        }
                    };

                    results.write().await.push(task_result);
                }

                debug!("Worker {} finished", worker_id);
            });

            handles.push(handle);
        }
    }

    /// Snapshot of every result collected so far, in completion order.
    pub async fn results(&self) -> Vec<TaskResult<T>> {
        self.results.read().await.clone()
    }

    pub async fn completed_count(&self) -> usize {
        self.results.read().await.len()
    }

    /// Make workers skip every task that has not started yet. In-flight tasks
    /// still finish.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Close the queue and wait for the workers to drain it.
    pub async fn stop(&self) {
        self.sender.lock().await.take();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker exited abnormally: {}", e);
            }
        }

        debug!(
            "Pool stopped with {} results",
            self.results.read().await.len()
        );
    }
}
