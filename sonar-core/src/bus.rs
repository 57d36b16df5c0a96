//! Per-job fan-out of progress events to live subscribers.
//!
//! Delivery is best-effort: a subscriber only sees events published while it
//! is registered, and nothing is replayed. A subscriber that shows up after
//! the terminal event has to read the [`ResultStore`](crate::ResultStore)
//! instead.

use crate::job::JobId;
use serde::{Deserialize, Serialize};
use sonar_scanner::TargetResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Incremental or terminal progress of one job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<TargetResult>>,
    pub is_final: bool,
}

impl ProgressEvent {
    pub fn progress(job_id: JobId, progress: u8, message: impl Into<String>) -> Self {
        Self {
            job_id,
            progress,
            message: message.into(),
            results: None,
            is_final: false,
        }
    }

    /// The single closing event of a job, carrying its ordered results
    pub fn terminal(job_id: JobId, results: Vec<TargetResult>) -> Self {
        Self {
            job_id,
            progress: 100,
            message: "Analysis complete. Results attached.".to_string(),
            results: Some(results),
            is_final: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Receiving end of a bus subscription.
///
/// Events arrive serialized, in publish order.
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    job_id: JobId,
    receiver: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Next serialized event, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Next event, decoded. Messages that fail to decode are logged and skipped.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        loop {
            let raw = self.receiver.recv().await?;
            match serde_json::from_str(&raw) {
                Ok(event) => return Some(event),
                Err(e) => warn!(job_id = %self.job_id, "Skipping undecodable progress message: {}", e),
            }
        }
    }
}

#[derive(Debug)]
struct Subscriber {
    handle: SubscriptionHandle,
    sender: mpsc::UnboundedSender<String>,
}

/// Subscriber lists for every job, behind a single lock
#[derive(Debug, Default)]
pub struct ProgressBus {
    subscribers: Mutex<HashMap<JobId, Vec<Subscriber>>>,
    next_handle: AtomicU64,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers
            .entry(job_id)
            .or_default()
            .push(Subscriber { handle, sender });
        debug!(job_id = %job_id, "Subscriber attached");

        Subscription {
            handle,
            job_id,
            receiver,
        }
    }

    /// Detach a subscriber. Returns whether it was registered.
    ///
    /// The job's entry disappears with its last subscriber.
    pub fn unsubscribe(&self, job_id: JobId, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = subscribers.get_mut(&job_id) else {
            return false;
        };

        let before = list.len();
        list.retain(|s| s.handle != handle);
        let removed = list.len() != before;

        if list.is_empty() {
            subscribers.remove(&job_id);
        }
        removed
    }

    /// Deliver `event` to every subscriber of `job_id`.
    ///
    /// Never fails: a subscriber whose receiving end is gone is logged and
    /// skipped.
    pub fn publish(&self, job_id: JobId, event: &ProgressEvent) {
        let message = match serde_json::to_string(event) {
            Ok(message) => message,
            Err(e) => {
                error!(job_id = %job_id, "Error serializing progress update: {}", e);
                return;
            }
        };

        let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = subscribers.get(&job_id) else {
            return;
        };

        for subscriber in list {
            if subscriber.sender.send(message.clone()).is_err() {
                warn!(
                    job_id = %job_id,
                    handle = subscriber.handle.0,
                    "Progress subscriber is gone, dropping update"
                );
            }
        }
    }

    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map_or(0, Vec::len)
    }

    /// Number of jobs with at least one subscriber
    pub fn job_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
