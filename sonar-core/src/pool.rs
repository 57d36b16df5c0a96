// Bounded admission of work units onto the runtime

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, warn};

/// Runs work units as tokio tasks with at most `capacity` of them in flight.
///
/// [`spawn`](Self::spawn) waits for a free slot before it hands the unit to
/// the runtime, so the caller is back-pressured by the bound. A slot is held
/// by the unit's task and released when the task ends, whether the unit
/// returned or panicked.
#[derive(Debug)]
pub struct RateLimitedPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    tasks: JoinSet<()>,
}

impl RateLimitedPool {
    /// Capacity is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            tasks: JoinSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    pub async fn spawn<F>(&mut self, unit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                // The semaphore is never closed, but the unit must still run.
                warn!("Admission semaphore unavailable, running unit unbounded: {}", e);
                None
            }
        };

        self.tasks.spawn(async move {
            let _permit = permit;
            unit.await;
        });

        while let Some(finished) = self.tasks.try_join_next() {
            log_join_result(finished);
        }
    }

    /// Wait for every spawned unit to finish.
    pub async fn join(mut self) {
        while let Some(finished) = self.tasks.join_next().await {
            log_join_result(finished);
        }
    }
}

fn log_join_result(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        error!("Work unit did not complete: {}", e);
    }
}
