//! Job submission and execution.
//!
//! A job probes every one of its targets exactly once. Units are admitted
//! through a [`RateLimitedPool`] sized from the job's configuration, wait out
//! any pause before they start, and report back under a job-scoped lock so
//! the processed counter and the published percentage only ever go up.
//! When the last unit is done the results are ordered, stored and sent as
//! the single terminal event.

use crate::aggregate::{order_results, progress_percent};
use crate::bus::{ProgressBus, ProgressEvent, Subscription, SubscriptionHandle};
use crate::config::JobConfig;
use crate::error::{EngineError, Result};
use crate::job::JobId;
use crate::pause::{PauseController, PauseState};
use crate::pool::RateLimitedPool;
use crate::store::ResultStore;
use futures::FutureExt;
use sonar_scanner::{Probe, TargetKind, TargetResult};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Handle to a submitted job
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    task: JoinHandle<Vec<TargetResult>>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job and return its ordered results
    pub async fn join(self) -> Result<Vec<TargetResult>> {
        self.task
            .await
            .map_err(|e| EngineError::JobFailed(self.id.to_string(), e.to_string()))
    }
}

pub struct JobEngine {
    probe: Arc<dyn Probe>,
    bus: Arc<ProgressBus>,
    pauses: Arc<PauseController>,
    store: Arc<ResultStore>,
}

impl JobEngine {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self::with_registries(
            probe,
            Arc::new(ProgressBus::new()),
            Arc::new(PauseController::new()),
            Arc::new(ResultStore::new()),
        )
    }

    /// Share the bus, pause and result registries with other components
    pub fn with_registries(
        probe: Arc<dyn Probe>,
        bus: Arc<ProgressBus>,
        pauses: Arc<PauseController>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            probe,
            bus,
            pauses,
            store,
        }
    }

    pub fn bus(&self) -> &Arc<ProgressBus> {
        &self.bus
    }

    pub fn pauses(&self) -> &Arc<PauseController> {
        &self.pauses
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Start a job and return its id without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, targets: Vec<String>, config: JobConfig) -> Result<JobId> {
        self.submit_job(targets, config).map(|handle| handle.id())
    }

    /// Like [`submit`](Self::submit), keeping a handle to await the job.
    pub fn submit_job(&self, targets: Vec<String>, config: JobConfig) -> Result<JobHandle> {
        if targets.is_empty() {
            return Err(EngineError::InvalidInput("No targets provided".to_string()));
        }

        let id = JobId::new();
        self.pauses.register(id);

        info!(
            job_id = %id,
            targets = targets.len(),
            capacity = config.capacity(),
            deep_crawl = config.deep_crawl,
            port_scan = config.port_scan,
            "Job submitted"
        );

        let run = JobRun {
            id,
            probe: Arc::clone(&self.probe),
            bus: Arc::clone(&self.bus),
            pauses: Arc::clone(&self.pauses),
            store: Arc::clone(&self.store),
        };
        let task = tokio::spawn(run.execute(targets, config));

        Ok(JobHandle { id, task })
    }

    pub fn set_pause_state(&self, job_id: JobId, state: PauseState) {
        self.pauses.set(job_id, state);
    }

    pub fn pause_state(&self, job_id: JobId) -> PauseState {
        self.pauses.get(job_id)
    }

    /// Results of a completed job, or `None` while it is unknown or running
    pub fn fetch_results(&self, job_id: JobId) -> Option<Vec<TargetResult>> {
        self.store.fetch(job_id)
    }

    pub fn subscribe(&self, job_id: JobId) -> Subscription {
        self.bus.subscribe(job_id)
    }

    pub fn unsubscribe(&self, job_id: JobId, handle: SubscriptionHandle) -> bool {
        self.bus.unsubscribe(job_id, handle)
    }
}

/// Counter and collected results, updated together
struct JobProgress {
    processed: usize,
    results: Vec<TargetResult>,
}

struct JobRun {
    id: JobId,
    probe: Arc<dyn Probe>,
    bus: Arc<ProgressBus>,
    pauses: Arc<PauseController>,
    store: Arc<ResultStore>,
}

impl JobRun {
    async fn execute(self, targets: Vec<String>, config: JobConfig) -> Vec<TargetResult> {
        let total = targets.len();
        let options = config.probe_options();
        let verb = match config.kind {
            TargetKind::Subdomain => "Scanning",
            TargetKind::Url => "Analyzing",
        };

        let progress = Arc::new(Mutex::new(JobProgress {
            processed: 0,
            results: Vec::with_capacity(total),
        }));
        let mut pool = RateLimitedPool::new(config.capacity());

        for target in targets {
            let id = self.id;
            let probe = Arc::clone(&self.probe);
            let bus = Arc::clone(&self.bus);
            let pauses = Arc::clone(&self.pauses);
            let progress = Arc::clone(&progress);

            pool.spawn(async move {
                pauses.wait_until_running(id).await;

                let result = match AssertUnwindSafe(probe.probe(&target, options))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        error!(job_id = %id, target = %target, "Probe panicked");
                        TargetResult::unreachable(&target, "probe panicked")
                    }
                };
                debug!(job_id = %id, target = %target, reachable = result.reachable, "Target processed");

                let mut state = progress.lock().await;
                state.processed += 1;
                state.results.push(result);

                let event = ProgressEvent::progress(
                    id,
                    progress_percent(state.processed, total),
                    format!("{} {}/{}: {}", verb, state.processed, total, target),
                );
                bus.publish(id, &event);
            })
            .await;
        }

        pool.join().await;

        let mut results = std::mem::take(&mut progress.lock().await.results);
        order_results(&mut results);

        self.store.store(self.id, results.clone());
        self.pauses.forget(self.id);
        self.bus
            .publish(self.id, &ProgressEvent::terminal(self.id, results.clone()));

        info!(
            job_id = %self.id,
            total = results.len(),
            reachable = results.iter().filter(|r| r.reachable).count(),
            "Job complete"
        );
        results
    }
}
