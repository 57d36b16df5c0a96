//! Live pause/resume of running jobs.
//!
//! Each job owns a `watch` channel holding its [`PauseState`]. Work units
//! park on [`PauseController::wait_until_running`] before they start a probe
//! and are woken as soon as the job is resumed; nothing polls.

use crate::job::JobId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseState {
    #[default]
    Running,
    Paused,
}

impl PauseState {
    pub fn is_paused(self) -> bool {
        self == PauseState::Paused
    }
}

impl fmt::Display for PauseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PauseState::Running => "running",
            PauseState::Paused => "paused",
        })
    }
}

impl FromStr for PauseState {
    type Err = String;

    /// Accepts both state names and the interactive verbs `pause`/`resume`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" | "resume" => Ok(PauseState::Running),
            "paused" | "pause" => Ok(PauseState::Paused),
            other => Err(format!("Unknown pause state '{}'", other)),
        }
    }
}

#[derive(Debug, Default)]
pub struct PauseController {
    states: Mutex<HashMap<JobId, watch::Sender<PauseState>>>,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a job known as running
    pub fn register(&self, job_id: JobId) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .entry(job_id)
            .or_insert_with(|| watch::channel(PauseState::Running).0)
            .send_replace(PauseState::Running);
    }

    /// Set the pause state of a job. Idempotent.
    ///
    /// Jobs that were never registered, or have already been forgotten, are
    /// left untouched so finished jobs do not leave entries behind.
    pub fn set(&self, job_id: JobId, state: PauseState) {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = states.get(&job_id) else {
            debug!(job_id = %job_id, "Ignoring pause state for untracked job");
            return;
        };

        let previous = sender.send_replace(state);
        if previous != state {
            info!(job_id = %job_id, "Job is now {}", state);
        }
    }

    /// Current state; jobs without an entry read as running.
    pub fn get(&self, job_id: JobId) -> PauseState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map_or(PauseState::Running, |sender| *sender.borrow())
    }

    /// Resolve once `job_id` is running. Returns at once if it already is.
    pub async fn wait_until_running(&self, job_id: JobId) {
        let receiver = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map(watch::Sender::subscribe);

        let Some(mut receiver) = receiver else {
            return;
        };

        if receiver.borrow().is_paused() {
            debug!(job_id = %job_id, "Work unit waiting for resume");
        }

        // An error means the entry was forgotten, which only happens once the
        // job is finished; let the unit through.
        let _ = receiver.wait_for(|state| !state.is_paused()).await;
    }

    /// Number of jobs with a live pause entry
    pub fn tracked_jobs(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop the entry of a finished job
    pub fn forget(&self, job_id: JobId) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }
}
