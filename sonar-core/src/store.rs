use crate::job::JobId;
use sonar_scanner::TargetResult;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Final, ordered results of completed jobs
#[derive(Debug, Default)]
pub struct ResultStore {
    results: Mutex<HashMap<JobId, Vec<TargetResult>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the results of `job_id`, replacing any earlier entry.
    pub fn store(&self, job_id: JobId, results: Vec<TargetResult>) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, results);
    }

    /// `None` until the job has completed
    pub fn fetch(&self, job_id: JobId) -> Option<Vec<TargetResult>> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .cloned()
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
