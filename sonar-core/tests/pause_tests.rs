// Tests for pause state and the admission pool

use sonar_core::{JobId, PauseController, PauseState, RateLimitedPool};
use tokio::sync::Semaphore;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[test]
fn test_pause_state_round_trip_and_idempotence() {
    let pauses = PauseController::new();
    let job_id = JobId::new();
    pauses.register(job_id);

    assert_eq!(pauses.get(job_id), PauseState::Running);
    pauses.set(job_id, PauseState::Paused);
    pauses.set(job_id, PauseState::Paused);
    assert_eq!(pauses.get(job_id), PauseState::Paused);
    pauses.set(job_id, PauseState::Running);
    assert_eq!(pauses.get(job_id), PauseState::Running);
}

#[test]
fn test_forgotten_job_reads_running() {
    let pauses = PauseController::new();
    let job_id = JobId::new();
    pauses.register(job_id);
    pauses.set(job_id, PauseState::Paused);
    pauses.forget(job_id);

    assert_eq!(pauses.get(job_id), PauseState::Running);
    assert_eq!(pauses.tracked_jobs(), 0);
}

#[test]
fn test_set_on_untracked_job_keeps_no_entry() {
    let pauses = PauseController::new();
    let finished = JobId::new();
    pauses.register(finished);
    pauses.forget(finished);

    pauses.set(finished, PauseState::Paused);
    pauses.set(JobId::new(), PauseState::Paused);
    pauses.set(JobId::new(), PauseState::Running);

    assert_eq!(pauses.tracked_jobs(), 0);
    assert_eq!(pauses.get(finished), PauseState::Running);
}

#[test]
fn test_parse_pause_commands() {
    assert_eq!("pause".parse::<PauseState>(), Ok(PauseState::Paused));
    assert_eq!(" Resume ".parse::<PauseState>(), Ok(PauseState::Running));
    assert_eq!("paused".parse::<PauseState>(), Ok(PauseState::Paused));
    assert!("stop".parse::<PauseState>().is_err());
    assert_eq!(PauseState::Paused.to_string(), "paused");
}

#[tokio::test]
async fn test_wait_returns_immediately_when_running() {
    let pauses = PauseController::new();
    let job_id = JobId::new();
    pauses.register(job_id);

    tokio::time::timeout(Duration::from_millis(100), pauses.wait_until_running(job_id))
        .await
        .expect("running job must not block");
    // Unknown jobs never block either
    tokio::time::timeout(
        Duration::from_millis(100),
        pauses.wait_until_running(JobId::new()),
    )
    .await
    .expect("unknown job must not block");
}

#[tokio::test]
async fn test_resume_wakes_waiters() {
    let pauses = Arc::new(PauseController::new());
    let job_id = JobId::new();
    pauses.register(job_id);
    pauses.set(job_id, PauseState::Paused);

    let waiter = {
        let pauses = Arc::clone(&pauses);
        tokio::spawn(async move { pauses.wait_until_running(job_id).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!waiter.is_finished());

    pauses.set(job_id, PauseState::Running);
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should wake on resume")
        .unwrap();
}

#[tokio::test]
async fn test_pool_runs_every_unit_within_capacity() {
    let mut pool = RateLimitedPool::new(2);
    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    for _ in 0..8 {
        let current = Arc::clone(&current);
        let max_seen = Arc::clone(&max_seen);
        let done = Arc::clone(&done);
        pool.spawn(async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        assert!(pool.in_flight() <= 2);
    }
    pool.join().await;

    assert_eq!(done.load(Ordering::SeqCst), 8);
    assert_eq!(max_seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pool_releases_slot_after_panic() {
    let mut pool = RateLimitedPool::new(1);
    let done = Arc::new(AtomicUsize::new(0));

    pool.spawn(async {
        panic!("unit failed");
    })
    .await;
    let counter = Arc::clone(&done);
    pool.spawn(async move {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .await;
    pool.join().await;

    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_capacity_is_raised_to_one() {
    assert_eq!(RateLimitedPool::new(0).capacity(), 1);
}

#[test]
fn test_oversized_capacity_is_clamped() {
    assert_eq!(
        RateLimitedPool::new(usize::MAX).capacity(),
        Semaphore::MAX_PERMITS
    );
    assert_eq!(
        RateLimitedPool::new(Semaphore::MAX_PERMITS).capacity(),
        Semaphore::MAX_PERMITS
    );
}
