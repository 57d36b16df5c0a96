//! Job execution engine for batch reconnaissance.
//!
//! A [`JobEngine`] takes a batch of targets, probes them through a bounded
//! [`RateLimitedPool`], honours live pause/resume from the [`PauseController`],
//! streams progress over the [`ProgressBus`] and leaves the ordered results in
//! the [`ResultStore`].

pub mod aggregate;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod job;
pub mod pause;
pub mod pool;
pub mod store;
pub mod targets;

pub use bus::{ProgressBus, ProgressEvent, Subscription, SubscriptionHandle};
pub use config::JobConfig;
pub use engine::{JobEngine, JobHandle};
pub use error::EngineError;
pub use job::JobId;
pub use pause::{PauseController, PauseState};
pub use pool::RateLimitedPool;
pub use store::ResultStore;
