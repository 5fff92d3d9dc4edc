//! Fetching: request pacing, the per-day pagination core and the batch driver.

pub mod batch;
pub mod day;
pub mod pacer;
pub mod progress;

pub use batch::{
    fetch_and_store, BatchDriver, BatchError, BatchPlan, BatchReport, ComboOutcome, Combination,
    FailureRecord,
};
pub use day::{reconcile, DayFetcher, DEFAULT_MAX_PAGES};
pub use pacer::Pacer;
pub use progress::{BatchProgress, SilentProgress, TracingProgress};
