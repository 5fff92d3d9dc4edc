//! Progress hooks for batch runs.

use super::batch::{BatchError, BatchReport, Combination, ComboOutcome};
use tracing::{info, warn};

/// Callbacks fired by [`BatchDriver::run`](super::BatchDriver::run).
pub trait BatchProgress {
    /// Symbols have been selected for an exchange.
    fn on_exchange(&self, exchange: &str, symbols: usize, combinations: usize);

    /// A combination is about to be fetched. `index` is zero-based within the exchange.
    fn on_start(&self, combination: &Combination, index: usize, total: usize);

    fn on_complete(&self, combination: &Combination, result: &Result<ComboOutcome, BatchError>);

    fn on_batch_complete(&self, report: &BatchReport);
}

/// Reports progress through `tracing`.
pub struct TracingProgress;

impl BatchProgress for TracingProgress {
    fn on_exchange(&self, exchange: &str, symbols: usize, combinations: usize) {
        info!(exchange, symbols, combinations, "starting exchange");
    }

    fn on_start(&self, combination: &Combination, index: usize, total: usize) {
        info!("[{}/{}] {}", index + 1, total, combination.tag());
    }

    fn on_complete(&self, combination: &Combination, result: &Result<ComboOutcome, BatchError>) {
        match result {
            Ok(ComboOutcome::Saved { path, bars }) => {
                info!(tag = %combination.tag(), bars, path = %path.display(), "saved");
            }
            Ok(ComboOutcome::Empty) => info!(tag = %combination.tag(), "no bars for day"),
            Err(e) => warn!(tag = %combination.tag(), error = %e, "failed"),
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        info!(
            attempted = report.attempted,
            saved = report.saved,
            empty = report.empty,
            failed = report.failures.len(),
            "batch complete"
        );
    }
}

/// Ignores every event.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn on_exchange(&self, _exchange: &str, _symbols: usize, _combinations: usize) {}
    fn on_start(&self, _combination: &Combination, _index: usize, _total: usize) {}
    fn on_complete(&self, _combination: &Combination, _result: &Result<ComboOutcome, BatchError>) {}
    fn on_batch_complete(&self, _report: &BatchReport) {}
}
