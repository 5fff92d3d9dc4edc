//! Courtesy delay between consecutive exchange requests.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Spaces requests at least `delay` apart, globally across every exchange.
///
/// Call [`Pacer::wait`] immediately before each request. The first request
/// goes out at once; later ones sleep for whatever is left of the delay since
/// the previous request.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    /// No delay at all (tests, local mocks).
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Block until the next request may go out, then mark it as sent.
    ///
    /// Returns how long the call slept.
    pub fn wait(&self) -> Duration {
        let mut last = self.last_request.lock().unwrap_or_else(PoisonError::into_inner);
        let slept = match *last {
            Some(prev) => {
                let remaining = self.delay.saturating_sub(prev.elapsed());
                if !remaining.is_zero() {
                    std::thread::sleep(remaining);
                }
                remaining
            }
            None => Duration::ZERO,
        };
        *last = Some(Instant::now());
        slept
    }
}
