//! Global pacing of repository checks.
//!
//! The hosting platform's rate-limit budget is shared by every worker, so
//! pacing is a property of the scan rather than of the iteration loop. A
//! [`Pacer`] hands out start slots at least `interval` apart: the first caller
//! proceeds immediately, each later caller waits until `interval` has passed
//! since the previous slot. Nothing waits after the last repository.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Intervals longer than this are capped so slot arithmetic cannot overflow.
pub const MAX_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Spaces out the start of consecutive repository checks.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.min(MAX_INTERVAL),
            next_slot: Mutex::new(None),
        }
    }

    /// Minimum spacing between slots.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next start slot.
    ///
    /// Callers are served in the order they arrive (the inner lock is fair).
    /// Dropping the future before it completes gives the slot up.
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            if at > Instant::now() {
                trace!(wait_ms = (at - Instant::now()).as_millis() as u64, "pacing");
                tokio::time::sleep_until(at).await;
            }
        }
        let now = Instant::now();
        *next_slot = Some(now.checked_add(self.interval).unwrap_or(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn huge_interval_is_capped_instead_of_overflowing() {
        let pacer = Pacer::new(Duration::from_secs(u64::MAX));
        assert_eq!(pacer.interval(), MAX_INTERVAL);

        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        assert_eq!(Instant::now() - start, MAX_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn first_slot_is_immediate() {
        let pacer = Pacer::new(Duration::from_secs(3));
        let start = Instant::now();
        pacer.acquire().await;
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_slots_are_spaced_by_interval() {
        let pacer = Pacer::new(Duration::from_secs(3));
        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        pacer.acquire().await;
        assert_eq!(Instant::now() - start, Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_counts_towards_the_interval() {
        let pacer = Pacer::new(Duration::from_secs(3));
        let start = Instant::now();
        pacer.acquire().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        pacer.acquire().await;
        assert_eq!(Instant::now() - start, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_waits() {
        let pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.acquire().await;
        }
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }
}
