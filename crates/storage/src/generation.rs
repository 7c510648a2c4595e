//! Generation tokens for discarding stale async results
//!
//! UI-driven chains (rapid re-search, re-resolution) can have several
//! requests in flight for the same slot; only the newest one may apply its
//! result. Each request takes a [`Generation`] from a monotonically
//! increasing counter and checks it is still current at completion time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token identifying one request generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// Monotonic counter handing out request generations
///
/// One counter per request slot (search box, media view, ...). Starting a
/// new request supersedes every earlier one.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: AtomicU64,
}

impl GenerationCounter {
    /// Create a counter with no requests issued
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new request, superseding all earlier generations
    pub fn begin(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether a completion for this generation may still be applied
    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == generation.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request_is_current() {
        let counter = GenerationCounter::new();
        let g = counter.begin();
        assert!(counter.is_current(g));
    }

    #[test]
    fn test_superseded_request_is_stale() {
        let counter = GenerationCounter::new();
        let first = counter.begin();
        let second = counter.begin();

        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
    }

    #[test]
    fn test_generations_are_monotonic() {
        let counter = GenerationCounter::new();
        let a = counter.begin();
        let b = counter.begin();
        let c = counter.begin();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_stale_completion_discarded() {
        use std::sync::Arc;
        use std::time::Duration;

        let counter = Arc::new(GenerationCounter::new());
        let slow = counter.begin();

        let slow_task = {
            let counter = counter.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.is_current(slow)
            })
        };

        // A newer request arrives while the first is still in flight
        let fast = counter.begin();
        assert!(counter.is_current(fast));

        // The slow completion must not be applied
        assert!(!slow_task.await.unwrap());
    }
}
