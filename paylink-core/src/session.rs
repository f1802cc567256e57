//! Stale-result suppression
//!
//! A view starts a new generation for every request it issues. Results of
//! requests from an older generation are dropped instead of overwriting
//! newer state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Generation counter shared by one view
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

/// Ticket for one request
#[derive(Debug, Clone)]
pub struct GenerationToken {
    id: u64,
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; earlier tokens become stale
    pub fn begin(&self) -> GenerationToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Make every outstanding token stale, e.g. when the view closes
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

impl GenerationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }

    /// Await `fut`; `None` if a newer generation started meanwhile
    pub async fn complete<F: Future>(self, fut: F) -> Option<F::Output> {
        let output = fut.await;
        if self.is_current() {
            Some(output)
        } else {
            debug!(generation = self.id, "Discarding stale result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_latest_request_wins() {
        let generation = Generation::new();
        let (slow_tx, slow_rx) = oneshot::channel::<&str>();

        let first = generation.begin();
        let slow = tokio::spawn(first.complete(async move { slow_rx.await.unwrap_or("dropped") }));

        let second = generation.begin();
        let fast = second.complete(async { "fresh" }).await;
        assert_eq!(fast, Some("fresh"));

        slow_tx.send("stale").unwrap();
        assert_eq!(slow.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_drops_everything() {
        let generation = Generation::new();
        let token = generation.begin();
        assert!(token.is_current());
        generation.invalidate();
        assert!(!token.is_current());
        assert_eq!(token.complete(async { 1 }).await, None);
    }
}
