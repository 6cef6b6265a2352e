//! Debounce tickets and the session mount guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Claim on the latest request for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: String,
    generation: u64,
}

impl Ticket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Per-key generation counter. Issuing a ticket supersedes every earlier
/// ticket for the same key.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generations: Mutex<HashMap<String, u64>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn issue(&self, key: &str) -> Ticket {
        let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = generations.entry(key.to_string()).or_insert(0);
        *generation += 1;
        Ticket {
            key: key.to_string(),
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket.key)
            .is_some_and(|g| *g == ticket.generation)
    }

    /// Wait out the window. True when `ticket` is still the latest.
    pub async fn settle(&self, ticket: &Ticket) -> bool {
        tokio::time::sleep(self.delay).await;
        self.is_current(ticket)
    }
}

/// Shared flag telling late lookups whether their session is still open.
#[derive(Debug, Clone)]
pub struct MountGuard(Arc<AtomicBool>);

impl MountGuard {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_ticket_settles() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));
        let first = debouncer.issue("companyName");
        let second = debouncer.issue("companyName");
        let other = debouncer.issue("isin");

        let (a, b, c) = tokio::join!(
            debouncer.settle(&first),
            debouncer.settle(&second),
            debouncer.settle(&other)
        );
        assert!(!a);
        assert!(b);
        assert!(c);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_issued_during_window_supersedes() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));
        let first = debouncer.issue("q");
        let waiter = {
            let debouncer = debouncer.clone();
            let first = first.clone();
            tokio::spawn(async move { debouncer.settle(&first).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = debouncer.issue("q");
        assert!(!waiter.await.unwrap());
        assert!(debouncer.is_current(&second));
        assert_eq!(second.key(), "q");
    }

    #[test]
    fn test_mount_guard_is_shared() {
        let guard = MountGuard::new();
        let clone = guard.clone();
        assert!(clone.is_mounted());
        guard.unmount();
        assert!(!clone.is_mounted());
    }
}
