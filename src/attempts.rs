use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::KeyValueStore;

/// Consecutive failures after which the lockout flag is raised.
pub const LOCKOUT_THRESHOLD: u32 = 5;

pub(crate) const FAILED_ATTEMPTS_KEY: &str = "failed_attempts";

/// Snapshot of the failed-attempt state.
///
/// `locked` is derived from the count and carries no expiry: it stays raised
/// until a successful verification or a password change resets the counter.
/// It is informational — verification itself is never gated on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttemptSnapshot {
    pub count: u32,
    pub locked: bool,
}

impl AttemptSnapshot {
    fn from_count(count: u32) -> Self {
        Self {
            count,
            locked: count >= LOCKOUT_THRESHOLD,
        }
    }
}

/// Persisted counter of consecutive failed password verifications.
#[derive(Clone)]
pub struct AttemptTracker {
    store: Arc<dyn KeyValueStore>,
}

impl AttemptTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn load_count(&self) -> Result<u32> {
        match self.store.get(FAILED_ATTEMPTS_KEY).await? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).context("Failed to parse failed-attempt count")
            }
            None => Ok(0),
        }
    }

    async fn store_count(&self, count: u32) -> Result<()> {
        let bytes = serde_json::to_vec(&count).context("Failed to serialize attempt count")?;
        self.store.set(FAILED_ATTEMPTS_KEY, &bytes).await
    }

    /// Record a verification result. Success resets the counter; failure
    /// increments it. The new state is persisted before returning.
    pub async fn record(&self, success: bool) -> Result<AttemptSnapshot> {
        let count = if success { 0 } else { self.load_count().await? + 1 };
        self.store_count(count).await?;
        Ok(AttemptSnapshot::from_count(count))
    }

    /// Read-only snapshot; never mutates.
    pub async fn current(&self) -> Result<AttemptSnapshot> {
        Ok(AttemptSnapshot::from_count(self.load_count().await?))
    }

    /// Reset the counter, as on a successful password set or change.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove_many(&[FAILED_ATTEMPTS_KEY]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;

    fn tracker() -> AttemptTracker {
        AttemptTracker::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn starts_unlocked_at_zero() {
        let snapshot = tracker().current().await.unwrap();
        assert_eq!(snapshot, AttemptSnapshot { count: 0, locked: false });
    }

    #[tokio::test]
    async fn locks_at_threshold_and_stays_locked() {
        let tracker = tracker();

        for expected in 1..LOCKOUT_THRESHOLD {
            let snapshot = tracker.record(false).await.unwrap();
            assert_eq!(snapshot.count, expected);
            assert!(!snapshot.locked);
        }

        let snapshot = tracker.record(false).await.unwrap();
        assert_eq!(snapshot.count, 5);
        assert!(snapshot.locked);

        // A sixth failure keeps counting past the threshold.
        let snapshot = tracker.record(false).await.unwrap();
        assert_eq!(snapshot.count, 6);
        assert!(snapshot.locked);
    }

    #[tokio::test]
    async fn success_resets_even_when_locked() {
        let tracker = tracker();

        for _ in 0..6 {
            tracker.record(false).await.unwrap();
        }
        assert!(tracker.current().await.unwrap().locked);

        let snapshot = tracker.record(true).await.unwrap();
        assert_eq!(snapshot, AttemptSnapshot { count: 0, locked: false });
        assert_eq!(tracker.current().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn clear_resets_counter() {
        let tracker = tracker();

        tracker.record(false).await.unwrap();
        tracker.record(false).await.unwrap();
        tracker.clear().await.unwrap();

        assert_eq!(tracker.current().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn current_does_not_mutate() {
        let tracker = tracker();

        tracker.record(false).await.unwrap();
        tracker.current().await.unwrap();
        tracker.current().await.unwrap();

        assert_eq!(tracker.current().await.unwrap().count, 1);
    }
}
