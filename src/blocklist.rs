use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use crate::enforcement::EnforcementChannel;
use crate::error::CoreResult;
use crate::store::KeyValueStore;

pub(crate) const BLOCKED_APPS_KEY: &str = "blocked_apps";

/// Starter set offered when the user has not picked anything yet.
pub const DEFAULT_BLOCKED_PACKAGES: &[&str] = &[
    "com.google.android.youtube",
    "com.facebook.katana",
];

/// Result of a block-set mutation. The persisted copy is always the source
/// of truth; `pushed` reports whether the enforcement channel also took the
/// new set. A failed push is surfaced here, not as an error — the set will
/// be pushed again on the next mutation or the next startup resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub pushed: bool,
}

/// Owns the declared blocked-application set.
///
/// All mutations funnel through [`set_blocked`](Self::set_blocked): the new
/// full set is persisted and then pushed wholesale to the enforcement
/// channel, never as a diff. An internal mutex serializes mutations so a
/// later call cannot be clobbered by an earlier one still in flight.
pub struct BlockSetSynchronizer {
    store: Arc<dyn KeyValueStore>,
    channel: Arc<dyn EnforcementChannel>,
    write_lock: Mutex<()>,
}

impl BlockSetSynchronizer {
    pub fn new(store: Arc<dyn KeyValueStore>, channel: Arc<dyn EnforcementChannel>) -> Self {
        Self {
            store,
            channel,
            write_lock: Mutex::new(()),
        }
    }

    /// Current persisted set, in insertion order. Empty when never set.
    pub async fn blocked(&self) -> CoreResult<Vec<String>> {
        match self.store.get(BLOCKED_APPS_KEY).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)
                .context("Failed to parse blocked-application set")?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the blocked set wholesale: persist, then push the full set.
    pub async fn set_blocked(&self, apps: Vec<String>) -> CoreResult<SyncOutcome> {
        let _guard = self.write_lock.lock().await;
        self.replace(apps).await
    }

    /// Toggle one package and feed the computed full set through the same
    /// replace operation every other mutation uses.
    pub async fn toggle(&self, package: &str) -> CoreResult<(Vec<String>, SyncOutcome)> {
        let _guard = self.write_lock.lock().await;

        let mut apps = self.blocked().await?;
        if let Some(pos) = apps.iter().position(|p| p == package) {
            apps.remove(pos);
        } else {
            apps.push(package.to_string());
        }

        let outcome = self.replace(apps.clone()).await?;
        Ok((apps, outcome))
    }

    /// Push the persisted set again without rewriting it. Called on host
    /// startup so a push that failed last session is retried.
    pub async fn resync(&self) -> CoreResult<SyncOutcome> {
        let _guard = self.write_lock.lock().await;
        let apps = self.blocked().await?;
        Ok(self.push(&apps).await)
    }

    async fn replace(&self, apps: Vec<String>) -> CoreResult<SyncOutcome> {
        let apps = dedup_preserving_order(apps);

        let bytes =
            serde_json::to_vec(&apps).context("Failed to serialize blocked-application set")?;
        self.store.set(BLOCKED_APPS_KEY, &bytes).await?;

        Ok(self.push(&apps).await)
    }

    async fn push(&self, apps: &[String]) -> SyncOutcome {
        match self.channel.push(apps).await {
            Ok(()) => SyncOutcome { pushed: true },
            Err(e) => {
                tracing::warn!("Enforcement push failed, persisted set kept: {e:#}");
                SyncOutcome { pushed: false }
            }
        }
    }
}

fn dedup_preserving_order(apps: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    apps.into_iter().filter(|app| seen.insert(app.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::broadcast;

    use crate::enforcement::{BlockEvent, EVENT_BUFFER};
    use crate::store::MemoryKeyValueStore;

    /// Channel that records every push and can be told to fail.
    struct RecordingChannel {
        pushes: std::sync::Mutex<Vec<Vec<String>>>,
        fail: AtomicBool,
        events: broadcast::Sender<BlockEvent>,
    }

    impl RecordingChannel {
        fn new() -> Self {
            let (events, _) = broadcast::channel(EVENT_BUFFER);
            Self {
                pushes: std::sync::Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
                events,
            }
        }

        fn last_push(&self) -> Option<Vec<String>> {
            self.pushes.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl EnforcementChannel for RecordingChannel {
        async fn push(&self, blocked: &[String]) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                bail!("channel unavailable");
            }
            self.pushes.lock().unwrap().push(blocked.to_vec());
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<BlockEvent> {
            self.events.subscribe()
        }
    }

    fn synchronizer() -> (BlockSetSynchronizer, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::new());
        let sync = BlockSetSynchronizer::new(
            Arc::new(MemoryKeyValueStore::new()),
            channel.clone(),
        );
        (sync, channel)
    }

    #[tokio::test]
    async fn empty_until_first_set() {
        let (sync, _) = synchronizer();
        assert!(sync.blocked().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_leaves_no_residue() {
        let (sync, channel) = synchronizer();

        sync.set_blocked(vec!["a".into(), "b".into()]).await.unwrap();
        sync.set_blocked(vec!["b".into()]).await.unwrap();

        assert_eq!(sync.blocked().await.unwrap(), vec!["b".to_string()]);
        assert_eq!(channel.last_push().unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn every_mutation_pushes_the_full_set() {
        let (sync, channel) = synchronizer();

        sync.set_blocked(vec!["a".into()]).await.unwrap();
        sync.set_blocked(vec!["a".into(), "b".into()]).await.unwrap();

        let pushes = channel.pushes.lock().unwrap().clone();
        assert_eq!(
            pushes,
            vec![
                vec!["a".to_string()],
                vec!["a".to_string(), "b".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn duplicates_are_dropped_keeping_first_occurrence() {
        let (sync, _) = synchronizer();

        sync.set_blocked(vec!["a".into(), "b".into(), "a".into()])
            .await
            .unwrap();

        assert_eq!(
            sync.blocked().await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_push_keeps_persisted_intent() {
        let (sync, channel) = synchronizer();
        channel.fail.store(true, Ordering::SeqCst);

        let outcome = sync.set_blocked(vec!["a".into()]).await.unwrap();
        assert!(!outcome.pushed);
        // The user's intent is durable even though the channel never saw it.
        assert_eq!(sync.blocked().await.unwrap(), vec!["a".to_string()]);

        // Recovery on next start: resync pushes the persisted set.
        channel.fail.store(false, Ordering::SeqCst);
        let outcome = sync.resync().await.unwrap();
        assert!(outcome.pushed);
        assert_eq!(channel.last_push().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let (sync, channel) = synchronizer();

        let (apps, _) = sync.toggle("a").await.unwrap();
        assert_eq!(apps, vec!["a".to_string()]);

        let (apps, _) = sync.toggle("b").await.unwrap();
        assert_eq!(apps, vec!["a".to_string(), "b".to_string()]);

        let (apps, _) = sync.toggle("a").await.unwrap();
        assert_eq!(apps, vec!["b".to_string()]);

        assert_eq!(channel.last_push().unwrap(), vec!["b".to_string()]);
        assert_eq!(sync.blocked().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn resync_does_not_rewrite() {
        let (sync, channel) = synchronizer();
        sync.set_blocked(vec!["a".into()]).await.unwrap();

        let before = channel.pushes.lock().unwrap().len();
        sync.resync().await.unwrap();

        assert_eq!(channel.pushes.lock().unwrap().len(), before + 1);
        assert_eq!(sync.blocked().await.unwrap(), vec!["a".to_string()]);
    }
}
