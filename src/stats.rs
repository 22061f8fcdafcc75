use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::enforcement::{BlockEvent, EnforcementChannel};
use crate::error::CoreResult;
use crate::store::KeyValueStore;

/// Minutes credited per intercepted launch.
pub const MINUTES_SAVED_PER_BLOCK: u64 = 5;

pub(crate) const DASHBOARD_STATS_KEY: &str = "dashboard_stats";

/// Accumulated dashboard statistics. Counters only grow between resets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DashboardStats {
    pub total_blocks: u64,
    pub time_saved_minutes: u64,
    pub last_reset: DateTime<Utc>,
}

impl DashboardStats {
    fn fresh() -> Self {
        Self {
            total_blocks: 0,
            time_saved_minutes: 0,
            last_reset: Utc::now(),
        }
    }
}

struct Listener {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Consumes block events from the enforcement channel and folds them into
/// the persisted [`DashboardStats`].
///
/// At most one listener is ever active: [`start`](Self::start) stops any
/// prior subscription before installing the new one, and
/// [`stop`](Self::stop) is safe to call when nothing is subscribed. The
/// single-subscriber discipline is what makes the per-event
/// read-modify-write safe without further locking.
pub struct BlockEventAggregator {
    store: Arc<dyn KeyValueStore>,
    channel: Arc<dyn EnforcementChannel>,
    listener: Option<Listener>,
}

impl BlockEventAggregator {
    pub fn new(store: Arc<dyn KeyValueStore>, channel: Arc<dyn EnforcementChannel>) -> Self {
        Self {
            store,
            channel,
            listener: None,
        }
    }

    /// Subscribe to the channel and start folding events into the stats.
    /// Re-subscribing first tears down the previous listener, so an event
    /// is never counted twice.
    pub async fn start(&mut self) {
        self.stop().await;

        let mut events = self.channel.subscribe();
        let store = self.store.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    received = events.recv() => match received {
                        Ok(event) => {
                            // The write completes before the next shutdown
                            // check, so stopping never aborts a persist.
                            if let Err(e) = record_block(store.as_ref(), &event).await {
                                tracing::error!(
                                    "Failed to record block of {}: {e:#}",
                                    event.package
                                );
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!("Fell behind; {missed} block event(s) not counted");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        self.listener = Some(Listener {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Release the listener and wait for it to finish. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            let _ = listener.shutdown.send(());
            let _ = listener.task.await;
        }
    }

    /// Current statistics; a zeroed document when nothing was persisted.
    pub async fn snapshot(&self) -> CoreResult<DashboardStats> {
        Ok(load_stats(self.store.as_ref()).await?)
    }

    /// Zero the counters and stamp a new reset time.
    pub async fn reset(&self) -> CoreResult<DashboardStats> {
        let stats = DashboardStats::fresh();
        store_stats(self.store.as_ref(), &stats).await?;
        Ok(stats)
    }
}

async fn load_stats(store: &dyn KeyValueStore) -> Result<DashboardStats> {
    match store.get(DASHBOARD_STATS_KEY).await? {
        Some(bytes) => {
            serde_json::from_slice(&bytes).context("Failed to parse dashboard statistics")
        }
        None => Ok(DashboardStats::fresh()),
    }
}

async fn store_stats(store: &dyn KeyValueStore, stats: &DashboardStats) -> Result<()> {
    let bytes = serde_json::to_vec(stats).context("Failed to serialize dashboard statistics")?;
    store.set(DASHBOARD_STATS_KEY, &bytes).await
}

async fn record_block(store: &dyn KeyValueStore, event: &BlockEvent) -> Result<()> {
    let mut stats = load_stats(store).await?;
    stats.total_blocks += 1;
    stats.time_saved_minutes += MINUTES_SAVED_PER_BLOCK;
    store_stats(store, &stats).await?;

    tracing::debug!(
        "Blocked {} ({} total, {} minutes saved)",
        event.package,
        stats.total_blocks,
        stats.time_saved_minutes
    );
    Ok(())
}
