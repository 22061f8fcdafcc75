use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Capacity of the block-event fan-out buffer. Block events are rare (one
/// per intercepted launch), so a small buffer is plenty.
pub(crate) const EVENT_BUFFER: usize = 64;

/// One intercepted launch of a blocked application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEvent {
    /// Package identifier of the application that was blocked.
    pub package: String,
}

/// The OS-level mechanism that actually prevents blocked applications from
/// running and reports each block it performs.
///
/// This crate never implements the interception itself; it pushes the full
/// blocked set down and listens for the events coming back. Hosts without a
/// working mechanism supply [`NoopEnforcement`].
#[async_trait]
pub trait EnforcementChannel: Send + Sync {
    /// Replace the enforced set with `blocked`, wholesale. Implementations
    /// must treat every push as the complete new set, not a delta.
    async fn push(&self, blocked: &[String]) -> Result<()>;

    /// Subscribe to block events. Each call returns an independent receiver;
    /// consumers enforce their own single-listener discipline.
    fn subscribe(&self) -> broadcast::Receiver<BlockEvent>;
}

/// Enforcement channel for hosts that cannot block anything.
///
/// Pushes succeed without doing anything and the subscription never yields,
/// so the rest of the system runs unchanged on unsupported platforms.
pub struct NoopEnforcement {
    events: broadcast::Sender<BlockEvent>,
}

impl NoopEnforcement {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { events }
    }
}

impl Default for NoopEnforcement {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnforcementChannel for NoopEnforcement {
    async fn push(&self, blocked: &[String]) -> Result<()> {
        tracing::debug!(
            "No enforcement mechanism on this host; dropping push of {} package(s)",
            blocked.len()
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BlockEvent> {
        self.events.subscribe()
    }
}
