use std::time::{Duration, Instant};

/// How long a session stays active after the last interaction.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// In-memory session activity tracker, one per running host process.
///
/// Nothing here is persisted: a fresh process always starts inactive. The
/// host delivers two lifecycle signals — user interaction (`track_activity`)
/// and the process moving to the background (`mark_backgrounded`), which
/// ends the session immediately regardless of the timeout.
#[derive(Debug, Default)]
pub struct SessionTracker {
    last_activity: Option<Instant>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record user interaction now.
    pub fn track_activity(&mut self) {
        self.last_activity = Some(Instant::now());
    }

    /// Host moved to the background; the session ends immediately.
    pub fn mark_backgrounded(&mut self) {
        self.last_activity = None;
    }

    /// True while the last interaction is within the timeout window.
    pub fn is_session_active(&self) -> bool {
        match self.last_activity {
            Some(last) => last.elapsed() < SESSION_TIMEOUT,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_is_inactive() {
        assert!(!SessionTracker::new().is_session_active());
    }

    #[test]
    fn active_immediately_after_activity() {
        let mut tracker = SessionTracker::new();
        tracker.track_activity();
        assert!(tracker.is_session_active());
    }

    #[test]
    fn expires_after_timeout() {
        let mut tracker = SessionTracker::new();

        // Rewind the stamp instead of sleeping five minutes.
        tracker.last_activity = Instant::now().checked_sub(SESSION_TIMEOUT + Duration::from_secs(1));
        assert!(tracker.last_activity.is_some());
        assert!(!tracker.is_session_active());

        // Just inside the window it is still active.
        tracker.last_activity = Instant::now().checked_sub(SESSION_TIMEOUT - Duration::from_secs(1));
        assert!(tracker.is_session_active());
    }

    #[test]
    fn backgrounding_ends_session_immediately() {
        let mut tracker = SessionTracker::new();
        tracker.track_activity();
        assert!(tracker.is_session_active());

        tracker.mark_backgrounded();
        assert!(!tracker.is_session_active());
    }

    #[test]
    fn activity_after_background_reactivates() {
        let mut tracker = SessionTracker::new();
        tracker.track_activity();
        tracker.mark_backgrounded();
        tracker.track_activity();
        assert!(tracker.is_session_active());
    }
}
