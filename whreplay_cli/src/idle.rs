//! Idle detection from terminal input
//!
//! Polling pauses after a window without key presses or mouse movement and
//! resumes on the next input.

use std::time::{Duration, Instant};

/// Whether the user is considered present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Active,
    Idle,
}

impl Activity {
    pub fn is_idle(&self) -> bool {
        matches!(self, Activity::Idle)
    }

    /// Notification shown on entering this state
    pub fn transition_message(&self) -> &'static str {
        match self {
            Activity::Idle => "You are now idle, requests will stop automatically updating",
            Activity::Active => "You are no longer idle, requests will automatically update",
        }
    }
}

/// Two-state idle machine driven by input timestamps
#[derive(Debug, Clone)]
pub struct IdleTracker {
    timeout: Duration,
    last_input: Instant,
    activity: Activity,
}

impl IdleTracker {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_input: now,
            activity: Activity::Active,
        }
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Record an input event. Returns the new state if it changed.
    pub fn record_input(&mut self, now: Instant) -> Option<Activity> {
        self.last_input = now;
        if self.activity.is_idle() {
            self.activity = Activity::Active;
            Some(Activity::Active)
        } else {
            None
        }
    }

    /// Check the inactivity window. Returns the new state if it changed.
    pub fn check(&mut self, now: Instant) -> Option<Activity> {
        let expired = now.saturating_duration_since(self.last_input) >= self.timeout;
        if expired && !self.activity.is_idle() {
            self.activity = Activity::Idle;
            Some(Activity::Idle)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whreplay_common::constants::IDLE_TIMEOUT;

    #[test]
    fn test_goes_idle_after_window() {
        let start = Instant::now();
        let mut tracker = IdleTracker::new(IDLE_TIMEOUT, start);

        assert_eq!(tracker.check(start + Duration::from_secs(299)), None);
        assert_eq!(tracker.activity(), Activity::Active);

        assert_eq!(tracker.check(start + IDLE_TIMEOUT), Some(Activity::Idle));
        assert!(tracker.activity().is_idle());

        // Only reported once
        assert_eq!(tracker.check(start + IDLE_TIMEOUT * 2), None);
    }

    #[test]
    fn test_input_postpones_idle() {
        let start = Instant::now();
        let mut tracker = IdleTracker::new(IDLE_TIMEOUT, start);

        assert_eq!(tracker.record_input(start + Duration::from_secs(200)), None);
        assert_eq!(tracker.check(start + Duration::from_secs(400)), None);
        assert_eq!(
            tracker.check(start + Duration::from_secs(500)),
            Some(Activity::Idle)
        );
    }

    #[test]
    fn test_input_restores_active() {
        let start = Instant::now();
        let mut tracker = IdleTracker::new(Duration::from_secs(1), start);
        tracker.check(start + Duration::from_secs(2));

        assert_eq!(
            tracker.record_input(start + Duration::from_secs(3)),
            Some(Activity::Active)
        );
        assert_eq!(tracker.record_input(start + Duration::from_secs(3)), None);
        assert_eq!(tracker.check(start + Duration::from_millis(3500)), None);
    }
}
