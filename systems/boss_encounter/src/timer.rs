//! Deadline-based countdowns used by the boss encounter.

use arena_waves_core::{TimerSnapshot, Timestamp};

/// Countdown stored as an absolute deadline so reads never drift.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerState {
    label: String,
    total_duration: Option<f64>,
    deadline: Option<Timestamp>,
}

/// Partial update for a [`TimerState`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimerPatch {
    /// Replacement label; blank labels are ignored.
    pub label: Option<String>,
    /// Full countdown length in seconds.
    pub total: Option<f64>,
    /// Seconds left, converted to a deadline on merge.
    pub remaining: Option<f64>,
    /// Absolute deadline; wins over `remaining` within one patch.
    pub deadline: Option<Timestamp>,
}

impl TimerState {
    /// Creates a stopped timer carrying `label`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            total_duration: None,
            deadline: None,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Full countdown length in seconds, if known.
    #[must_use]
    pub const fn total_duration(&self) -> Option<f64> {
        self.total_duration
    }

    /// Absolute deadline, if the timer is running.
    #[must_use]
    pub const fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Seconds left at `now`, or `None` when the timer is stopped.
    #[must_use]
    pub fn remaining_at(&self, now: Timestamp) -> Option<f64> {
        self.deadline.map(|deadline| now.seconds_until(deadline))
    }

    /// Merges `patch` into the timer, resolving `remaining` against `now`.
    pub fn apply(&mut self, patch: &TimerPatch, now: Timestamp) {
        if let Some(label) = patch.label.as_deref().map(str::trim) {
            if !label.is_empty() {
                self.label = label.to_owned();
            }
        }
        if let Some(total) = patch.total {
            self.total_duration = Some(total);
        }
        match (patch.deadline, patch.remaining) {
            (Some(deadline), _) => self.deadline = Some(deadline),
            (None, Some(remaining)) => self.deadline = Some(now.after_seconds(remaining)),
            (None, None) => {}
        }
    }

    /// Stops the timer and forgets its duration. The label is kept.
    pub fn clear(&mut self) {
        self.total_duration = None;
        self.deadline = None;
    }

    /// Presentation view resolved at `now`.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> TimerSnapshot {
        TimerSnapshot {
            label: self.label.clone(),
            total_duration: self.total_duration,
            remaining: self.remaining_at(now),
        }
    }
}
