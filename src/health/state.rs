//! Upstream health state machine.
//!
//! # States
//! - Healthy: upstream is in the healthy set and receives traffic
//! - Unhealthy: upstream excluded from selection
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: consecutive failures >= fails threshold
//! Unhealthy → Healthy: consecutive successes >= passes threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Each probe outcome resets the opposite streak, so at most one streak
//!   is non-zero
//! - Healthy-set membership, not the record, decides whether a transition
//!   is due

use crate::config::HealthCheckConfig;

/// Consecutive-outcome thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub fails: u32,
    pub passes: u32,
}

impl From<&HealthCheckConfig> for Thresholds {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            fails: config.fails,
            passes: config.passes,
        }
    }
}

/// Outcome of folding one probe result into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Promote,
    Demote,
}

/// Per-upstream probe history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthRecord {
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub healthy: bool,
}

impl HealthRecord {
    /// Fold one probe outcome into the record.
    ///
    /// `in_healthy_set` is the upstream's current membership.
    pub fn observe(&mut self, success: bool, in_healthy_set: bool, thresholds: Thresholds) -> Transition {
        if success {
            self.consecutive_failures = 0;
            self.consecutive_successes = self.consecutive_successes.saturating_add(1);
            if self.consecutive_successes >= thresholds.passes && !in_healthy_set {
                self.healthy = true;
                return Transition::Promote;
            }
        } else {
            self.consecutive_successes = 0;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if self.consecutive_failures >= thresholds.fails && in_healthy_set {
                self.healthy = false;
                return Transition::Demote;
            }
        }
        Transition::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Thresholds = Thresholds { fails: 3, passes: 2 };

    #[test]
    fn test_demotion_needs_consecutive_failures() {
        let mut record = HealthRecord { healthy: true, ..Default::default() };

        assert_eq!(record.observe(false, true, T), Transition::Unchanged);
        assert_eq!(record.observe(false, true, T), Transition::Unchanged);
        assert_eq!(record.observe(false, true, T), Transition::Demote);
        assert!(!record.healthy);
        assert_eq!(record.consecutive_failures, 3);
    }

    #[test]
    fn test_success_resets_fail_streak() {
        let mut record = HealthRecord { healthy: true, ..Default::default() };

        record.observe(false, true, T);
        record.observe(false, true, T);
        assert_eq!(record.observe(true, true, T), Transition::Unchanged);
        assert_eq!(record.consecutive_failures, 0);
        assert_eq!(record.consecutive_successes, 1);

        // Needs a full new streak of three.
        assert_eq!(record.observe(false, true, T), Transition::Unchanged);
        assert_eq!(record.observe(false, true, T), Transition::Unchanged);
        assert_eq!(record.observe(false, true, T), Transition::Demote);
    }

    #[test]
    fn test_promotion_needs_consecutive_successes() {
        let mut record = HealthRecord::default();

        assert_eq!(record.observe(true, false, T), Transition::Unchanged);
        assert_eq!(record.observe(false, false, T), Transition::Unchanged);
        assert_eq!(record.consecutive_successes, 0);
        assert_eq!(record.observe(true, false, T), Transition::Unchanged);
        assert_eq!(record.observe(true, false, T), Transition::Promote);
        assert!(record.healthy);
    }

    #[test]
    fn test_no_transition_when_already_in_state() {
        let mut record = HealthRecord::default();
        for _ in 0..5 {
            assert_eq!(record.observe(false, false, T), Transition::Unchanged);
        }

        let mut record = HealthRecord { healthy: true, ..Default::default() };
        for _ in 0..5 {
            assert_eq!(record.observe(true, true, T), Transition::Unchanged);
        }
    }

    #[test]
    fn test_streaks_are_exclusive() {
        let mut record = HealthRecord::default();
        for outcome in [true, false, false, true, false, true, true] {
            record.observe(outcome, false, T);
            assert!(record.consecutive_failures == 0 || record.consecutive_successes == 0);
        }
    }

    #[test]
    fn test_single_pass_threshold() {
        let t = Thresholds { fails: 2, passes: 1 };
        let mut record = HealthRecord { healthy: true, ..Default::default() };

        assert_eq!(record.observe(false, true, t), Transition::Unchanged);
        assert_eq!(record.observe(false, true, t), Transition::Demote);
        assert_eq!(record.observe(true, false, t), Transition::Promote);
    }
}
