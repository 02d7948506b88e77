use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Exponential delay between failed recovery attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound for the delay
    pub max_delay: Duration,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Delay to wait after `failures` consecutive failed attempts
    pub fn delay_after(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let factor = 2_u32.saturating_pow(failures - 1);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// How the supervisor paces recovery of an unhealthy component.
///
/// The default places no limit and no delay: every pass re-attempts
/// recovery for every unhealthy component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Consecutive failed attempts after which recovery is suspended
    pub max_attempts: Option<u32>,
    /// Delay between failed attempts
    pub backoff: Option<Backoff>,
}

impl RecoveryPolicy {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

/// Decision for one unhealthy observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Call `recover()` now
    Attempt,
    /// Still inside the backoff window
    Wait(Duration),
    /// Attempt limit reached
    GiveUp,
}

/// Per-component recovery bookkeeping kept by the supervisor
#[derive(Debug, Clone, Default)]
pub struct RecoveryTracker {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    total_recoveries: u64,
}

impl RecoveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do about a component that just failed its health check
    pub fn next_action(&self, policy: &RecoveryPolicy, now: Instant) -> RecoveryAction {
        if let Some(max_attempts) = policy.max_attempts {
            if self.consecutive_failures >= max_attempts {
                return RecoveryAction::GiveUp;
            }
        }

        if let (Some(backoff), Some(last_failure)) = (policy.backoff, self.last_failure) {
            let delay = backoff.delay_after(self.consecutive_failures);
            let elapsed = now.saturating_duration_since(last_failure);
            if elapsed < delay {
                return RecoveryAction::Wait(delay - elapsed);
            }
        }

        RecoveryAction::Attempt
    }

    pub fn record_failure(&mut self, component: &str, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(now);
        debug!(
            "Recovery of {} failed ({} consecutive)",
            component, self.consecutive_failures
        );
    }

    pub fn record_success(&mut self, component: &str) {
        if self.consecutive_failures > 0 {
            info!(
                "Component {} recovered after {} failed attempts",
                component, self.consecutive_failures
            );
        }
        self.total_recoveries += 1;
        self.reset();
    }

    /// Forget failures once the component reports healthy on its own
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.last_failure = None;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn total_recoveries(&self) -> u64 {
        self.total_recoveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_always_attempts() {
        let policy = RecoveryPolicy::default();
        let mut tracker = RecoveryTracker::new();
        let now = Instant::now();

        for _ in 0..10 {
            assert_eq!(tracker.next_action(&policy, now), RecoveryAction::Attempt);
            tracker.record_failure("cache", now);
        }
        assert_eq!(tracker.consecutive_failures(), 10);
    }

    #[test]
    fn test_attempt_limit() {
        let policy = RecoveryPolicy::unlimited().with_max_attempts(2);
        let mut tracker = RecoveryTracker::new();
        let now = Instant::now();

        assert_eq!(tracker.next_action(&policy, now), RecoveryAction::Attempt);
        tracker.record_failure("chat", now);
        assert_eq!(tracker.next_action(&policy, now), RecoveryAction::Attempt);
        tracker.record_failure("chat", now);
        assert_eq!(tracker.next_action(&policy, now), RecoveryAction::GiveUp);

        // A healthy observation re-arms recovery
        tracker.reset();
        assert_eq!(tracker.next_action(&policy, now), RecoveryAction::Attempt);
    }

    #[test]
    fn test_backoff_delay_growth() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(backoff.delay_after(0), Duration::ZERO);
        assert_eq!(backoff.delay_after(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_after(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_after(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_after(5), Duration::from_secs(10));
        assert_eq!(backoff.delay_after(64), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_window() {
        let policy = RecoveryPolicy::unlimited().with_backoff(Backoff::new(
            Duration::from_secs(4),
            Duration::from_secs(60),
        ));
        let mut tracker = RecoveryTracker::new();
        let start = Instant::now();

        tracker.record_failure("model", start);
        assert_eq!(
            tracker.next_action(&policy, start + Duration::from_secs(1)),
            RecoveryAction::Wait(Duration::from_secs(3))
        );
        assert_eq!(
            tracker.next_action(&policy, start + Duration::from_secs(4)),
            RecoveryAction::Attempt
        );
    }

    #[test]
    fn test_success_resets_failures() {
        let policy = RecoveryPolicy::unlimited().with_max_attempts(1);
        let mut tracker = RecoveryTracker::new();
        let now = Instant::now();

        tracker.record_failure("cache", now);
        assert_eq!(tracker.next_action(&policy, now), RecoveryAction::GiveUp);

        tracker.record_success("cache");
        assert_eq!(tracker.consecutive_failures(), 0);
        assert_eq!(tracker.total_recoveries(), 1);
        assert_eq!(tracker.next_action(&policy, now), RecoveryAction::Attempt);
    }
}
