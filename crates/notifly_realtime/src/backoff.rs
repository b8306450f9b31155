use notifly_config::RealtimeConfig;
use std::time::Duration;

const MIN_STABLE_SESSION: Duration = Duration::from_secs(1);

/// Reconnect schedule: exponential from `base_delay`, capped at `max_delay`,
/// for at most `max_attempts` attempts.
///
/// Attempts accumulate across sessions that end within `stable_after` of
/// connecting, so a server that keeps evicting the client still exhausts
/// the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub handshake_timeout: Duration,
    pub stable_after: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        let max_delay = Duration::from_millis(config.reconnection_delay_max_ms);
        Self {
            enabled: config.reconnection,
            max_attempts: config.reconnection_attempts,
            base_delay: Duration::from_millis(config.reconnection_delay_ms),
            max_delay,
            handshake_timeout: Duration::from_millis(config.timeout_ms),
            stable_after: max_delay.max(MIN_STABLE_SESSION),
        }
    }

    /// Delay before attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && attempt <= self.max_attempts
    }

    /// Whether a session that stayed up for `uptime` resets the attempt count.
    pub fn is_stable(&self, uptime: Duration) -> bool {
        uptime >= self.stable_after
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
        assert!(policy.allows(5));
        assert!(!policy.allows(6));
    }

    #[test]
    fn test_short_sessions_are_not_stable() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.stable_after, Duration::from_secs(5));
        assert!(!policy.is_stable(Duration::from_millis(20)));
        assert!(policy.is_stable(Duration::from_secs(5)));

        let fast = ReconnectPolicy::from_config(&RealtimeConfig {
            reconnection_delay_max_ms: 50,
            ..RealtimeConfig::default()
        });
        assert_eq!(fast.stable_after, Duration::from_secs(1));
    }

    #[test]
    fn test_disabled_policy_allows_nothing() {
        let policy = ReconnectPolicy {
            enabled: false,
            ..ReconnectPolicy::default()
        };
        assert!(!policy.allows(1));
    }

    proptest! {
        #[test]
        fn delay_never_exceeds_cap(attempt in 0u32..10_000, base in 1u64..10_000, cap in 1u64..100_000) {
            let policy = ReconnectPolicy {
                base_delay: Duration::from_millis(base),
                max_delay: Duration::from_millis(cap),
                ..ReconnectPolicy::default()
            };
            prop_assert!(policy.delay_for(attempt) <= Duration::from_millis(cap));
        }

        #[test]
        fn delay_is_monotonic(attempt in 1u32..64) {
            let policy = ReconnectPolicy::default();
            prop_assert!(policy.delay_for(attempt) <= policy.delay_for(attempt + 1));
        }
    }
}
