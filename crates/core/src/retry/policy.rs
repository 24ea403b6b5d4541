//! Bounded retry policy.

use std::time::Duration;

use crate::config::{BackoffKind, RetryConfig};

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    Exponential { multiplier: f64, max_delay: Duration },
}

/// How many times to try a URL and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                multiplier: config.multiplier,
                max_delay: Duration::from_millis(config.max_delay_ms),
            },
        };
        Self {
            max_attempts: config.max_attempts,
            delay: Duration::from_millis(config.delay_ms),
            backoff,
        }
    }

    /// Wait before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = self.delay.as_secs_f64() * multiplier.powi(exponent);
                if secs.is_finite() && secs < max_delay.as_secs_f64() {
                    // A negative multiplier can flip the sign
                    Duration::from_secs_f64(secs.max(0.0))
                } else {
                    max_delay
                }
            }
        }
    }

    /// Whether another attempt is allowed after `attempt`.
    pub fn allows_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 7);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.backoff, Backoff::Fixed);
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(2), Duration::from_millis(250));
        assert!(policy.allows_after(2));
        assert!(!policy.allows_after(3));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            delay: Duration::from_secs(1),
            backoff: Backoff::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_secs(5),
            },
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_negative_multiplier_never_goes_below_zero() {
        let policy = RetryPolicy {
            max_attempts: 4,
            delay: Duration::from_secs(1),
            backoff: Backoff::Exponential {
                multiplier: -2.0,
                max_delay: Duration::from_secs(5),
            },
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::ZERO);
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::ZERO);
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            max_attempts: 3,
            delay_ms: 100,
            backoff: BackoffKind::Exponential,
            multiplier: 3.0,
            max_delay_ms: 1000,
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(2), Duration::from_millis(300));
        assert_eq!(policy.delay_after(3), Duration::from_millis(900));
    }
}
