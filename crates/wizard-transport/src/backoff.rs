//! Reconnect timing: exponential backoff with jitter and a retry cap.
//!
//! When the server drops the link, every client that was connected to it
//! notices at the same moment. Retrying immediately (or on the same fixed
//! schedule) makes them all hammer the server in lockstep. Backoff spreads
//! the attempts out over time and jitter de-synchronizes the clients.
//!
//! ```text
//! attempt:   1      2      3      4      5  ...
//! base:    250ms  500ms   1s     2s     4s  ... capped at max_delay
//! actual:  base × (1 ± jitter)
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// How the link retries after an unexpected close or a failed connect.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay (jitter included).
    pub max_delay: Duration,
    /// Growth factor between consecutive attempts. Must be ≥ 1.0.
    pub multiplier: f64,
    /// Symmetric random spread as a fraction of the base delay (0.0–1.0).
    /// 0.2 means each delay lands somewhere in `base × [0.8, 1.2]`.
    pub jitter: f64,
    /// Give up after this many consecutive failed attempts.
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: Some(20),
        }
    }
}

impl ReconnectPolicy {
    /// Retry at once, forever. Mostly useful in tests.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    /// Sets the retry cap.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the first and the largest delay.
    #[must_use]
    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    /// Clamp and fix any out-of-range values so the policy is safe to use.
    ///
    /// Called automatically by [`Link::spawn`](crate::Link::spawn). Rules:
    /// - `multiplier` below 1.0 (or not finite) becomes 1.0.
    /// - `jitter` clamped to `0.0..=1.0`.
    /// - `max_delay` raised to at least `initial_delay`.
    pub fn validated(mut self) -> Self {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            warn!(
                multiplier = self.multiplier,
                "backoff multiplier must be >= 1.0, clamping"
            );
            self.multiplier = 1.0;
        }
        if !self.jitter.is_finite() {
            self.jitter = 0.0;
        }
        self.jitter = self.jitter.clamp(0.0, 1.0);
        if self.max_delay < self.initial_delay {
            self.max_delay = self.initial_delay;
        }
        self
    }

    /// Returns `true` once `attempt` (1-based) is past the retry cap.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt > max)
    }

    /// The delay for `attempt` (1-based) before jitter is applied.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let secs =
            self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if !secs.is_finite() || secs >= max {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// The jittered delay for `attempt` (1-based).
    pub fn delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let base = self.base_delay(attempt).as_secs_f64();
        let factor = if self.jitter > 0.0 {
            1.0 + rng.random_range(-self.jitter..=self.jitter)
        } else {
            1.0
        };
        let secs = (base * factor).clamp(0.0, self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}
