//! Exponential backoff between reconnection attempts.
//!
//! Attempt `n` (1-indexed) waits `min(max_delay, initial_delay * 2^(n-1))`.
//! The exponent is saturated at [`BackoffConfig::MAX_SHIFT`] so a client
//! that retries forever never overflows the multiplier:
//!
//! ```text
//! attempt:  1    2    3    4    5    6    ...
//! delay:    1s   2s   4s   8s   16s  30s  30s (max_delay = 30s)
//! ```

use std::time::Duration;

use rand::Rng;

use crate::SessionError;

// ---------------------------------------------------------------------------
// BackoffConfig
// ---------------------------------------------------------------------------

/// Backoff parameters for the reconnection loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first attempt. Default: 1 second.
    pub initial_delay: Duration,

    /// Upper bound for any single delay. Default: 30 seconds.
    pub max_delay: Duration,

    /// Attempts allowed before giving up. 0 retries forever (the default).
    pub max_attempts: u32,

    /// Random extra delay (`0..jitter`) added to each wait to keep a fleet
    /// of clients from reconnecting in lockstep after a server restart.
    /// Default: zero.
    pub jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 0,
            jitter: Duration::ZERO,
        }
    }
}

impl BackoffConfig {
    /// Largest exponent ever computed; later attempts reuse it.
    pub const MAX_SHIFT: u32 = 30;

    /// The deterministic delay for `attempt` (1-indexed; 0 is treated as 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(Self::MAX_SHIFT);
        self.initial_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// [`delay_for`](Self::delay_for) plus random jitter, still capped at
    /// `max_delay`.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let jitter_us = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        if jitter_us == 0 {
            return base;
        }
        let extra = Duration::from_micros(rand::rng().random_range(0..jitter_us));
        base.saturating_add(extra).min(self.max_delay)
    }

    /// Returns `true` once `attempt` is past the configured maximum.
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts != 0 && attempt > self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Attempt counter driving a [`BackoffConfig`].
///
/// ```text
///   reset() ──→ next_delay() ──→ next_delay() ──→ ... ──→ AttemptsExhausted
///      ↑             │ (attempt 1)     │ (attempt 2)
///      └─────────────┴─────────────────┘  on successful reconnect
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Starts the next attempt and returns how long to wait before it.
    ///
    /// # Errors
    /// [`SessionError::AttemptsExhausted`] once `max_attempts` is used up.
    /// The counter is not advanced further in that case.
    pub fn next_delay(&mut self) -> Result<Duration, SessionError> {
        let attempt = self.attempt.saturating_add(1);
        if self.config.exhausted(attempt) {
            return Err(SessionError::AttemptsExhausted {
                attempts: self.attempt,
            });
        }
        self.attempt = attempt;
        Ok(self.config.jittered_delay_for(attempt))
    }

    /// Number of attempts started since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Back to zero after a successful (re)connect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
