//! Retry policy for rate-limited requests.
//!
//! A [`RetryPolicy`] is applied explicitly by the client around `fetch` and
//! `submit`. The delay before the retry following attempt `i` (0-based) is
//! `min(2^i * (1 + r), cap)` units, with `r` drawn from `[0, 1)`.

use std::time::Duration;

use rand::Rng;

/// Default status codes that trigger a retry: rate limiting only.
pub const DEFAULT_RETRY_STATUSES: &[u16] = &[429];

/// Source of the jitter factor `r` in the backoff formula.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Jitter {
    /// Uniformly random in `[0, 1)` on every call.
    Uniform,
    /// Fixed factor, clamped to `[0, 1)`. Useful for deterministic delays.
    Fixed(f64),
}

impl Jitter {
    fn sample(self) -> f64 {
        match self {
            Self::Uniform => rand::rng().random_range(0.0..1.0),
            Self::Fixed(value) if value.is_finite() => value.clamp(0.0, 1.0 - f64::EPSILON),
            Self::Fixed(_) => 0.0,
        }
    }
}

/// Capped exponential backoff with jitter.
#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
    /// Length of one backoff unit.
    pub unit: Duration,
    /// Upper bound for a single wait, in units.
    pub cap: f64,
    /// Jitter source.
    pub jitter: Jitter,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            cap: 300.0,
            jitter: Jitter::Uniform,
        }
    }
}

impl Backoff {
    /// Delay in units for a given attempt index and jitter factor.
    pub fn units_for(&self, attempt: u32, r: f64) -> f64 {
        // 2^63 units is far beyond any sane cap already.
        let exp = attempt.min(63) as i32;
        (2f64.powi(exp) * (1.0 + r)).min(self.cap)
    }

    /// Wait duration before the retry that follows attempt `attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let units = self.units_for(attempt, self.jitter.sample());
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * units.max(0.0))
            .unwrap_or(Duration::MAX)
    }
}

/// Which statuses are retried, how often, and how long to wait in between.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// HTTP status codes that trigger a retry.
    pub retry_on: Vec<u16>,
    /// Backoff between attempts.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_on: DEFAULT_RETRY_STATUSES.to_vec(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether another attempt should follow attempt number `attempt`
    /// (0-based) that returned `status`.
    pub fn should_retry(&self, status: u16, attempt: u32) -> bool {
        self.retry_on.contains(&status) && attempt + 1 < self.max_attempts.max(1)
    }
}
