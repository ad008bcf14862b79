/// Exponential backoff with jitter and a bounded give-up point
///
/// `ExponentialBackOff` is a stateful interval generator: each failure grows the
/// base interval by `multiplier` up to `max_interval`, and each returned delay is
/// randomized around that base so many clients retrying at once spread out.
/// Once the attempt or elapsed-time budget is spent, `next_backoff` returns
/// `None` and keeps returning it until `reset`.
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// A retry interval generator owned by a single retry loop.
pub trait BackOffStrategy: Send {
    /// Delay before the next retry, or `None` when the strategy is exhausted
    /// and the caller must give up.
    fn next_backoff(&mut self) -> Option<Duration>;

    /// Return to the initial state after a successful operation.
    fn reset(&mut self);
}

impl<B: BackOffStrategy + ?Sized> BackOffStrategy for Box<B> {
    fn next_backoff(&mut self) -> Option<Duration> {
        (**self).next_backoff()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Base interval used for the first retry after a reset
    pub initial_interval: Duration,
    /// Growth factor applied after every retry
    pub multiplier: f64,
    /// Ceiling for the base interval
    pub max_interval: Duration,
    /// Jitter as a fraction of the base interval (0.5 = ±50%)
    pub randomization_factor: f64,
    /// Give up once this much time has passed since the first failure
    pub max_elapsed_time: Option<Duration>,
    /// Give up after this many retries
    pub max_attempts: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            randomization_factor: 0.5,
            max_elapsed_time: Some(Duration::from_secs(15 * 60)),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackoffConfigError {
    #[error("initial interval must be greater than zero")]
    ZeroInitialInterval,
    #[error("multiplier must be >= 1.0, got {0}")]
    InvalidMultiplier(f64),
    #[error("randomization factor must be in [0, 1), got {0}")]
    InvalidRandomization(f64),
    #[error("max interval {max:?} is below initial interval {initial:?}")]
    MaxBelowInitial { initial: Duration, max: Duration },
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<(), BackoffConfigError> {
        if self.initial_interval.is_zero() {
            return Err(BackoffConfigError::ZeroInitialInterval);
        }
        if !(self.multiplier >= 1.0) {
            return Err(BackoffConfigError::InvalidMultiplier(self.multiplier));
        }
        if !(0.0..1.0).contains(&self.randomization_factor) {
            return Err(BackoffConfigError::InvalidRandomization(
                self.randomization_factor,
            ));
        }
        if self.max_interval < self.initial_interval {
            return Err(BackoffConfigError::MaxBelowInitial {
                initial: self.initial_interval,
                max: self.max_interval,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExponentialBackOff {
    config: BackoffConfig,
    current: Duration,
    attempts: u32,
    /// Set on the first call after a reset
    started_at: Option<Instant>,
}

impl ExponentialBackOff {
    pub fn new(config: BackoffConfig) -> Result<Self, BackoffConfigError> {
        config.validate()?;
        Ok(Self {
            current: config.initial_interval,
            config,
            attempts: 0,
            started_at: None,
        })
    }

    /// Number of intervals handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Base interval the next call will randomize around
    pub fn current_interval(&self) -> Duration {
        self.current
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    fn exhausted(&self, now: Instant) -> bool {
        if let Some(max_attempts) = self.config.max_attempts {
            if self.attempts >= max_attempts {
                return true;
            }
        }
        match (self.config.max_elapsed_time, self.started_at) {
            (Some(max_elapsed), Some(started_at)) => now.duration_since(started_at) > max_elapsed,
            _ => false,
        }
    }

    fn grow(&mut self) {
        let next = self.current.as_secs_f64() * self.config.multiplier;
        self.current = if next >= self.config.max_interval.as_secs_f64() {
            self.config.max_interval
        } else {
            // float rounding must never shrink the interval
            Duration::from_secs_f64(next).max(self.current)
        };
    }
}

impl BackOffStrategy for ExponentialBackOff {
    fn next_backoff(&mut self) -> Option<Duration> {
        let now = Instant::now();
        self.started_at.get_or_insert(now);

        if self.exhausted(now) {
            return None;
        }

        let delay = randomize(self.current, self.config.randomization_factor);
        self.attempts += 1;
        self.grow();
        Some(delay)
    }

    fn reset(&mut self) {
        self.current = self.config.initial_interval;
        self.attempts = 0;
        self.started_at = None;
    }
}

fn randomize(base: Duration, factor: f64) -> Duration {
    if factor == 0.0 {
        return base;
    }
    let mut rng = rand::thread_rng();
    let jitter = 1.0 + rng.gen_range(-factor..factor);
    Duration::from_secs_f64(base.as_secs_f64() * jitter)
}
