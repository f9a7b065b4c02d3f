use super::FailureKind;
use std::time::Duration;

/// Upper bound on any delay between attempts, whichever policy computed it.
pub const MAX_BACKOFF: Duration = Duration::from_secs(20);

const DEFAULT_SCALE: Duration = Duration::from_millis(300);
const DEFAULT_THROTTLE_SCALE: Duration = Duration::from_millis(500);
const DEFAULT_THROTTLE_JITTER: Duration = Duration::from_millis(100);

/// Computes how long to wait before the next attempt.
///
/// `attempt` is the number of attempts already made (1 before the first
/// retry) and `last_failure` is what went wrong on the latest one. A custom
/// policy fully replaces the default formula; the executor still clamps its
/// result to [`MAX_BACKOFF`].
pub trait BackoffPolicy: Send + Sync {
    fn delay(&self, attempt: u32, last_failure: FailureKind) -> Duration;
}

impl<F> BackoffPolicy for F
where
    F: Fn(u32, FailureKind) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32, last_failure: FailureKind) -> Duration {
        self(attempt, last_failure)
    }
}

pub fn clamp_to_ceiling(delay: Duration) -> Duration {
    delay.min(MAX_BACKOFF)
}

#[derive(Debug, Clone, Default)]
enum Jitter {
    #[default]
    Random,
    #[cfg(test)]
    Fixed(Duration),
}

/// `min(ceiling, 2^attempt * scale)`, with a larger, jittered scale after
/// throttling so concurrent callers spread their retries out.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    scale: Duration,
    throttle_scale: Duration,
    throttle_jitter: Duration,
    ceiling: Duration,
    jitter: Jitter,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            throttle_scale: DEFAULT_THROTTLE_SCALE,
            throttle_jitter: DEFAULT_THROTTLE_JITTER,
            ceiling: MAX_BACKOFF,
            jitter: Jitter::Random,
        }
    }
}

impl ExponentialBackoff {
    pub fn with_scale(mut self, scale: Duration) -> Self {
        self.scale = scale;
        self
    }

    /// Scale used after throttling: `base + uniform[0, jitter)`.
    pub fn with_throttle_scale(mut self, base: Duration, jitter: Duration) -> Self {
        self.throttle_scale = base;
        self.throttle_jitter = jitter;
        self
    }

    /// Ceilings above [`MAX_BACKOFF`] are clamped.
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = clamp_to_ceiling(ceiling);
        self
    }

    #[cfg(test)]
    fn with_fixed_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = Jitter::Fixed(jitter);
        self
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    fn scale_for(&self, last_failure: FailureKind) -> Duration {
        if !last_failure.is_throttling() {
            return self.scale;
        }
        let jitter = match self.jitter {
            Jitter::Random => {
                let max = self.throttle_jitter.as_millis() as u64;
                if max == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(fastrand::u64(0..max))
                }
            }
            #[cfg(test)]
            Jitter::Fixed(d) => d,
        };
        self.throttle_scale + jitter
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32, last_failure: FailureKind) -> Duration {
        // 2^31 still fits a u32 multiplier; anything beyond is over the ceiling anyway.
        let factor = 1u32 << attempt.min(31);
        self.scale_for(last_failure)
            .saturating_mul(factor)
            .min(self.ceiling)
    }
}
