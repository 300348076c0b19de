use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Token-bucket rate limiter shared by every request of a run.
///
/// Semantics:
/// - the bucket starts full, so the first `burst` acquisitions are immediate;
/// - tokens refill at `qps` per second up to `burst`;
/// - an acquisition that finds too few tokens reserves them anyway (the
///   balance goes negative) and sleeps until the debt is repaid, so callers
///   waking up together do not all pass at once.
///
/// Clones share the same bucket.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<BucketState>>,
}

#[derive(Clone, Copy, Debug)]
struct BucketCfg {
    qps: f64,
    burst: f64,
}

#[derive(Debug)]
struct BucketState {
    cfg: BucketCfg,
    tokens: f64,
    last: Instant,
}

impl BucketState {
    fn new(cfg: BucketCfg) -> Self {
        Self {
            cfg,
            tokens: cfg.burst,
            last: Instant::now(),
        }
    }

    /// Takes `need` tokens and returns how long the caller must wait for them.
    fn needed_wait(&mut self, need: f64, now: Instant) -> Duration {
        if !self.cfg.qps.is_finite() {
            return Duration::ZERO;
        }
        let dt = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + dt * self.cfg.qps).min(self.cfg.burst);

        self.tokens -= need;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.cfg.qps)
        }
    }
}

impl RateLimiter {
    /// `qps` must be positive; non-finite values disable limiting.
    pub fn new(qps: f64, burst: u32) -> Self {
        let qps = if qps > 0.0 { qps } else { f64::INFINITY };
        Self {
            state: Arc::new(Mutex::new(BucketState::new(BucketCfg {
                qps,
                burst: f64::from(burst.max(1)),
            }))),
        }
    }

    /// One request per `delay`, burst 1. A zero delay disables limiting.
    pub fn per_interval(delay: Duration) -> Self {
        if delay.is_zero() {
            Self::unlimited()
        } else {
            Self::new(1.0 / delay.as_secs_f64(), 1)
        }
    }

    pub fn unlimited() -> Self {
        Self::new(f64::INFINITY, 1)
    }

    pub async fn acquire(&self) {
        self.acquire_cost(1).await
    }

    pub async fn acquire_cost(&self, cost: u32) {
        let wait = {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.needed_wait(f64::from(cost), Instant::now())
        };
        if !wait.is_zero() {
            tracing::trace!(target: "rate", wait_ms = wait.as_millis() as u64, "rate.wait");
            sleep(wait).await;
        }
    }
}
