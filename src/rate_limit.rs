use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_secs(8);

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock: time only moves when someone sleeps or calls `advance`.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self { origin: Instant::now(), elapsed: Arc::default() }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub can_make_request: bool,
    pub wait_time_ms: u64,
}

/// Enforces a minimum spacing between dispatches. Callers that arrive early
/// are suspended, never rejected.
pub struct RateLimiter {
    delay: Duration,
    clock: Arc<dyn Clock>,
    // Held across the sleep so check-and-update is atomic across tasks.
    gate: tokio::sync::Mutex<()>,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            delay,
            clock,
            gate: tokio::sync::Mutex::new(()),
            last_dispatch: Mutex::new(None),
        }
    }

    fn remaining(&self, now: Instant) -> Duration {
        match *self.last_dispatch.lock() {
            Some(last) => self.delay.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Waits until a dispatch is allowed and records it.
    pub async fn acquire(&self) {
        let _gate = self.gate.lock().await;

        let wait = self.remaining(self.clock.now());
        if !wait.is_zero() {
            info!(wait_ms = wait.as_millis() as u64, "⏳ Rate limit: waiting before dispatch");
            self.clock.sleep(wait).await;
        }

        *self.last_dispatch.lock() = Some(self.clock.now());
    }

    pub fn status(&self) -> RateLimitStatus {
        let wait = self.remaining(self.clock.now());
        RateLimitStatus {
            can_make_request: wait.is_zero(),
            wait_time_ms: wait.as_millis() as u64,
        }
    }
}
