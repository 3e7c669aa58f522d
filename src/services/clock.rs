use async_trait::async_trait;
use std::time::Duration;

/// Source of the simulated settlement delay
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock delay on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Completes every delay immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateClock;

#[async_trait]
impl Clock for ImmediateClock {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}
