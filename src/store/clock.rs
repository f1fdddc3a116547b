//! Wall clock and sleeping, kept behind a trait so retry timing is testable.
use async_trait::async_trait;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_epoch_secs(&self) -> i64;
    async fn sleep(&self, duration: Duration);
}

/// Real time, backed by chrono and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}
