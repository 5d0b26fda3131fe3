//! Recurring background trigger

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{Trigger, current_runtime};
use crate::core::{ConfigError, ConfigResult};

/// Runs a callback every period until stopped or until the callback fails
#[derive(Debug)]
pub struct RecurringTrigger {
    period: Duration,
    cancel: CancellationToken,
}

impl RecurringTrigger {
    /// Start firing `callback` every `period`, the first time one period
    /// from now.
    ///
    /// An `Err` from the callback stops the trigger permanently. Must be
    /// called from within a tokio runtime; a zero period is rejected.
    pub fn start<F, Fut>(period: Duration, mut callback: F) -> ConfigResult<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ConfigResult<()>> + Send + 'static,
    {
        if period.is_zero() {
            return Err(ConfigError::invalid_argument(
                "recurring trigger period must be non-zero",
            ));
        }

        let runtime = current_runtime()?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if let Err(e) = callback().await {
                    tracing::warn!(error = %e, ?period, "Recurring trigger callback failed, stopping");
                    token.cancel();
                    break;
                }
            }

            tracing::debug!(?period, "Recurring trigger stopped");
        });

        Ok(Self { period, cancel })
    }
}

impl Trigger for RecurringTrigger {
    fn timer(&self) -> Duration {
        self.period
    }

    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RecurringTrigger {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_period_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let trigger = RecurringTrigger::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        trigger.stop();
        trigger.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(trigger.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_trigger() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let trigger = RecurringTrigger::start(Duration::from_millis(10), move || {
            let fired = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if fired >= 2 {
                    Err(ConfigError::source_error("poll failed", "test"))
                } else {
                    Ok(())
                }
            }
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(trigger.is_stopped());
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let result = RecurringTrigger::start(Duration::ZERO, || async { Ok(()) });
        assert!(matches!(result, Err(ConfigError::InvalidArgument { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_trigger() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let trigger = RecurringTrigger::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .unwrap();

        drop(trigger);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
