//! One-shot background trigger

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Trigger, current_runtime};
use crate::core::ConfigResult;

/// Runs a callback once after a delay unless stopped first
#[derive(Debug)]
pub struct OneShotTrigger {
    delay: Duration,
    cancel: CancellationToken,
}

impl OneShotTrigger {
    /// Schedule `callback` to run once after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(delay: Duration, callback: F) -> ConfigResult<Self>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = current_runtime()?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        runtime.spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!(?delay, "One-shot trigger stopped before firing");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            callback().await;
            token.cancel();
        });

        Ok(Self { delay, cancel })
    }
}

impl Trigger for OneShotTrigger {
    fn timer(&self) -> Duration {
        self.delay
    }

    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for OneShotTrigger {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
