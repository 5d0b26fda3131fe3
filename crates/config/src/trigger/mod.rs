//! Background scheduling primitives
//!
//! A trigger owns one tokio task that races a timer against a
//! [`CancellationToken`](tokio_util::sync::CancellationToken). Stopping is
//! idempotent and takes effect at the task's next scheduling point; an
//! in-flight callback is never interrupted or awaited.

mod one_shot;
mod recurring;

pub use one_shot::OneShotTrigger;
pub use recurring::RecurringTrigger;

use std::time::Duration;

use crate::core::{ConfigError, ConfigResult};

/// Common control surface of background triggers
pub trait Trigger: Send + Sync {
    /// Delay or period the trigger was started with
    fn timer(&self) -> Duration;

    /// Whether the trigger will fire again
    fn is_stopped(&self) -> bool;

    /// Stop the trigger. Calling this more than once is a no-op.
    fn stop(&self);

    /// Alias for [`stop`](Trigger::stop)
    fn close(&self) {
        self.stop();
    }
}

fn current_runtime() -> ConfigResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|e| {
        ConfigError::invalid_argument(format!("trigger requires a tokio runtime: {e}"))
    })
}
