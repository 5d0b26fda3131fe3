//! Configuration source contract

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::ConfigResult;

/// A provider of configuration data.
///
/// Sources are registered with a [`Config`](super::Config) under an id and a
/// priority. The aggregator reads the whole tree through `get("")` on every
/// rebuild and takes ownership: it calls [`close`](Source::close) exactly
/// once when the source is removed or the aggregator is closed.
pub trait Source: Send + Sync + Debug {
    /// Check whether a non-null value is stored at `path`
    fn has(&self, path: &str) -> bool;

    /// Get the value stored at `path`; `""` yields the whole tree
    fn get(&self, path: &str) -> Option<Value>;

    /// Release resources held by the source
    fn close(&self) -> ConfigResult<()> {
        Ok(())
    }

    /// Capability query for change detection.
    ///
    /// Sources that can detect changes in their backing medium return
    /// themselves as an [`ObservableSource`].
    fn as_observable(self: Arc<Self>) -> Option<Arc<dyn ObservableSource>> {
        None
    }
}

/// A source able to detect and apply changes to its backing data
#[async_trait]
pub trait ObservableSource: Source {
    /// Re-read the backing medium if it changed.
    ///
    /// Returns `true` when new data was loaded.
    async fn reload(&self) -> ConfigResult<bool>;
}
