//! Configuration builder

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::{Config, ConfigResult, ObserverCallback, Source};

/// Configuration builder
#[derive(Default)]
pub struct ConfigBuilder {
    /// Background reload period
    reload_period: Option<Duration>,

    /// Sources to register, in order
    sources: Vec<(String, i32, Arc<dyn Source>)>,

    /// Observers to register once every source is in place
    observers: Vec<(String, ObserverCallback)>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll observable sources every `period`
    pub fn with_reload_period(mut self, period: Duration) -> Self {
        self.reload_period = Some(period);
        self
    }

    /// Add a configuration source
    pub fn with_source(
        mut self,
        id: impl Into<String>,
        priority: i32,
        source: Arc<dyn Source>,
    ) -> Self {
        self.sources.push((id.into(), priority, source));
        self
    }

    /// Add an observer
    pub fn with_observer<F>(mut self, path: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        self.observers.push((path.into(), Arc::new(callback)));
        self
    }

    /// Build the configuration.
    ///
    /// Sources are registered in the order they were added; the first
    /// failing registration aborts the build and closes the sources
    /// registered before it.
    pub async fn build(self) -> ConfigResult<Config> {
        let config = match self.reload_period {
            Some(period) => Config::with_reload_period(period)?,
            None => Config::new(),
        };

        for (id, priority, source) in self.sources {
            config.add_source(id, priority, source).await?;
        }

        for (path, callback) in self.observers {
            config.add_observer_callback(path, callback).await?;
        }

        tracing::debug!(config = ?config, "Configuration built");
        Ok(config)
    }
}

impl std::fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("reload_period", &self.reload_period)
            .field("sources", &self.sources.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
