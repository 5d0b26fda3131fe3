//! Main configuration container

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use super::partial::value_kind;
use super::{ConfigError, ConfigResult, ObservableSource, Partial, Source};
use crate::trigger::{RecurringTrigger, Trigger};

/// Callback invoked with `(old, new)` when an observed value changes
pub type ObserverCallback = Arc<dyn Fn(&Value, &Value) + Send + Sync>;

/// Layered configuration aggregated from prioritized sources.
///
/// Sources are merged in ascending priority order, so a higher priority
/// overrides a lower one on overlapping paths; equal priorities resolve in
/// registration order. The merged tree is rebuilt after every registry
/// change and whenever an observable source reports new data.
///
/// One lock guards the registry, the observers and the merged tree.
/// Observer callbacks run while that lock is held: they must return quickly
/// and must not call back into the same `Config`, or the task deadlocks.
///
/// `Config` is a cheap handle; clones share the same state.
#[derive(Clone)]
pub struct Config {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    trigger: OnceLock<RecurringTrigger>,
    reload_failures: AtomicU64,
}

#[derive(Default)]
struct State {
    registrations: Vec<Registration>,
    observers: Vec<Observer>,
    tree: Partial,
    next_sequence: u64,
    revision: u64,
    closed: bool,
}

struct Registration {
    id: String,
    priority: i32,
    sequence: u64,
    source: Arc<dyn Source>,
    observable: Option<Arc<dyn ObservableSource>>,
}

struct Observer {
    path: String,
    last: Value,
    callback: ObserverCallback,
}

impl Config {
    /// Create a configuration without background reloading
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                trigger: OnceLock::new(),
                reload_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Create a configuration that polls observable sources every `period`.
    ///
    /// A zero period disables polling. Polling requires a tokio runtime.
    pub fn with_reload_period(period: Duration) -> ConfigResult<Self> {
        let config = Self::new();
        if !period.is_zero() {
            config.start_reload(period)?;
        }
        Ok(config)
    }

    fn start_reload(&self, period: Duration) -> ConfigResult<()> {
        let weak = Arc::downgrade(&self.inner);
        let trigger = RecurringTrigger::start(period, move || {
            let weak = weak.clone();
            async move {
                let config = Config {
                    inner: weak.upgrade().ok_or(ConfigError::Closed)?,
                };
                if config.is_closed().await {
                    return Err(ConfigError::Closed);
                }
                config.reload().await;
                Ok(())
            }
        })?;

        tracing::debug!(?period, "Started configuration reload trigger");
        if self.inner.trigger.set(trigger).is_err() {
            return Err(ConfigError::invalid_argument("reload trigger already started"));
        }
        Ok(())
    }

    /// Reload period, if background polling is enabled
    pub fn reload_period(&self) -> Option<Duration> {
        self.inner.trigger.get().map(Trigger::timer)
    }

    // ==================== Source registry ====================

    /// Register `source` under `id` with the given priority and rebuild.
    ///
    /// The configuration takes ownership of the source and closes it when
    /// it is removed or when the configuration is closed.
    pub async fn add_source(
        &self,
        id: impl Into<String>,
        priority: i32,
        source: Arc<dyn Source>,
    ) -> ConfigResult<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(ConfigError::invalid_argument("source id must not be empty"));
        }

        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Err(ConfigError::Closed);
        }
        if state.position(&id).is_some() {
            return Err(ConfigError::duplicate_source(id));
        }

        let observable = Arc::clone(&source).as_observable();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        tracing::debug!(
            source_id = %id,
            priority,
            observable = observable.is_some(),
            "Registered configuration source"
        );

        state.registrations.push(Registration {
            id,
            priority,
            sequence,
            source,
            observable,
        });
        state.sort();
        state.rebuild();
        Ok(())
    }

    /// Close and unregister the source registered under `id`, then rebuild.
    ///
    /// Returns `false` if no such source is registered.
    pub async fn remove_source(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let Some(index) = state.position(id) else {
            return false;
        };

        let registration = state.registrations.remove(index);
        registration.close();
        tracing::debug!(source_id = %id, "Removed configuration source");

        state.rebuild();
        true
    }

    /// Change the priority of a registered source and rebuild
    pub async fn set_source_priority(&self, id: &str, priority: i32) -> ConfigResult<()> {
        let mut state = self.inner.state.lock().await;
        let index = state
            .position(id)
            .ok_or_else(|| ConfigError::source_not_found(id))?;

        state.registrations[index].priority = priority;
        tracing::debug!(source_id = %id, priority, "Changed configuration source priority");

        state.sort();
        state.rebuild();
        Ok(())
    }

    /// Check if a source is registered under `id`
    pub async fn has_source(&self, id: &str) -> bool {
        self.inner.state.lock().await.position(id).is_some()
    }

    /// Registered source ids, lowest priority first
    pub async fn source_ids(&self) -> Vec<String> {
        let state = self.inner.state.lock().await;
        state.registrations.iter().map(|r| r.id.clone()).collect()
    }

    // ==================== Queries ====================

    async fn read<T>(&self, f: impl FnOnce(&Partial) -> T) -> T {
        let state = self.inner.state.lock().await;
        f(&state.tree)
    }

    /// Check if a non-null value is stored at `path`
    pub async fn has(&self, path: &str) -> bool {
        self.read(|tree| tree.has(path)).await
    }

    /// Get the value stored at `path`
    pub async fn get(&self, path: &str) -> Option<Value> {
        self.read(|tree| tree.get(path).cloned()).await
    }

    /// Get the value stored at `path`, or `default` when the key is missing
    pub async fn get_or(&self, path: &str, default: Value) -> Value {
        self.read(|tree| tree.get(path).cloned()).await.unwrap_or(default)
    }

    /// Get a boolean
    pub async fn get_bool(&self, path: &str) -> ConfigResult<bool> {
        self.read(|tree| tree.get_bool(path)).await
    }

    /// Get a boolean, falling back to `default` when absent
    pub async fn get_bool_or(&self, path: &str, default: bool) -> ConfigResult<bool> {
        self.read(|tree| tree.get_bool_or(path, default)).await
    }

    /// Get a signed integer
    pub async fn get_int(&self, path: &str) -> ConfigResult<i64> {
        self.read(|tree| tree.get_int(path)).await
    }

    /// Get a signed integer, falling back to `default` when absent
    pub async fn get_int_or(&self, path: &str, default: i64) -> ConfigResult<i64> {
        self.read(|tree| tree.get_int_or(path, default)).await
    }

    /// Get a floating point number
    pub async fn get_float(&self, path: &str) -> ConfigResult<f64> {
        self.read(|tree| tree.get_float(path)).await
    }

    /// Get a floating point number, falling back to `default` when absent
    pub async fn get_float_or(&self, path: &str, default: f64) -> ConfigResult<f64> {
        self.read(|tree| tree.get_float_or(path, default)).await
    }

    /// Get a string
    pub async fn get_string(&self, path: &str) -> ConfigResult<String> {
        self.read(|tree| tree.get_string(path)).await
    }

    /// Get a string, falling back to `default` when absent
    pub async fn get_string_or(
        &self,
        path: &str,
        default: impl Into<String>,
    ) -> ConfigResult<String> {
        let default = default.into();
        self.read(|tree| tree.get_string_or(path, default)).await
    }

    /// Get a list
    pub async fn get_list(&self, path: &str) -> ConfigResult<Vec<Value>> {
        self.read(|tree| tree.get_list(path)).await
    }

    /// Get a nested tree
    pub async fn get_partial(&self, path: &str) -> ConfigResult<Partial> {
        self.read(|tree| tree.get_partial(path)).await
    }

    /// Deserialize the value stored at `path`
    pub async fn get_as<T>(&self, path: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        self.read(|tree| tree.get_as(path)).await
    }

    /// Copy of the whole merged tree
    pub async fn snapshot(&self) -> Partial {
        self.read(Partial::clone).await
    }

    /// Number of rebuilds performed so far
    pub async fn revision(&self) -> u64 {
        self.inner.state.lock().await.revision
    }

    // ==================== Observers ====================

    /// Observe the value at `path`.
    ///
    /// The current value becomes the baseline; `callback` is invoked with
    /// `(old, new)` after each rebuild that changes it. Missing values are
    /// observed as `null`.
    pub async fn add_observer<F>(&self, path: impl Into<String>, callback: F) -> ConfigResult<()>
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        self.add_observer_callback(path.into(), Arc::new(callback))
            .await
    }

    pub(crate) async fn add_observer_callback(
        &self,
        path: String,
        callback: ObserverCallback,
    ) -> ConfigResult<()> {
        let mut state = self.inner.state.lock().await;
        if state.closed {
            return Err(ConfigError::Closed);
        }

        let last = state.tree.get(&path).cloned().unwrap_or(Value::Null);
        tracing::debug!(path = %path, "Registered configuration observer");
        state.observers.push(Observer {
            path,
            last,
            callback,
        });
        Ok(())
    }

    /// Remove the first observer registered for `path`
    pub async fn remove_observer(&self, path: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        match state.observers.iter().position(|o| o.path == path) {
            Some(index) => {
                state.observers.remove(index);
                true
            }
            None => false,
        }
    }

    // ==================== Reload & lifecycle ====================

    /// Run one reload cycle.
    ///
    /// Every observable source is asked to reload concurrently, without the
    /// configuration lock held. If any of them loaded new data, the tree is
    /// rebuilt once. Failed reloads are logged and counted. Returns whether
    /// a rebuild happened.
    pub async fn reload(&self) -> bool {
        let observables: Vec<(String, Arc<dyn ObservableSource>)> = {
            let state = self.inner.state.lock().await;
            if state.closed {
                return false;
            }
            state
                .registrations
                .iter()
                .filter_map(|r| r.observable.as_ref().map(|o| (r.id.clone(), Arc::clone(o))))
                .collect()
        };

        if observables.is_empty() {
            return false;
        }

        let results =
            futures::future::join_all(observables.iter().map(|(_, source)| source.reload())).await;

        let mut changed = false;
        for ((id, _), result) in observables.iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::debug!(source_id = %id, "Configuration source reloaded");
                    changed = true;
                }
                Ok(false) => {}
                Err(e) => {
                    self.inner.reload_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(source_id = %id, error = %e, "Configuration source reload failed");
                }
            }
        }

        if !changed {
            return false;
        }

        let mut state = self.inner.state.lock().await;
        if state.closed {
            return false;
        }
        state.rebuild();
        true
    }

    /// Number of source reloads that failed so far
    pub fn reload_failures(&self) -> u64 {
        self.inner.reload_failures.load(Ordering::Relaxed)
    }

    /// Stop background reloading and close every registered source.
    ///
    /// Idempotent. The last merged tree stays readable; sources and
    /// observers can no longer be added.
    pub async fn close(&self) {
        if let Some(trigger) = self.inner.trigger.get() {
            trigger.stop();
        }

        let mut state = self.inner.state.lock().await;
        if state.closed {
            return;
        }
        state.shutdown();
        tracing::debug!("Configuration closed");
    }

    /// Whether [`close`](Config::close) was called
    pub async fn is_closed(&self) -> bool {
        self.inner.state.lock().await.closed
    }
}

impl State {
    fn position(&self, id: &str) -> Option<usize> {
        self.registrations.iter().position(|r| r.id == id)
    }

    fn sort(&mut self) {
        self.registrations.sort_by_key(|r| (r.priority, r.sequence));
    }

    fn rebuild(&mut self) {
        let mut tree = Partial::new();
        for registration in &self.registrations {
            match registration.source.get("") {
                Some(Value::Object(map)) => {
                    tree.merge(Partial::from(map));
                }
                Some(other) => {
                    tracing::warn!(
                        source_id = %registration.id,
                        kind = value_kind(&other),
                        "Configuration source root is not a tree, skipping"
                    );
                }
                None => {}
            }
        }

        self.tree = tree;
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            sources = self.registrations.len(),
            "Configuration rebuilt"
        );

        for observer in &mut self.observers {
            let current = self.tree.get(&observer.path).cloned().unwrap_or(Value::Null);
            if current != observer.last {
                let old = std::mem::replace(&mut observer.last, current);
                (observer.callback)(&old, &observer.last);
            }
        }
    }

    fn shutdown(&mut self) {
        self.closed = true;
        self.observers.clear();
        for registration in self.registrations.drain(..) {
            registration.close();
        }
    }
}

impl Registration {
    fn close(&self) {
        if let Err(e) = self.source.close() {
            tracing::warn!(source_id = %self.id, error = %e, "Failed to close configuration source");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Config");
        debug.field("reload_period", &self.reload_period());
        if let Ok(state) = self.inner.state.try_lock() {
            debug
                .field("sources", &state.registrations.len())
                .field("observers", &state.observers.len())
                .field("revision", &state.revision)
                .field("closed", &state.closed);
        }
        debug.finish_non_exhaustive()
    }
}

// Cleanup on drop
impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(trigger) = self.trigger.get() {
            trigger.stop();
        }

        let state = self.state.get_mut();
        if !state.closed {
            state.shutdown();
        }
    }
}
