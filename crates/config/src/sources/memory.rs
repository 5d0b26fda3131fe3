//! In-memory configuration source

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::core::{ConfigResult, ObservableSource, Partial, Source};

/// Configuration held in memory.
///
/// Useful for defaults and for values computed at runtime. Every mutation
/// marks the source as changed; the next [`reload`](ObservableSource::reload)
/// reports it so the owning configuration rebuilds.
#[derive(Debug, Default)]
pub struct MemorySource {
    tree: RwLock<Partial>,
    dirty: AtomicBool,
}

impl MemorySource {
    /// Create a source holding `tree`
    pub fn new(tree: Partial) -> Self {
        Self {
            tree: RwLock::new(tree),
            dirty: AtomicBool::new(false),
        }
    }

    /// Replace the whole tree
    pub fn replace(&self, tree: Partial) {
        *self.tree.write() = tree;
        self.dirty.store(true, Ordering::Release);
    }

    /// Store `value` at `path`
    pub fn set(&self, path: &str, value: Value) -> ConfigResult<()> {
        self.tree.write().set(path, value)?;
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Copy of the current tree
    pub fn snapshot(&self) -> Partial {
        self.tree.read().clone()
    }
}

impl Source for MemorySource {
    fn has(&self, path: &str) -> bool {
        self.tree.read().has(path)
    }

    fn get(&self, path: &str) -> Option<Value> {
        self.tree.read().get(path).cloned()
    }

    fn as_observable(self: Arc<Self>) -> Option<Arc<dyn ObservableSource>> {
        Some(self)
    }
}

#[async_trait]
impl ObservableSource for MemorySource {
    async fn reload(&self) -> ConfigResult<bool> {
        Ok(self.dirty.swap(false, Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mutations_are_reported_once() {
        let source = MemorySource::new(Partial::try_from(json!({"a": 1})).unwrap());
        assert!(!source.reload().await.unwrap());

        source.set("b.c", json!(true)).unwrap();
        assert!(source.reload().await.unwrap());
        assert!(!source.reload().await.unwrap());

        assert!(source.has("b.c"));
        assert_eq!(source.get(""), Some(json!({"a": 1, "b": {"c": true}})));
    }

    #[tokio::test]
    async fn test_replace() {
        let source = MemorySource::default();
        assert!(!source.has("x"));

        source.replace(Partial::try_from(json!({"x": "y"})).unwrap());
        assert!(source.reload().await.unwrap());
        assert_eq!(source.snapshot().get_string("x").unwrap(), "y");
    }

    #[test]
    fn test_is_observable() {
        let source: Arc<dyn Source> = Arc::new(MemorySource::default());
        assert!(source.as_observable().is_some());
    }
}
