//! File-based configuration source that follows changes on disk

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::file::read_tree;
use crate::core::{ConfigError, ConfigResult, ObservableSource, Partial, Source};
use crate::decoders::{ConfigFormat, Decoder, decoder_for};

/// Configuration file that is re-read when its modification time advances.
///
/// The tracked modification time starts at the UNIX epoch, so the first
/// [`reload`](ObservableSource::reload) always loads the file. Later
/// reloads compare the file's mtime against the tracked one and leave the
/// tree untouched when it has not moved forward.
#[derive(Debug)]
pub struct ObservableFileSource {
    path: PathBuf,
    decoder: Box<dyn Decoder>,
    state: RwLock<FileState>,
}

#[derive(Debug)]
struct FileState {
    tree: Partial,
    last_modified: SystemTime,
}

impl ObservableFileSource {
    /// Create a source for `path` without reading it yet.
    ///
    /// The tree stays empty until the first successful reload.
    pub fn new(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self::new_with_format(path, format)
    }

    /// Create a source for `path` read as `format`
    pub fn new_with_format(path: impl Into<PathBuf>, format: ConfigFormat) -> ConfigResult<Self> {
        Ok(Self {
            path: path.into(),
            decoder: decoder_for(&format)?,
            state: RwLock::new(FileState {
                tree: Partial::new(),
                last_modified: SystemTime::UNIX_EPOCH,
            }),
        })
    }

    /// Create a source for `path` and load it
    pub async fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let source = Self::new(path)?;
        source.reload().await?;
        Ok(source)
    }

    /// Create a source for `path` read as `format` and load it
    pub async fn open_with_format(
        path: impl Into<PathBuf>,
        format: ConfigFormat,
    ) -> ConfigResult<Self> {
        let source = Self::new_with_format(path, format)?;
        source.reload().await?;
        Ok(source)
    }

    /// Path being followed
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time of the last loaded version, or the UNIX epoch
    /// before the first load
    pub fn last_modified(&self) -> SystemTime {
        self.state.read().last_modified
    }

    async fn modified(&self) -> ConfigResult<SystemTime> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::file_not_found(&self.path)
            } else {
                ConfigError::file_read_error(&self.path, e.to_string())
            }
        })?;
        metadata
            .modified()
            .map_err(|e| ConfigError::file_read_error(&self.path, e.to_string()))
    }
}

impl Source for ObservableFileSource {
    fn has(&self, path: &str) -> bool {
        self.state.read().tree.has(path)
    }

    fn get(&self, path: &str) -> Option<Value> {
        self.state.read().tree.get(path).cloned()
    }

    fn as_observable(self: Arc<Self>) -> Option<Arc<dyn ObservableSource>> {
        Some(self)
    }
}

#[async_trait]
impl ObservableSource for ObservableFileSource {
    async fn reload(&self) -> ConfigResult<bool> {
        let modified = self.modified().await?;
        if modified <= self.last_modified() {
            return Ok(false);
        }

        let tree = read_tree(&self.path, self.decoder.as_ref()).await?;

        let mut state = self.state.write();
        state.tree = tree;
        state.last_modified = modified;
        tracing::trace!(path = %self.path.display(), "Configuration file changed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs::File;
    use std::time::Duration;

    fn write_file(path: &Path, content: &str, modified: SystemTime) {
        std::fs::write(path, content).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_reload_always_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        write_file(&path, r#"{"port": 1}"#, SystemTime::now());

        let source = ObservableFileSource::new(&path).unwrap();
        assert_eq!(source.last_modified(), SystemTime::UNIX_EPOCH);
        assert!(!source.has("port"));

        assert!(source.reload().await.unwrap());
        assert_eq!(source.get("port"), Some(json!(1)));
        assert!(!source.reload().await.unwrap());
    }

    #[tokio::test]
    async fn test_reload_only_when_mtime_advances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(now - 60);
        write_file(&path, r#"{"port": 1}"#, start);

        let source = ObservableFileSource::open(&path).await.unwrap();
        assert_eq!(source.last_modified(), start);

        // Same mtime, different content: not picked up
        write_file(&path, r#"{"port": 2}"#, start);
        assert!(!source.reload().await.unwrap());
        assert_eq!(source.get("port"), Some(json!(1)));

        let later = start + Duration::from_secs(10);
        write_file(&path, r#"{"port": 3}"#, later);
        assert!(source.reload().await.unwrap());
        assert_eq!(source.get("port"), Some(json!(3)));
        assert_eq!(source.last_modified(), later);
    }

    #[tokio::test]
    async fn test_missing_file_keeps_last_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        write_file(&path, r#"{"port": 1}"#, SystemTime::now());

        let source = ObservableFileSource::open(&path).await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(
            source.reload().await.unwrap_err(),
            ConfigError::file_not_found(&path)
        );
        assert_eq!(source.get("port"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ObservableFileSource::open(dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_is_observable() {
        let source: Arc<dyn Source> = Arc::new(ObservableFileSource::new("app.json").unwrap());
        assert!(source.as_observable().is_some());
    }
}
