//! File-based configuration source

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::{ConfigError, ConfigResult, Partial, Source};
use crate::decoders::{ConfigFormat, Decoder, decoder_for};

/// Configuration read from a file once, when the source is opened
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    format: ConfigFormat,
    tree: Partial,
}

impl FileSource {
    /// Open `path`, detecting the format from its extension
    pub async fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self::open_with_format(path, format).await
    }

    /// Open `path` as `format`
    pub async fn open_with_format(
        path: impl Into<PathBuf>,
        format: ConfigFormat,
    ) -> ConfigResult<Self> {
        let path = path.into();
        let decoder = decoder_for(&format)?;
        let tree = read_tree(&path, decoder.as_ref()).await?;
        Ok(Self { path, format, tree })
    }

    /// Path the configuration was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the file
    pub fn format(&self) -> &ConfigFormat {
        &self.format
    }
}

impl Source for FileSource {
    fn has(&self, path: &str) -> bool {
        self.tree.has(path)
    }

    fn get(&self, path: &str) -> Option<Value> {
        self.tree.get(path).cloned()
    }
}

/// Read and decode the file at `path`
pub(crate) async fn read_tree(path: &Path, decoder: &dyn Decoder) -> ConfigResult<Partial> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::file_not_found(path)
        } else {
            ConfigError::file_read_error(path, e.to_string())
        }
    })?;

    let tree = decoder.decode(&content).map_err(|e| match e {
        ConfigError::ParseError { message, .. } => {
            ConfigError::parse_error(path.display().to_string(), message)
        }
        other => other,
    })?;

    tracing::debug!(
        path = %path.display(),
        format = %decoder.format(),
        keys = tree.len(),
        "Loaded configuration file"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn test_open_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"server": {{"port": 8080}}}}"#).unwrap();

        let source = FileSource::open(file.path()).await.unwrap();
        assert_eq!(source.format(), &ConfigFormat::Json);
        assert_eq!(source.get("server.port"), Some(json!(8080)));
        assert!(!source.has("server.host"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = FileSource::open(&path).await.unwrap_err();
        assert_eq!(err, ConfigError::file_not_found(&path));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_parse_error_names_the_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[1, 2]").unwrap();

        match FileSource::open(file.path()).await.unwrap_err() {
            ConfigError::ParseError { origin, .. } => {
                assert_eq!(origin, file.path().display().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            FileSource::open(file.path()).await,
            Err(ConfigError::FormatNotSupported { .. })
        ));
    }
}
