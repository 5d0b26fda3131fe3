//! Declarative source creation
//!
//! Sources can be described as data, typically inside a bootstrap
//! configuration:
//!
//! ```toml
//! [[strata.sources]]
//! id = "defaults"
//! priority = 0
//! type = "file"
//! path = "defaults.toml"
//!
//! [[strata.sources]]
//! id = "env"
//! priority = 100
//! type = "env"
//! prefix = "APP"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Config, ConfigError, ConfigResult, Partial, Source};
use crate::decoders::ConfigFormat;
use crate::sources::{FileSource, MemorySource, ObservableFileSource};

/// Path read by [`SourceFactory::bootstrap`]
pub const BOOTSTRAP_PATH: &str = "strata.sources";

/// Description of a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSpec {
    /// In-memory values
    Memory {
        /// Initial tree
        #[serde(default)]
        values: Partial,
    },

    /// Environment variables
    Env {
        /// Only variables starting with this prefix
        #[serde(default)]
        prefix: Option<String>,

        /// Separator for nested keys
        #[serde(default)]
        separator: Option<String>,

        /// Turn comma-separated values into lists
        #[serde(default = "default_split_lists")]
        split_lists: bool,
    },

    /// File read once
    File {
        /// File path, relative to the factory base directory
        path: PathBuf,

        /// Format; detected from the extension when omitted
        #[serde(default)]
        format: Option<ConfigFormat>,
    },

    /// File re-read when it changes
    ObservableFile {
        /// File path, relative to the factory base directory
        path: PathBuf,

        /// Format; detected from the extension when omitted
        #[serde(default)]
        format: Option<ConfigFormat>,
    },
}

fn default_split_lists() -> bool {
    true
}

/// A source description together with its registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Registration id
    pub id: String,

    /// Registration priority
    #[serde(default)]
    pub priority: i32,

    /// What to create
    #[serde(flatten)]
    pub spec: SourceSpec,
}

/// Creates sources from [`SourceSpec`]s
#[derive(Debug, Clone, Default)]
pub struct SourceFactory {
    base_dir: Option<PathBuf>,
}

impl SourceFactory {
    /// Create a factory resolving paths as given
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory resolving relative paths against `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base_dir) if path.is_relative() => base_dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Create the source described by `spec`
    pub async fn create(&self, spec: &SourceSpec) -> ConfigResult<Arc<dyn Source>> {
        let source: Arc<dyn Source> = match spec {
            SourceSpec::Memory { values } => Arc::new(MemorySource::new(values.clone())),
            SourceSpec::Env {
                prefix,
                separator,
                split_lists,
            } => create_env(prefix.as_deref(), separator.as_deref(), *split_lists)?,
            SourceSpec::File { path, format } => {
                let path = self.resolve_path(path);
                let format = format.clone().unwrap_or_else(|| ConfigFormat::from_path(&path));
                Arc::new(FileSource::open_with_format(path, format).await?)
            }
            SourceSpec::ObservableFile { path, format } => {
                let path = self.resolve_path(path);
                let format = format.clone().unwrap_or_else(|| ConfigFormat::from_path(&path));
                Arc::new(ObservableFileSource::open_with_format(path, format).await?)
            }
        };
        Ok(source)
    }

    /// Create the source described by `tree`, which must deserialize into a
    /// [`SourceSpec`]
    pub async fn create_from_partial(&self, tree: &Partial) -> ConfigResult<Arc<dyn Source>> {
        let spec: SourceSpec = tree.get_as("")?;
        self.create(&spec).await
    }

    /// Register the sources listed under `strata.sources` in `config`.
    ///
    /// Entries are created and registered in list order. The first failure
    /// aborts: the sources this call already registered are removed again
    /// and the entry's error is returned unchanged. Returns the number of
    /// registered sources, zero when the list is absent.
    pub async fn bootstrap(&self, config: &Config) -> ConfigResult<usize> {
        if !config.has(BOOTSTRAP_PATH).await {
            return Ok(0);
        }
        let entries: Vec<SourceEntry> = config.get_as(BOOTSTRAP_PATH).await?;

        let mut registered: Vec<&str> = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Err(e) = self.register(config, entry).await {
                tracing::error!(
                    source_id = %entry.id,
                    error = %e,
                    rolled_back = registered.len(),
                    "Failed to bootstrap configuration source"
                );
                for id in registered.iter().rev() {
                    config.remove_source(id).await;
                }
                return Err(e);
            }
            registered.push(&entry.id);
        }

        tracing::info!(
            sources = entries.len(),
            base_dir = ?self.base_dir,
            "Bootstrapped configuration sources"
        );
        Ok(entries.len())
    }

    async fn register(&self, config: &Config, entry: &SourceEntry) -> ConfigResult<()> {
        if entry.id.is_empty() {
            return Err(ConfigError::invalid_argument(
                "bootstrap source id must not be empty",
            ));
        }
        let source = self.create(&entry.spec).await?;
        config
            .add_source(entry.id.clone(), entry.priority, source)
            .await
    }
}

#[cfg(feature = "env")]
fn create_env(
    prefix: Option<&str>,
    separator: Option<&str>,
    split_lists: bool,
) -> ConfigResult<Arc<dyn Source>> {
    use crate::sources::{EnvOptions, EnvSource};

    let mut options = EnvOptions::default().with_split_lists(split_lists);
    if let Some(prefix) = prefix {
        options = options.with_prefix(prefix);
    }
    if let Some(separator) = separator {
        options = options.with_separator(separator);
    }
    Ok(Arc::new(EnvSource::with_options(options)))
}

#[cfg(not(feature = "env"))]
fn create_env(
    _prefix: Option<&str>,
    _separator: Option<&str>,
    _split_lists: bool,
) -> ConfigResult<Arc<dyn Source>> {
    Err(ConfigError::invalid_argument(
        "environment sources require the `env` feature",
    ))
}
