//! Decoders turning raw configuration content into a [`Partial`] tree
//!
//! The core never parses a wire format itself; file-backed sources are
//! handed a [`Decoder`] for the format of their file.

mod format;

pub use format::ConfigFormat;

use std::fmt::Debug;

use serde_json::Value;

use crate::core::{ConfigError, ConfigResult, Partial};

/// Decodes configuration content of one format
pub trait Decoder: Send + Sync + Debug {
    /// Format handled by this decoder
    fn format(&self) -> ConfigFormat;

    /// Decode `content` into a tree. The document root must be a mapping.
    fn decode(&self, content: &str) -> ConfigResult<Partial>;
}

/// Get the decoder for `format`
pub fn decoder_for(format: &ConfigFormat) -> ConfigResult<Box<dyn Decoder>> {
    match format {
        ConfigFormat::Json => Ok(Box::new(JsonDecoder)),
        #[cfg(feature = "toml")]
        ConfigFormat::Toml => Ok(Box::new(TomlDecoder)),
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => Ok(Box::new(YamlDecoder)),
        other => Err(ConfigError::format_not_supported(other.to_string())),
    }
}

fn into_partial(value: Value, format: &ConfigFormat) -> ConfigResult<Partial> {
    match value {
        Value::Object(map) => Ok(Partial::from(map)),
        Value::Null => Ok(Partial::new()),
        _ => Err(ConfigError::parse_error(
            format.to_string(),
            "document root must be a mapping",
        )),
    }
}

/// JSON decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }

    fn decode(&self, content: &str) -> ConfigResult<Partial> {
        let value: Value = serde_json::from_str(content).map_err(|e| {
            ConfigError::parse_error(self.format().to_string(), format!("JSON parse error: {e}"))
        })?;
        into_partial(value, &self.format())
    }
}

/// TOML decoder
#[cfg(feature = "toml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDecoder;

#[cfg(feature = "toml")]
impl Decoder for TomlDecoder {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }

    fn decode(&self, content: &str) -> ConfigResult<Partial> {
        let value: Value = ::toml::from_str(content).map_err(|e| {
            ConfigError::parse_error(self.format().to_string(), format!("TOML parse error: {e}"))
        })?;
        into_partial(value, &self.format())
    }
}

/// YAML decoder
#[cfg(feature = "yaml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

#[cfg(feature = "yaml")]
impl Decoder for YamlDecoder {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Yaml
    }

    fn decode(&self, content: &str) -> ConfigResult<Partial> {
        if content.trim().is_empty() {
            return Ok(Partial::new());
        }
        let value: Value = serde_yaml::from_str(content).map_err(|e| {
            ConfigError::parse_error(self.format().to_string(), format!("YAML parse error: {e}"))
        })?;
        into_partial(value, &self.format())
    }
}
