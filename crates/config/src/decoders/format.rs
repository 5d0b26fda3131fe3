//! Configuration format detection

use serde::{Deserialize, Serialize};

/// Configuration format
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// JSON format
    Json,

    /// TOML format
    Toml,

    /// YAML format
    Yaml,

    /// Unknown format
    #[serde(untagged)]
    Unknown(String),
}

impl ConfigFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Yaml => "yml",
            ConfigFormat::Unknown(ext) => ext,
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "json" => ConfigFormat::Json,
            "toml" => ConfigFormat::Toml,
            "yml" | "yaml" => ConfigFormat::Yaml,
            _ => ConfigFormat::Unknown(ext.to_string()),
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(ConfigFormat::Unknown("no_extension".to_string()))
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Json => write!(f, "JSON"),
            ConfigFormat::Toml => write!(f, "TOML"),
            ConfigFormat::Yaml => write!(f, "YAML"),
            ConfigFormat::Unknown(s) => write!(f, "Unknown ({s})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_format_detection() {
        assert_eq!(ConfigFormat::from_extension("json"), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_extension("YML"), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_extension("yaml"), ConfigFormat::Yaml);
        assert!(matches!(
            ConfigFormat::from_extension("ini"),
            ConfigFormat::Unknown(_)
        ));

        assert_eq!(
            ConfigFormat::from_path(Path::new("config.toml")),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("noext")),
            ConfigFormat::Unknown("no_extension".to_string())
        );
        assert_eq!(ConfigFormat::Yaml.extension(), "yml");
    }

    #[test]
    fn test_config_format_serde_names() {
        let format: ConfigFormat = serde_json::from_str("\"toml\"").unwrap();
        assert_eq!(format, ConfigFormat::Toml);
        assert_eq!(serde_json::to_string(&ConfigFormat::Json).unwrap(), "\"json\"");

        let unknown: ConfigFormat = serde_json::from_str("\"hcl\"").unwrap();
        assert_eq!(unknown, ConfigFormat::Unknown("hcl".to_string()));
        assert_eq!(unknown.to_string(), "Unknown (hcl)");
    }
}
