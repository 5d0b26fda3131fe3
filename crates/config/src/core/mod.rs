//! Core configuration functionality

pub mod builder;
pub mod config;
pub mod error;
pub mod partial;
pub mod result;
pub mod source;

// Re-export core types
pub use builder::ConfigBuilder;
pub use config::{Config, ObserverCallback};
pub use error::{ConfigError, ErrorCategory};
pub use partial::Partial;
pub use result::{ConfigResult, ConfigResultExt};
pub use source::{ObservableSource, Source};
