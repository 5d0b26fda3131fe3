//! Strata Config - layered, hot-reloadable configuration
//!
//! Configuration is merged from prioritized sources into one tree. Sources
//! that can change (files on disk, in-memory overrides) are polled in the
//! background, and observers are told when a value they watch changes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use strata_config::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> ConfigResult<()> {
//!     let config = ConfigBuilder::new()
//!         .with_source("defaults", 0, Arc::new(FileSource::open("defaults.toml").await?))
//!         .with_source("local", 10, Arc::new(ObservableFileSource::open("local.toml").await?))
//!         .with_source("env", 100, Arc::new(EnvSource::with_prefix("APP")))
//!         .with_reload_period(Duration::from_secs(5))
//!         .with_observer("server.port", |old, new| {
//!             println!("port changed from {old} to {new}");
//!         })
//!         .build()
//!         .await?;
//!
//!     let port = config.get_int_or("server.port", 8080).await?;
//!     let host = config.get_string("server.host").await?;
//!     println!("listening on {host}:{port}");
//!
//!     config.close().await;
//!     Ok(())
//! }
//! ```

#![deny(unused_must_use)]
#![warn(missing_docs)]

// Core module with main functionality
pub mod core;

// Implementation modules
pub mod decoders;
pub mod factory;
pub mod sources;
pub mod trigger;

// Re-export main types from core
pub use core::{
    Config, ConfigBuilder, ConfigError, ConfigResult, ConfigResultExt, ErrorCategory,
    ObservableSource, ObserverCallback, Partial, Source,
};

pub use decoders::{ConfigFormat, Decoder, JsonDecoder, decoder_for};
#[cfg(feature = "toml")]
pub use decoders::TomlDecoder;
#[cfg(feature = "yaml")]
pub use decoders::YamlDecoder;

pub use factory::{SourceEntry, SourceFactory, SourceSpec};

#[cfg(feature = "env")]
pub use sources::{EnvOptions, EnvSource};
pub use sources::{FileSource, MemorySource, ObservableFileSource};

pub use trigger::{OneShotTrigger, RecurringTrigger, Trigger};

/// Prelude module for convenient imports
pub mod prelude {
    //! Prelude for common imports
    //!
    //! # Example
    //! ```rust
    //! use strata_config::prelude::*;
    //! ```

    pub use crate::core::{
        Config, ConfigBuilder, ConfigError, ConfigResult, ConfigResultExt, ObservableSource,
        Partial, Source,
    };

    pub use crate::decoders::ConfigFormat;
    pub use crate::factory::{SourceEntry, SourceFactory, SourceSpec};

    #[cfg(feature = "env")]
    pub use crate::sources::{EnvOptions, EnvSource};
    pub use crate::sources::{FileSource, MemorySource, ObservableFileSource};
}
