//! Built-in configuration sources

#[cfg(feature = "env")]
mod env;
mod file;
mod memory;
mod observable_file;

#[cfg(feature = "env")]
pub use env::{EnvOptions, EnvSource};
pub use file::FileSource;
pub use memory::MemorySource;
pub use observable_file::ObservableFileSource;
