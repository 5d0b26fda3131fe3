//! Result type and utilities for configuration operations

use super::error::ConfigError;

/// Standard result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Extension trait for Result types to add configuration-specific utilities
pub trait ConfigResultExt<T> {
    /// Convert error with additional context
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String;

    /// Convert to option, logging error if present
    fn log_error(self) -> Option<T>;
}

impl<T> ConfigResultExt<T> for ConfigResult<T> {
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e {
            ConfigError::SourceError { message, origin } => {
                let ctx = f();
                ConfigError::SourceError {
                    message: format!("{ctx}: {message}"),
                    origin,
                }
            }
            other => ConfigError::SourceError {
                message: f(),
                origin: other.to_string(),
            },
        })
    }

    fn log_error(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(error = %e, "Configuration error");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_wraps_error() {
        let result: ConfigResult<i32> = Err(ConfigError::path_not_found("a.b"));
        let err = result
            .with_context(|| "loading bootstrap entries".to_string())
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::SourceError {
                message: "loading bootstrap entries".to_string(),
                origin: "Configuration path not found: a.b".to_string(),
            }
        );
    }

    #[test]
    fn test_with_context_prefixes_source_error() {
        let result: ConfigResult<()> = Err(ConfigError::source_error("boom", "env"));
        let err = result.with_context(|| "reload".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "Configuration source error (env): reload: boom");
    }

    #[test]
    fn test_log_error() {
        assert_eq!(Ok::<_, ConfigError>(7).log_error(), Some(7));
        assert_eq!(Err::<i32, _>(ConfigError::Closed).log_error(), None);
    }
}
