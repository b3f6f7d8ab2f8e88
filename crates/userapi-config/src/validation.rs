//! Configuration validation module.
//!
//! Collects every problem in one pass so startup fails with a complete
//! report instead of one error at a time.

use crate::{AppConfig, BackendKind, DatabaseConfig};
use std::fmt;
use userapi_core::UserApiError;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Backend kind is not one of the supported engines.
    UnsupportedBackend { value: String },
    /// Port number is invalid (must be 1-65535).
    InvalidPort { value: u16 },
    /// A required string field is empty.
    MissingField { name: &'static str },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: &'static str },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBackend { value } => {
                write!(f, "Unsupported database type '{}'", value)
            }
            Self::InvalidPort { value } => {
                write!(f, "Invalid database port: {} (must be 1-65535)", value)
            }
            Self::MissingField { name } => write!(f, "{} must not be empty", name),
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} is outside 1..={}", value, maximum)
            }
            Self::NonPositiveTimeout { name } => write!(f, "Timeout '{}' must be positive", name),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Folds validation failures into a single configuration error.
#[must_use]
pub fn to_configuration_error(errors: &[ConfigValidationError]) -> UserApiError {
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    UserApiError::configuration(joined)
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let errors = Self::validate_database(&config.database);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates database configuration.
    #[must_use]
    pub fn validate_database(config: &DatabaseConfig) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if config.kind.parse::<BackendKind>().is_err() {
            errors.push(ConfigValidationError::UnsupportedBackend {
                value: config.kind.clone(),
            });
        }

        if config.port == 0 {
            errors.push(ConfigValidationError::InvalidPort { value: config.port });
        }

        if config.host.trim().is_empty() {
            errors.push(ConfigValidationError::MissingField { name: "database.host" });
        }
        if config.name.trim().is_empty() {
            errors.push(ConfigValidationError::MissingField { name: "database.name" });
        }

        if config.min_connections > config.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if config.max_connections == 0 || config.max_connections > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.connect_timeout_secs",
            });
        }
        if config.shutdown_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.shutdown_timeout_secs",
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_passes() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_unsupported_backend() {
        let mut config = AppConfig::default();
        config.database.kind = "cassandra".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigValidationError::UnsupportedBackend { value } if value == "cassandra"
        )));
    }

    #[test]
    fn test_invalid_port() {
        let mut config = AppConfig::default();
        config.database.port = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors, vec![ConfigValidationError::InvalidPort { value: 0 }]);
    }

    #[test]
    fn test_invalid_pool_size() {
        let mut config = AppConfig::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::InvalidPoolSize { min: 20, max: 5 })));
    }

    #[test]
    fn test_zero_pool_size() {
        let mut config = AppConfig::default();
        config.database.min_connections = 0;
        config.database.max_connections = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigValidationError::PoolSizeTooLarge { value: 0, .. })));
    }

    #[test]
    fn test_collects_multiple_errors() {
        let mut config = AppConfig::default();
        config.database.host = String::new();
        config.database.name = "  ".to_string();
        config.database.connect_timeout_secs = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ConfigValidationError::MissingField { name: "database.host" }));
        assert!(errors.contains(&ConfigValidationError::MissingField { name: "database.name" }));
    }

    #[test]
    fn test_error_display() {
        let err = ConfigValidationError::UnsupportedBackend {
            value: "oracle".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported database type 'oracle'");
    }
}
