//! Error types for rule configuration and config files.

use thiserror::Error;

/// Result type for transform rule configuration.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A rejected transform rule. The pipeline is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// First argument is not `freq`, `amp` or `db`.
    #[error("transform target '{0}' not recognized, valid targets are freq, amp and db")]
    UnknownTarget(String),

    /// Operator not valid for the given target.
    #[error(
        "transform operator '{operator}' not valid for {target}, valid operators are = and * for amp and freq; =, + and - for db"
    )]
    UnknownOperator {
        /// Target the operator was given for.
        target: String,
        /// The rejected operator.
        operator: String,
    },

    /// Selector symbol not recognized.
    #[error("transform selector '{0}' not recognized, known values are = odd even > >= < <= all outlier")]
    UnknownSelector(String),

    /// Comparison selector given without its numeric argument.
    #[error("transform selector '{0}' requires a numeric argument")]
    MissingSelectorArgument(String),

    /// Operand or selector argument is NaN or infinite.
    #[error("transform {name} must be finite, got {value}")]
    NonFinite {
        /// Which argument was rejected.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// Errors that can occur while loading, saving or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the analyzer cannot work with.
    #[error("invalid config field '{name}': {message}")]
    InvalidField {
        /// Field name.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
