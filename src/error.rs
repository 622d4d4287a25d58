// --- Файл: src/error.rs ---

//! Error types shared by the loss and metric aggregators.
//!
//! Build-time problems are reported as [`ConfigError`], problems hit while
//! evaluating a batch as [`EvalError`]. [`Error`] wraps both together with the
//! I/O and parse failures of the config loader.

use thiserror::Error;

/// Errors raised while compiling a loss or metric configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An entry is not a single-key mapping (or the section is not a list).
    #[error("yaml format error: {0}")]
    Shape(String),

    /// A loss entry has no `weight` parameter.
    #[error("weight must be in param of '{name}', but param just contains {present:?}")]
    MissingWeight { name: String, present: Vec<String> },

    /// The name does not match any registered kind.
    #[error("unknown {category} kind '{name}', expected one of {known:?}")]
    UnknownKind {
        category: &'static str,
        name: String,
        known: Vec<&'static str>,
    },

    /// A constructor rejected the supplied parameters.
    #[error("failed to construct '{name}': {message}")]
    Construction { name: String, message: String },
}

impl ConfigError {
    pub(crate) fn construction(name: &str, message: impl Into<String>) -> Self {
        ConfigError::Construction {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while evaluating a composite on one batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("model output has no entry '{0}'")]
    MissingOutput(String),

    #[error("expected a tensor at '{0}', found a nested output")]
    NotATensor(String),

    #[error("expected a dict model output to look up '{0}'")]
    NotADict(String),

    #[error("shape error in {context}: {message}")]
    Shape { context: String, message: String },

    #[error("label {label} is out of range for {num_classes} classes")]
    LabelOutOfRange { label: f32, num_classes: usize },

    #[error("invalid input for {context}: {message}")]
    InvalidInput { context: String, message: String },
}

impl EvalError {
    pub(crate) fn shape(context: &str, message: impl Into<String>) -> Self {
        EvalError::Shape {
            context: context.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(context: &str, message: impl Into<String>) -> Self {
        EvalError::InvalidInput {
            context: context.to_string(),
            message: message.into(),
        }
    }
}

/// Top-level error for callers that load configuration from disk.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(String),
}
