//! Error types for card rendering.
//!
//! [`RenderError`] covers template compilation and rendering. [`ConfigError`]
//! is raised while validating user options before any rendering starts, so a
//! bad `--batch-size` or `--bleed` never produces partial output.

use std::fmt;

use crate::length::LengthError;

/// Error type for template operations.
///
/// Keeps minijinja's error kinds out of the public API.
#[derive(Debug)]
pub enum RenderError {
    /// Template syntax error or failure while evaluating it.
    TemplateError(String),

    /// No template registered under this name.
    TemplateNotFound(String),

    /// Context data could not be converted into template values.
    SerializationError(String),

    /// I/O error (e.g., reading a template from disk).
    IoError(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TemplateError(msg) => write!(f, "template error: {}", msg),
            RenderError::TemplateNotFound(name) => write!(f, "template not found: {}", name),
            RenderError::SerializationError(msg) => write!(f, "serialization error: {}", msg),
            RenderError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::IoError(err)
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        // `{:#}` includes the template name and line in the message.
        let msg = format!("{:#}", err);
        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(msg),
            ErrorKind::BadSerialization => RenderError::SerializationError(msg),
            _ => RenderError::TemplateError(msg),
        }
    }
}

/// Invalid user-supplied options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("batch size cannot be < 1 (got {0})")]
    InvalidBatchSize(i64),

    #[error("invalid bleed: {0}")]
    InvalidBleed(#[from] LengthError),
}
