//! Error types for the conversion pipeline and the scaffolding commands.

use std::io;
use std::path::PathBuf;

use cardpress_render::{ConfigError, RenderError};

/// Errors that abort a conversion run.
///
/// Everything that only affects one card type or one artifact is logged and
/// skipped instead, so reaching one of these means no useful output can be
/// produced.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("target '{name}' not found (path: {})", .path.display())]
    MissingTarget { name: String, path: PathBuf },

    #[error("error parsing target template: {0}")]
    Render(#[from] RenderError),

    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("invalid settings in {}: {source}", .path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from `create`, `create-example` and `add-type`.
#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("{} is not empty. Use --force to create anyway.", .0.display())]
    NotEmpty(PathBuf),

    #[error("card type {0} already exists. Use --force to overwrite.")]
    TypeExists(String),

    #[error("'{0}' is not a valid card type name")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
