//! Project settings and resolved conversion options.
//!
//! Settings come from three layers, highest priority first:
//!
//! 1. command-line flags ([`ConvertOverrides`])
//! 2. `cardpress.yaml` in the project root ([`ProjectConfig`])
//! 3. built-in defaults
//!
//! ```yaml
//! target: sprite
//! batch_size: 9
//! bleed: 3mm
//! image: true
//! browser: "flatpak run org.chromium.Chromium"
//! browser_timeout_secs: 120
//! ```
//!
//! [`ConvertOptions::resolve`] validates the merged values, so a bad batch
//! size or bleed is reported before anything is rendered.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use cardpress_render::{
    parse_length, BatchSize, ChromeRasterizer, ConfigError, LengthError, MAX_BLEED_SIDE,
};
use serde::Deserialize;

use crate::error::ConvertError;
use crate::project::ProjectLayout;

/// Target used when neither flags nor settings name one.
pub const DEFAULT_TARGET: &str = "default";

/// Contents of `cardpress.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub target: Option<String>,
    pub batch_size: Option<i64>,
    pub bleed: Option<String>,
    pub image: Option<bool>,
    pub backs: Option<bool>,
    pub overview: Option<bool>,
    pub browser: Option<String>,
    pub browser_timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Reads the settings file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        Self::parse(&text).map_err(|source| ConvertError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses settings from YAML text. An empty document is valid.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// The screenshot backend these settings describe.
    pub fn rasterizer(&self) -> ChromeRasterizer {
        let rasterizer = ChromeRasterizer::new(self.browser.clone());
        match self.browser_timeout_secs {
            Some(secs) => rasterizer.with_timeout(Duration::from_secs(secs)),
            None => rasterizer,
        }
    }
}

/// Values given on the command line. `None`/`false` defer to the settings
/// file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOverrides {
    pub target: Option<String>,
    pub card_type: Option<String>,
    pub batch_size: Option<i64>,
    pub single: bool,
    pub bleed: Option<String>,
    pub image: bool,
    pub backs: bool,
    pub overview: bool,
    pub open_files: bool,
}

/// Validated options for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub project: ProjectLayout,
    pub target: String,
    /// Only card types whose name contains this substring are converted.
    pub card_type: Option<String>,
    pub batch_size: Option<BatchSize>,
    /// Bleed in pixels added around every image.
    pub bleed: u32,
    pub image: bool,
    pub backs: bool,
    pub overview: bool,
    pub open_files: bool,
}

impl ConvertOptions {
    /// Default options for `project`: the default target, one page per deck,
    /// HTML only.
    pub fn new(project: ProjectLayout) -> Self {
        Self {
            project,
            target: DEFAULT_TARGET.to_string(),
            card_type: None,
            batch_size: None,
            bleed: 0,
            image: false,
            backs: false,
            overview: false,
            open_files: false,
        }
    }

    /// Merges flags over settings over defaults and validates the result.
    pub fn resolve(
        project: ProjectLayout,
        config: &ProjectConfig,
        overrides: &ConvertOverrides,
    ) -> Result<Self, ConfigError> {
        let batch_size = if overrides.single {
            Some(BatchSize::single())
        } else {
            overrides
                .batch_size
                .or(config.batch_size)
                .map(BatchSize::new)
                .transpose()?
        };
        let bleed = match overrides.bleed.as_deref().or(config.bleed.as_deref()) {
            Some(raw) => parse_bleed(raw)?,
            None => 0,
        };

        Ok(Self {
            project,
            target: overrides
                .target
                .clone()
                .or_else(|| config.target.clone())
                .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            card_type: overrides.card_type.clone(),
            batch_size,
            bleed,
            image: overrides.image || config.image.unwrap_or(false),
            backs: overrides.backs || config.backs.unwrap_or(false),
            overview: overrides.overview || config.overview.unwrap_or(false),
            open_files: overrides.open_files,
        })
    }
}

/// A bleed wider than half the largest image side can never be applied.
fn parse_bleed(raw: &str) -> Result<u32, ConfigError> {
    let bleed = parse_length(raw)?;
    if bleed > MAX_BLEED_SIDE / 2 {
        return Err(LengthError::TooLarge(raw.to_string()).into());
    }
    Ok(bleed)
}
