//! Card prototyping from spreadsheets.
//!
//! `cardpress` reads card definitions from `cards/` (one row per card, in
//! csv, ods or xlsx), renders each row through the card type's MiniJinja
//! template, groups the cards into decks and wraps them in a target layout
//! from `targets/`. Pages can also be screenshotted to PNG with a print
//! bleed.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cardpress::{convert, ConvertOptions, ProjectLayout, Services};
//! use cardpress_render::ChromeRasterizer;
//! use cardpress_table::TableCache;
//!
//! let mut options = ConvertOptions::new(ProjectLayout::new("my-game"));
//! options.overview = true;
//!
//! let services = Services::system(ChromeRasterizer::default());
//! let report = convert(&options, &mut TableCache::new(), &services)?;
//! println!("{} cards", report.cards);
//! # Ok::<(), cardpress::ConvertError>(())
//! ```
//!
//! # Card Data
//!
//! | Column | Meaning |
//! |--------|---------|
//! | first | card title, used to name single-card pages |
//! | `Deck` | deck the card goes to (default: the card type) |
//! | `Copies` | number of identical cards (default: 1) |
//! | any | bound under its header name in the card template |
//!
//! Field values are markdown. `{name}` inlines an icon from `icons/`,
//! `{{name}}` an image from `images/`.
//!
//! # Modules
//!
//! - [`convert`]: the pipeline and its report
//! - [`watch`]: re-running on file changes
//! - [`config`]: `cardpress.yaml` and option resolution
//! - [`scaffold`]: project and card type starters
//! - [`cli`]: the `cardpress` command

pub mod cli;
pub mod config;
pub mod convert;
mod error;
pub mod logging;
pub mod presets;
pub mod project;
pub mod scaffold;
pub mod watch;

pub use config::{ConvertOptions, ConvertOverrides, ProjectConfig};
pub use convert::{convert, ArtifactKind, ConversionReport, OutputArtifact, Services};
pub use error::{ConvertError, ScaffoldError};
pub use project::{CardType, ProjectLayout};
pub use watch::{run_loop, watch, WatchSignal, WatchState};
