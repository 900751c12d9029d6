//! Rendering building blocks for card prototypes.
//!
//! `cardpress-render` turns [`Record`](cardpress_table::Record)s into HTML
//! fragments, groups them into decks, pages the decks and, optionally,
//! rasterises the pages.
//!
//! # Pipeline
//!
//! ```text
//! Record ── MacroExpander ──▶ CardContext ── TemplateEngine ──▶ fragment
//!                                                                  │
//!        Deck ◀── DeckAssembler (Deck / Copies columns) ◀──────────┘
//!          │
//!          └── plan(BatchSize) ──▶ Batch ── target template ──▶ page.html
//!                                                    │
//!                          RasterRenderer + add_bleed └──▶ page.png
//! ```
//!
//! # Host Capabilities
//!
//! Screenshots and opening files depend on the host. Both sit behind traits
//! ([`RasterRenderer`], [`Viewer`]) with system implementations
//! ([`ChromeRasterizer`], [`SystemViewer`]) so callers can substitute fakes.

pub mod batch;
mod bleed;
pub mod deck;
mod error;
mod length;
pub mod markup;
pub mod raster;
pub mod template;
mod viewer;

pub use batch::{plan, sanitize_file_name, Batch, BatchPolicy, BatchSize};
pub use bleed::{add_bleed, MAX_BLEED_SIDE};
pub use deck::{Card, Deck, DeckAssembler, TitleCounter};
pub use error::{ConfigError, RenderError};
pub use length::{parse_length, LengthError, LengthUnit};
pub use markup::{AssetResolver, MacroExpander, MacroKind, MacroReference};
pub use raster::{ChromeRasterizer, RasterError, RasterRenderer, SharedSession, Viewport};
pub use template::{CardContext, OverviewContext, TargetContext, TemplateEngine};
pub use viewer::{SystemViewer, Viewer};
