//! The conversion pipeline.
//!
//! One run converts every card type of a project into pages for one target:
//!
//! 1. load and compile `targets/<target>.html` (missing or invalid aborts the run)
//! 2. clear `output/<target>/`
//! 3. per card type: find its data, render one fragment per row, assemble decks
//! 4. per deck (in parallel): plan batches, write `<batch>.html` and optionally
//!    `<batch>.png`, plus the card back
//! 5. optionally write `output/<target>.html` listing every page
//!
//! Problems with one card type or one artifact are logged and counted in the
//! [`ConversionReport`]; they never stop the other card types.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cardpress_render::deck::DECK_FIELD;
use cardpress_render::{
    add_bleed, plan, sanitize_file_name, AssetResolver, CardContext, ChromeRasterizer, Deck,
    DeckAssembler, MacroExpander, OverviewContext, RasterRenderer, SystemViewer, TargetContext,
    TemplateEngine, Viewer, Viewport,
};
use cardpress_table::TableCache;
use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};

use crate::config::ConvertOptions;
use crate::error::ConvertError;
use crate::presets;
use crate::project::CardType;

const TARGET_TEMPLATE: &str = "target";
const OVERVIEW_TEMPLATE: &str = "overview";

/// Host capabilities used by the pipeline.
#[derive(Clone)]
pub struct Services {
    pub raster: Arc<dyn RasterRenderer>,
    pub viewer: Arc<dyn Viewer>,
}

impl Services {
    pub fn new(raster: Arc<dyn RasterRenderer>, viewer: Arc<dyn Viewer>) -> Self {
        Self { raster, viewer }
    }

    /// Headless Chrome screenshots and the platform file opener.
    pub fn system(rasterizer: ChromeRasterizer) -> Self {
        Self::new(Arc::new(rasterizer), Arc::new(SystemViewer))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// What kind of file an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Html,
    Image,
}

/// A file written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl OutputArtifact {
    fn html(path: PathBuf) -> Self {
        Self {
            path,
            kind: ArtifactKind::Html,
        }
    }

    fn image(path: PathBuf) -> Self {
        Self {
            path,
            kind: ArtifactKind::Image,
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Every file written, in deck and batch order. The overview comes last.
    pub artifacts: Vec<OutputArtifact>,
    /// Card types that produced nothing because of an error or missing data.
    pub skipped_types: Vec<String>,
    /// Cards rendered, copies included.
    pub cards: usize,
    /// Artifacts that could not be produced.
    pub failures: usize,
    /// The overview page, if one was written.
    pub overview: Option<PathBuf>,
}

impl ConversionReport {
    pub fn artifacts_of(&self, kind: ArtifactKind) -> impl Iterator<Item = &Path> {
        self.artifacts
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.path.as_path())
    }

    fn absorb(&mut self, page: PageOutcome) {
        self.artifacts.extend(page.artifacts);
        self.failures += page.failures;
    }
}

/// Runs the pipeline once.
///
/// Returns an error only for problems that make the whole run pointless: an
/// invalid target template or a missing `cards/` directory.
pub fn convert(
    options: &ConvertOptions,
    cache: &mut TableCache,
    services: &Services,
) -> Result<ConversionReport, ConvertError> {
    let project = &options.project;
    let target_path = project.target_template(&options.target);
    if !target_path.is_file() {
        return Err(ConvertError::MissingTarget {
            name: options.target.clone(),
            path: target_path,
        });
    }
    let cards_dir = project.cards_dir();
    if !cards_dir.is_dir() {
        return Err(ConvertError::MissingDirectory(cards_dir));
    }

    info!(path = %target_path.display(), "using target template");
    let target_source = fs::read_to_string(&target_path)?;

    // Cleared before the expander runs, since it copies images into it.
    let output_dir = project.clear_output(&options.target)?;

    let expander = Arc::new(MacroExpander::new(AssetResolver::new(
        project.icons_dir(),
        project.images_dir(),
        &output_dir,
    )));
    let mut engine = TemplateEngine::new(Arc::clone(&expander));
    engine.add_template(TARGET_TEMPLATE, &target_source)?;
    if options.overview {
        engine.add_template(OVERVIEW_TEMPLATE, presets::OVERVIEW)?;
    }

    let globaltargetcss = project.global_css();
    let scripts = project.scripts();

    let mut report = ConversionReport::default();
    let mut page_names = Vec::new();
    let mut deck_owners: HashMap<String, String> = HashMap::new();

    for card_type in project.card_types() {
        let span = info_span!("card_type", name = %card_type.name);
        let _enter = span.enter();

        if let Some(filter) = &options.card_type {
            if !card_type.name.contains(filter.as_str()) {
                debug!(filter = %filter, "type does not match filter, skipping");
                continue;
            }
        }

        let Some(decks) = render_decks(&card_type, &mut engine, &expander, cache) else {
            report.skipped_types.push(card_type.name.clone());
            continue;
        };
        for deck in &decks {
            if let Some(owner) = deck_owners.insert(deck.name.clone(), card_type.name.clone()) {
                if owner != card_type.name {
                    warn!(deck = %deck.name, other = %owner, "deck name used by another card type, pages may be overwritten");
                }
            }
        }

        let cardtypecss = card_type.css();
        let writer = PageWriter {
            engine: &engine,
            services,
            output_dir: &output_dir,
            target_source: &target_source,
            card_type: &card_type.name,
            cardtypecss: &cardtypecss,
            globaltargetcss: &globaltargetcss,
            scripts: &scripts,
            image: options.image,
            bleed: options.bleed,
        };

        let pages: Vec<PageOutcome> = decks
            .par_iter()
            .flat_map(|deck| writer.write_deck(deck, options))
            .collect();

        let cards: usize = decks.iter().map(Deck::len).sum();
        report.cards += cards;
        for page in pages {
            if !page.is_back && !page.artifacts.is_empty() {
                page_names.push(page.name.clone());
            }
            report.absorb(page);
        }
        info!(count = cards, path = %output_dir.display(), "created cards");
    }

    if options.overview {
        write_overview(&engine, options, &page_names, &mut report);
    }
    if options.open_files {
        open_artifacts(services.viewer.as_ref(), options, &report);
    }

    Ok(report)
}

/// Renders every row of `card_type` and groups the fragments into decks.
///
/// Returns `None` if the type has no data or its template does not compile.
/// A row that fails to render stops the remaining rows; the cards rendered
/// so far are kept.
fn render_decks(
    card_type: &CardType,
    engine: &mut TemplateEngine,
    expander: &MacroExpander,
    cache: &mut TableCache,
) -> Option<Vec<Deck>> {
    let Some(source) = card_type.data_source() else {
        warn!(template = %card_type.template.display(), "card data file missing, skipping");
        return None;
    };
    let records = match source.records(cache) {
        Ok(records) => records,
        Err(err) => {
            warn!(path = %source.path.display(), %err, "reading card data failed, skipping");
            return None;
        }
    };
    let template = card_template_name(&card_type.name);
    let compiled = fs::read_to_string(&card_type.template)
        .map_err(|err| err.to_string())
        .and_then(|text| {
            engine
                .add_template(&template, &text)
                .map_err(|err| err.to_string())
        });
    if let Err(err) = compiled {
        warn!(%err, "error parsing card type template, skipping");
        return None;
    }

    let mut assembler = DeckAssembler::new(&card_type.name);
    for (row, record) in records.iter().enumerate() {
        let context = CardContext::from_record(record, expander);
        match engine.render_card(&template, &context) {
            Ok(fragment) => assembler.push(record, Arc::from(fragment)),
            Err(err) => {
                error!(row = row + 1, %err, "rendering card failed, skipping remaining rows");
                break;
            }
        }
    }
    Some(assembler.finish())
}

fn card_template_name(card_type: &str) -> String {
    format!("cards/{card_type}")
}

/// One page produced by a [`PageWriter`].
#[derive(Debug, Default)]
struct PageOutcome {
    name: String,
    is_back: bool,
    artifacts: Vec<OutputArtifact>,
    failures: usize,
}

/// Everything shared by the pages of one card type.
struct PageWriter<'a> {
    engine: &'a TemplateEngine,
    services: &'a Services,
    output_dir: &'a Path,
    target_source: &'a str,
    card_type: &'a str,
    cardtypecss: &'a str,
    globaltargetcss: &'a str,
    scripts: &'a [String],
    image: bool,
    bleed: u32,
}

impl PageWriter<'_> {
    /// Writes every batch of `deck` and, if requested, its back.
    fn write_deck(&self, deck: &Deck, options: &ConvertOptions) -> Vec<PageOutcome> {
        let batches = plan(deck, options.batch_size);
        let mut pages: Vec<PageOutcome> = batches
            .par_iter()
            .map(|batch| {
                let fragments = batch.cards.iter().map(|c| &*c.fragment).collect();
                let page = self.write_page(&batch.name, &deck.name, fragments);
                debug!(deck = %deck.name, page = %batch.name, count = batch.cards.len(), "created page");
                page
            })
            .collect();
        if options.backs {
            pages.push(self.write_back(deck));
        }
        pages
    }

    /// Renders the card template with only the deck name bound.
    fn write_back(&self, deck: &Deck) -> PageOutcome {
        let name = format!("{} back", sanitize_file_name(&deck.name));
        let mut context = CardContext::new();
        context.insert(DECK_FIELD, deck.name.as_str());
        let mut page = match self
            .engine
            .render_card(&card_template_name(self.card_type), &context)
        {
            Ok(fragment) => self.write_page(&name, &deck.name, vec![fragment.as_str()]),
            Err(err) => {
                error!(deck = %deck.name, %err, "rendering card back failed, skipping");
                PageOutcome {
                    name,
                    failures: 1,
                    ..Default::default()
                }
            }
        };
        page.is_back = true;
        page
    }

    /// Wraps `fragments` in the target template and writes the page.
    fn write_page(&self, name: &str, deck: &str, fragments: Vec<&str>) -> PageOutcome {
        let mut page = PageOutcome {
            name: name.to_string(),
            ..Default::default()
        };
        let context = TargetContext {
            name: self.card_type,
            cards: fragments,
            cardtypecss: self.cardtypecss,
            globaltargetcss: self.globaltargetcss,
            scripts: self.scripts,
        };
        let html = match self.engine.render(TARGET_TEMPLATE, &context) {
            Ok(html) => html,
            Err(err) => {
                error!(page = %name, %err, "rendering target failed, skipping");
                page.failures += 1;
                return page;
            }
        };

        let html_path = self.output_dir.join(format!("{name}.html"));
        if let Err(err) = fs::write(&html_path, html) {
            error!(path = %html_path.display(), %err, "writing output failed, skipping");
            page.failures += 1;
            return page;
        }
        page.artifacts.push(OutputArtifact::html(html_path.clone()));

        if self.image {
            let png_path = self.output_dir.join(format!("{name}.png"));
            let viewport = Viewport::from_template(self.target_source, &[deck, self.card_type]);
            match self.rasterize(&html_path, &png_path, viewport) {
                Ok(()) => {
                    info!(path = %png_path.display(), "added image");
                    page.artifacts.push(OutputArtifact::image(png_path));
                }
                Err(err) => {
                    error!(path = %png_path.display(), %err, "generating image failed, skipping");
                    page.failures += 1;
                }
            }
        }
        page
    }

    fn rasterize(
        &self,
        html: &Path,
        png: &Path,
        viewport: Viewport,
    ) -> Result<(), cardpress_render::RasterError> {
        let shot = self.services.raster.render_to_raster(html, viewport)?;
        let bled = add_bleed(&shot, self.bleed)?;
        fs::write(png, bled)?;
        Ok(())
    }
}

fn write_overview(
    engine: &TemplateEngine,
    options: &ConvertOptions,
    page_names: &[String],
    report: &mut ConversionReport,
) {
    let path = options.project.overview_path(&options.target);
    let context = OverviewContext {
        target: &options.target,
        decks: page_names,
    };
    let written = engine
        .render(OVERVIEW_TEMPLATE, &context)
        .map_err(|err| err.to_string())
        .and_then(|html| fs::write(&path, html).map_err(|err| err.to_string()));
    match written {
        Ok(()) => {
            info!(path = %path.display(), "created overview");
            report.artifacts.push(OutputArtifact::html(path.clone()));
            report.overview = Some(path);
        }
        Err(err) => {
            error!(path = %path.display(), %err, "writing overview failed, skipping");
            report.failures += 1;
        }
    }
}

/// Opens the overview if there is one, otherwise every primary artifact.
fn open_artifacts(viewer: &dyn Viewer, options: &ConvertOptions, report: &ConversionReport) {
    let primary = if options.image {
        ArtifactKind::Image
    } else {
        ArtifactKind::Html
    };
    let paths: Vec<&Path> = match &report.overview {
        Some(overview) => vec![overview.as_path()],
        None => report.artifacts_of(primary).collect(),
    };
    for path in paths {
        if let Err(err) = viewer.open(path) {
            warn!(path = %path.display(), %err, "opening file failed");
        }
    }
}
