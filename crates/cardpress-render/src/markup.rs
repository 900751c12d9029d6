//! Markdown with icon and image macros.
//!
//! Card text is markdown extended with two asset references:
//!
//! | Syntax | Kind | Looks in | CSS class |
//! |--------|------|----------|-----------|
//! | `{tap}` | icon | `icons/` | `icon` |
//! | `{{strong}}` | image | `images/` | `image` |
//!
//! Names are runs of letters, digits, `_` and `-`. Anything that does not
//! form a complete reference is left as literal text, so `{ not a macro }`
//! or a lone `{` survive unchanged.
//!
//! References are inline markup: they expand in markdown text only. Code
//! spans, fenced or indented code blocks and raw HTML keep their braces.
//!
//! # Resolution
//!
//! The asset directory is searched recursively for a file whose stem equals
//! the name. SVG files are inlined with the class added to the root element;
//! other files are copied next to the output as `{class}-{file_name}` and
//! referenced with an `<img>`. When nothing matches, the name is rendered as
//! `<em class="icon">name</em>` and a warning is logged.
//!
//! # Example
//!
//! ```rust,no_run
//! use cardpress_render::{AssetResolver, MacroExpander};
//!
//! let resolver = AssetResolver::new("icons", "images", "output/default");
//! let expander = MacroExpander::new(resolver);
//! let html = expander.parse("{tap}: do something *really* **strong**");
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};
use walkdir::WalkDir;

/// The two kinds of asset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    Icon,
    Image,
}

impl MacroKind {
    /// CSS class applied to the resolved asset.
    pub fn class(self) -> &'static str {
        match self {
            MacroKind::Icon => "icon",
            MacroKind::Image => "image",
        }
    }
}

/// A parsed `{name}` or `{{name}}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroReference {
    pub kind: MacroKind,
    pub name: String,
}

/// A piece of scanned card text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Macro(MacroReference),
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Tries to read `name` followed by `close` at the start of `rest`.
///
/// Returns the name and the number of bytes consumed including `close`.
fn take_reference<'a>(rest: &'a str, close: &str) -> Option<(&'a str, usize)> {
    let end = rest
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if end == 0 || !rest[end..].starts_with(close) {
        return None;
    }
    Some((&rest[..end], end + close.len()))
}

/// Splits raw text into literal text and macro references.
///
/// At every `{`, an image reference (`{{name}}`) is tried first, then an
/// icon reference (`{name}`). If neither matches, the brace is kept as text
/// and scanning resumes at the next character.
pub fn scan(raw: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = raw[pos..].find('{') {
        let open = pos + offset;
        let after = &raw[open + 1..];

        let found = after
            .strip_prefix('{')
            .and_then(|inner| take_reference(inner, "}}"))
            .map(|(name, used)| (MacroKind::Image, name, used + 2))
            .or_else(|| {
                take_reference(after, "}").map(|(name, used)| (MacroKind::Icon, name, used + 1))
            });

        match found {
            Some((kind, name, used)) => {
                if text_start < open {
                    segments.push(Segment::Text(&raw[text_start..open]));
                }
                segments.push(Segment::Macro(MacroReference {
                    kind,
                    name: name.to_string(),
                }));
                pos = open + used;
                text_start = pos;
            }
            None => pos = open + 1,
        }
    }

    if text_start < raw.len() {
        segments.push(Segment::Text(&raw[text_start..]));
    }
    segments
}

/// Resolves macro references to HTML.
///
/// Results are memoised per reference, so each asset is read (and copied)
/// at most once per resolver. Build a new resolver for every run so edited
/// assets are picked up.
#[derive(Debug)]
pub struct AssetResolver {
    icon_dir: PathBuf,
    image_dir: PathBuf,
    output_dir: PathBuf,
    resolved: Mutex<HashMap<MacroReference, Arc<str>>>,
}

impl AssetResolver {
    pub fn new(
        icon_dir: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            icon_dir: icon_dir.into(),
            image_dir: image_dir.into(),
            output_dir: output_dir.into(),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the HTML for a reference.
    ///
    /// The lookup and any file copy run without holding the memo lock. When
    /// two threads resolve the same reference at once, both render it and the
    /// first stored result wins.
    pub fn resolve(&self, reference: &MacroReference) -> Arc<str> {
        if let Some(html) = self.memo().get(reference) {
            return Arc::clone(html);
        }
        let html: Arc<str> = self.render(reference).into();
        Arc::clone(self.memo().entry(reference.clone()).or_insert(html))
    }

    // Entries are inserted whole, so a poisoned map is still consistent.
    fn memo(&self) -> MutexGuard<'_, HashMap<MacroReference, Arc<str>>> {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn directory(&self, kind: MacroKind) -> &Path {
        match kind {
            MacroKind::Icon => &self.icon_dir,
            MacroKind::Image => &self.image_dir,
        }
    }

    /// First file (in sorted walk order) whose stem equals `name`.
    fn locate(&self, kind: MacroKind, name: &str) -> Option<PathBuf> {
        WalkDir::new(self.directory(kind))
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| entry.path().file_stem().is_some_and(|stem| stem == name))
            .map(|entry| entry.into_path())
    }

    fn render(&self, reference: &MacroReference) -> String {
        let class = reference.kind.class();
        let name = reference.name.as_str();

        let Some(path) = self.locate(reference.kind, name) else {
            tracing::warn!(kind = class, name, "{} not found, rendering its name", class);
            return missing_html(class, name);
        };

        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            match fs::read_to_string(&path) {
                Ok(svg) => return inline_svg(&svg, class),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "could not read svg");
                    return missing_html(class, name);
                }
            }
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let copied = format!("{class}-{file_name}");
        let target = self.output_dir.join(&copied);
        if !target.exists() {
            let result = fs::create_dir_all(&self.output_dir).and_then(|_| fs::copy(&path, &target));
            match result {
                Ok(_) => tracing::debug!(from = %path.display(), to = %target.display(), "copied asset"),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "could not copy asset"),
            }
        }
        format!(r#"<img class="{class}" src="{copied}" alt="{name}" />"#)
    }
}

fn missing_html(class: &str, name: &str) -> String {
    format!(r#"<em class="{class}">{name}</em>"#)
}

/// Adds `class` to the root `<svg` element and drops any prolog before it.
fn inline_svg(svg: &str, class: &str) -> String {
    match svg.find("<svg") {
        Some(start) => {
            let body = svg[start..].trim_end();
            let tag_end = "<svg".len();
            format!(r#"{} class="{class}"{}"#, &body[..tag_end], &body[tag_end..])
        }
        None => svg.trim_end().to_string(),
    }
}

/// Expands macros and renders markdown.
///
/// Shared across worker threads behind an `Arc`.
#[derive(Debug)]
pub struct MacroExpander {
    resolver: AssetResolver,
    options: Options,
}

impl MacroExpander {
    pub fn new(resolver: AssetResolver) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { resolver, options }
    }

    /// The resolver backing this expander.
    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Renders markdown, expands macros in its text and unwraps a lone
    /// paragraph.
    ///
    /// Never fails: unknown assets become `<em>` fallbacks and malformed
    /// macro syntax stays literal.
    pub fn parse(&self, raw: &str) -> String {
        let mut events = Vec::new();
        let mut in_code_block = false;

        for event in TextMergeStream::new(Parser::new_ext(raw, self.options)) {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code_block = true;
                    events.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    events.push(event);
                }
                Event::Text(text) if !in_code_block => self.expand_text(&text, &mut events),
                other => events.push(other),
            }
        }

        let mut rendered = String::with_capacity(raw.len() * 3 / 2);
        html::push_html(&mut rendered, events.into_iter());
        unwrap_paragraph(&rendered).to_string()
    }

    /// Splits one text event around its macro references.
    fn expand_text(&self, text: &str, events: &mut Vec<Event<'_>>) {
        for segment in scan(text) {
            let event = match segment {
                Segment::Text(text) => Event::Text(CowStr::from(text.to_string())),
                Segment::Macro(reference) => {
                    Event::InlineHtml(CowStr::from(self.resolver.resolve(&reference).to_string()))
                }
            };
            events.push(event);
        }
    }
}

/// Strips `<p>…</p>` when it is the only block in `html`.
fn unwrap_paragraph(html: &str) -> &str {
    let trimmed = html.trim_end_matches('\n');
    match trimmed
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("</p>") => inner,
        _ => trimmed,
    }
}
