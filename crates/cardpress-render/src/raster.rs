//! Turning rendered HTML pages into PNG images.
//!
//! Rasterisation is a host capability: [`RasterRenderer`] hides how the
//! screenshot is taken so the pipeline can be exercised with a fake in
//! tests. [`ChromeRasterizer`] drives a locally installed Chrome or Chromium
//! in headless mode.
//!
//! # Browser Session
//!
//! One browser process is launched on the first screenshot and kept in a
//! [`SharedSession`]. Every screenshot opens its own tab, captures the full
//! page height and closes the tab again, so watch-mode re-runs reuse the
//! same process. If the browser dies, the next screenshot launches a new one.
//!
//! # Browser Detection
//!
//! The executable is located on first use:
//!
//! 1. `CARDPRESS_BROWSER` environment variable (may include arguments,
//!    e.g. `"flatpak run org.chromium.Chromium"`)
//! 2. The `browser` setting from the project configuration
//! 3. The first of `chromium`, `chromium-browser`, `google-chrome`,
//!    `google-chrome-stable`, `chrome`, `msedge` found on `PATH`
//!
//! # Viewport Hints
//!
//! Target templates may declare the screenshot size in an HTML comment:
//!
//! ```html
//! <!-- image-size-actions:8000x8400 -->
//! <!-- image-size:1200x900 -->
//! ```
//!
//! A hint naming the deck (or card type) wins over the generic one.
//! Without hints the viewport is 1000x1000. The hint fixes the width and the
//! minimum height; pages taller than the hint are captured in full.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

/// Environment variable overriding browser detection.
pub const BROWSER_ENV: &str = "CARDPRESS_BROWSER";

/// Screenshot timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How long an unused browser stays alive between watch-mode runs.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);

#[cfg(not(windows))]
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "msedge",
];

#[cfg(windows)]
const BROWSER_CANDIDATES: &[&str] = &["chrome", "msedge", "chromium"];

static GENERIC_SIZE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s*image-size:(\d+)x(\d+)\s*-->").expect("size hint pattern is valid")
});

/// Errors raised while producing or post-processing a raster image.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no Chrome/Chromium executable found; set CARDPRESS_BROWSER or `browser` in cardpress.yaml")]
    BrowserNotFound,

    #[error("failed to parse browser command '{0}'")]
    InvalidCommand(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("bleed of {bleed}px is too large for a {width}x{height} image")]
    BleedTooLarge { bleed: u32, width: u32, height: u32 },
}

/// Screenshot dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reads the viewport hint for the first matching name from a target
    /// template, falling back to the generic hint and then the default.
    pub fn from_template(source: &str, names: &[&str]) -> Self {
        for name in names {
            let pattern = format!(
                r"<!--\s*image-size-{}:(\d+)x(\d+)\s*-->",
                regex::escape(name)
            );
            if let Some(viewport) = Regex::new(&pattern)
                .ok()
                .and_then(|re| capture_size(&re, source))
            {
                return viewport;
            }
        }
        capture_size(&GENERIC_SIZE_HINT, source).unwrap_or_default()
    }
}

fn capture_size(re: &Regex, source: &str) -> Option<Viewport> {
    let caps = re.captures(source)?;
    let width = caps[1].parse().ok()?;
    let height = caps[2].parse().ok()?;
    Some(Viewport::new(width, height))
}

/// Produces a PNG screenshot of an HTML file.
pub trait RasterRenderer: Send + Sync {
    /// Renders `html` at the given viewport size and returns PNG bytes.
    fn render_to_raster(&self, html: &Path, viewport: Viewport) -> Result<Vec<u8>, RasterError>;
}

/// A lazily launched handle shared by every caller.
///
/// The first [`get_or_launch`](Self::get_or_launch) runs the launcher while
/// holding the lock, so concurrent first use launches exactly once. Later
/// calls get the same handle until [`reset`](Self::reset) drops it.
pub struct SharedSession<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for SharedSession<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> SharedSession<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the running session, launching it if there is none.
    pub fn get_or_launch<E>(&self, launch: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(launch()?);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Drops the session; the next call launches a new one.
    pub fn reset(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> fmt::Debug for SharedSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSession")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Headless Chrome/Chromium screenshotter.
///
/// A configured command with arguments (`flatpak run ...`) launches the
/// first word as the executable and passes the rest before the browser's
/// own flags.
#[derive(Debug)]
pub struct ChromeRasterizer {
    configured: Option<String>,
    timeout: Duration,
    command: OnceCell<Vec<String>>,
    browser: SharedSession<Browser>,
}

impl Default for ChromeRasterizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ChromeRasterizer {
    /// Creates a rasterizer; `browser` is the configured command, if any.
    pub fn new(browser: Option<String>) -> Self {
        Self {
            configured: browser.filter(|b| !b.trim().is_empty()),
            timeout: DEFAULT_TIMEOUT,
            command: OnceCell::new(),
            browser: SharedSession::new(),
        }
    }

    /// Sets how long a single screenshot may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The detected browser command, locating it on first use.
    pub fn browser_command(&self) -> Result<&[String], RasterError> {
        self.command
            .get_or_try_init(|| detect_browser(self.configured.as_deref()))
            .map(Vec::as_slice)
    }

    fn launch(&self) -> Result<Browser, RasterError> {
        let (program, args) = self
            .browser_command()?
            .split_first()
            .ok_or(RasterError::BrowserNotFound)?;
        let options = LaunchOptions::default_builder()
            .path(Some(PathBuf::from(program)))
            .args(args.iter().map(OsStr::new).collect())
            .idle_browser_timeout(SESSION_IDLE_TIMEOUT)
            .build()
            .map_err(browser_error)?;

        tracing::info!(browser = %program, "launching headless browser");
        Browser::new(options).map_err(browser_error)
    }

    /// Loads `url` in a new tab and captures the whole page.
    fn capture(&self, tab: &Tab, url: &str, viewport: Viewport) -> Result<Vec<u8>, RasterError> {
        tab.set_default_timeout(self.timeout);
        resize(tab, viewport.width, viewport.height)?;
        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(browser_error)?;

        let height = page_height(tab)?.max(viewport.height);
        if height > viewport.height {
            resize(tab, viewport.width, height)?;
        }
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(viewport.width),
            height: f64::from(height),
            scale: 1.0,
        };
        tab.capture_screenshot(
            Page::CaptureScreenshotFormatOption::Png,
            None,
            Some(clip),
            true,
        )
        .map_err(browser_error)
    }
}

impl RasterRenderer for ChromeRasterizer {
    fn render_to_raster(&self, html: &Path, viewport: Viewport) -> Result<Vec<u8>, RasterError> {
        let url = file_url(html)?;
        let browser = self.browser.get_or_launch(|| self.launch())?;

        let tab = match browser.new_tab() {
            Ok(tab) => tab,
            Err(err) => {
                // The process is gone or unresponsive.
                self.browser.reset();
                return Err(browser_error(err));
            }
        };

        tracing::debug!(url = %url, ?viewport, "taking screenshot");
        let shot = self.capture(&tab, &url, viewport);
        if let Err(err) = tab.close(true) {
            tracing::debug!(%err, "closing tab failed");
        }
        shot
    }
}

fn resize(tab: &Tab, width: u32, height: u32) -> Result<(), RasterError> {
    tab.set_bounds(Bounds::Normal {
        left: Some(0),
        top: Some(0),
        width: Some(f64::from(width)),
        height: Some(f64::from(height)),
    })
    .map(|_| ())
    .map_err(browser_error)
}

/// Rendered height of the loaded document in CSS pixels.
fn page_height(tab: &Tab) -> Result<u32, RasterError> {
    let height = tab
        .evaluate("Math.ceil(document.documentElement.scrollHeight)", false)
        .map_err(browser_error)?
        .value
        .and_then(|value| value.as_f64())
        .unwrap_or(0.0);
    Ok(height.clamp(0.0, f64::from(u32::MAX)) as u32)
}

fn browser_error(err: impl fmt::Display) -> RasterError {
    RasterError::Browser(format!("{err:#}"))
}

fn detect_browser(configured: Option<&str>) -> Result<Vec<String>, RasterError> {
    if let Ok(command) = std::env::var(BROWSER_ENV) {
        if !command.trim().is_empty() {
            return split_command(&command);
        }
    }

    if let Some(command) = configured {
        return split_command(command);
    }

    for candidate in BROWSER_CANDIDATES {
        if let Ok(path) = which::which(candidate) {
            tracing::debug!(browser = %path.display(), "found browser on PATH");
            return Ok(vec![path.to_string_lossy().into_owned()]);
        }
    }

    Err(RasterError::BrowserNotFound)
}

fn split_command(command: &str) -> Result<Vec<String>, RasterError> {
    let parts =
        shell_words::split(command).map_err(|_| RasterError::InvalidCommand(command.to_string()))?;
    if parts.is_empty() {
        return Err(RasterError::InvalidCommand(command.to_string()));
    }
    Ok(parts)
}

/// Builds a `file://` URL for an existing file.
fn file_url(path: &Path) -> io::Result<String> {
    let absolute = path.canonicalize()?;
    let mut text = absolute.to_string_lossy().replace('\\', "/");
    if let Some(stripped) = text.strip_prefix("//?/") {
        text = stripped.to_string();
    }

    let mut url = String::from("file://");
    if !text.starts_with('/') {
        url.push('/');
    }
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            _ => url.push_str(&format!("%{byte:02X}")),
        }
    }
    Ok(url)
}
