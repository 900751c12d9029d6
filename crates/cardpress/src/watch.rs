//! Re-running the conversion when project files change.
//!
//! ```text
//!            change               quiet window passes
//! Watching ─────────▶ Debouncing ─────────────────────▶ Idle (re-run)
//!    ▲                  │   ▲                             │
//!    │                  └───┘ change: keep waiting        │
//!    └────────────────────────────────────────────────────┘
//! ```
//!
//! Signals arrive on an [`mpsc`] channel fed by a file watcher and a stdin
//! reader, so [`run_loop`] can be driven directly in tests.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use cardpress_table::TableCache;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, error, info, warn};

use crate::config::ConvertOptions;
use crate::convert::{convert, ConversionReport, Services};
use crate::error::ConvertError;

/// How long the project must stay unchanged before a re-run.
pub const QUIET_WINDOW: Duration = Duration::from_millis(200);

/// Where the watch loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Debouncing,
}

/// Input to the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Changed(PathBuf),
    Quit,
}

fn transition(state: &mut WatchState, next: WatchState) {
    debug!(from = ?*state, to = ?next, "watch state");
    *state = next;
}

/// Runs `rerun` once after every burst of changes until a quit signal
/// arrives or every sender is gone. Returns the number of re-runs.
pub fn run_loop<F>(signals: &Receiver<WatchSignal>, quiet: Duration, mut rerun: F) -> usize
where
    F: FnMut(),
{
    let mut state = WatchState::Idle;
    let mut runs = 0;
    transition(&mut state, WatchState::Watching);

    loop {
        match state {
            WatchState::Watching => match signals.recv() {
                Ok(WatchSignal::Changed(path)) => {
                    debug!(path = %path.display(), "file changed");
                    transition(&mut state, WatchState::Debouncing);
                }
                Ok(WatchSignal::Quit) | Err(_) => break,
            },
            WatchState::Debouncing => match signals.recv_timeout(quiet) {
                Ok(WatchSignal::Changed(path)) => {
                    debug!(path = %path.display(), "file changed");
                }
                Ok(WatchSignal::Quit) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => transition(&mut state, WatchState::Idle),
            },
            WatchState::Idle => {
                rerun();
                runs += 1;
                transition(&mut state, WatchState::Watching);
            }
        }
    }
    runs
}

/// Watches the project and converts again after every change.
///
/// `on_run` sees the result of each re-run. Failed runs do not end the
/// loop; only `q` on stdin (or stdin closing) does.
pub fn watch<F>(
    options: &ConvertOptions,
    cache: &mut TableCache,
    services: &Services,
    mut on_run: F,
) -> Result<usize, ConvertError>
where
    F: FnMut(&Result<ConversionReport, ConvertError>),
{
    let (tx, rx) = mpsc::channel();
    let _debouncer = spawn_file_watcher(options, tx.clone())?;
    spawn_quit_listener(tx)?;

    let runs = run_loop(&rx, QUIET_WINDOW, || {
        cache.invalidate();
        let result = convert(options, cache, services);
        if let Err(err) = &result {
            error!(%err, "conversion failed");
        }
        on_run(&result);
    });
    info!(runs, "stopped watching");
    Ok(runs)
}

/// Directories whose changes trigger a re-run.
pub fn watched_dirs(options: &ConvertOptions) -> Vec<PathBuf> {
    let project = &options.project;
    let required = [project.cards_dir(), project.targets_dir()];
    let optional = [
        project.icons_dir(),
        project.images_dir(),
        project.scripts_dir(),
    ];
    required
        .into_iter()
        .chain(optional.into_iter().filter(|dir| dir.is_dir()))
        .collect()
}

fn spawn_file_watcher(
    options: &ConvertOptions,
    tx: Sender<WatchSignal>,
) -> Result<Debouncer<notify::RecommendedWatcher>, ConvertError> {
    let output = options.project.output_root();
    let output_canonical = output.canonicalize().unwrap_or_else(|_| output.clone());

    let mut debouncer = new_debouncer(QUIET_WINDOW, move |res: DebounceEventResult| match res {
        Ok(events) => {
            for event in events {
                if is_under(&event.path, &output) || is_under(&event.path, &output_canonical) {
                    continue;
                }
                if tx.send(WatchSignal::Changed(event.path)).is_err() {
                    break;
                }
            }
        }
        Err(err) => warn!(%err, "file watch error"),
    })
    .map_err(io::Error::other)?;

    for dir in watched_dirs(options) {
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::Recursive)
            .map_err(io::Error::other)?;
        debug!(path = %dir.display(), "watching");
    }
    Ok(debouncer)
}

fn is_under(path: &Path, dir: &Path) -> bool {
    path.starts_with(dir)
}

fn spawn_quit_listener(tx: Sender<WatchSignal>) -> io::Result<()> {
    thread::Builder::new()
        .name("cardpress-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
            let _ = tx.send(WatchSignal::Quit);
        })?;
    Ok(())
}
