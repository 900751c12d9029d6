//! Opening generated files in the user's default application.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

/// Opens a file for viewing.
pub trait Viewer: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<()>;
}

/// Uses the platform's file opener (`open`, `xdg-open`, `cmd /C start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemViewer;

impl Viewer for SystemViewer {
    fn open(&self, path: &Path) -> io::Result<()> {
        let mut command = opener_command();
        command
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        tracing::debug!(path = %path.display(), "opening file");
        spawn_reaped(command).map(drop)
    }
}

/// Starts `command` and waits for it on a background thread, so the run
/// carries on while the finished opener is still reaped.
fn spawn_reaped(mut command: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command.spawn()?;
    thread::Builder::new()
        .name("cardpress-opener".into())
        .spawn(move || {
            let status = child.wait();
            match &status {
                Ok(status) if !status.success() => tracing::warn!(%status, "file opener failed"),
                Ok(_) => {}
                Err(err) => tracing::debug!(%err, "waiting for file opener failed"),
            }
            status
        })
}

#[cfg(target_os = "macos")]
fn opener_command() -> Command {
    Command::new("open")
}

#[cfg(windows)]
fn opener_command() -> Command {
    let mut c = Command::new("cmd");
    // Empty title argument so paths with spaces are not taken as the title.
    c.args(["/C", "start", ""]);
    c
}

#[cfg(not(any(target_os = "macos", windows)))]
fn opener_command() -> Command {
    Command::new("xdg-open")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn opener_process_is_waited_for() {
        let handle = spawn_reaped(Command::new("true")).unwrap();
        assert!(handle.join().unwrap().unwrap().success());

        let handle = spawn_reaped(Command::new("false")).unwrap();
        assert!(!handle.join().unwrap().unwrap().success());
    }

    #[test]
    fn missing_opener_is_an_error() {
        assert!(spawn_reaped(Command::new("/nonexistent/opener")).is_err());
    }
}
