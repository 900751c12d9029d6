//! Log setup and user-facing status lines.
//!
//! Diagnostics go through `tracing` to stderr. `RUST_LOG` takes precedence
//! over `--log-level`:
//!
//! ```bash
//! RUST_LOG=cardpress_table=trace cardpress convert
//! ```

use std::fmt;

use clap::ValueEnum;
use console::Style;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Crates whose events are shown at the chosen level.
const CRATES: &[&str] = &["cardpress", "cardpress_render", "cardpress_table"];

/// Verbosity selected with `--log-level`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter directives for `level`, e.g. `cardpress=info,cardpress_render=info,…`.
pub fn directives(level: LogLevel) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber. Call once, from `main`.
pub fn init(level: LogLevel) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directives(level).into()))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Prints a success line in green.
pub fn success(message: impl fmt::Display) {
    eprintln!("{}", Style::new().green().apply_to(message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_every_crate() {
        assert_eq!(
            directives(LogLevel::Debug),
            "cardpress=debug,cardpress_render=debug,cardpress_table=debug"
        );
    }

    #[test]
    fn directives_parse_as_filter() {
        for level in LogLevel::value_variants() {
            assert!(EnvFilter::try_new(directives(*level)).is_ok());
        }
    }
}
