//! Command-line interface.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cardpress_table::TableCache;
use clap::{Args, Parser, Subcommand};

use crate::config::{ConvertOptions, ConvertOverrides, ProjectConfig};
use crate::convert::{convert, ArtifactKind, ConversionReport, Services};
use crate::logging::{success, LogLevel};
use crate::project::ProjectLayout;
use crate::scaffold;
use crate::watch::watch;

#[derive(Debug, Parser)]
#[command(name = "cardpress", version, about = "Turn spreadsheets of card data into printable prototypes")]
pub struct Cli {
    /// Log verbosity (RUST_LOG takes precedence)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert card data into pages for a target
    Convert(ConvertArgs),

    /// Create an empty project
    Create {
        /// Create even if the directory is not empty
        #[arg(long)]
        force: bool,
    },

    /// Create a project with example card types
    CreateExample {
        /// Create even if the directory is not empty
        #[arg(long)]
        force: bool,
    },

    /// Add starter files for a new card type
    AddType {
        /// Name of the card type
        name: String,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Default, Args)]
pub struct ConvertArgs {
    /// Target template in targets/ (without .html)
    #[arg(long, short)]
    pub target: Option<String>,

    /// Only convert card types whose name contains this text
    #[arg(long = "type", value_name = "SUBSTR")]
    pub card_type: Option<String>,

    /// Cards per page
    #[arg(long, short, value_name = "N", allow_negative_numbers = true, conflicts_with = "single")]
    pub batch_size: Option<i64>,

    /// One card per page (same as --batch-size 1)
    #[arg(long)]
    pub single: bool,

    /// Extend images by this length on every side, e.g. 3mm
    #[arg(long, value_name = "LEN", allow_hyphen_values = true)]
    pub bleed: Option<String>,

    /// Also render every page to PNG
    #[arg(long)]
    pub image: bool,

    /// Keep converting when files change
    #[arg(long, short)]
    pub watch: bool,

    /// Write a card back per deck
    #[arg(long)]
    pub backs: bool,

    /// Write output/<target>.html listing every page
    #[arg(long)]
    pub overview: bool,

    /// Open the results when done
    #[arg(long)]
    pub open_files: bool,
}

impl ConvertArgs {
    pub fn overrides(&self) -> ConvertOverrides {
        ConvertOverrides {
            target: self.target.clone(),
            card_type: self.card_type.clone(),
            batch_size: self.batch_size,
            single: self.single,
            bleed: self.bleed.clone(),
            image: self.image,
            backs: self.backs,
            overview: self.overview,
            open_files: self.open_files,
        }
    }
}

/// Executes a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let root = match cli.project {
        Some(dir) => dir,
        None => env::current_dir().context("reading current directory")?,
    };
    let project = ProjectLayout::new(root);

    match cli.command {
        Command::Convert(args) => run_convert(project, &args),
        Command::Create { force } => {
            scaffold::create(&project, force).context("while creating")?;
            success("Project created. Run 'cardpress add-type <name>' to add some cards.");
            Ok(())
        }
        Command::CreateExample { force } => {
            scaffold::create_example(&project, force).context("while creating")?;
            success("Example project created. Run 'cardpress convert' to see an output.");
            Ok(())
        }
        Command::AddType { name, force } => {
            scaffold::add_type(&project, &name, force).context("while adding card type")?;
            success(format!("Card type {} added successfully.", name.trim()));
            Ok(())
        }
    }
}

fn run_convert(project: ProjectLayout, args: &ConvertArgs) -> Result<()> {
    let config = ProjectConfig::load(&project.config_path())?;
    let options = ConvertOptions::resolve(project, &config, &args.overrides())?;
    let services = Services::system(config.rasterizer());
    let mut cache = TableCache::new();

    let report = convert(&options, &mut cache, &services).context("while converting")?;
    summarize(&report);

    if args.watch {
        success("Watching files. Press q to quit.");
        watch(&options, &mut cache, &services, |result| {
            if let Ok(report) = result {
                summarize(report);
            }
            success("Still watching. Press q to quit.");
        })?;
    }
    Ok(())
}

fn summarize(report: &ConversionReport) {
    let pages = report.artifacts_of(ArtifactKind::Html).count();
    let images = report.artifacts_of(ArtifactKind::Image).count();
    if report.failures > 0 || !report.skipped_types.is_empty() {
        tracing::warn!(
            failures = report.failures,
            skipped = ?report.skipped_types,
            "finished with problems"
        );
    }
    success(format!(
        "Finished: {} cards, {pages} pages, {images} images.",
        report.cards
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_flags() {
        let cli = Cli::try_parse_from([
            "cardpress", "--project", "game", "convert", "--target", "sprite", "--type", "act",
            "--single", "--image", "--bleed", "3mm", "--backs",
        ])
        .unwrap();
        assert_eq!(cli.project, Some(PathBuf::from("game")));
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.target.as_deref(), Some("sprite"));
        assert_eq!(overrides.card_type.as_deref(), Some("act"));
        assert!(overrides.single && overrides.image && overrides.backs);
        assert_eq!(overrides.bleed.as_deref(), Some("3mm"));
    }

    #[test]
    fn single_conflicts_with_batch_size() {
        assert!(Cli::try_parse_from(["cardpress", "convert", "--single", "--batch-size", "2"])
            .is_err());
    }

    #[test]
    fn negative_batch_size_reaches_validation() {
        let cli = Cli::try_parse_from(["cardpress", "convert", "--batch-size", "-1"]).unwrap();
        let Command::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        let err = ConvertOptions::resolve(
            ProjectLayout::new("."),
            &ProjectConfig::default(),
            &args.overrides(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "batch size cannot be < 1 (got -1)");
    }

    #[test]
    fn parses_scaffold_commands() {
        let cli = Cli::try_parse_from(["cardpress", "add-type", "units", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::AddType { ref name, force: true } if name == "units"
        ));
        let cli = Cli::try_parse_from(["cardpress", "create-example", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Command::CreateExample { force: false }));
    }

    #[test]
    fn missing_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args: Vec<std::ffi::OsString> = vec![
            "cardpress".into(),
            "--project".into(),
            dir.path().into(),
            "convert".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let err = run(cli).unwrap_err();
        assert!(format!("{err:#}").contains("target 'default' not found"));
    }
}
