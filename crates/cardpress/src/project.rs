//! Project directory layout.
//!
//! ```text
//! project/
//! ├── cardpress.yaml        optional settings
//! ├── cards/                <type>.html, <type>.css, <type>.csv|ods|xlsx, data.ods|xlsx
//! ├── targets/              <target>.html, global.css
//! ├── icons/                {name} macro assets
//! ├── images/               {{name}} macro assets
//! ├── scripts/              *.js, inlined into every page
//! └── output/
//!     ├── <target>/         generated pages
//!     └── <target>.html     overview
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cardpress_table::{find_source, DataSource};
use tracing::warn;
use walkdir::WalkDir;

pub const CONFIG_FILE: &str = "cardpress.yaml";
pub const CARDS_DIR: &str = "cards";
pub const TARGETS_DIR: &str = "targets";
pub const ICONS_DIR: &str = "icons";
pub const IMAGES_DIR: &str = "images";
pub const SCRIPTS_DIR: &str = "scripts";
pub const OUTPUT_DIR: &str = "output";
pub const GLOBAL_CSS: &str = "global.css";

/// Paths of a card project, all derived from its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn cards_dir(&self) -> PathBuf {
        self.root.join(CARDS_DIR)
    }

    pub fn targets_dir(&self) -> PathBuf {
        self.root.join(TARGETS_DIR)
    }

    pub fn icons_dir(&self) -> PathBuf {
        self.root.join(ICONS_DIR)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR)
    }

    pub fn output_root(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Directory receiving the pages of `target`.
    pub fn output_dir(&self, target: &str) -> PathBuf {
        self.output_root().join(target)
    }

    /// Location of the overview page of `target`.
    pub fn overview_path(&self, target: &str) -> PathBuf {
        self.output_root().join(format!("{target}.html"))
    }

    pub fn target_template(&self, target: &str) -> PathBuf {
        self.targets_dir().join(format!("{target}.html"))
    }

    /// Contents of `targets/global.css`, or `""` if there is none.
    pub fn global_css(&self) -> String {
        read_optional(&self.targets_dir().join(GLOBAL_CSS))
    }

    /// Contents of every `scripts/*.js`, sorted by file name.
    ///
    /// Unreadable scripts are logged and left out.
    pub fn scripts(&self) -> Vec<String> {
        let dir = self.scripts_dir();
        if !dir.is_dir() {
            return Vec::new();
        }
        WalkDir::new(&dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), "js"))
            .filter_map(|entry| match fs::read_to_string(entry.path()) {
                Ok(script) => {
                    tracing::debug!(path = %entry.path().display(), "added script");
                    Some(script)
                }
                Err(err) => {
                    tracing::error!(path = %entry.path().display(), %err, "reading script failed, skipping");
                    None
                }
            })
            .collect()
    }

    /// Every card type under `cards/`, found recursively and sorted by path.
    ///
    /// Symlinks are followed. Entries that cannot be read are logged and
    /// skipped.
    pub fn card_types(&self) -> Vec<CardType> {
        let dir = self.cards_dir();
        let mut types = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(dir.as_path()).display().to_string();
                    warn!(%path, %err, "unreadable entry in cards directory, skipping");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !has_extension(path, "html") {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                types.push(CardType {
                    name: name.to_string(),
                    template: path.to_path_buf(),
                });
            }
        }
        types
    }

    /// Removes everything inside the output directory of `target`, creating
    /// it if needed, and returns its path.
    pub fn clear_output(&self, target: &str) -> io::Result<PathBuf> {
        let dir = self.output_dir(target);
        if dir.exists() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
            }
        } else {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }
}

/// A card template and the files that sit next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardType {
    pub name: String,
    pub template: PathBuf,
}

impl CardType {
    fn dir(&self) -> &Path {
        self.template.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn css_path(&self) -> PathBuf {
        self.dir().join(format!("{}.css", self.name))
    }

    /// The optional stylesheet, or `""`.
    pub fn css(&self) -> String {
        read_optional(&self.css_path())
    }

    /// Where this type's rows come from, if anywhere.
    pub fn data_source(&self) -> Option<DataSource> {
        find_source(self.dir(), &self.name)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn read_optional(path: &Path) -> String {
    if !path.is_file() {
        return String::new();
    }
    fs::read_to_string(path).unwrap_or_else(|err| {
        tracing::error!(path = %path.display(), %err, "reading stylesheet failed, skipping");
        String::new()
    })
}
