//! `create`, `create-example` and `add-type`.

use std::fs;
use std::path::{Path, PathBuf};

use cardpress_render::sanitize_file_name;

use crate::error::ScaffoldError;
use crate::presets::{self, Preset};
use crate::project::ProjectLayout;

/// Creates an empty project: targets, global stylesheet, scripts and the
/// empty asset directories.
///
/// Fails if the project directory has any content, unless `force` is set.
pub fn create(project: &ProjectLayout, force: bool) -> Result<Vec<PathBuf>, ScaffoldError> {
    ensure_empty(project.root(), force)?;
    let written = write_presets(project.root(), presets::PROJECT)?;
    for dir in [project.cards_dir(), project.icons_dir(), project.images_dir()] {
        fs::create_dir_all(dir)?;
    }
    Ok(written)
}

/// Creates a project with two example card types.
pub fn create_example(
    project: &ProjectLayout,
    force: bool,
) -> Result<Vec<PathBuf>, ScaffoldError> {
    let mut written = create(project, force)?;
    written.extend(write_presets(project.root(), presets::EXAMPLE)?);
    Ok(written)
}

/// Adds starter files for card type `name` to `cards/`.
///
/// Fails if any of them exists, unless `force` is set.
pub fn add_type(
    project: &ProjectLayout,
    name: &str,
    force: bool,
) -> Result<Vec<PathBuf>, ScaffoldError> {
    let name = name.trim();
    if name.is_empty() || name.starts_with('.') || sanitize_file_name(name) != name {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }

    let cards = project.cards_dir();
    let files: Vec<(PathBuf, &str)> = presets::card_type_files(name)
        .into_iter()
        .map(|(file, contents)| (cards.join(file), contents))
        .collect();
    if !force && files.iter().any(|(path, _)| path.exists()) {
        return Err(ScaffoldError::TypeExists(name.to_string()));
    }

    fs::create_dir_all(&cards)?;
    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        fs::write(&path, contents)?;
        written.push(path);
    }
    tracing::debug!(card_type = %name, "card type added");
    Ok(written)
}

fn ensure_empty(root: &Path, force: bool) -> Result<(), ScaffoldError> {
    if force || !root.exists() {
        return Ok(());
    }
    if fs::read_dir(root)?.next().is_some() {
        return Err(ScaffoldError::NotEmpty(root.to_path_buf()));
    }
    Ok(())
}

fn write_presets(root: &Path, presets: &[Preset]) -> Result<Vec<PathBuf>, ScaffoldError> {
    presets
        .iter()
        .map(|preset| {
            let path = root.join(preset.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, preset.contents)?;
            tracing::debug!(path = %path.display(), "wrote");
            Ok(path)
        })
        .collect()
}
