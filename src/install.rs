//! On-disk icon overrides inside a WoW installation
//!
//! The client prefers loose files in `<version>/Interface/ICONS/` over its
//! packed data, so applying an icon means writing a file there under the
//! stock icon's name, and resetting means deleting it again.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Errors from touching the installation's ICONS folder
#[derive(Debug, thiserror::Error)]
pub enum IconIoError {
    #[error("Failed to create ICONS directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write icon file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove icon file {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove ICONS folder {}: {source}", .path.display())]
    RemoveDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid icon file name: {0:?}")]
    InvalidFileName(String),
}

/// Result of a reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The override at this path was removed
    Removed(PathBuf),
    /// Nothing to remove; the game already uses its stock icon(s)
    AlreadyDefault,
}

/// `<root>/<version>/Interface/ICONS`
pub fn icons_dir(root: &Path, version: &str) -> PathBuf {
    root.join(version).join("Interface").join("ICONS")
}

/// Whether a directory name looks like a version folder (`_retail_`, `_classic_era_`)
pub fn is_version_dir_name(name: &str) -> bool {
    name.len() > 2 && name.starts_with('_') && name.ends_with('_')
}

/// List the version folders of an installation root, sorted.
///
/// Nonexistent or unreadable paths yield an empty list.
pub fn get_install_versions(root: &Path) -> Vec<String> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No versions at {}: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut versions: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| is_version_dir_name(name))
        .collect();

    versions.sort();
    versions
}

fn target_path(root: &Path, version: &str, file_name: &str) -> Result<PathBuf, IconIoError> {
    let valid = !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\']);
    if !valid {
        return Err(IconIoError::InvalidFileName(file_name.to_string()));
    }
    Ok(icons_dir(root, version).join(file_name))
}

/// Write `bytes` as `<ICONS>/<target_file_name>`, creating the folder as needed
pub async fn apply_icon(
    root: &Path,
    version: &str,
    target_file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, IconIoError> {
    let target = target_path(root, version, target_file_name)?;
    let dir = icons_dir(root, version);

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| IconIoError::CreateDir {
            path: dir.clone(),
            source,
        })?;

    tokio::fs::write(&target, bytes)
        .await
        .map_err(|source| IconIoError::Write {
            path: target.clone(),
            source,
        })?;

    info!("Applied icon {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}

/// Remove the override for one icon
pub async fn reset_icon(
    root: &Path,
    version: &str,
    target_file_name: &str,
) -> Result<ResetOutcome, IconIoError> {
    let target = target_path(root, version, target_file_name)?;

    match tokio::fs::remove_file(&target).await {
        Ok(()) => {
            info!("Reset icon, removed {}", target.display());
            Ok(ResetOutcome::Removed(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResetOutcome::AlreadyDefault),
        Err(source) => Err(IconIoError::Remove {
            path: target,
            source,
        }),
    }
}

/// Remove the whole ICONS override folder for a version
pub async fn reset_all_icons(root: &Path, version: &str) -> Result<ResetOutcome, IconIoError> {
    let dir = icons_dir(root, version);

    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => {
            info!("Reset all icons, removed {}", dir.display());
            Ok(ResetOutcome::Removed(dir))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ResetOutcome::AlreadyDefault),
        Err(source) => Err(IconIoError::RemoveDir { path: dir, source }),
    }
}
