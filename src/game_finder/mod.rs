//! Locating a World of Warcraft installation.
//!
//! An installation root is any folder holding at least one version folder
//! (`_retail_`, `_classic_`, ...). Users often pick a folder inside the root
//! or the root's parent, so [`resolve`] walks upward from whatever they chose,
//! and [`auto_detect`] tries the usual install locations first.

mod detect;
mod resolve;

pub use detect::{auto_detect, well_known_locations};
pub use resolve::{resolve, ResolveError, MAX_HOPS};

use std::path::Path;

use crate::install;

/// Answers "which versions live under this path?"
///
/// An empty list means the path is not an installation root. Implementations
/// must not fail on nonexistent or malformed paths.
pub trait VersionProbe {
    fn versions(&self, path: &str) -> Vec<String>;
}

/// Probes the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl VersionProbe for FsProbe {
    fn versions(&self, path: &str) -> Vec<String> {
        if path.is_empty() {
            return Vec::new();
        }
        install::get_install_versions(Path::new(path))
    }
}

/// A validated installation root and the versions found in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstall {
    pub root: String,
    pub versions: Vec<String>,
}

impl ResolvedInstall {
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }
}
