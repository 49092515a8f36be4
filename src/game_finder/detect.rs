//! Auto-detection of common WoW install locations
//!
//! Covers the Battle.net defaults on Windows and macOS, plus the usual Wine
//! prefixes on Linux (Lutris, Bottles, plain `~/.wine`). Not finding
//! anything is a normal outcome.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{ResolvedInstall, VersionProbe};

const WOW_DIR: &str = "World of Warcraft";

/// Candidate install roots, most likely first
pub fn well_known_locations(home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if cfg!(windows) {
        for drive in ["C:", "D:", "E:"] {
            candidates.push(PathBuf::from(format!("{drive}\\Program Files (x86)\\{WOW_DIR}")));
            candidates.push(PathBuf::from(format!("{drive}\\Program Files\\{WOW_DIR}")));
            candidates.push(PathBuf::from(format!("{drive}\\Games\\{WOW_DIR}")));
        }
    }

    if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from("/Applications").join(WOW_DIR));
    }

    if let Some(home) = home {
        if cfg!(target_os = "macos") {
            candidates.push(home.join("Applications").join(WOW_DIR));
        }

        let prefixes = [
            home.join("Games/world-of-warcraft"),
            home.join("Games/battlenet"),
            home.join(".wine"),
            home.join(".var/app/com.usebottles.bottles/data/bottles/bottles/Battle.net"),
            home.join(".local/share/bottles/bottles/Battle.net"),
        ];
        for prefix in prefixes {
            candidates.push(prefix.join("drive_c/Program Files (x86)").join(WOW_DIR));
            candidates.push(prefix.join("drive_c/Program Files").join(WOW_DIR));
        }
    }

    candidates
}

/// Return the first well-known location the probe accepts
pub fn auto_detect<P: VersionProbe + ?Sized>(probe: &P) -> Option<ResolvedInstall> {
    let home = dirs::home_dir();
    detect_in(&well_known_locations(home.as_deref()), probe)
}

fn detect_in<P: VersionProbe + ?Sized>(
    candidates: &[PathBuf],
    probe: &P,
) -> Option<ResolvedInstall> {
    candidates.iter().find_map(|candidate| {
        let root = candidate.to_string_lossy().to_string();
        let versions = probe.versions(&root);
        if versions.is_empty() {
            debug!("No WoW install at {}", root);
            return None;
        }
        info!("Detected WoW install at {} ({:?})", root, versions);
        Some(ResolvedInstall { root, versions })
    })
}
