//! Walk from a user-chosen path up to the installation root

use std::collections::HashSet;

use tracing::debug;

use super::{ResolvedInstall, VersionProbe};
use crate::paths;

/// Maximum number of ancestors probed above the candidate
pub const MAX_HOPS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("No WoW installation found at or above {candidate:?} (expected folders like _retail_ or _classic_)")]
    NotFound { candidate: String },

    #[error("Gave up looking for a WoW installation above {candidate:?} after {MAX_HOPS} folders")]
    HopLimit { candidate: String },
}

/// Find the installation root at or above `candidate`.
///
/// Probes `candidate` first; a valid candidate costs exactly one probe. Then
/// walks to each parent until a probe returns versions, the filesystem root
/// is passed, or [`MAX_HOPS`] ancestors have been tried. No path is probed
/// twice.
pub fn resolve<P: VersionProbe + ?Sized>(
    candidate: &str,
    probe: &P,
) -> Result<ResolvedInstall, ResolveError> {
    let not_found = || ResolveError::NotFound {
        candidate: candidate.to_string(),
    };

    if candidate.is_empty() {
        return Err(not_found());
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = candidate;
    let mut hops = 0;

    loop {
        let key = match paths::trim_trailing_separators(current) {
            "" => current,
            trimmed => trimmed,
        };
        if !visited.insert(key) {
            return Err(not_found());
        }

        let versions = probe.versions(current);
        if !versions.is_empty() {
            debug!(
                "Resolved {} to {} ({} hops, versions: {:?})",
                candidate, current, hops, versions
            );
            return Ok(ResolvedInstall {
                root: current.to_string(),
                versions,
            });
        }

        match paths::parent_path(current) {
            Some(parent) if parent != current => current = parent,
            _ => return Err(not_found()),
        }

        hops += 1;
        if hops > MAX_HOPS {
            return Err(ResolveError::HopLimit {
                candidate: candidate.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory probe recording every path it was asked about
    #[derive(Default)]
    struct FakeProbe {
        roots: HashMap<String, Vec<String>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeProbe {
        fn with_root(root: &str, versions: &[&str]) -> Self {
            let mut probe = Self::default();
            probe
                .roots
                .insert(root.into(), versions.iter().map(|v| v.to_string()).collect());
            probe
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl VersionProbe for FakeProbe {
        fn versions(&self, path: &str) -> Vec<String> {
            self.calls.borrow_mut().push(path.to_string());
            self.roots.get(path).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_valid_root_zero_hops() {
        let probe = FakeProbe::with_root("/games/wow", &["_classic_", "_retail_"]);
        let resolved = resolve("/games/wow", &probe).unwrap();
        assert_eq!(resolved.root, "/games/wow");
        assert_eq!(resolved.versions, vec!["_classic_", "_retail_"]);
        assert_eq!(probe.calls(), vec!["/games/wow"]);
    }

    #[test]
    fn test_walks_up_from_subdirectory() {
        let probe = FakeProbe::with_root("/games/wow", &["_retail_"]);
        let resolved = resolve("/games/wow/_retail_/Interface/ICONS", &probe).unwrap();
        assert_eq!(resolved.root, "/games/wow");
        assert_eq!(
            probe.calls(),
            vec![
                "/games/wow/_retail_/Interface/ICONS",
                "/games/wow/_retail_/Interface",
                "/games/wow/_retail_",
                "/games/wow",
            ]
        );
    }

    #[test]
    fn test_windows_path() {
        let probe = FakeProbe::with_root("C:\\Games\\World of Warcraft", &["_retail_"]);
        let resolved = resolve("C:\\Games\\World of Warcraft\\_retail_\\", &probe).unwrap();
        assert_eq!(resolved.root, "C:\\Games\\World of Warcraft");
    }

    #[test]
    fn test_windows_walk_reaches_drive_root() {
        let probe = FakeProbe::with_root("D:\\", &["_retail_"]);
        let resolved = resolve("D:\\Games\\Other", &probe).unwrap();
        assert_eq!(resolved.root, "D:\\");
        assert_eq!(probe.calls(), vec!["D:\\Games\\Other", "D:\\Games", "D:\\"]);
    }

    #[test]
    fn test_empty_candidate() {
        let probe = FakeProbe::default();
        assert!(matches!(resolve("", &probe), Err(ResolveError::NotFound { .. })));
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn test_no_parent() {
        let probe = FakeProbe::default();
        assert!(matches!(resolve("wow", &probe), Err(ResolveError::NotFound { .. })));
        assert_eq!(probe.calls(), vec!["wow"]);

        let probe = FakeProbe::default();
        assert!(matches!(resolve("/", &probe), Err(ResolveError::NotFound { .. })));
        assert_eq!(probe.calls(), vec!["/"]);
    }

    #[test]
    fn test_walks_to_root_without_repeats() {
        let probe = FakeProbe::default();
        let err = resolve("/home/user//games/", &probe).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound {
                candidate: "/home/user//games/".into()
            }
        );

        let calls = probe.calls();
        assert_eq!(calls, vec!["/home/user//games/", "/home/user", "/home", "/"]);
        let unique: HashSet<_> = calls.iter().collect();
        assert_eq!(unique.len(), calls.len());
    }

    #[test]
    fn test_malformed_paths_terminate() {
        for candidate in ["\\\\?\\UNC\\server\\share\\", "////", "a\\/\\/b", "..", "\0bad"] {
            let probe = FakeProbe::default();
            assert!(resolve(candidate, &probe).is_err(), "{candidate}");
            assert!(probe.calls().len() <= MAX_HOPS + 1);
        }
    }

    #[test]
    fn test_hop_limit() {
        let deep: String = (0..MAX_HOPS + 10).map(|i| format!("/d{i}")).collect();
        let probe = FakeProbe::default();
        assert!(matches!(resolve(&deep, &probe), Err(ResolveError::HopLimit { .. })));
        assert_eq!(probe.calls().len(), MAX_HOPS + 1);
    }
}
