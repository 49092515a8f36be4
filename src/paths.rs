//! String-level path helpers for user-supplied install paths
//!
//! Paths arrive from a folder picker, the command line, or a settings file
//! written on another platform, so both `/` and `\` count as separators.
//! Nothing here touches the filesystem.

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Strip trailing separators
/// `C:\Games\World of Warcraft\` -> `C:\Games\World of Warcraft`
///
/// A path made only of separators (a filesystem root) trims to an empty string.
pub fn trim_trailing_separators(path: &str) -> &str {
    path.trim_end_matches(SEPARATORS)
}

/// Get the parent directory of a path (handles both / and \)
///
/// Returns `None` when the path has no parent: empty strings, bare roots and
/// single relative segments. A leading root separator is kept, so `/games`
/// yields `/`.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = trim_trailing_separators(path);
    if trimmed.is_empty() {
        return None;
    }

    let idx = trimmed.rfind(SEPARATORS)?;
    let parent = trim_trailing_separators(&trimmed[..idx]);
    if parent.is_empty() {
        // `/games` or `//games`: the parent is the root itself
        Some(&trimmed[..1])
    } else if is_drive_prefix(parent) {
        // `C:\Games`: the parent is `C:\`, not the drive-relative `C:`
        Some(&trimmed[..parent.len() + 1])
    } else {
        Some(parent)
    }
}

/// `C:` and the like
fn is_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Get the filename from a path (handles both / and \)
pub fn file_name(path: &str) -> &str {
    path.rfind(SEPARATORS)
        .map(|idx| &path[idx + 1..])
        .unwrap_or(path)
}

/// Get file extension (lowercase)
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    name.rfind('.').map(|idx| name[idx + 1..].to_lowercase())
}
