//! Settings persistence
//!
//! Stores the chosen WoW folder and icon selections in
//! ~/.config/dricons/settings.json

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Category key -> icon asset path
pub type PersistedRecord = BTreeMap<String, String>;

/// On-disk settings record
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Last validated WoW installation root
    #[serde(default)]
    pub wow_folder: String,

    /// Icon selections per version folder
    #[serde(default)]
    pub selected_icons_by_version: BTreeMap<String, PersistedRecord>,

    /// Selections written before they were tracked per version.
    /// Only read, as a fallback; never written unless already present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_icons: Option<PersistedRecord>,
}

/// Settings read/write failures
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Settings {
    /// Default settings file path (~/.config/dricons/settings.json)
    pub fn default_path() -> Result<PathBuf, PersistenceError> {
        Ok(dirs::config_dir()
            .ok_or(PersistenceError::NoConfigDir)?
            .join("dricons")
            .join("settings.json"))
    }

    /// Load settings from `path`, or return defaults if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not load settings: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Try to load settings, returning error on failure. A missing file is not an error.
    pub fn try_load(path: &Path) -> Result<Self, PersistenceError> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings to `path`.
    ///
    /// Writes a sibling temp file and renames it over the target, so a crash
    /// mid-write leaves the previous settings intact.
    pub async fn save_to(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| PersistenceError::Write {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(PersistenceError::Serialize)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| PersistenceError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| PersistenceError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Check if a WoW folder has been saved
    pub fn has_wow_folder(&self) -> bool {
        !self.wow_folder.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert!(settings.wow_folder.is_empty());
        assert!(settings.selected_icons_by_version.is_empty());
        assert!(settings.selected_icons.is_none());
        assert!(!settings.has_wow_folder());
    }

    #[test]
    fn test_camel_case_keys() {
        let mut settings = Settings {
            wow_folder: "/games/wow".into(),
            ..Default::default()
        };
        settings.selected_icons_by_version.insert(
            "_retail_".into(),
            PersistedRecord::from([(
                "stun".to_string(),
                "alternative-stun/ability_rogue_kidneyshot.tga".to_string(),
            )]),
        );

        let json: serde_json::Value = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["wowFolder"], "/games/wow");
        assert_eq!(
            json["selectedIconsByVersion"]["_retail_"]["stun"],
            "alternative-stun/ability_rogue_kidneyshot.tga"
        );
        // Legacy key is not written when absent
        assert!(json.get("selectedIcons").is_none());
    }

    #[test]
    fn test_reads_legacy_shape() {
        let raw = r#"{
            "wowFolder": "C:\\Games\\World of Warcraft",
            "selectedIcons": { "stun": "alternative-stun/ability_CheapShot.tga" }
        }"#;
        let settings: Settings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.wow_folder, "C:\\Games\\World of Warcraft");
        assert!(settings.selected_icons_by_version.is_empty());
        assert_eq!(
            settings.selected_icons.unwrap()["stun"],
            "alternative-stun/ability_CheapShot.tga"
        );
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(Settings::load_from(&path), Settings::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Settings::try_load(&path),
            Err(PersistenceError::Parse { .. })
        ));
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            wow_folder: "/games/wow".into(),
            ..Default::default()
        };
        settings.save_to(&path).await.unwrap();

        assert_eq!(Settings::load_from(&path), settings);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
