//! Per-version icon selections
//!
//! Each installed version (`_retail_`, `_classic_`, ...) keeps its own
//! category -> icon record. Builds that predate per-version tracking stored a
//! single flat record; that record is kept as a read-only fallback so users
//! upgrading do not lose their choices.
//!
//! Precedence for a version: its own record, then the legacy record (only
//! while the store is in the [`SelectionState::Legacy`] state), then defaults.
//! Once a version has its own record, the legacy record never applies to it
//! again.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::{CategoryId, IconRef};
use crate::settings::{PersistedRecord, Settings};

/// Category -> chosen icon for one version. Always covers every category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRecord {
    icons: BTreeMap<CategoryId, IconRef>,
}

impl Default for SelectionRecord {
    fn default() -> Self {
        Self {
            icons: CategoryId::ALL
                .iter()
                .map(|cat| (*cat, cat.default_icon()))
                .collect(),
        }
    }
}

impl SelectionRecord {
    pub fn get(&self, category: CategoryId) -> IconRef {
        self.icons
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_icon())
    }

    /// A copy of this record with `category` set to `icon`
    pub fn with(&self, category: CategoryId, icon: IconRef) -> Self {
        let mut next = self.clone();
        next.icons.insert(category, icon);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, IconRef)> + '_ {
        self.icons.iter().map(|(cat, icon)| (*cat, *icon))
    }

    pub fn is_all_default(&self) -> bool {
        self.iter().all(|(_, icon)| icon.is_default())
    }

    /// Build from a persisted record, dropping entries that no longer resolve
    fn from_persisted(raw: &PersistedRecord) -> Self {
        let mut record = Self::default();
        for (key, asset) in raw {
            let Some(category) = CategoryId::parse(key) else {
                warn!("Ignoring saved selection for unknown category {:?}", key);
                continue;
            };
            match IconRef::from_asset(asset).filter(|icon| icon.category() == category) {
                Some(icon) => {
                    record.icons.insert(category, icon);
                }
                None => warn!("Ignoring unknown saved icon {:?} for {}", asset, category),
            }
        }
        record
    }

    fn to_persisted(&self) -> PersistedRecord {
        self.iter()
            .map(|(cat, icon)| (cat.as_str().to_string(), icon.asset().to_string()))
            .collect()
    }
}

/// Where selections come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// Nothing saved yet
    Fresh,
    /// Only a legacy record was saved. It backs every version without its own record.
    Legacy {
        legacy: SelectionRecord,
        versions: BTreeMap<String, SelectionRecord>,
    },
    /// Per-version records are the only source of truth
    Migrated {
        versions: BTreeMap<String, SelectionRecord>,
    },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Icon {icon} does not belong to category {category}")]
pub struct CategoryMismatch {
    pub category: CategoryId,
    pub icon: IconRef,
}

/// Selection state plus a dirty flag for persistence
#[derive(Debug, Clone)]
pub struct SelectionStore {
    state: SelectionState,
    dirty: bool,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self {
            state: SelectionState::Fresh,
            dirty: false,
        }
    }
}

impl SelectionStore {
    /// Build the store from persisted settings. Never fails.
    pub fn load(settings: &Settings) -> Self {
        let state = if !settings.selected_icons_by_version.is_empty() {
            let versions = settings
                .selected_icons_by_version
                .iter()
                .map(|(version, raw)| (version.clone(), SelectionRecord::from_persisted(raw)))
                .collect();
            SelectionState::Migrated { versions }
        } else if let Some(raw) = &settings.selected_icons {
            debug!("Using legacy icon selections as fallback");
            SelectionState::Legacy {
                legacy: SelectionRecord::from_persisted(raw),
                versions: BTreeMap::new(),
            }
        } else {
            SelectionState::Fresh
        };

        Self {
            state,
            dirty: false,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Effective selections for `version`
    pub fn selections_for(&self, version: &str) -> SelectionRecord {
        match &self.state {
            SelectionState::Fresh => SelectionRecord::default(),
            SelectionState::Legacy { legacy, versions } => {
                versions.get(version).unwrap_or(legacy).clone()
            }
            SelectionState::Migrated { versions } => {
                versions.get(version).cloned().unwrap_or_default()
            }
        }
    }

    /// Set one category for `version`, returning the version's new record
    pub fn record_selection(
        &mut self,
        version: &str,
        category: CategoryId,
        icon: IconRef,
    ) -> Result<SelectionRecord, CategoryMismatch> {
        if icon.category() != category {
            return Err(CategoryMismatch { category, icon });
        }
        let record = self.selections_for(version).with(category, icon);
        self.store(version, record.clone());
        Ok(record)
    }

    /// Put `category` back to its default for `version`
    pub fn record_reset(&mut self, version: &str, category: CategoryId) -> SelectionRecord {
        let record = self
            .selections_for(version)
            .with(category, category.default_icon());
        self.store(version, record.clone());
        record
    }

    /// Put every category back to its default for `version`
    pub fn record_reset_all(&mut self, version: &str) -> SelectionRecord {
        let record = SelectionRecord::default();
        self.store(version, record.clone());
        record
    }

    fn store(&mut self, version: &str, record: SelectionRecord) {
        match &mut self.state {
            SelectionState::Fresh => {
                self.state = SelectionState::Migrated {
                    versions: BTreeMap::from([(version.to_string(), record)]),
                };
            }
            SelectionState::Legacy { versions, .. } | SelectionState::Migrated { versions } => {
                if versions.get(version) == Some(&record) {
                    return;
                }
                versions.insert(version.to_string(), record);
            }
        }
        self.dirty = true;
    }

    /// Whether there are changes not yet written out
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Write per-version records into `settings`. The legacy field is left untouched.
    pub fn write_to(&self, settings: &mut Settings) {
        let versions = match &self.state {
            SelectionState::Fresh => return,
            SelectionState::Legacy { versions, .. } | SelectionState::Migrated { versions } => {
                versions
            }
        };
        settings.selected_icons_by_version = versions
            .iter()
            .map(|(version, record)| (version.clone(), record.to_persisted()))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt(category: CategoryId, n: usize) -> IconRef {
        IconRef::alternative(category, n).unwrap()
    }

    fn legacy_settings(entries: &[(&str, &str)]) -> Settings {
        Settings {
            selected_icons: Some(
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_store_defaults() {
        let store = SelectionStore::load(&Settings::default());
        assert_eq!(store.state(), &SelectionState::Fresh);
        let record = store.selections_for("_retail_");
        assert!(record.is_all_default());
        assert_eq!(record.iter().count(), CategoryId::ALL.len());
    }

    #[test]
    fn test_legacy_migration() {
        let x = alt(CategoryId::Stun, 2);
        let y = alt(CategoryId::Incap, 1);
        let mut store = SelectionStore::load(&legacy_settings(&[("stun", x.asset())]));
        assert!(matches!(store.state(), SelectionState::Legacy { .. }));

        for version in ["_retail_", "_classic_"] {
            let record = store.selections_for(version);
            assert_eq!(record.get(CategoryId::Stun), x);
            assert!(record.get(CategoryId::Incap).is_default());
            assert!(record.get(CategoryId::Fear).is_default());
        }

        store
            .record_selection("_retail_", CategoryId::Incap, y)
            .unwrap();

        let retail = store.selections_for("_retail_");
        assert_eq!(retail.get(CategoryId::Stun), x);
        assert_eq!(retail.get(CategoryId::Incap), y);
        assert!(retail.get(CategoryId::Root).is_default());

        // Other versions still fall back to legacy
        let classic = store.selections_for("_classic_");
        assert_eq!(classic.get(CategoryId::Stun), x);
        assert!(classic.get(CategoryId::Incap).is_default());
    }

    #[test]
    fn test_version_record_shadows_legacy() {
        let x = alt(CategoryId::Stun, 1);
        let mut store = SelectionStore::load(&legacy_settings(&[("stun", x.asset())]));

        store.record_reset("_retail_", CategoryId::Stun);
        assert!(store.selections_for("_retail_").get(CategoryId::Stun).is_default());
        assert_eq!(store.selections_for("_ptr_").get(CategoryId::Stun), x);
    }

    #[test]
    fn test_per_version_map_wins_over_legacy() {
        let mut settings = legacy_settings(&[("stun", alt(CategoryId::Stun, 1).asset())]);
        settings.selected_icons_by_version.insert(
            "_retail_".into(),
            PersistedRecord::from([("fear".into(), alt(CategoryId::Fear, 1).asset().into())]),
        );

        let store = SelectionStore::load(&settings);
        assert!(matches!(store.state(), SelectionState::Migrated { .. }));
        assert_eq!(
            store.selections_for("_retail_").get(CategoryId::Fear),
            alt(CategoryId::Fear, 1)
        );
        assert!(store.selections_for("_classic_").is_all_default());
    }

    #[test]
    fn test_unknown_entries_dropped() {
        let store = SelectionStore::load(&legacy_settings(&[
            ("silence", "whatever.tga"),
            ("stun", "alternative-root/spell_frost_frostnova.tga"),
            ("fear", "no/such/icon.tga"),
            ("root", "alternative-root/spell_frost_frostnova.tga"),
        ]));
        let record = store.selections_for("_retail_");
        assert!(record.get(CategoryId::Stun).is_default());
        assert!(record.get(CategoryId::Fear).is_default());
        assert_eq!(record.get(CategoryId::Root), alt(CategoryId::Root, 1));
    }

    #[test]
    fn test_copy_on_write() {
        let mut store = SelectionStore::default();
        let before = store.selections_for("_retail_");
        let after = store
            .record_selection("_retail_", CategoryId::Stun, alt(CategoryId::Stun, 1))
            .unwrap();

        assert!(before.is_all_default());
        assert_eq!(after.get(CategoryId::Stun), alt(CategoryId::Stun, 1));
        assert!(matches!(store.state(), SelectionState::Migrated { .. }));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_unchanged_record_stays_clean() {
        let mut store = SelectionStore::default();
        store
            .record_selection("_retail_", CategoryId::Stun, alt(CategoryId::Stun, 1))
            .unwrap();
        store.mark_clean();

        store
            .record_selection("_retail_", CategoryId::Stun, alt(CategoryId::Stun, 1))
            .unwrap();
        assert!(!store.is_dirty());

        store.record_reset("_retail_", CategoryId::Stun);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_category_mismatch() {
        let mut store = SelectionStore::default();
        let err = store
            .record_selection("_retail_", CategoryId::Fear, alt(CategoryId::Stun, 1))
            .unwrap_err();
        assert_eq!(err.category, CategoryId::Fear);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_reset_all() {
        let mut store = SelectionStore::default();
        store
            .record_selection("_retail_", CategoryId::Stun, alt(CategoryId::Stun, 1))
            .unwrap();
        store
            .record_selection("_retail_", CategoryId::Root, alt(CategoryId::Root, 1))
            .unwrap();
        assert!(store.record_reset_all("_retail_").is_all_default());
        assert!(store.selections_for("_retail_").is_all_default());
    }

    #[test]
    fn test_write_and_reload() {
        let legacy_icon = alt(CategoryId::Stun, 2);
        let mut settings = legacy_settings(&[("stun", legacy_icon.asset())]);
        let mut store = SelectionStore::load(&settings);
        store
            .record_selection("_retail_", CategoryId::Root, alt(CategoryId::Root, 1))
            .unwrap();
        store.write_to(&mut settings);

        // Legacy field is never rewritten
        assert_eq!(
            settings.selected_icons.as_ref().unwrap()["stun"],
            legacy_icon.asset()
        );
        assert_eq!(
            settings.selected_icons_by_version["_retail_"]["root"],
            alt(CategoryId::Root, 1).asset()
        );

        let reloaded = SelectionStore::load(&settings);
        assert_eq!(
            reloaded.selections_for("_retail_"),
            store.selections_for("_retail_")
        );
    }
}
