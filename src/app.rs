//! Application orchestration
//!
//! Ties the pieces together the way the front end uses them: pick or detect
//! a WoW folder, pick a version, then swap icons for that version. Every
//! icon change touches the installation first and only then updates and
//! saves the selection record, so a failed write leaves the record alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::assets::AssetDir;
use crate::catalog::{self, CategoryId, IconRef};
use crate::game_finder::{self, FsProbe, ResolveError, ResolvedInstall, VersionProbe};
use crate::install::{self, IconIoError, ResetOutcome};
use crate::selection::{CategoryMismatch, SelectionRecord, SelectionStore};
use crate::settings::{PersistenceError, Settings};
use crate::tga::{BitmapCache, DecodedBitmap, EncodeError, LoadError, TransferFormat};

/// Edge length of the placeholder shown for icons that fail to load
pub const PLACEHOLDER_SIZE: u32 = 64;

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Settings file location
    pub settings_path: PathBuf,
    /// Icon asset directory
    pub assets_dir: PathBuf,
}

/// Errors surfaced to the user
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("No WoW installation found in the usual locations; select the folder manually")]
    NotDetected,

    #[error("No WoW folder selected")]
    NoInstallation,

    #[error("Version {version:?} not found in {root} (available: {available})")]
    UnknownVersion {
        version: String,
        root: String,
        available: String,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Io(#[from] IconIoError),

    #[error(transparent)]
    Selection(#[from] CategoryMismatch),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// What an icon change did on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskChange {
    Written(PathBuf),
    Reset(ResetOutcome),
}

/// Result of choosing or resetting an icon
#[derive(Debug, Clone)]
pub struct IconChange {
    pub record: SelectionRecord,
    pub disk: DiskChange,
}

/// Settings and selections, updated together under one lock
struct State {
    settings: Settings,
    selections: SelectionStore,
}

pub struct App<P: VersionProbe = FsProbe> {
    config: AppConfig,
    probe: P,
    state: Mutex<State>,
    install: Option<ResolvedInstall>,
    cache: BitmapCache,
    assets: AssetDir,
}

impl App<FsProbe> {
    /// Load settings and build an app against the real filesystem
    pub fn new(config: AppConfig) -> Self {
        Self::with_probe(config, FsProbe)
    }
}

impl<P: VersionProbe> App<P> {
    pub fn with_probe(config: AppConfig, probe: P) -> Self {
        let settings = Settings::load_from(&config.settings_path);
        let selections = SelectionStore::load(&settings);
        let assets = AssetDir::new(&config.assets_dir);

        Self {
            config,
            probe,
            state: Mutex::new(State {
                settings,
                selections,
            }),
            install: None,
            cache: BitmapCache::new(),
            assets,
        }
    }

    pub fn installation(&self) -> Option<&ResolvedInstall> {
        self.install.as_ref()
    }

    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    /// Re-validate the saved WoW folder from a previous session
    pub async fn restore(&mut self) -> Option<&ResolvedInstall> {
        let saved = {
            let state = self.state.lock().await;
            if !state.settings.has_wow_folder() {
                return None;
            }
            state.settings.wow_folder.clone()
        };

        let versions = self.probe.versions(&saved);
        if versions.is_empty() {
            warn!("Saved WoW folder {} no longer has any versions", saved);
            return None;
        }

        self.install = Some(ResolvedInstall {
            root: saved,
            versions,
        });
        self.install.as_ref()
    }

    /// Use `candidate`, or the installation root above it, and remember it
    pub async fn select_folder(&mut self, candidate: &str) -> Result<&ResolvedInstall, AppError> {
        let resolved = game_finder::resolve(candidate, &self.probe)?;
        Ok(self.remember(resolved).await)
    }

    /// Look in the usual install locations and remember the first hit
    pub async fn auto_detect(&mut self) -> Result<&ResolvedInstall, AppError> {
        let resolved = game_finder::auto_detect(&self.probe).ok_or(AppError::NotDetected)?;
        Ok(self.remember(resolved).await)
    }

    async fn remember(&mut self, resolved: ResolvedInstall) -> &ResolvedInstall {
        info!("Using WoW folder {} ({:?})", resolved.root, resolved.versions);
        {
            let mut state = self.state.lock().await;
            state.settings.wow_folder = resolved.root.clone();
            if let Err(e) = state.settings.save_to(&self.config.settings_path).await {
                warn!("Could not save WoW folder: {}", e);
            }
        }
        self.install.insert(resolved)
    }

    fn require_version(&self, version: &str) -> Result<&ResolvedInstall, AppError> {
        let install = self.install.as_ref().ok_or(AppError::NoInstallation)?;
        if !install.has_version(version) {
            return Err(AppError::UnknownVersion {
                version: version.to_string(),
                root: install.root.clone(),
                available: install.versions.join(", "),
            });
        }
        Ok(install)
    }

    /// Current selections for a version of the selected installation
    pub async fn selections_for(&self, version: &str) -> Result<SelectionRecord, AppError> {
        self.require_version(version)?;
        Ok(self.state.lock().await.selections.selections_for(version))
    }

    /// Swap in `icon` for its category. Choosing the default resets instead.
    pub async fn choose_icon(&self, version: &str, icon: IconRef) -> Result<IconChange, AppError> {
        let category = icon.category();
        if icon.is_default() {
            return self.reset_icon(version, category).await;
        }

        let install = self.require_version(version)?;
        let target = category.info().target_file_name;

        let bitmap = self.assets.load_icon(&self.cache, icon).await?;
        let bytes = bitmap.encode_for_transfer(TransferFormat::for_target(target))?;

        // Held from the disk write through the save, so the file and the record agree
        let mut state = self.state.lock().await;
        let written = install::apply_icon(Path::new(&install.root), version, target, &bytes).await?;

        let record = self
            .commit(&mut state, |store| store.record_selection(version, category, icon))
            .await?;
        Ok(IconChange {
            record,
            disk: DiskChange::Written(written),
        })
    }

    /// Restore the stock icon for one category
    pub async fn reset_icon(
        &self,
        version: &str,
        category: CategoryId,
    ) -> Result<IconChange, AppError> {
        let install = self.require_version(version)?;
        let target = category.info().target_file_name;

        let mut state = self.state.lock().await;
        let outcome = install::reset_icon(Path::new(&install.root), version, target).await?;

        let record = self
            .commit(&mut state, |store| Ok(store.record_reset(version, category)))
            .await?;
        Ok(IconChange {
            record,
            disk: DiskChange::Reset(outcome),
        })
    }

    /// Restore every stock icon for a version
    pub async fn reset_all(&self, version: &str) -> Result<IconChange, AppError> {
        let install = self.require_version(version)?;

        let mut state = self.state.lock().await;
        let outcome = install::reset_all_icons(Path::new(&install.root), version).await?;

        let record = self
            .commit(&mut state, |store| Ok(store.record_reset_all(version)))
            .await?;
        Ok(IconChange {
            record,
            disk: DiskChange::Reset(outcome),
        })
    }

    /// Apply a selection change and save it if anything changed.
    /// Save failures are logged, not returned. Callers hold the state lock.
    async fn commit<F>(&self, state: &mut State, change: F) -> Result<SelectionRecord, AppError>
    where
        F: FnOnce(&mut SelectionStore) -> Result<SelectionRecord, CategoryMismatch>,
    {
        let State {
            settings,
            selections,
        } = state;

        let record = change(selections)?;
        if !selections.is_dirty() {
            return Ok(record);
        }
        selections.write_to(settings);

        match settings.save_to(&self.config.settings_path).await {
            Ok(()) => selections.mark_clean(),
            Err(e) => warn!("Could not save icon selections: {}", e),
        }
        Ok(record)
    }

    /// Decoded bitmap for display. Icons that fail to load get a placeholder.
    pub async fn preview(&self, icon: IconRef) -> Arc<DecodedBitmap> {
        match self.assets.load_icon(&self.cache, icon).await {
            Ok(bitmap) => bitmap,
            Err(e) => {
                warn!("Showing placeholder for {}: {}", icon, e);
                Arc::new(DecodedBitmap::placeholder(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE))
            }
        }
    }

    /// Decode every catalog icon concurrently. Returns how many loaded.
    pub async fn preload_gallery(&self) -> usize {
        let icons = catalog::categories().iter().flat_map(|cat| {
            std::iter::once(cat.id.default_icon())
                .chain((1..=cat.alternatives.len()).filter_map(move |n| IconRef::alternative(cat.id, n)))
        });

        let results = join_all(icons.map(|icon| self.assets.load_icon(&self.cache, icon))).await;
        let loaded = results.iter().filter(|r| r.is_ok()).count();
        info!(
            "Preloaded {}/{} icons from {}",
            loaded,
            results.len(),
            self.assets.root().display()
        );
        loaded
    }
}
