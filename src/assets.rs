//! Icon asset directory
//!
//! Assets are the bundled TGA files referenced by the catalog, laid out as
//! `default-drs/`, `alternative-stun/`, `alternative-incap/`, and so on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::catalog::IconRef;
use crate::tga::{BitmapCache, DecodedBitmap, LoadError, SourceId};

/// Read-only view of the asset directory
#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location: `<data dir>/dricons/assets`
    pub fn default_root() -> Result<PathBuf> {
        Ok(dirs::data_dir()
            .context("Could not determine data directory")?
            .join("dricons")
            .join("assets"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of an asset
    pub fn path_of(&self, asset: &str) -> PathBuf {
        asset
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Read an asset's raw bytes
    pub async fn read(&self, asset: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.path_of(asset);
        debug!("Reading icon asset {}", path.display());
        tokio::fs::read(&path).await.map_err(|e| LoadError::Asset {
            source_id: asset.to_string(),
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Load an icon's bitmap through `cache`, reading the asset only on a miss
    pub async fn load_icon(
        &self,
        cache: &BitmapCache,
        icon: IconRef,
    ) -> Result<Arc<DecodedBitmap>, LoadError> {
        let source = SourceId::from(icon.asset());
        let assets = self.clone();
        cache
            .get_or_load(&source, move || async move { assets.read(icon.asset()).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryId;
    use crate::tga::tests::rle_sample;
    use tempfile::tempdir;

    #[test]
    fn test_path_of() {
        let assets = AssetDir::new("/opt/dricons/assets");
        assert_eq!(
            assets.path_of("default-drs/spell_frost_stun.tga"),
            PathBuf::from("/opt/dricons/assets/default-drs/spell_frost_stun.tga")
        );
        assert_eq!(
            assets.path_of("alternative-root\\spell_frost_frostnova.tga"),
            PathBuf::from("/opt/dricons/assets/alternative-root/spell_frost_frostnova.tga")
        );
    }

    #[tokio::test]
    async fn test_load_icon_reads_once() {
        let dir = tempdir().unwrap();
        let assets = AssetDir::new(dir.path());
        let icon = CategoryId::Stun.default_icon();
        let path = assets.path_of(icon.asset());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, rle_sample(0)).unwrap();

        let cache = BitmapCache::new();
        let first = assets.load_icon(&cache, icon).await.unwrap();

        // Cached: the file is no longer needed
        std::fs::remove_file(&path).unwrap();
        let second = assets.load_icon(&cache, icon).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.decode_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let dir = tempdir().unwrap();
        let assets = AssetDir::new(dir.path());
        let cache = BitmapCache::new();

        let err = assets
            .load_icon(&cache, CategoryId::Fear.default_icon())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Asset { .. }));
    }
}
