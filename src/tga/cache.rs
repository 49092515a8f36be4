//! Memoizing bitmap cache with single-flight decoding
//!
//! Bitmaps are keyed by source identity (the asset path), not by content.
//! The icon catalog is closed and assets never change while the process
//! runs, so entries are never evicted or invalidated.
//!
//! Concurrent requests for a source that is not cached yet share one decode:
//! the first request registers an in-flight entry holding a `watch` receiver
//! and spawns the fetch + decode task; later requests clone the receiver and
//! wait for the same result. Failures are broadcast to every waiter but never
//! cached, so the next request retries.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::{decode, DecodeError, DecodedBitmap};

/// Identity of a bitmap source (an asset path)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        SourceId(Arc::from(s))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a bitmap could not be produced
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read icon asset {source_id}: {message}")]
    Asset { source_id: String, message: String },

    #[error("Failed to decode {source_id}: {error}")]
    Decode {
        source_id: String,
        #[source]
        error: DecodeError,
    },

    #[error("Decode of {0} was abandoned")]
    Abandoned(String),
}

type LoadResult = Result<Arc<DecodedBitmap>, LoadError>;

enum Slot {
    Ready(Arc<DecodedBitmap>),
    InFlight(watch::Receiver<Option<LoadResult>>),
}

struct Inner {
    slots: Mutex<HashMap<SourceId, Slot>>,
    decodes: AtomicUsize,
}

/// Process-lifetime bitmap cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct BitmapCache {
    inner: Arc<Inner>,
}

impl Default for BitmapCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BitmapCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                decodes: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of parses performed so far
    pub fn decode_count(&self) -> usize {
        self.inner.decodes.load(Ordering::SeqCst)
    }

    /// Number of cached bitmaps
    pub fn len(&self) -> usize {
        let slots = self.inner.slots.lock().expect("bitmap cache lock poisoned");
        slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached bitmap, if already decoded
    pub fn get(&self, source: &SourceId) -> Option<Arc<DecodedBitmap>> {
        let slots = self.inner.slots.lock().expect("bitmap cache lock poisoned");
        match slots.get(source) {
            Some(Slot::Ready(bitmap)) => Some(bitmap.clone()),
            _ => None,
        }
    }

    /// Decode `bytes` for `source`, or return the bitmap already cached for it
    pub async fn decode(&self, source: &SourceId, bytes: Vec<u8>) -> LoadResult {
        self.get_or_load(source, move || async move { Ok(bytes) })
            .await
    }

    /// Return the bitmap for `source`, fetching and decoding it at most once.
    ///
    /// `fetch` only runs when no cached or in-flight entry exists.
    pub async fn get_or_load<F, Fut>(&self, source: &SourceId, fetch: F) -> LoadResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, LoadError>> + Send + 'static,
    {
        let rx = {
            let mut slots = self.inner.slots.lock().expect("bitmap cache lock poisoned");
            match slots.get(source) {
                Some(Slot::Ready(bitmap)) => return Ok(bitmap.clone()),
                Some(Slot::InFlight(rx)) => {
                    debug!("Joining in-flight decode of {}", source);
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    slots.insert(source.clone(), Slot::InFlight(rx.clone()));
                    self.spawn_load(source.clone(), fetch(), tx);
                    rx
                }
            }
        };

        Self::wait(source, rx).await
    }

    fn spawn_load<Fut>(&self, source: SourceId, fetch: Fut, tx: watch::Sender<Option<LoadResult>>)
    where
        Fut: Future<Output = Result<Vec<u8>, LoadError>> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let result = match fetch.await {
                Ok(bytes) => {
                    inner.decodes.fetch_add(1, Ordering::SeqCst);
                    decode(&bytes)
                        .map(Arc::new)
                        .map_err(|error| LoadError::Decode {
                            source_id: source.to_string(),
                            error,
                        })
                }
                Err(e) => Err(e),
            };

            {
                let mut slots = inner.slots.lock().expect("bitmap cache lock poisoned");
                match &result {
                    Ok(bitmap) => {
                        debug!(
                            "Decoded {} ({}x{})",
                            source,
                            bitmap.width(),
                            bitmap.height()
                        );
                        slots.insert(source.clone(), Slot::Ready(bitmap.clone()));
                    }
                    Err(e) => {
                        warn!("{}", e);
                        slots.remove(&source);
                    }
                }
            }

            // No receivers left is fine: the cache entry is already settled
            let _ = tx.send(Some(result));
        });
    }

    async fn wait(source: &SourceId, mut rx: watch::Receiver<Option<LoadResult>>) -> LoadResult {
        match rx.wait_for(|value| value.is_some()).await {
            Ok(value) => match value.as_ref() {
                Some(result) => result.clone(),
                None => Err(LoadError::Abandoned(source.to_string())),
            },
            Err(_) => Err(LoadError::Abandoned(source.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tga::tests::{header, rle_sample};
    use std::time::Duration;

    #[tokio::test]
    async fn test_memoized_by_source() {
        let cache = BitmapCache::new();
        let source = SourceId::from("default-drs/spell_frost_stun.tga");

        let first = cache.decode(&source, rle_sample(0)).await.unwrap();
        let second = cache.decode(&source, rle_sample(0)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.decode_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_identity_not_content() {
        let cache = BitmapCache::new();
        let a = SourceId::from("a.tga");
        let b = SourceId::from("b.tga");

        let first = cache.decode(&a, rle_sample(0)).await.unwrap();
        // Same key, different bytes: the cached bitmap wins
        let again = cache.decode(&a, rle_sample(0x20)).await.unwrap();
        let other = cache.decode(&b, rle_sample(0)).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(*first, *other);
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(cache.decode_count(), 2);
    }

    #[tokio::test]
    async fn test_truncated_not_cached() {
        let cache = BitmapCache::new();
        let source = SourceId::from("broken.tga");
        let truncated = header(10, 3, 2, 24, 0)[..12].to_vec();

        let err = cache.decode(&source, truncated).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Decode {
                error: DecodeError::TruncatedHeader { len: 12 },
                ..
            }
        ));
        assert!(cache.get(&source).is_none());
        assert!(cache.is_empty());

        // A later request retries instead of reusing the failure
        assert!(cache.decode(&source, rle_sample(0)).await.is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_not_cached() {
        let cache = BitmapCache::new();
        let source = SourceId::from("missing.tga");

        let err = cache
            .get_or_load(&source, || async {
                Err(LoadError::Asset {
                    source_id: "missing.tga".into(),
                    message: "not found".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::Asset { .. }));
        assert_eq!(cache.decode_count(), 0);
        assert!(cache.get(&source).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let cache = BitmapCache::new();
        let source = SourceId::from("alternative-stun/ability_rogue_kidneyshot.tga");
        let fetches = Arc::new(AtomicUsize::new(0));

        let fetch = |fetches: Arc<AtomicUsize>| {
            move || async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, LoadError>(rle_sample(0))
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_load(&source, fetch(fetches.clone())),
            cache.get_or_load(&source, fetch(fetches.clone())),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.decode_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_failure_reaches_all_waiters() {
        let cache = BitmapCache::new();
        let source = SourceId::from("bad.tga");
        let bad = header(99, 1, 1, 24, 0);

        let (a, b) = tokio::join!(
            cache.decode(&source, bad.clone()),
            cache.decode(&source, bad.clone()),
        );

        assert_eq!(a.unwrap_err(), b.unwrap_err());
        assert_eq!(cache.decode_count(), 1);
        assert!(cache.is_empty());
    }
}
