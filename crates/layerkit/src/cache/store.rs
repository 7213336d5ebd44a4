use super::source_key;
use crate::error::FetchError;
use crate::fetch::FetcherRegistry;
use crate::model::{Data, Feature, Range};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

type Slots = IndexMap<String, Arc<Vec<Feature>>>;
type InFlightKey = (String, String);

/// Counters for monitoring cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches answered from a trusted slot.
    pub hits: u64,
    /// Fetcher invocations.
    pub fetches: u64,
    /// Fetches that waited on an identical in-flight fetch.
    pub coalesced: u64,
    /// Fetcher invocations that failed.
    pub failures: u64,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<String, Slots>,
    /// Completion is signalled by dropping or firing the sender.
    in_flight: HashMap<InFlightKey, broadcast::Sender<()>>,
    stats: CacheStats,
}

/// Features keyed by source, then by range, with in-flight de-duplication.
///
/// Slots are replaced whole and read back in first-write order. The lock is
/// never held across an `.await`.
pub struct FeatureCache {
    registry: Arc<FetcherRegistry>,
    inner: Mutex<Inner>,
}

enum Plan {
    Trusted,
    Wait(broadcast::Receiver<()>),
    Fetch,
}

/// Clears the in-flight mark when the owning fetch finishes, including when
/// it fails or its future is dropped.
struct InFlightGuard<'a> {
    cache: &'a FeatureCache,
    key: Option<InFlightKey>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if let Some(tx) = self.cache.inner.lock().in_flight.remove(&key) {
                let _ = tx.send(());
            }
        }
    }
}

impl FeatureCache {
    pub fn new(registry: Arc<FetcherRegistry>) -> Self {
        Self {
            registry,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn get(&self, source_key: &str, range_key: &str) -> Option<Arc<Vec<Feature>>> {
        self.inner
            .lock()
            .slots
            .get(source_key)
            .and_then(|slots| slots.get(range_key))
            .cloned()
    }

    /// Every slot of a source, in the order the slots were first written.
    pub fn get_all(&self, source_key: &str) -> Option<Vec<Arc<Vec<Feature>>>> {
        self.inner
            .lock()
            .slots
            .get(source_key)
            .map(|slots| slots.values().cloned().collect())
    }

    /// Replaces one slot. A replaced slot keeps its position.
    pub fn set(&self, source_key: &str, range_key: &str, features: Vec<Feature>) {
        self.inner
            .lock()
            .slots
            .entry(source_key.to_string())
            .or_default()
            .insert(range_key.to_string(), Arc::new(features));
    }

    /// Removes the given feature ids from every slot of a source. Slots that
    /// contain none of them are left as the same `Arc`. Returns whether any
    /// slot changed.
    pub fn delete_all(&self, source_key: &str, ids: &[String]) -> bool {
        let mut inner = self.inner.lock();
        let Some(slots) = inner.slots.get_mut(source_key) else {
            return false;
        };
        let mut changed = false;
        for features in slots.values_mut() {
            if !features.iter().any(|f| ids.contains(&f.id)) {
                continue;
            }
            let kept: Vec<Feature> = features
                .iter()
                .filter(|f| !ids.contains(&f.id))
                .cloned()
                .collect();
            *features = Arc::new(kept);
            changed = true;
        }
        changed
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    /// Drops every slot. In-flight fetches still write their result.
    pub fn clear(&self) {
        self.inner.lock().slots.clear();
    }

    /// Makes sure the slot for `(data, range)` is populated.
    ///
    /// Content-addressed data already in the cache is trusted as is. When an
    /// identical fetch is already running, this waits for it to finish
    /// instead of fetching again; the waiter does not see that fetch's
    /// error. Otherwise the registry is invoked and its result written.
    pub async fn fetch(
        &self,
        data: &Data,
        range: Option<&Range>,
        layer_id: &str,
    ) -> Result<(), FetchError> {
        let source_key = source_key(data, layer_id);
        let range_key = Range::key(range);

        let plan = {
            let mut inner = self.inner.lock();
            let cached = inner
                .slots
                .get(&source_key)
                .is_some_and(|slots| slots.contains_key(&range_key));
            let key = (source_key.clone(), range_key.clone());
            if cached && data.is_content_addressed() {
                inner.stats.hits += 1;
                Plan::Trusted
            } else if let Some(tx) = inner.in_flight.get(&key) {
                let rx = tx.subscribe();
                inner.stats.coalesced += 1;
                Plan::Wait(rx)
            } else {
                let (tx, _) = broadcast::channel(1);
                inner.in_flight.insert(key, tx);
                inner.stats.fetches += 1;
                Plan::Fetch
            }
        };

        match plan {
            Plan::Trusted => {
                debug!(source = %source_key, range = %range_key, "cache hit");
                Ok(())
            }
            Plan::Wait(mut rx) => {
                debug!(source = %source_key, range = %range_key, "coalescing with in-flight fetch");
                // A closed channel also means the fetch is over.
                let _ = rx.recv().await;
                Ok(())
            }
            Plan::Fetch => {
                let _guard = InFlightGuard {
                    cache: self,
                    key: Some((source_key.clone(), range_key.clone())),
                };
                debug!(source = %source_key, range = %range_key, "fetching");
                match self.registry.fetch(data, range).await {
                    Ok(features) => {
                        debug!(source = %source_key, range = %range_key, count = features.len(), "fetched");
                        self.set(&source_key, &range_key, features);
                        Ok(())
                    }
                    Err(err) => {
                        self.inner.lock().stats.failures += 1;
                        warn!(source = %source_key, range = %range_key, error = %err, "fetch failed");
                        Err(err)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetcherRegistry, FnFetcher};
    use crate::model::DataType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn features(ids: &[&str]) -> Vec<Feature> {
        ids.iter().map(|id| Feature::new(*id)).collect()
    }

    fn ids(slot: &[Feature]) -> Vec<&str> {
        slot.iter().map(|f| f.id.as_str()).collect()
    }

    fn counting_cache(delay: Duration) -> (FeatureCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = FetcherRegistry::new();
        registry.register(
            DataType::GeoJson,
            FnFetcher::new(move |_data: Data, range: Option<Range>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    let id = format!("f{}", Range::key(range.as_ref()));
                    Ok::<_, FetchError>(vec![Feature::new(id)])
                }
            }),
        );
        (FeatureCache::new(Arc::new(registry)), calls)
    }

    fn empty_cache() -> FeatureCache {
        FeatureCache::new(Arc::new(FetcherRegistry::new()))
    }

    #[test]
    fn test_set_get_round_trip() {
        let cache = empty_cache();
        cache.set("s", "1:2:3", features(&["a", "b"]));
        assert_eq!(ids(&cache.get("s", "1:2:3").unwrap()), vec!["a", "b"]);
        assert!(cache.get("s", "").is_none());
        assert!(cache.get("other", "1:2:3").is_none());
    }

    #[test]
    fn test_get_all_keeps_first_write_order() {
        let cache = empty_cache();
        cache.set("s", "a", features(&["1"]));
        cache.set("s", "b", features(&["2"]));
        cache.set("s", "a", features(&["3"]));
        let all = cache.get_all("s").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(ids(&all[0]), vec!["3"]);
        assert_eq!(ids(&all[1]), vec!["2"]);
        assert!(cache.get_all("missing").is_none());
    }

    #[test]
    fn test_delete_is_surgical() {
        let cache = empty_cache();
        cache.set("s", "a", features(&["1", "2"]));
        cache.set("s", "b", features(&["3"]));
        let untouched = cache.get("s", "b").unwrap();

        assert!(cache.delete_all("s", &["2".to_string()]));
        assert_eq!(ids(&cache.get("s", "a").unwrap()), vec!["1"]);
        assert!(Arc::ptr_eq(&untouched, &cache.get("s", "b").unwrap()));

        assert!(!cache.delete_all("s", &["404".to_string()]));
        assert!(!cache.delete_all("missing", &["1".to_string()]));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_are_deduplicated() {
        let (cache, calls) = counting_cache(Duration::from_millis(20));
        let data = Data::from_url(DataType::GeoJson, "https://e/x.geojson");

        let (a, b) = tokio::join!(
            cache.fetch(&data, None, "l1"),
            cache.fetch(&data, None, "l2")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 1);
        let key = source_key(&data, "l1");
        assert_eq!(ids(&cache.get(&key, "").unwrap()), vec!["f"]);
    }

    #[tokio::test]
    async fn test_different_ranges_fetch_independently() {
        let (cache, calls) = counting_cache(Duration::from_millis(5));
        let data = Data::from_url(DataType::GeoJson, "https://e/x.geojson");
        let (r1, r2) = (Range::new(0, 0, 1), Range::new(1, 0, 1));

        let (a, b) = tokio::join!(
            cache.fetch(&data, Some(&r1), "l"),
            cache.fetch(&data, Some(&r2), "l")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get_all(&source_key(&data, "l")).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_url_data_is_trusted_once_cached() {
        let (cache, calls) = counting_cache(Duration::ZERO);
        let data = Data::from_url(DataType::GeoJson, "https://e/x.geojson");
        cache.fetch(&data, None, "l").await.unwrap();
        cache.fetch(&data, None, "other").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_inline_data_is_refetched() {
        let (cache, calls) = counting_cache(Duration::ZERO);
        let data = Data::inline(DataType::GeoJson, serde_json::json!([]));
        cache.fetch(&data, None, "l").await.unwrap();
        cache.fetch(&data, None, "l").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_clears_in_flight_mark() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mut registry = FetcherRegistry::new();
        registry.register(
            DataType::GeoJson,
            FnFetcher::new(move |_data: Data, _range: Option<Range>| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(FetchError::Network("connection reset".into()))
                    } else {
                        Ok(vec![Feature::new("ok")])
                    }
                }
            }),
        );
        let cache = FeatureCache::new(Arc::new(registry));
        let data = Data::from_url(DataType::GeoJson, "https://e/x.geojson");

        assert_eq!(
            cache.fetch(&data, None, "l").await,
            Err(FetchError::Network("connection reset".into()))
        );
        assert!(cache.get(&source_key(&data, "l"), "").is_none());
        cache.fetch(&data, None, "l").await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().failures, 1);
        assert!(cache.get(&source_key(&data, "l"), "").is_some());
    }
}
