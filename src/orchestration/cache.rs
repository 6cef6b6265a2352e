//! Process-wide memoization of catalog and instrument-universe loads.
//!
//! Concurrent requests for the same key share one in-flight load and all
//! receive its result. Successful results are kept for a TTL; failures are
//! never cached.

use crate::datasource::{CatalogProvider, InstrumentLookup, ServiceError};
use crate::domain::{CatalogEntry, InstrumentRecord};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

type Shared<V> = broadcast::Sender<Result<V, ServiceError>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-flight cache with per-entry TTL.
#[derive(Debug)]
pub struct SingleFlightCache<V: Clone> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (V, Instant)>>,
    in_flight: Mutex<HashMap<String, Shared<V>>>,
}

impl<V: Clone + Send + 'static> SingleFlightCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn fresh(&self, key: &str) -> Option<V> {
        lock(&self.entries)
            .get(key)
            .filter(|(_, cached_at)| cached_at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    /// Cached value for `key`, joining or starting a load when stale.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> Result<V, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ServiceError>>,
    {
        if let Some(value) = self.fresh(key) {
            return Ok(value);
        }

        let waiter = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(value) = self.fresh(key) {
                return Ok(value);
            }
            match in_flight.get(key) {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    in_flight.insert(key.to_string(), sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = waiter {
            debug!(key, "Coalesced with in-flight load");
            return receiver.recv().await.unwrap_or_else(|_| {
                Err(ServiceError::Other(format!("Load of {} was abandoned", key)))
            });
        }

        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
        };
        let started_at = Instant::now();
        let result = load().await;
        if let Ok(value) = &result {
            lock(&self.entries).insert(key.to_string(), (value.clone(), Instant::now()));
        }
        debug!(
            key,
            ok = result.is_ok(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Load completed"
        );
        guard.complete(result.clone());
        result
    }

    pub fn invalidate(&self, key: &str) {
        lock(&self.entries).remove(key);
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Removes the in-flight entry even when the loading future is dropped, so
/// waiters are released instead of hanging.
struct InFlightGuard<'a, V> {
    in_flight: &'a Mutex<HashMap<String, Shared<V>>>,
    key: &'a str,
}

impl<V> InFlightGuard<'_, V> {
    fn complete(self, result: Result<V, ServiceError>) {
        if let Some(sender) = lock(self.in_flight).remove(self.key) {
            // No receivers is fine.
            let _ = sender.send(result);
        }
    }
}

impl<V> Drop for InFlightGuard<'_, V> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(self.key);
    }
}

const UNIVERSE_KEY: &str = "instrumentos";

/// Cached access to option catalogs and the instrument universe.
#[derive(Debug)]
pub struct CatalogStore {
    catalogs: Arc<dyn CatalogProvider>,
    instruments: Arc<dyn InstrumentLookup>,
    catalog_cache: SingleFlightCache<Arc<Vec<CatalogEntry>>>,
    universe_cache: SingleFlightCache<Arc<Vec<InstrumentRecord>>>,
}

impl CatalogStore {
    pub fn new(
        catalogs: Arc<dyn CatalogProvider>,
        instruments: Arc<dyn InstrumentLookup>,
        ttl: Duration,
    ) -> Self {
        Self {
            catalogs,
            instruments,
            catalog_cache: SingleFlightCache::new(ttl),
            universe_cache: SingleFlightCache::new(ttl),
        }
    }

    /// Every entry of catalog `name`.
    pub async fn catalog(&self, name: &str) -> Result<Arc<Vec<CatalogEntry>>, ServiceError> {
        let provider = self.catalogs.clone();
        self.catalog_cache
            .get_or_load(name, || async move { provider.fetch(name).await.map(Arc::new) })
            .await
    }

    /// Active entries of catalog `name`.
    pub async fn options(&self, name: &str) -> Result<Vec<CatalogEntry>, ServiceError> {
        Ok(self
            .catalog(name)
            .await?
            .iter()
            .filter(|e| e.activo)
            .cloned()
            .collect())
    }

    pub async fn all_instruments(&self) -> Result<Arc<Vec<InstrumentRecord>>, ServiceError> {
        let lookup = self.instruments.clone();
        self.universe_cache
            .get_or_load(UNIVERSE_KEY, || async move { lookup.get_all().await.map(Arc::new) })
            .await
    }

    pub fn invalidate_catalog(&self, name: &str) {
        self.catalog_cache.invalidate(name);
    }

    pub fn invalidate_instruments(&self) {
        self.universe_cache.invalidate(UNIVERSE_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store(backend: Arc<MockBackend>, ttl: Duration) -> CatalogStore {
        CatalogStore::new(backend.clone(), backend, ttl)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_request() {
        let backend = Arc::new(
            MockBackend::new()
                .with_catalog("paises", vec![CatalogEntry::new("CL", "Chile")])
                .with_latency(Duration::from_millis(100)),
        );
        let store = store(backend.clone(), Duration::from_secs(300));

        let (a, b, c) = tokio::join!(
            store.catalog("paises"),
            store.catalog("paises"),
            store.catalog("paises")
        );
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(c.unwrap().len(), 1);
        assert_eq!(backend.catalog_calls(), 1);
        assert_eq!(store.catalog_cache.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_and_invalidate() {
        let backend = Arc::new(
            MockBackend::new().with_catalog("monedas", vec![CatalogEntry::new("1", "Dolar")]),
        );
        let store = store(backend.clone(), Duration::from_secs(60));

        store.catalog("monedas").await.unwrap();
        store.catalog("monedas").await.unwrap();
        assert_eq!(backend.catalog_calls(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        store.catalog("monedas").await.unwrap();
        assert_eq!(backend.catalog_calls(), 2);

        store.invalidate_catalog("monedas");
        store.catalog("monedas").await.unwrap();
        assert_eq!(backend.catalog_calls(), 3);
    }

    #[tokio::test]
    async fn test_options_filter_inactive() {
        let backend = Arc::new(MockBackend::new().with_catalog(
            "cashTypes",
            vec![
                CatalogEntry::new("1", "Caja"),
                CatalogEntry::new("2", "Overnight").inactive(),
            ],
        ));
        let store = store(backend, Duration::from_secs(60));
        let options = store.options("cashTypes").await.unwrap();
        assert_eq!(options, vec![CatalogEntry::new("1", "Caja")]);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache: SingleFlightCache<u32> = SingleFlightCache::new(Duration::from_secs(60));
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let load = move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::RateLimited)
        };
        assert!(cache.get_or_load("k", load).await.is_err());
        assert!(cache.get_or_load("k", load).await.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let value = cache.get_or_load("k", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        let cached = cache
            .get_or_load("k", || async { Err(ServiceError::RateLimited) })
            .await
            .unwrap();
        assert_eq!(cached, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_universe_is_memoized() {
        let backend = Arc::new(MockBackend::new().with_instrument(InstrumentRecord::new()));
        let store = store(backend.clone(), Duration::from_secs(60));
        store.all_instruments().await.unwrap();
        store.all_instruments().await.unwrap();
        assert_eq!(backend.get_all_calls(), 1);
        store.invalidate_instruments();
        store.all_instruments().await.unwrap();
        assert_eq!(backend.get_all_calls(), 2);
    }
}
