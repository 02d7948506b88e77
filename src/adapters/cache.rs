use crate::config::CacheConfig;
use crate::error::{CasebotError, Result};
use crate::lifecycle::LifecycleHooks;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const COMPONENT: &str = "cache";

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

type Store = HashMap<String, CacheEntry>;

/// In-memory key/value cache with per-entry expiry.
///
/// Every key is stored under the configured prefix. Operations fail with
/// `ComponentUnavailable` while the store is closed.
pub struct MemoryCache {
    config: CacheConfig,
    store: RwLock<Option<Store>>,
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            store: RwLock::new(None),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.key(key);
        let now = Instant::now();

        let mut guard = self.store.write();
        let store = guard
            .as_mut()
            .ok_or_else(|| CasebotError::unavailable(COMPONENT))?;

        match store.get(&key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        store.remove(&key);
        Ok(None)
    }

    pub fn set<V: Into<String>>(&self, key: &str, value: V) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl())
    }

    pub fn set_with_ttl<V: Into<String>>(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            value: value.into(),
            expires_at: Instant::now().checked_add(ttl),
        };

        let mut guard = self.store.write();
        let store = guard
            .as_mut()
            .ok_or_else(|| CasebotError::unavailable(COMPONENT))?;
        store.insert(self.key(key), entry);
        Ok(())
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self.store.write();
        let store = guard
            .as_mut()
            .ok_or_else(|| CasebotError::unavailable(COMPONENT))?;
        Ok(store.remove(&self.key(key)).is_some())
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> Result<usize> {
        self.store
            .read()
            .as_ref()
            .map(HashMap::len)
            .ok_or_else(|| CasebotError::unavailable(COMPONENT))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Drop expired entries and return how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut guard = self.store.write();
        let store = guard
            .as_mut()
            .ok_or_else(|| CasebotError::unavailable(COMPONENT))?;

        let before = store.len();
        store.retain(|_, entry| !entry.is_expired(now));
        Ok(before - store.len())
    }

    /// Lose the backing store outside the lifecycle, the way a dropped
    /// backend connection would
    pub fn close(&self) {
        if self.store.write().take().is_some() {
            warn!("Cache store closed");
        }
    }
}

#[async_trait]
impl LifecycleHooks for MemoryCache {
    async fn do_initialize(&self) -> Result<bool> {
        let mut store = self.store.write();
        if store.is_none() {
            *store = Some(Store::new());
        }
        info!(
            "Cache store opened (prefix: {:?}, ttl: {}s)",
            self.config.prefix, self.config.ttl_seconds
        );
        Ok(true)
    }

    async fn do_shutdown(&self) -> Result<()> {
        if let Some(store) = self.store.write().take() {
            debug!("Dropped {} cache entries", store.len());
        }
        Ok(())
    }

    async fn check_health(&self) -> Result<bool> {
        Ok(self.store.read().is_some())
    }

    /// Repair in place when the store is still there, otherwise reopen it
    async fn do_recover(&self) -> Result<bool> {
        match self.purge_expired() {
            Ok(purged) => {
                info!("Cache recovered in place, purged {} expired entries", purged);
                Ok(true)
            }
            Err(CasebotError::ComponentUnavailable { .. }) => {
                info!("Cache store missing, reopening");
                self.do_initialize().await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ComponentStatus, Lifecycle, ManagedComponent};

    fn create_test_config() -> CacheConfig {
        CacheConfig {
            prefix: "cache:".to_string(),
            ttl_seconds: 60,
        }
    }

    async fn open_cache() -> ManagedComponent<MemoryCache> {
        let cache = ManagedComponent::new("cache", MemoryCache::new(create_test_config()));
        assert!(cache.initialize().await);
        cache
    }

    #[test]
    fn test_operations_require_open_store() {
        let cache = MemoryCache::new(create_test_config());

        assert!(matches!(cache.get("a"), Err(CasebotError::ComponentUnavailable { .. })));
        assert!(cache.set("a", "1").is_err());
        assert!(cache.delete("a").is_err());
        assert!(cache.len().is_err());
    }

    #[tokio::test]
    async fn test_get_set_delete() {
        let cache = open_cache().await;
        let store = cache.hooks();

        store.set("user:1", "alice").unwrap();
        assert_eq!(store.get("user:1").unwrap().as_deref(), Some("alice"));
        assert_eq!(store.get("user:2").unwrap(), None);

        assert!(store.delete("user:1").unwrap());
        assert!(!store.delete("user:1").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_prefixed() {
        let cache = open_cache().await;
        cache.hooks().set("session", "x").unwrap();

        let guard = cache.hooks().store.read();
        let keys: Vec<&String> = guard.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["cache:session"]);
    }

    #[tokio::test]
    async fn test_expired_entries() {
        let cache = open_cache().await;
        let store = cache.hooks();

        store.set_with_ttl("short", "gone", Duration::ZERO).unwrap();
        store.set("long", "kept").unwrap();

        assert_eq!(store.get("short").unwrap(), None);
        assert_eq!(store.get("long").unwrap().as_deref(), Some("kept"));

        store.set_with_ttl("short", "gone", Duration::ZERO).unwrap();
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let config = CacheConfig {
            prefix: "cache:".to_string(),
            ttl_seconds: u64::MAX,
        };
        let cache = ManagedComponent::new("cache", MemoryCache::new(config));
        assert!(cache.initialize().await);

        cache.hooks().set("forever", "1").unwrap();
        cache.hooks().set_with_ttl("also", "2", Duration::MAX).unwrap();

        assert_eq!(cache.hooks().get("forever").unwrap().as_deref(), Some("1"));
        assert_eq!(cache.hooks().get("also").unwrap().as_deref(), Some("2"));
        assert_eq!(cache.hooks().purge_expired().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recover_in_place_keeps_live_entries() {
        let cache = open_cache().await;
        cache.hooks().set("live", "1").unwrap();
        cache.hooks().set_with_ttl("stale", "2", Duration::ZERO).unwrap();

        assert!(cache.recover().await);
        assert_eq!(cache.hooks().len().unwrap(), 1);
        assert_eq!(cache.hooks().get("live").unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_recover_reopens_missing_store() {
        let cache = open_cache().await;
        cache.hooks().set("lost", "1").unwrap();

        cache.hooks().close();
        assert_eq!(cache.status().await, ComponentStatus::Unhealthy);

        assert!(cache.recover().await);
        assert_eq!(cache.status().await, ComponentStatus::Healthy);
        assert_eq!(cache.hooks().get("lost").unwrap(), None);
    }
}
