use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::ports::KeyValueCache;
use crate::error::AppError;

/// In-process key-value cache with per-entry TTL. Stands in for the shared
/// cache store; entries expire lazily on access.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn live<'a>(entries: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
    entries
        .get(key)
        .filter(|entry| entry.expires_at > Instant::now())
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.lock().await;
        Ok(live(&entries, key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let mut entries = self.entries.lock().await;
        if live(&entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn compare_and_delete(&self, key: &str, value: &str) -> Result<bool, AppError> {
        let mut entries = self.entries.lock().await;
        match live(&entries, key) {
            Some(entry) if entry.value == value => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_if_absent_is_exclusive_until_expiry() {
        let cache = MemoryCache::new();
        assert!(cache
            .set_if_absent("k", "a", Duration::from_millis(20))
            .await
            .unwrap());
        assert!(!cache
            .set_if_absent("k", "b", Duration::from_secs(10))
            .await
            .unwrap());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache
            .set_if_absent("k", "b", Duration::from_secs(10))
            .await
            .unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn compare_and_delete_checks_ownership() {
        let cache = MemoryCache::new();
        cache.set("k", "token-1", Duration::from_secs(10)).await.unwrap();
        assert!(!cache.compare_and_delete("k", "token-2").await.unwrap());
        assert!(cache.compare_and_delete("k", "token-1").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
