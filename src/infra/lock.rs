use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::ports::{KeyValueCache, LockService};
use crate::error::AppError;

/// Distributed lock over the shared key-value cache: set-if-absent with TTL
/// to acquire, compare-and-delete to release. The token guards against
/// releasing a lock that was taken over after the lease expired.
pub struct CacheLockService {
    cache: Arc<dyn KeyValueCache>,
}

impl CacheLockService {
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl LockService for CacheLockService {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<String>, AppError> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();

        if self.cache.set_if_absent(key, &token, ttl).await? {
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, AppError> {
        let released = self.cache.compare_and_delete(key, token).await?;
        if !released {
            warn!(key, "lock not released: token no longer owns it");
        }
        Ok(released)
    }
}

/// Bounded acquisition loop: `retries` attempts, fixed `interval` apart.
/// Returns None when the lock stayed held for the whole window.
pub async fn acquire_with_retry(
    lock: &dyn LockService,
    key: &str,
    ttl: Duration,
    retries: u32,
    interval: Duration,
) -> Result<Option<String>, AppError> {
    for attempt in 0..retries {
        if let Some(token) = lock.try_acquire(key, ttl).await? {
            return Ok(Some(token));
        }
        if attempt + 1 < retries {
            tokio::time::sleep(interval).await;
        }
    }
    Ok(None)
}
