use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::ports::{KeyValueCache, SessionRepository};
use crate::domain::services::conflict::{sessions_to_intervals, BusyInterval};
use crate::error::AppError;

#[derive(Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Read-through/write-through cache of per-teacher-per-day occupied
/// intervals. Best-effort: every path falls back to the session store, so
/// a cold or broken cache only costs a scan, never correctness.
pub struct BusyCache {
    cache: Arc<dyn KeyValueCache>,
    sessions: Arc<dyn SessionRepository>,
    ttl: Duration,
    /// Shorter TTL for empty days, bounding staleness after a miss-then-empty race.
    negative_ttl: Duration,
    stats: CacheStats,
}

impl BusyCache {
    pub fn new(
        cache: Arc<dyn KeyValueCache>,
        sessions: Arc<dyn SessionRepository>,
        ttl: Duration,
        negative_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            sessions,
            ttl,
            negative_ttl,
            stats: CacheStats::default(),
        }
    }

    fn key(teacher_id: &str, date: NaiveDate) -> String {
        format!("busy:{}:{}", teacher_id, date)
    }

    /// Committed occupancy for one teacher-day, cached.
    pub async fn busy_intervals(
        &self,
        teacher_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BusyInterval>, AppError> {
        let key = Self::key(teacher_id, date);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<BusyInterval>>(&raw) {
                Ok(intervals) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(%key, "busy cache hit");
                    return Ok(intervals);
                }
                Err(e) => warn!(%key, "busy cache entry corrupt, rereading store: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!(%key, "busy cache read failed, falling back to store: {}", e),
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "busy cache miss");
        let intervals = self.load_and_store(teacher_id, date, &key).await?;
        Ok(intervals)
    }

    /// Drops and proactively repopulates the given teacher-days after a
    /// mutation, so approvals do not trigger a miss storm.
    pub async fn invalidate(&self, teacher_id: &str, dates: &[NaiveDate]) {
        for date in dates {
            let key = Self::key(teacher_id, *date);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.cache.delete(&key).await {
                warn!(%key, "busy cache eviction failed: {}", e);
                continue;
            }
            debug!(%key, "busy cache evicted");
            if let Err(e) = self.load_and_store(teacher_id, *date, &key).await {
                warn!(%key, "busy cache repopulation failed: {:?}", e);
            }
        }
    }

    async fn load_and_store(
        &self,
        teacher_id: &str,
        date: NaiveDate,
        key: &str,
    ) -> Result<Vec<BusyInterval>, AppError> {
        let sessions = self
            .sessions
            .list_active_by_teacher_date(teacher_id, date)
            .await?;
        let intervals = sessions_to_intervals(&sessions);

        let ttl = if intervals.is_empty() {
            self.negative_ttl
        } else {
            self.ttl
        };
        if let Ok(raw) = serde_json::to_string(&intervals) {
            if let Err(e) = self.cache.set(key, &raw, ttl).await {
                warn!(%key, "busy cache write failed: {}", e);
            }
        }
        Ok(intervals)
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }
}
