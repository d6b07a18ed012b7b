//! Time-bounded cache for the aggregate stats view.
//!
//! Many dashboard readers poll stats; the aggregation touches the whole
//! table, so one refresh is shared by every caller inside the TTL window.

use crate::error::{Result, StoreError};
use crate::models::Stats;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default freshness window
pub const DEFAULT_STATS_TTL: Duration = Duration::from_secs(10);

struct CachedStats {
    stats: Stats,
    expires_at: Instant,
}

/// Single-entry stats cache.
///
/// Readers share a read lock; a refresh takes the write lock and re-checks
/// freshness so concurrent callers that queued behind it do not recompute.
pub struct StatsCache {
    ttl: Duration,
    entry: RwLock<Option<CachedStats>>,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Returns the cached stats, recomputing with `refresh` once expired.
    pub fn get_or_refresh<F>(&self, refresh: F) -> Result<Stats>
    where
        F: FnOnce() -> Result<Stats>,
    {
        {
            let guard = self
                .entry
                .read()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            if let Some(cached) = guard.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.stats.clone());
                }
            }
        }

        let mut guard = self
            .entry
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        // Another caller may have refreshed while we waited for the write lock
        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.stats.clone());
            }
        }

        let stats = refresh()?;
        *guard = Some(CachedStats {
            stats: stats.clone(),
            expires_at: Instant::now() + self.ttl,
        });
        Ok(stats)
    }

    /// Drops the cached entry so the next read recomputes.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = None;
        }
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(DEFAULT_STATS_TTL)
    }
}
