use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::sweep::Sweeper;
use super::types::Snapshot;
use crate::registry::Registry;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// The one cached sweep result; replaced wholesale, never mutated.
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    expires_at: Instant,
}

/// TTL cache in front of the sweep.
///
/// Refresh is lazy: only a read that finds the entry missing or expired runs
/// a sweep. The entry mutex is held across that sweep, so concurrent readers
/// of a cold or expired cache queue up and share the one in-flight result
/// instead of each starting their own sweep.
pub struct StatusCache {
    sweeper: Box<dyn Sweeper>,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl StatusCache {
    pub fn new(sweeper: impl Sweeper + 'static, ttl: Duration) -> Self {
        Self { sweeper: Box::new(sweeper), ttl, entry: Mutex::new(None) }
    }

    /// Current snapshot, refreshed with a single sweep if the entry expired.
    pub async fn get(&self, registry: &Registry) -> Arc<Snapshot> {
        let mut entry = self.entry.lock().await;

        if let Some(current) = entry.as_ref() {
            if Instant::now() < current.expires_at {
                return Arc::clone(&current.snapshot);
            }
        }

        debug!("status cache miss, running sweep");
        let snapshot = Arc::new(self.sweeper.sweep(registry).await);
        *entry = Some(CacheEntry {
            snapshot: Arc::clone(&snapshot),
            expires_at: Instant::now() + self.ttl,
        });

        snapshot
    }
}
