//! Single-slot match cache shared by every caller.
//!
//! Each write replaces the whole snapshot, so a reader always sees one
//! complete generation. Stale or empty snapshots are never served.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

use crate::scraper::models::Match;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Snapshot {
    matches: Vec<Match>,
    captured_at: Instant,
}

/// Cheap-to-clone handle; clones share the same slot.
#[derive(Debug, Clone)]
pub struct MatchCache {
    inner: Arc<RwLock<Option<Snapshot>>>,
    ttl: Duration,
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl MatchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached list, if non-empty and younger than the TTL.
    pub async fn get(&self) -> Option<Vec<Match>> {
        let slot = self.inner.read().await;
        let Some(snapshot) = slot.as_ref() else {
            info!(matches = 0, "Cache miss (no snapshot)");
            return None;
        };
        let age = snapshot.captured_at.elapsed();

        if snapshot.matches.is_empty() || age >= self.ttl {
            info!(
                matches = snapshot.matches.len(),
                age_s = age.as_secs(),
                "Cache miss"
            );
            return None;
        }

        info!(
            matches = snapshot.matches.len(),
            age_s = age.as_secs(),
            "Cache hit"
        );
        Some(snapshot.matches.clone())
    }

    /// Replace the snapshot and reset its age.
    pub async fn set(&self, matches: Vec<Match>) {
        let count = matches.len();
        let snapshot = Snapshot {
            matches,
            captured_at: Instant::now(),
        };
        *self.inner.write().await = Some(snapshot);
        info!(matches = count, age_s = 0, "Cache updated");
    }

    /// Drop the snapshot so the next `get` misses.
    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
        info!("Cache invalidated");
    }
}
