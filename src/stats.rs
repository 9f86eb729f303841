use std::sync::Arc;

use tokio::sync::RwLock;

use crate::gateway::Backend;
use crate::types::Stats;

/// Last known `/stats` payload, shared by every view that shows counters.
#[derive(Debug, Clone, Default)]
pub struct StatsCache {
    inner: Arc<RwLock<Stats>>,
}

impl StatsCache {
    pub async fn get(&self) -> Stats {
        self.inner.read().await.clone()
    }

    /// Fetch and store. Failures keep the previous counters.
    pub async fn refresh(&self, backend: &dyn Backend) {
        match backend.stats().await {
            Ok(stats) => *self.inner.write().await = stats,
            Err(e) => tracing::warn!("Failed to fetch stats: {e}"),
        }
    }

    /// Refresh in the background; the caller does not wait for it.
    pub fn spawn_refresh(&self, backend: Arc<dyn Backend>) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.refresh(backend.as_ref()).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[tokio::test]
    async fn failed_refresh_keeps_previous_counters() {
        let backend = FakeBackend::new();
        backend.set_stats(Stats {
            total_notes: 2,
            ideas: 1,
            pieces: 1,
            ..Stats::default()
        });
        let cache = StatsCache::default();
        cache.refresh(&backend).await;
        assert_eq!(cache.get().await.total_notes, 2);

        backend.fail("stats");
        cache.refresh(&backend).await;
        assert_eq!(cache.get().await.total_notes, 2);
    }
}
