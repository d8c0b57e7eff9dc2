use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use serde::{Serialize, Deserialize};

/// Operational counters. Degraded queries are only observable here,
/// never through the search payload.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub inverted_shards: AtomicUsize,
    pub paused_shards: AtomicUsize,
    pub shard_failures: AtomicU64,
    pub ranking_shards_ready: AtomicUsize,
    pub ranking_shards_failed: AtomicU64,
    pub worker_failures: AtomicU64,
    pub worker_timeouts: AtomicU64,
    pub duplicate_keys: AtomicUsize,
    pub duplicate_log_bytes: AtomicU64,
    pub queries_served: AtomicU64,
    pub degraded_queries: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub inverted_shards: usize,
    pub paused_shards: usize,
    pub shard_failures: u64,
    pub ranking_shards_ready: usize,
    pub ranking_shards_failed: u64,
    pub worker_failures: u64,
    pub worker_timeouts: u64,
    pub duplicate_keys: usize,
    pub duplicate_log_bytes: u64,
    pub queries_served: u64,
    pub degraded_queries: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inverted_shards: self.inverted_shards.load(Ordering::Relaxed),
            paused_shards: self.paused_shards.load(Ordering::Relaxed),
            shard_failures: self.shard_failures.load(Ordering::Relaxed),
            ranking_shards_ready: self.ranking_shards_ready.load(Ordering::Relaxed),
            ranking_shards_failed: self.ranking_shards_failed.load(Ordering::Relaxed),
            worker_failures: self.worker_failures.load(Ordering::Relaxed),
            worker_timeouts: self.worker_timeouts.load(Ordering::Relaxed),
            duplicate_keys: self.duplicate_keys.load(Ordering::Relaxed),
            duplicate_log_bytes: self.duplicate_log_bytes.load(Ordering::Relaxed),
            queries_served: self.queries_served.load(Ordering::Relaxed),
            degraded_queries: self.degraded_queries.load(Ordering::Relaxed),
        }
    }

    pub fn health(&self) -> HealthStatus {
        let snapshot = self.snapshot();
        if snapshot.inverted_shards == 0 && snapshot.ranking_shards_ready == 0 {
            return HealthStatus::Unhealthy("no shards loaded".to_string());
        }
        if snapshot.ranking_shards_ready == 0 {
            return HealthStatus::Degraded("no ranking shards ready".to_string());
        }
        if snapshot.paused_shards > 0 {
            return HealthStatus::Degraded(format!("{} inverted index shards paused", snapshot.paused_shards));
        }
        HealthStatus::Healthy
    }
}

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_tracks_shard_counts() {
        let stats = EngineStats::new();
        assert!(matches!(stats.health(), HealthStatus::Unhealthy(_)));

        stats.inverted_shards.store(2, Ordering::Relaxed);
        assert!(matches!(stats.health(), HealthStatus::Degraded(_)));

        stats.ranking_shards_ready.store(1, Ordering::Relaxed);
        assert!(stats.health().is_healthy());
    }
}
