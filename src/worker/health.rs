//! Worker liveness tracking. Purely informational: unhealthy workers keep
//! running.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::warn;

use super::WorkerStats;

/// Errors a worker may accumulate before it is considered unhealthy.
pub const MAX_WORKER_ERRORS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerHealth {
    pub worker_id: usize,
    pub is_healthy: bool,
    pub last_heartbeat: Instant,
    pub error_count: u64,
    pub uptime: Duration,
}

struct Entry {
    started: Instant,
    health: WorkerHealth,
}

pub struct HealthMonitor {
    workers: RwLock<HashMap<usize, Entry>>,
    heartbeat_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            heartbeat_timeout,
        }
    }

    pub fn reset(&self) {
        self.workers.write().clear();
    }

    /// Records a sign of life from a worker.
    pub fn heartbeat(&self, stats: &WorkerStats) {
        let now = Instant::now();
        let mut workers = self.workers.write();
        let entry = workers.entry(stats.worker_id).or_insert_with(|| Entry {
            started: now,
            health: WorkerHealth {
                worker_id: stats.worker_id,
                is_healthy: true,
                last_heartbeat: now,
                error_count: 0,
                uptime: Duration::ZERO,
            },
        });

        let health = &mut entry.health;
        health.last_heartbeat = now;
        health.error_count = health.error_count.max(stats.error_count);
        health.uptime = now.duration_since(entry.started);

        let healthy = health.error_count <= MAX_WORKER_ERRORS;
        if health.is_healthy && !healthy {
            warn!(
                worker = health.worker_id,
                errors = health.error_count,
                "worker marked unhealthy"
            );
        }
        health.is_healthy = healthy;
    }

    /// Flags workers whose heartbeat is overdue. Returns the newly flagged ids.
    pub fn check(&self) -> Vec<usize> {
        let now = Instant::now();
        let mut flagged = Vec::new();

        for entry in self.workers.write().values_mut() {
            let health = &mut entry.health;
            health.uptime = now.duration_since(entry.started);
            if health.is_healthy && now.duration_since(health.last_heartbeat) > self.heartbeat_timeout {
                health.is_healthy = false;
                flagged.push(health.worker_id);
            }
        }

        if !flagged.is_empty() {
            warn!(workers = ?flagged, "no heartbeat within {:?}", self.heartbeat_timeout);
        }
        flagged
    }

    /// Health of every known worker, ordered by id.
    pub fn snapshot(&self) -> Vec<WorkerHealth> {
        let mut health: Vec<_> = self
            .workers
            .read()
            .values()
            .map(|e| e.health.clone())
            .collect();
        health.sort_by_key(|h| h.worker_id);
        health
    }

    pub fn unhealthy_count(&self) -> usize {
        self.workers
            .read()
            .values()
            .filter(|e| !e.health.is_healthy)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn stats(worker_id: usize, error_count: u64) -> WorkerStats {
        WorkerStats {
            error_count,
            ..WorkerStats::new(worker_id)
        }
    }

    #[test]
    fn test_flips_after_error_threshold() {
        let monitor = HealthMonitor::new(Duration::from_secs(60));
        monitor.heartbeat(&stats(0, MAX_WORKER_ERRORS));
        assert!(monitor.snapshot()[0].is_healthy);

        monitor.heartbeat(&stats(0, MAX_WORKER_ERRORS + 1));
        let health = &monitor.snapshot()[0];
        assert!(!health.is_healthy);
        assert_eq!(health.error_count, MAX_WORKER_ERRORS + 1);
        assert_eq!(monitor.unhealthy_count(), 1);
    }

    #[test]
    fn test_stale_heartbeat_is_flagged_once() {
        let monitor = HealthMonitor::new(Duration::from_millis(10));
        monitor.heartbeat(&stats(3, 0));
        monitor.heartbeat(&stats(1, 0));
        assert!(monitor.check().is_empty());

        thread::sleep(Duration::from_millis(30));
        let mut flagged = monitor.check();
        flagged.sort_unstable();
        assert_eq!(flagged, vec![1, 3]);
        assert!(monitor.check().is_empty());

        monitor.heartbeat(&stats(1, 0));
        assert_eq!(monitor.unhealthy_count(), 1);
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let monitor = HealthMonitor::new(Duration::from_secs(60));
        for id in [2, 0, 1] {
            monitor.heartbeat(&stats(id, 0));
        }
        let ids: Vec<_> = monitor.snapshot().iter().map(|h| h.worker_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
