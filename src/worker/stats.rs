//! Per-worker statistics and their aggregation.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Number of aggregate-speed samples kept for the variance window.
const SPEED_WINDOW: usize = 100;

/// Counters owned and written by a single worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerStats {
    pub worker_id: usize,
    /// Candidates evaluated during the current search.
    pub attempts: u64,
    /// Candidates per second since the worker started.
    pub speed: f64,
    pub last_update: Instant,
    pub is_healthy: bool,
    pub error_count: u64,
}

impl WorkerStats {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            attempts: 0,
            speed: 0.0,
            last_update: Instant::now(),
            is_healthy: true,
            error_count: 0,
        }
    }
}

/// A worker snapshot tagged with the search it belongs to.
#[derive(Debug, Clone)]
pub struct StatsReport {
    pub epoch: u64,
    pub stats: WorkerStats,
}

/// Combined view over all workers of the current search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedStats {
    pub total_attempts: u64,
    /// Sum of the workers' own speeds.
    pub total_speed: f64,
    /// Total attempts divided by wall-clock time since the search started.
    pub average_speed: f64,
    /// Highest `total_speed` observed during the search.
    pub peak_speed: f64,
    /// Wall-clock throughput relative to perfect scaling of the mean worker.
    pub thread_efficiency: f64,
    /// 1 for perfectly even workers, towards 0 as speeds diverge.
    pub thread_balance: f64,
    /// Variance of recent `total_speed` samples.
    pub speed_variance: f64,
    pub active_workers: usize,
    pub elapsed: Duration,
}

struct CollectorState {
    epoch: u64,
    started: Instant,
    workers: HashMap<usize, WorkerStats>,
    speed_samples: VecDeque<f64>,
    aggregated: AggregatedStats,
}

/// Folds worker reports into [`AggregatedStats`].
pub struct StatsCollector {
    state: RwLock<CollectorState>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CollectorState {
                epoch: 0,
                started: Instant::now(),
                workers: HashMap::new(),
                speed_samples: VecDeque::with_capacity(SPEED_WINDOW),
                aggregated: AggregatedStats::default(),
            }),
        }
    }

    /// Starts a new search. Reports from older epochs are ignored afterwards.
    pub fn reset(&self, epoch: u64) {
        let mut state = self.state.write();
        state.epoch = epoch;
        state.started = Instant::now();
        state.workers.clear();
        state.speed_samples.clear();
        state.aggregated = AggregatedStats::default();
    }

    /// Applies a report and recomputes the aggregate.
    ///
    /// Returns false if the report was stale: from another epoch, or older
    /// than what is already recorded for that worker.
    pub fn record(&self, report: StatsReport) -> bool {
        let mut state = self.state.write();
        if report.epoch != state.epoch {
            return false;
        }

        let id = report.stats.worker_id;
        if let Some(current) = state.workers.get(&id) {
            if report.stats.attempts < current.attempts {
                return false;
            }
        }
        state.workers.insert(id, report.stats);
        Self::fold(&mut state);
        true
    }

    /// Recomputes the aggregate from the current worker map.
    pub fn recalculate(&self) {
        Self::fold(&mut self.state.write());
    }

    fn fold(state: &mut CollectorState) {
        let elapsed = state.started.elapsed();
        let count = state.workers.len();

        let total_attempts: u64 = state.workers.values().map(|w| w.attempts).sum();
        let total_speed: f64 = state.workers.values().map(|w| w.speed).sum();
        let average_speed = if elapsed.as_secs_f64() > 0.0 {
            total_attempts as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let (thread_efficiency, thread_balance) = if count > 0 {
            let mean = total_speed / count as f64;
            let efficiency = if mean > 0.0 {
                average_speed / (mean * count as f64)
            } else {
                0.0
            };
            let variance = state
                .workers
                .values()
                .map(|w| (w.speed - mean).powi(2))
                .sum::<f64>()
                / count as f64;
            let balance = if mean > 0.0 {
                1.0 - (variance.sqrt() / mean).min(1.0)
            } else {
                0.0
            };
            (efficiency, balance)
        } else {
            (0.0, 0.0)
        };

        if state.speed_samples.len() == SPEED_WINDOW {
            state.speed_samples.pop_front();
        }
        state.speed_samples.push_back(total_speed);

        let agg = &mut state.aggregated;
        agg.total_attempts = total_attempts;
        agg.total_speed = total_speed;
        agg.average_speed = average_speed;
        agg.peak_speed = agg.peak_speed.max(total_speed);
        agg.thread_efficiency = thread_efficiency;
        agg.thread_balance = thread_balance;
        agg.speed_variance = variance(&state.speed_samples);
        agg.active_workers = count;
        agg.elapsed = elapsed;
    }

    pub fn snapshot(&self) -> AggregatedStats {
        self.state.read().aggregated.clone()
    }

    /// Latest report of every worker, ordered by id.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        let mut stats: Vec<_> = self.state.read().workers.values().cloned().collect();
        stats.sort_by_key(|w| w.worker_id);
        stats
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn variance(samples: &VecDeque<f64>) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(epoch: u64, worker_id: usize, attempts: u64, speed: f64) -> StatsReport {
        StatsReport {
            epoch,
            stats: WorkerStats {
                attempts,
                speed,
                ..WorkerStats::new(worker_id)
            },
        }
    }

    #[test]
    fn test_totals_are_sums() {
        let collector = StatsCollector::new();
        collector.reset(1);
        assert!(collector.record(report(1, 0, 1000, 100.0)));
        assert!(collector.record(report(1, 1, 3000, 300.0)));
        assert!(collector.record(report(1, 0, 2000, 100.0)));

        let agg = collector.snapshot();
        assert_eq!(agg.total_attempts, 5000);
        assert_eq!(agg.total_speed, 400.0);
        assert_eq!(agg.active_workers, 2);

        let sum: u64 = collector.worker_stats().iter().map(|w| w.attempts).sum();
        assert_eq!(sum, agg.total_attempts);
    }

    #[test]
    fn test_stale_reports_ignored() {
        let collector = StatsCollector::new();
        collector.reset(2);
        assert!(!collector.record(report(1, 0, 500, 10.0)));
        assert!(collector.record(report(2, 0, 500, 10.0)));
        assert!(!collector.record(report(2, 0, 400, 10.0)));
        assert_eq!(collector.snapshot().total_attempts, 500);
    }

    #[test]
    fn test_peak_speed_is_running_max() {
        let collector = StatsCollector::new();
        collector.reset(1);
        collector.record(report(1, 0, 100, 500.0));
        collector.record(report(1, 0, 200, 200.0));

        let agg = collector.snapshot();
        assert_eq!(agg.total_speed, 200.0);
        assert_eq!(agg.peak_speed, 500.0);
        assert!(agg.speed_variance > 0.0);
    }

    #[test]
    fn test_thread_balance() {
        let collector = StatsCollector::new();
        collector.reset(1);
        collector.record(report(1, 0, 100, 100.0));
        collector.record(report(1, 1, 100, 100.0));
        assert!((collector.snapshot().thread_balance - 1.0).abs() < 1e-12);

        collector.record(report(1, 1, 200, 300.0));
        // mean 200, stddev 100 -> cv 0.5
        assert!((collector.snapshot().thread_balance - 0.5).abs() < 1e-12);

        // 0, 0, 300: mean 100, stddev ~141 -> cv clamped to 1
        collector.record(report(1, 0, 200, 0.0));
        collector.record(report(1, 1, 300, 0.0));
        collector.record(report(1, 2, 300, 300.0));
        assert_eq!(collector.snapshot().thread_balance, 0.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let collector = StatsCollector::new();
        collector.reset(1);
        collector.record(report(1, 0, 100, 100.0));
        collector.reset(2);

        assert_eq!(collector.snapshot(), AggregatedStats::default());
        assert!(collector.worker_stats().is_empty());
        assert!(!collector.record(report(1, 0, 200, 100.0)));
        assert!(collector.record(report(2, 0, 50, 100.0)));
    }

    #[test]
    fn test_variance_window() {
        let mut samples = VecDeque::new();
        assert_eq!(variance(&samples), 0.0);
        samples.extend([1.0, 3.0]);
        assert_eq!(variance(&samples), 1.0);
    }

    #[test]
    fn test_variance_keeps_last_samples() {
        let collector = StatsCollector::new();
        collector.reset(1);
        for i in 0..250u64 {
            assert!(collector.record(report(1, 0, i, i as f64)));
        }

        // Speeds 150..250 survive: variance of 100 consecutive integers.
        let recent: Vec<f64> = (150..250).map(|i| i as f64).collect();
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        let expected = recent.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / recent.len() as f64;

        let agg = collector.snapshot();
        assert!((agg.speed_variance - expected).abs() < 1e-9, "{}", agg.speed_variance);
        assert!((agg.speed_variance - 833.25).abs() < 1e-9);
        assert_eq!(collector.state.read().speed_samples.len(), SPEED_WINDOW);
    }

    #[test]
    fn test_thread_efficiency() {
        let collector = StatsCollector::new();
        collector.reset(1);
        collector.state.write().started = Instant::now() - Duration::from_secs(10);

        // 1000 attempts over ~10s is ~100/s against a combined 200/s.
        collector.record(report(1, 0, 500, 100.0));
        collector.record(report(1, 1, 500, 100.0));

        let agg = collector.snapshot();
        assert!((agg.average_speed - 100.0).abs() < 0.5, "{}", agg.average_speed);
        assert!((agg.thread_efficiency - 0.5).abs() < 0.005, "{}", agg.thread_efficiency);
        let expected = agg.total_attempts as f64 / agg.elapsed.as_secs_f64() / agg.total_speed;
        assert!((agg.thread_efficiency - expected).abs() < 1e-12);
    }

    #[test]
    fn test_efficiency_zero_without_speed() {
        let collector = StatsCollector::new();
        collector.reset(1);
        collector.record(report(1, 0, 10, 0.0));
        assert_eq!(collector.snapshot().thread_efficiency, 0.0);
    }
}
