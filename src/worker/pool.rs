//! Worker pool management.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{after, bounded, never, select, tick, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::crypto::checksum::render_checksum_into;
use crate::crypto::{KeyMaterial, KeyProvider, ScratchPool, Secp256k1Provider, ADDRESS_HEX_LEN};
use crate::matcher::{difficulty, CriteriaError, GenerationCriteria, Pattern, Progress};
use crate::recorder::ResultRecorder;

use super::cpu::{CpuWorker, FoundWallet, SearchJob, WorkerExit};
use super::health::{HealthMonitor, WorkerHealth};
use super::stats::{AggregatedStats, StatsCollector, StatsReport, WorkerStats};
use super::CancellationToken;

/// Upper bound on the worker count.
pub const MAX_WORKERS: usize = 256;

/// Operational failures of the pool itself, as opposed to search outcomes.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("stats queue is full")]
    QueueFull,
    #[error("worker pool is not running")]
    PoolNotRunning,
    #[error("failed to build worker threads: {0}")]
    Spawn(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to start stats collector: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum VanityError {
    #[error("invalid criteria: {0}")]
    Validation(#[from] CriteriaError),
    #[error("search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u64 },
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Pool tuning knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Worker count; `None` uses the number of CPUs.
    pub threads: Option<usize>,
    /// Capacity of the stats queue. Reports beyond it are dropped.
    pub stats_capacity: usize,
    /// How often aggregates are recomputed without new reports.
    pub stats_interval: Duration,
    /// How long workers get to stop before giving up on them.
    pub shutdown_timeout: Duration,
    /// Silence after which a worker is reported unhealthy.
    pub heartbeat_timeout: Duration,
    /// Fixed batch size instead of the difficulty-based default.
    pub batch_size: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: None,
            stats_capacity: 1024,
            stats_interval: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(5),
            heartbeat_timeout: Duration::from_secs(30),
            batch_size: None,
        }
    }
}

impl PoolConfig {
    /// Effective worker count, clamped to `1..=MAX_WORKERS`.
    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).clamp(1, MAX_WORKERS)
    }
}

/// A generated wallet.
#[derive(Clone)]
pub struct Wallet {
    /// `0x` + 40 hex chars, checksum-cased when requested.
    pub address: String,
    /// Uncompressed public key without the 0x04 tag (hex).
    pub public_key: String,
    /// Private key (hex, no 0x prefix).
    pub private_key: String,
}

impl Wallet {
    fn from_key(key: &KeyMaterial, checksum: bool) -> Self {
        let lower = key.address_hex();
        let mut rendered = *lower;
        if checksum {
            render_checksum_into(lower, &mut rendered);
        }

        let mut address = String::with_capacity(2 + ADDRESS_HEX_LEN);
        address.push_str("0x");
        address.extend(rendered.iter().map(|&b| b as char));

        Self {
            address,
            public_key: key.public_key_hex(),
            private_key: key.private_key_hex(),
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Result of a successful vanity address generation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub wallet: Wallet,
    /// Candidates evaluated by all workers of the search.
    pub attempts: u64,
    pub duration: Duration,
    /// The ID of the worker that found this result
    pub worker_id: usize,
}

enum Outcome {
    Found(FoundWallet),
    Cancelled,
    TimedOut,
    Exhausted,
}

/// Decrements the live-worker count even if a worker panics.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Manages a pool of workers for parallel vanity address generation.
///
/// The worker threads live as long as the pool and are reused by every
/// search. Searches run one at a time.
pub struct WorkerPool<P: KeyProvider = Secp256k1Provider> {
    config: PoolConfig,
    num_workers: usize,
    provider: Arc<P>,
    threads: rayon::ThreadPool,
    scratch: Arc<ScratchPool>,
    collector: Arc<StatsCollector>,
    health: Arc<HealthMonitor>,
    stats_tx: Sender<StatsReport>,
    stats_rx: Receiver<StatsReport>,
    collector_stop: CancellationToken,
    collector_handle: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
    epoch: AtomicU64,
    search_lock: Mutex<()>,
    active_search: Mutex<Option<CancellationToken>>,
    active_workers: Arc<AtomicUsize>,
    recorder: Option<Box<dyn ResultRecorder>>,
}

impl WorkerPool<Secp256k1Provider> {
    /// Creates a pool searching secp256k1/Keccak (Ethereum) addresses.
    pub fn new(config: PoolConfig) -> Result<Self, WorkerError> {
        Self::with_provider(config, Secp256k1Provider::new())
    }
}

impl<P: KeyProvider> WorkerPool<P> {
    /// Creates a pool drawing candidates from `provider`.
    pub fn with_provider(config: PoolConfig, provider: P) -> Result<Self, WorkerError> {
        let num_workers = config.thread_count();
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("vanity-worker-{}", i))
            .panic_handler(|_| error!("worker panicked"))
            .build()?;

        let (stats_tx, stats_rx) = bounded(config.stats_capacity.max(1));
        let collector = Arc::new(StatsCollector::new());
        let health = Arc::new(HealthMonitor::new(config.heartbeat_timeout));
        let collector_stop = CancellationToken::new();
        let active_workers = Arc::new(AtomicUsize::new(0));

        let handle = {
            let stats_rx = stats_rx.clone();
            let stop = collector_stop.clone();
            let collector = collector.clone();
            let health = health.clone();
            let active = active_workers.clone();
            let interval = config.stats_interval;

            thread::Builder::new()
                .name("vanity-stats".into())
                .spawn(move || collect(stats_rx, stop, collector, health, active, interval))?
        };

        info!(workers = num_workers, "worker pool started");

        Ok(Self {
            config,
            num_workers,
            provider: Arc::new(provider),
            threads,
            scratch: Arc::new(ScratchPool::new()),
            collector,
            health,
            stats_tx,
            stats_rx,
            collector_stop,
            collector_handle: Mutex::new(Some(handle)),
            running: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
            search_lock: Mutex::new(()),
            active_search: Mutex::new(None),
            active_workers,
            recorder: None,
        })
    }

    /// Records every successful result with `recorder`.
    pub fn with_recorder(mut self, recorder: impl ResultRecorder + 'static) -> Self {
        self.recorder = Some(Box::new(recorder));
        self
    }

    /// Searches until one worker finds a wallet matching `criteria`.
    ///
    /// Fails with [`VanityError::Cancelled`] if `cancel` fires first.
    pub fn generate_wallet(
        &self,
        cancel: &CancellationToken,
        criteria: &GenerationCriteria,
    ) -> Result<GenerationResult, VanityError> {
        self.search(cancel, criteria, None)
    }

    /// Like [`generate_wallet`](Self::generate_wallet), but gives up with
    /// [`VanityError::Timeout`] after `timeout`.
    pub fn generate_wallet_timeout(
        &self,
        cancel: &CancellationToken,
        criteria: &GenerationCriteria,
        timeout: Duration,
    ) -> Result<GenerationResult, VanityError> {
        self.search(cancel, criteria, Some(timeout))
    }

    fn search(
        &self,
        cancel: &CancellationToken,
        criteria: &GenerationCriteria,
        timeout: Option<Duration>,
    ) -> Result<GenerationResult, VanityError> {
        criteria.validate()?;
        if !self.is_running() {
            return Err(WorkerError::PoolNotRunning.into());
        }

        let _guard = self.search_lock.lock();
        if cancel.is_cancelled() {
            return Err(VanityError::Cancelled { attempts: 0 });
        }

        let difficulty =
            difficulty::difficulty(&criteria.prefix, &criteria.suffix, criteria.is_checksum);
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.collector.reset(epoch);
        self.health.reset();

        let search_cancel = CancellationToken::new();
        *self.active_search.lock() = Some(search_cancel.clone());
        // A shutdown that raced the registration above must still stop us.
        if !self.is_running() {
            search_cancel.cancel();
        }

        let (result_tx, result_rx) = bounded(1);
        let (exit_tx, exit_rx) = bounded(self.num_workers);
        let tally = Arc::new(AtomicU64::new(0));
        let job = SearchJob {
            epoch,
            pattern: Arc::new(Pattern::compile(criteria)),
            cancel: search_cancel.clone(),
            result_tx,
            stats_tx: self.stats_tx.clone(),
            tally: tally.clone(),
            max_attempts: criteria.max_attempts,
            batch_size: self
                .config
                .batch_size
                .unwrap_or_else(|| difficulty::batch_size(difficulty))
                .max(1),
        };

        info!(
            prefix = %criteria.prefix,
            suffix = %criteria.suffix,
            checksum = criteria.is_checksum,
            difficulty,
            workers = self.num_workers,
            "search started"
        );

        let started = Instant::now();
        for id in 0..self.num_workers {
            self.spawn_worker(id, job.clone(), exit_tx.clone());
        }
        drop(job);
        drop(exit_tx);

        let deadline = timeout.map(after).unwrap_or_else(never);
        let mut outcome = select! {
            recv(result_rx) -> msg => match msg {
                Ok(found) => Outcome::Found(found),
                // Every worker hung up without a match.
                Err(_) if cancel.is_cancelled() || search_cancel.is_cancelled() => {
                    Outcome::Cancelled
                }
                Err(_) => Outcome::Exhausted,
            },
            recv(cancel.signal()) -> _ => Outcome::Cancelled,
            recv(search_cancel.signal()) -> _ => Outcome::Cancelled,
            recv(deadline) -> _ => Outcome::TimedOut,
        };
        if !matches!(outcome, Outcome::Found(_)) {
            if let Ok(found) = result_rx.try_recv() {
                outcome = Outcome::Found(found);
            }
        }

        search_cancel.cancel();
        let attempts = self.collect_exits(&exit_rx, epoch, &tally);
        *self.active_search.lock() = None;
        for late in result_rx.try_iter() {
            debug!(worker = late.worker_id, "discarding late match");
        }
        let duration = started.elapsed();

        match outcome {
            Outcome::Found(found) => {
                let result = GenerationResult {
                    wallet: Wallet::from_key(&found.key, criteria.is_checksum),
                    attempts,
                    duration,
                    worker_id: found.worker_id,
                };
                info!(
                    address = %result.wallet.address,
                    attempts,
                    worker = result.worker_id,
                    elapsed = ?duration,
                    "match found"
                );
                self.record(&result);
                Ok(result)
            }
            Outcome::Cancelled => {
                info!(attempts, "search cancelled");
                Err(VanityError::Cancelled { attempts })
            }
            Outcome::TimedOut => {
                let timeout = timeout.unwrap_or_default();
                info!(attempts, ?timeout, "search timed out");
                Err(VanityError::Timeout(timeout))
            }
            Outcome::Exhausted => {
                info!(attempts, "attempt budget exhausted");
                Err(VanityError::Exhausted { attempts })
            }
        }
    }

    fn spawn_worker(&self, id: usize, job: SearchJob, exit_tx: Sender<WorkerExit>) {
        let worker = CpuWorker::new(id, self.provider.clone(), self.scratch.clone(), job);
        self.active_workers.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(self.active_workers.clone());

        self.threads.spawn(move || {
            let exit = worker.run();
            drop(guard);
            // Capacity equals the worker count.
            let _ = exit_tx.send(exit);
        });
    }

    /// Waits for every worker of the search and folds in their final
    /// counters. Returns the search's total attempts.
    fn collect_exits(&self, exit_rx: &Receiver<WorkerExit>, epoch: u64, tally: &AtomicU64) -> u64 {
        let deadline = Instant::now() + self.config.shutdown_timeout;
        let mut exited = 0;
        let mut flushed = 0u64;

        while exited < self.num_workers {
            let Ok(exit) = exit_rx.recv_deadline(deadline) else {
                break;
            };
            exited += 1;
            flushed += exit.stats.attempts;
            debug!(
                worker = exit.stats.worker_id,
                state = ?exit.state,
                attempts = exit.stats.attempts,
                "worker exited"
            );
            self.health.heartbeat(&exit.stats);
            self.collector.record(StatsReport {
                epoch,
                stats: exit.stats,
            });
        }

        if exited < self.num_workers {
            warn!(
                exited,
                expected = self.num_workers,
                "workers did not stop in time, attempts are partial"
            );
            return flushed.max(tally.load(Ordering::Relaxed));
        }
        flushed
    }

    fn record(&self, result: &GenerationResult) {
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(result) {
                warn!(error = %e, "failed to record result");
            }
        }
    }

    /// Stops the pool: cancels any running search, waits for workers to
    /// exit, stops the stats collector and drains its queue.
    ///
    /// Returns [`VanityError::Timeout`] if workers are still running after
    /// the shutdown timeout.
    pub fn shutdown(&self) -> Result<(), VanityError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(search) = self.active_search.lock().as_ref() {
            search.cancel();
        }

        let deadline = Instant::now() + self.config.shutdown_timeout;
        let ticker = tick(Duration::from_millis(5));
        while self.active_workers.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            let _ = ticker.recv();
        }
        let stuck = self.active_workers.load(Ordering::SeqCst);

        self.collector_stop.cancel();
        if let Some(handle) = self.collector_handle.lock().take() {
            if handle.join().is_err() {
                error!("stats collector panicked");
            }
        }
        let drained = self.stats_rx.try_iter().count();
        debug!(drained, "stats queue drained");

        if stuck > 0 {
            warn!(workers = stuck, "workers still running after shutdown timeout");
            return Err(VanityError::Timeout(self.config.shutdown_timeout));
        }
        info!("worker pool stopped");
        Ok(())
    }

    /// Returns the number of workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Aggregated statistics of the current (or last) search.
    pub fn stats(&self) -> AggregatedStats {
        self.collector.snapshot()
    }

    /// Latest report of each worker in the current (or last) search.
    pub fn worker_stats(&self) -> Vec<WorkerStats> {
        self.collector.worker_stats()
    }

    pub fn health(&self) -> Vec<WorkerHealth> {
        self.health.snapshot()
    }

    /// Current statistics seen through the difficulty of `criteria`.
    pub fn progress(&self, criteria: &GenerationCriteria) -> Progress {
        let difficulty =
            difficulty::difficulty(&criteria.prefix, &criteria.suffix, criteria.is_checksum);
        Progress::new(self.stats(), difficulty)
    }
}

impl<P: KeyProvider> Drop for WorkerPool<P> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "unclean worker pool shutdown");
        }
    }
}

/// Stats collector loop: applies reports as they arrive and refreshes the
/// aggregate on every tick.
fn collect(
    stats_rx: Receiver<StatsReport>,
    stop: CancellationToken,
    collector: Arc<StatsCollector>,
    health: Arc<HealthMonitor>,
    active_workers: Arc<AtomicUsize>,
    interval: Duration,
) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(stats_rx) -> msg => match msg {
                Ok(report) => {
                    let stats = report.stats.clone();
                    if collector.record(report) {
                        health.heartbeat(&stats);
                    }
                }
                Err(_) => break,
            },
            recv(ticker) -> _ => {
                collector.recalculate();
                if active_workers.load(Ordering::Relaxed) > 0 {
                    health.check();
                }
            }
            recv(stop.signal()) -> _ => break,
        }
    }
    debug!("stats collector stopped");
}
