//! CPU-based worker for vanity address generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{select, Sender, TrySendError};
use rand::rngs::ThreadRng;
use tracing::{debug, trace, warn};

use crate::crypto::{KeyError, KeyMaterial, KeyProvider, Scratch, ScratchPool};
use crate::matcher::Pattern;

use super::health::MAX_WORKER_ERRORS;
use super::{CancellationToken, StatsReport, WorkerError, WorkerStats};

/// Lifecycle of a worker within one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    /// Found a match and handed it over (or lost the race to hand it over).
    Found,
    Cancelled,
    /// The search-wide attempt budget ran out.
    Exhausted,
}

/// A matching keypair on its way to the pool.
#[derive(Debug)]
pub struct FoundWallet {
    pub worker_id: usize,
    pub key: KeyMaterial,
}

/// Final state and flushed counters of a finished worker.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub state: WorkerState,
    pub stats: WorkerStats,
}

/// Everything the workers of one search share.
#[derive(Clone)]
pub struct SearchJob {
    pub epoch: u64,
    pub pattern: Arc<Pattern>,
    pub cancel: CancellationToken,
    pub result_tx: Sender<FoundWallet>,
    pub stats_tx: Sender<StatsReport>,
    /// Attempts flushed by all workers so far.
    pub tally: Arc<AtomicU64>,
    pub max_attempts: Option<u64>,
    pub batch_size: u64,
}

/// A CPU worker that generates and tests keypairs.
pub struct CpuWorker<P: KeyProvider> {
    id: usize,
    provider: Arc<P>,
    scratch_pool: Arc<ScratchPool>,
    job: SearchJob,
    state: WorkerState,
    stats: WorkerStats,
    dropped_reports: u64,
}

impl<P: KeyProvider> CpuWorker<P> {
    pub fn new(id: usize, provider: Arc<P>, scratch_pool: Arc<ScratchPool>, job: SearchJob) -> Self {
        Self {
            id,
            provider,
            scratch_pool,
            job,
            state: WorkerState::Idle,
            stats: WorkerStats::new(id),
            dropped_reports: 0,
        }
    }

    /// Runs the worker loop.
    ///
    /// Generates keypairs and tests them against the pattern until:
    /// - A match is found (handed to the pool, or dropped if the search ended)
    /// - The cancellation token fires
    /// - The search-wide attempt budget is spent
    pub fn run(mut self) -> WorkerExit {
        self.state = WorkerState::Running;
        debug!(worker = self.id, batch = self.job.batch_size, "worker started");

        let mut scratch = self.scratch_pool.checkout();
        let mut rng = rand::thread_rng();
        let started = Instant::now();
        let mut in_batch = 0u64;
        let mut unflushed = 0u64;

        // Each pass evaluates a candidate before looking at the token, so
        // every started worker contributes at least one attempt.
        loop {
            match self.try_candidate(&mut scratch, &mut rng) {
                Ok(matched) => {
                    self.stats.attempts += 1;
                    unflushed += 1;
                    if matched {
                        self.deliver(&scratch);
                        self.state = WorkerState::Found;
                    }
                }
                Err(e) => self.record_error(&e),
            }
            scratch.wipe();

            if self.state == WorkerState::Found {
                break;
            }
            if self.job.cancel.is_cancelled() {
                self.state = WorkerState::Cancelled;
                break;
            }

            in_batch += 1;
            if in_batch == self.job.batch_size {
                in_batch = 0;
                let total = self.job.tally.fetch_add(unflushed, Ordering::Relaxed) + unflushed;
                unflushed = 0;

                if let Err(e) = self.publish(started) {
                    self.dropped_reports += 1;
                    trace!(worker = self.id, error = %e, "stats report dropped");
                }
                if self.job.max_attempts.is_some_and(|max| total >= max) {
                    self.state = WorkerState::Exhausted;
                    break;
                }
            }
        }

        self.job.tally.fetch_add(unflushed, Ordering::Relaxed);
        self.refresh(started);
        self.scratch_pool.release(scratch);

        debug!(
            worker = self.id,
            state = ?self.state,
            attempts = self.stats.attempts,
            errors = self.stats.error_count,
            dropped_reports = self.dropped_reports,
            "worker stopped"
        );

        WorkerExit {
            state: self.state,
            stats: self.stats,
        }
    }

    #[inline]
    fn try_candidate(&self, scratch: &mut Scratch, rng: &mut ThreadRng) -> Result<bool, KeyError> {
        self.provider.generate(scratch, rng)?;
        self.provider.format_address(scratch)?;
        Ok(self.job.pattern.matches(&scratch.address))
    }

    fn record_error(&mut self, error: &KeyError) {
        self.stats.error_count += 1;
        debug!(worker = self.id, %error, "candidate discarded");

        if self.stats.is_healthy && self.stats.error_count > MAX_WORKER_ERRORS {
            self.stats.is_healthy = false;
            warn!(
                worker = self.id,
                errors = self.stats.error_count,
                "error threshold exceeded, continuing"
            );
        }
    }

    fn refresh(&mut self, started: Instant) {
        let now = Instant::now();
        let elapsed = now.duration_since(started).as_secs_f64();
        self.stats.speed = if elapsed > 0.0 {
            self.stats.attempts as f64 / elapsed
        } else {
            0.0
        };
        self.stats.last_update = now;
    }

    /// Best-effort stats report; a full queue loses the sample.
    fn publish(&mut self, started: Instant) -> Result<(), WorkerError> {
        self.refresh(started);
        let report = StatsReport {
            epoch: self.job.epoch,
            stats: self.stats.clone(),
        };

        match self.job.stats_tx.try_send(report) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(WorkerError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(WorkerError::PoolNotRunning),
        }
    }

    /// Hands a match to the pool. Blocks until it is taken or the search is
    /// cancelled.
    fn deliver(&self, scratch: &Scratch) {
        let found = FoundWallet {
            worker_id: self.id,
            key: KeyMaterial::from_scratch(scratch),
        };

        select! {
            send(self.job.result_tx, found) -> res => {
                if res.is_err() {
                    debug!(worker = self.id, "result channel closed, match dropped");
                }
            }
            recv(self.job.cancel.signal()) -> _ => {
                debug!(worker = self.id, "search already over, match dropped");
            }
        }
    }
}
