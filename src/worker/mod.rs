//! Worker pool for parallel vanity address generation.
//!
//! This module provides:
//! - Multi-threaded CPU workers racing over the same criteria
//! - Cooperative cancellation and exactly-once result delivery
//! - Aggregated progress statistics and worker health

mod cancel;
mod cpu;
mod health;
mod pool;
mod stats;

pub use cancel::CancellationToken;
pub use cpu::{CpuWorker, FoundWallet, SearchJob, WorkerExit, WorkerState};
pub use health::{HealthMonitor, WorkerHealth, MAX_WORKER_ERRORS};
pub use pool::{
    GenerationResult, PoolConfig, VanityError, Wallet, WorkerError, WorkerPool, MAX_WORKERS,
};
pub use stats::{AggregatedStats, StatsCollector, StatsReport, WorkerStats};
