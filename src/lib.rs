//! # vanity_wallet
//!
//! Concurrent Ethereum vanity wallet search.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation, address derivation and EIP-55 checksums
//! - `matcher`: Criteria, matching strategies and difficulty statistics
//! - `worker`: Worker pool, cancellation, statistics and health
//! - `recorder`: Result log
//! - `config`: Runtime configuration

pub mod config;
pub mod crypto;
pub mod matcher;
pub mod recorder;
pub mod worker;

pub use config::Config;
pub use crypto::{Address, KeyProvider, Secp256k1Provider};
pub use matcher::{GenerationCriteria, Pattern, Strategy};
pub use recorder::{FileRecorder, ResultRecorder};
pub use worker::{
    AggregatedStats, CancellationToken, GenerationResult, PoolConfig, VanityError, Wallet,
    WorkerPool,
};
