//! Runtime configuration for the vanity wallet generator.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::matcher::{CriteriaError, GenerationCriteria};
use crate::worker::PoolConfig;

/// Ethereum Vanity Wallet Generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address prefix (hex characters only: 0-9, a-f, A-F)
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Address suffix (hex characters only)
    #[arg(short, long, default_value = "")]
    pub suffix: String,

    /// Match the exact EIP-55 checksum casing of prefix and suffix
    #[arg(short, long, default_value = "false")]
    pub checksum: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Number of wallets to generate
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Give up each search after this many attempts
    #[arg(long)]
    pub max_attempts: Option<u64>,

    /// Give up each search after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Progress report interval in seconds
    #[arg(short, long, default_value = "5")]
    pub report_interval: u64,

    /// Append found wallets to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Candidates per worker between stats reports (default: by difficulty)
    #[arg(long)]
    pub batch_size: Option<u64>,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.criteria().validate()?;

        if self.count == 0 {
            return Err(ConfigError::Invalid("count must be at least 1".into()));
        }
        if self.report_interval == 0 {
            return Err(ConfigError::Invalid("report interval must be at least 1 second".into()));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::Invalid("batch size must be at least 1".into()));
        }

        Ok(())
    }

    /// Returns the search criteria described by the flags.
    pub fn criteria(&self) -> GenerationCriteria {
        GenerationCriteria {
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            is_checksum: self.checksum,
            max_attempts: self.max_attempts,
        }
    }

    /// Returns the pool settings described by the flags.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            threads: self.workers,
            batch_size: self.batch_size,
            ..PoolConfig::default()
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] CriteriaError),
    #[error("Invalid option: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("vanity_wallet").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_valid_pattern() {
        let config = parse(&["-p", "dead", "-s", "BEEF", "-c"]);
        assert!(config.validate().is_ok());

        let criteria = config.criteria();
        assert_eq!(criteria.prefix, "dead");
        assert_eq!(criteria.suffix, "BEEF");
        assert!(criteria.is_checksum);
    }

    #[test]
    fn test_invalid_pattern() {
        let config = parse(&["-p", "xyz"]);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_invalid_options() {
        assert!(parse(&["-p", "ab", "-n", "0"]).validate().is_err());
        assert!(parse(&["-p", "ab", "-w", "0"]).validate().is_err());
    }

    #[test]
    fn test_pool_config() {
        let config = parse(&["-w", "3", "--batch-size", "64", "--max-attempts", "10"]);
        let pool = config.pool_config();
        assert_eq!(pool.thread_count(), 3);
        assert_eq!(pool.batch_size, Some(64));
        assert_eq!(config.criteria().max_attempts, Some(10));
    }
}
