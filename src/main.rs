//! Ethereum Vanity Wallet Generator CLI
//!
//! Usage:
//!   vanity_wallet -p dead              # Address starting with "dead"
//!   vanity_wallet -s beef              # Address ending with "beef"
//!   vanity_wallet -p CAFE -c -n 3      # 3 addresses with checksum prefix "CAFE"

use std::process;
use std::thread;

use clap::Parser;
use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::error;
use tracing_subscriber::EnvFilter;

use vanity_wallet::matcher::difficulty;
use vanity_wallet::worker::{GenerationResult, WorkerError};
use vanity_wallet::{
    CancellationToken, Config, FileRecorder, GenerationCriteria, VanityError, WorkerPool,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        process::exit(1);
    }

    let criteria = config.criteria();
    let difficulty =
        difficulty::difficulty(&criteria.prefix, &criteria.suffix, criteria.is_checksum);

    let mut pool = match WorkerPool::new(config.pool_config()) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to start workers: {}", e);
            process::exit(1);
        }
    };
    if let Some(path) = &config.output {
        pool = pool.with_recorder(FileRecorder::new(path));
    }

    // Print startup info
    println!("Ethereum Vanity Wallet Generator");
    println!("================================");
    println!("Prefix:     {}", display_or_any(&criteria.prefix));
    println!("Suffix:     {}", display_or_any(&criteria.suffix));
    println!("Checksum:   {}", criteria.is_checksum);
    println!("Difficulty: {:.0} ({})", difficulty, difficulty::describe(difficulty));
    println!("50% after:  {} attempts", difficulty::probability50(difficulty));
    println!("Workers:    {}", pool.num_workers());
    println!("Target:     {} wallet(s)", config.count);
    println!();

    let cancel = CancellationToken::new();
    ctrlc_handler(cancel.clone());

    println!("Searching... (Press Ctrl+C to stop)\n");

    let timeout = config.timeout();
    let report_interval = config.report_interval();
    let mut found = 0;
    while found < config.count {
        let outcome = thread::scope(|s| {
            let (done_tx, done_rx) = bounded(1);
            let (pool, cancel, criteria) = (&pool, &cancel, &criteria);
            s.spawn(move || {
                let result = match timeout {
                    Some(timeout) => pool.generate_wallet_timeout(cancel, criteria, timeout),
                    None => pool.generate_wallet(cancel, criteria),
                };
                let _ = done_tx.send(result);
            });

            loop {
                match done_rx.recv_timeout(report_interval) {
                    Ok(result) => break result,
                    Err(RecvTimeoutError::Timeout) => print_progress(pool, criteria),
                    Err(RecvTimeoutError::Disconnected) => {
                        break Err(WorkerError::PoolNotRunning.into())
                    }
                }
            }
        });

        match outcome {
            Ok(result) => {
                found += 1;
                print_result(&result, found);
            }
            Err(VanityError::Cancelled { attempts }) => {
                println!("\nStopped by user after {} attempts.", format_number(attempts));
                break;
            }
            Err(e) => {
                error!("Search failed: {}", e);
                break;
            }
        }
    }

    // Print final stats
    let stats = pool.stats();
    println!("\n--- Final Statistics (last search) ---");
    println!("Keys generated:  {}", format_number(stats.total_attempts));
    println!("Time elapsed:    {:.2}s", stats.elapsed.as_secs_f64());
    println!("Average speed:   {}/s", format_number(stats.average_speed as u64));
    println!("Peak speed:      {}/s", format_number(stats.peak_speed as u64));
    println!("Thread balance:  {:.1}%", stats.thread_balance * 100.0);
    println!("Wallets found:   {}", found);

    if let Err(e) = pool.shutdown() {
        error!("Shutdown failed: {}", e);
    }
    if found < config.count {
        process::exit(1);
    }
}

fn display_or_any(s: &str) -> &str {
    if s.is_empty() {
        "(any)"
    } else {
        s
    }
}

fn print_result(result: &GenerationResult, index: usize) {
    println!("=== Wallet #{} ===", index);
    println!("Address:     {}", result.wallet.address);
    println!("Public Key:  {}", result.wallet.public_key);
    println!("Private Key: {}", result.wallet.private_key);
    println!("Attempts:    {}", format_number(result.attempts));
    println!("Time:        {:.2}s", result.duration.as_secs_f64());
    println!("Worker:      {}", result.worker_id);
    println!();
}

fn print_progress(pool: &WorkerPool, criteria: &GenerationCriteria) {
    let progress = pool.progress(criteria);
    let eta = progress
        .eta
        .map(|eta| format!("{}s", eta.as_secs()))
        .unwrap_or_else(|| "unknown".into());

    println!(
        "[{:>4}s] Generated {} keys ({}/s, peak {}/s) | p={:.1}% | 50% ETA {} | efficiency {:.0}%",
        progress.stats.elapsed.as_secs(),
        format_number(progress.stats.total_attempts),
        format_number(progress.stats.average_speed as u64),
        format_number(progress.stats.peak_speed as u64),
        progress.probability * 100.0,
        eta,
        progress.stats.thread_efficiency * 100.0,
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(cancel: CancellationToken) {
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        error!("Error setting Ctrl-C handler: {}", e);
    }
}
