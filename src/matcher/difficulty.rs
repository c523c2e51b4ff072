//! Search-space statistics: difficulty, success probability and ETA.

use std::time::Duration;

use crate::worker::AggregatedStats;

/// Expected number of candidates needed to find one match.
///
/// Every hex character multiplies the space by 16. Under checksum matching
/// each letter must also land on the right case, halving the odds again.
pub fn difficulty(prefix: &str, suffix: &str, is_checksum: bool) -> f64 {
    let len = prefix.len() + suffix.len();
    let base = 16f64.powi(len as i32);

    if is_checksum {
        let letters = prefix
            .bytes()
            .chain(suffix.bytes())
            .filter(u8::is_ascii_alphabetic)
            .count();
        base * 2f64.powi(letters as i32)
    } else {
        base
    }
}

/// Probability of at least one match after `attempts` candidates.
pub fn probability(difficulty: f64, attempts: u64) -> f64 {
    if difficulty <= 1.0 {
        return if attempts > 0 { 1.0 } else { 0.0 };
    }
    1.0 - (1.0 - 1.0 / difficulty).powf(attempts as f64)
}

/// Attempts needed for a given cumulative probability of success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Estimate {
    Attempts(u64),
    /// The closed form broke down; the pattern is out of practical reach.
    NearlyImpossible,
}

impl std::fmt::Display for Estimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Estimate::Attempts(n) => write!(f, "{}", n),
            Estimate::NearlyImpossible => write!(f, "nearly impossible"),
        }
    }
}

/// Number of attempts after which a match is 50% likely.
pub fn probability50(difficulty: f64) -> Estimate {
    if difficulty <= 1.0 {
        return Estimate::Attempts(1);
    }

    let attempts = (0.5f64.ln() / (1.0 - 1.0 / difficulty).ln()).floor();
    if !attempts.is_finite() || attempts < 0.0 {
        Estimate::NearlyImpossible
    } else {
        Estimate::Attempts(attempts as u64)
    }
}

/// Time to a 50% chance of success at `speed` candidates per second.
pub fn estimated_time(difficulty: f64, speed: f64) -> Option<Duration> {
    match probability50(difficulty) {
        Estimate::Attempts(n) if speed > 0.0 => Duration::try_from_secs_f64(n as f64 / speed).ok(),
        _ => None,
    }
}

/// Returns a human-readable difficulty estimate.
pub fn describe(difficulty: f64) -> &'static str {
    match difficulty {
        d if d <= 1e3 => "Very Easy (< 1 second)",
        d if d <= 1e5 => "Easy (seconds)",
        d if d <= 1e7 => "Medium (minutes)",
        d if d <= 1e9 => "Hard (hours)",
        _ => "Very Hard (days or more)",
    }
}

/// Candidates a worker evaluates between stats reports.
///
/// Easy searches report often so progress stays fresh; hard ones report
/// rarely so coordination cost disappears into the batch.
pub fn batch_size(difficulty: f64) -> u64 {
    match difficulty {
        d if d <= 65_536.0 => 1_000,
        d if d <= 16_777_216.0 => 2_500,
        d if d <= 4_294_967_296.0 => 5_000,
        _ => 10_000,
    }
}

/// Progress of a running search.
#[derive(Debug, Clone)]
pub struct Progress {
    pub stats: AggregatedStats,
    pub difficulty: f64,
    /// Probability that a match should have been found by now.
    pub probability: f64,
    pub probability50: Estimate,
    /// Time from start to a 50% chance at the current average speed.
    pub eta: Option<Duration>,
}

impl Progress {
    pub fn new(stats: AggregatedStats, difficulty: f64) -> Self {
        Self {
            probability: probability(difficulty, stats.total_attempts),
            probability50: probability50(difficulty),
            eta: estimated_time(difficulty, stats.average_speed),
            difficulty,
            stats,
        }
    }
}
