//! Pattern matching for Ethereum addresses.
//!
//! - `criteria`: caller-facing prefix/suffix constraints and validation
//! - `pattern`: matching strategies, selected once per search
//! - `difficulty`: search-space size, probabilities and ETA

mod criteria;
pub mod difficulty;
mod pattern;

pub use criteria::{CriteriaError, GenerationCriteria, PatternField};
pub use difficulty::{Estimate, Progress};
pub use pattern::{Pattern, Strategy};
