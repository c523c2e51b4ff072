//! Pattern matching implementation.

use crate::crypto::validate_checksum_pattern;

use super::GenerationCriteria;

/// How a candidate is compared with the pattern.
///
/// Chosen once per search; the variant never changes inside the hot loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Lowercases both sides and compares, allocating on every call.
    ///
    /// Never picked by [`Strategy::for_criteria`]; it is the reference
    /// rendering of case-insensitive matching that `Optimized` is checked
    /// against.
    CaseInsensitive,
    /// Byte-exact comparison, for chains where casing is part of the address.
    ExactMatch,
    /// Case-insensitive pre-filter, then exact EIP-55 casing.
    ChecksumAware,
    /// Case-insensitive, byte by byte, without allocating.
    Optimized,
}

impl Strategy {
    /// Picks the strategy for a search.
    pub fn for_criteria(criteria: &GenerationCriteria) -> Self {
        if criteria.is_checksum {
            Strategy::ChecksumAware
        } else {
            Strategy::Optimized
        }
    }

    /// Returns whether `candidate` carries `prefix` and `suffix`.
    ///
    /// Never fails: a pattern longer than the candidate is simply no match.
    #[inline]
    pub fn validate(self, candidate: &[u8], prefix: &[u8], suffix: &[u8]) -> bool {
        if prefix.len() + suffix.len() > candidate.len() {
            return false;
        }

        match self {
            Strategy::CaseInsensitive => {
                let candidate = candidate.to_ascii_lowercase();
                candidate.starts_with(&prefix.to_ascii_lowercase())
                    && candidate.ends_with(&suffix.to_ascii_lowercase())
            }
            Strategy::ExactMatch => candidate.starts_with(prefix) && candidate.ends_with(suffix),
            Strategy::ChecksumAware => validate_checksum_pattern(candidate, prefix, suffix),
            Strategy::Optimized => {
                let tail = candidate.len() - suffix.len();
                fold_eq(&candidate[..prefix.len()], prefix) && fold_eq(&candidate[tail..], suffix)
            }
        }
    }
}

#[inline(always)]
fn fold_eq(a: &[u8], b: &[u8]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::CaseInsensitive => write!(f, "case-insensitive"),
            Strategy::ExactMatch => write!(f, "exact"),
            Strategy::ChecksumAware => write!(f, "checksum"),
            Strategy::Optimized => write!(f, "optimized"),
        }
    }
}

/// A compiled pattern for efficient matching.
#[derive(Debug, Clone)]
pub struct Pattern {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    strategy: Strategy,
}

impl Pattern {
    /// Compiles validated criteria.
    ///
    /// Non-checksum patterns are stored lowercase; checksum patterns keep the
    /// caller's casing because it is the casing being searched for.
    pub fn compile(criteria: &GenerationCriteria) -> Self {
        Self::with_strategy(criteria, Strategy::for_criteria(criteria))
    }

    /// Compiles criteria with an explicit strategy.
    pub fn with_strategy(criteria: &GenerationCriteria, strategy: Strategy) -> Self {
        let normalize = |s: &str| match strategy {
            Strategy::ChecksumAware | Strategy::ExactMatch => s.as_bytes().to_vec(),
            _ => s.to_ascii_lowercase().into_bytes(),
        };

        Self {
            prefix: normalize(&criteria.prefix),
            suffix: normalize(&criteria.suffix),
            strategy,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Matches a lowercase hex candidate against this pattern.
    #[inline]
    pub fn matches(&self, candidate: &[u8]) -> bool {
        self.strategy.validate(candidate, &self.prefix, &self.suffix)
    }
}
