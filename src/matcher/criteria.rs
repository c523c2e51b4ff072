//! Caller-supplied search criteria.

use crate::crypto::ADDRESS_HEX_LEN;

/// Which half of the pattern a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    Prefix,
    Suffix,
}

impl std::fmt::Display for PatternField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternField::Prefix => write!(f, "prefix"),
            PatternField::Suffix => write!(f, "suffix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CriteriaError {
    #[error("{field} contains non-hex character {character:?} at position {position}")]
    InvalidCharacter {
        field: PatternField,
        character: char,
        position: usize,
    },
    #[error("combined prefix + suffix length {length} exceeds {max} characters")]
    TooLong { length: usize, max: usize },
}

/// What a generated address has to look like.
///
/// When `is_checksum` is set the casing of `prefix` and `suffix` is the exact
/// EIP-55 casing required; otherwise casing is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationCriteria {
    pub prefix: String,
    pub suffix: String,
    pub is_checksum: bool,
    /// Stop the search after this many candidates across all workers.
    pub max_attempts: Option<u64>,
}

impl GenerationCriteria {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            ..Self::default()
        }
    }

    pub fn checksum(mut self, is_checksum: bool) -> Self {
        self.is_checksum = is_checksum;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Combined pattern length in hex characters.
    pub fn pattern_len(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// Checks the hex alphabet and the combined length.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        for (field, value) in [
            (PatternField::Prefix, &self.prefix),
            (PatternField::Suffix, &self.suffix),
        ] {
            if let Some((position, character)) =
                value.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit())
            {
                return Err(CriteriaError::InvalidCharacter {
                    field,
                    character,
                    position,
                });
            }
        }

        let length = self.pattern_len();
        if length > ADDRESS_HEX_LEN {
            return Err(CriteriaError::TooLong {
                length,
                max: ADDRESS_HEX_LEN,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_criteria() {
        assert!(GenerationCriteria::new("dead", "BEEF").validate().is_ok());
        assert!(GenerationCriteria::new("", "").validate().is_ok());
    }

    #[test]
    fn test_invalid_character() {
        let err = GenerationCriteria::new("de", "bxef").validate().unwrap_err();
        assert_eq!(
            err,
            CriteriaError::InvalidCharacter {
                field: PatternField::Suffix,
                character: 'x',
                position: 1,
            }
        );
    }

    #[test]
    fn test_rejects_0x_prefix() {
        assert!(GenerationCriteria::new("0xdead", "").validate().is_err());
    }

    #[test]
    fn test_too_long() {
        let criteria = GenerationCriteria::new("a".repeat(30), "b".repeat(11));
        assert_eq!(
            criteria.validate(),
            Err(CriteriaError::TooLong { length: 41, max: 40 })
        );
        assert!(GenerationCriteria::new("a".repeat(20), "b".repeat(20)).validate().is_ok());
    }
}
