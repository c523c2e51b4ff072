//! EIP-55 mixed-case checksum encoding.
//!
//! The checksum of an address is the Keccak-256 digest of its lowercase hex
//! string (ASCII bytes, no `0x`). A letter at position `i` is uppercased when
//! the digest nibble at `i` (high nibble for even `i`, low for odd) is >= 8.

use tiny_keccak::{Hasher, Keccak};

/// Number of hex characters in a reference-chain address.
pub const ADDRESS_HEX_LEN: usize = 40;

/// Longest string a Keccak-256 digest has nibbles for.
pub const MAX_CHECKSUM_LEN: usize = 64;

#[inline]
fn keccak(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

/// Returns the checksum-cased form of the lowercase character `c` at
/// position `i`.
#[inline]
fn checksum_byte(c: u8, hash: &[u8; 32], i: usize) -> u8 {
    let byte = hash[i / 2];
    let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

    if c.is_ascii_alphabetic() && nibble >= 8 {
        c.to_ascii_uppercase()
    } else {
        c
    }
}

/// Renders `lower` into `out` using checksum casing.
///
/// `lower` must be lowercase hex of at most [`MAX_CHECKSUM_LEN`] characters
/// and `out` must be at least as long. Performs no allocation.
pub fn render_checksum_into(lower: &[u8], out: &mut [u8]) {
    debug_assert!(lower.len() <= MAX_CHECKSUM_LEN, "input longer than the digest");
    debug_assert!(out.len() >= lower.len(), "output shorter than input");
    let hash = keccak(lower);
    for (i, (&c, slot)) in lower.iter().zip(out.iter_mut()).enumerate() {
        *slot = checksum_byte(c, &hash, i);
    }
}

/// Returns the checksum rendering of a hex address (no `0x` prefix).
///
/// Input casing is ignored, so rendering an already-checksummed address
/// reproduces it. Returns `None` for input longer than [`MAX_CHECKSUM_LEN`].
pub fn render_checksum(address: &str) -> Option<String> {
    if address.len() > MAX_CHECKSUM_LEN {
        return None;
    }
    let lower = address.to_ascii_lowercase();
    let mut out = lower.clone().into_bytes();
    render_checksum_into(lower.as_bytes(), &mut out);
    // Only ASCII case changes were applied.
    Some(String::from_utf8(out).unwrap_or(lower))
}

#[inline]
fn is_lower_hex(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
}

/// Checks that the checksum rendering of `candidate` carries `prefix` and
/// `suffix` with exactly the caller's casing.
///
/// `candidate` is the lowercase hex address. Candidates failing a
/// case-insensitive comparison are rejected before any hashing; windows
/// with no letters never need the hash at all. Anything that is not
/// [`ADDRESS_HEX_LEN`] characters long is no match.
pub fn validate_checksum_pattern(candidate: &[u8], prefix: &[u8], suffix: &[u8]) -> bool {
    let len = candidate.len();
    if len != ADDRESS_HEX_LEN || prefix.len() + suffix.len() > len {
        return false;
    }

    let tail = len - suffix.len();
    if !candidate[..prefix.len()].eq_ignore_ascii_case(prefix)
        || !candidate[tail..].eq_ignore_ascii_case(suffix)
    {
        return false;
    }

    if !prefix.iter().chain(suffix).any(u8::is_ascii_alphabetic) {
        return true;
    }
    if !is_lower_hex(candidate) {
        return false;
    }

    let hash = keccak(candidate);
    let prefix_ok = prefix
        .iter()
        .enumerate()
        .all(|(i, &want)| checksum_byte(candidate[i], &hash, i) == want);

    prefix_ok
        && suffix
            .iter()
            .enumerate()
            .all(|(j, &want)| checksum_byte(candidate[tail + j], &hash, tail + j) == want)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const CHECKSUMMED: &str = "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    /// Every casing of the letters in `s`, in order.
    fn casings(s: &str) -> Vec<String> {
        let letters: Vec<usize> = s
            .bytes()
            .enumerate()
            .filter(|(_, b)| b.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .collect();

        (0..1u32 << letters.len())
            .map(|mask| {
                let mut bytes = s.to_ascii_lowercase().into_bytes();
                for (bit, &pos) in letters.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        bytes[pos] = bytes[pos].to_ascii_uppercase();
                    }
                }
                String::from_utf8(bytes).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(render_checksum(LOWER).as_deref(), Some(CHECKSUMMED));
    }

    #[test]
    fn test_eip55_vectors() {
        for expected in [
            "fB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "dbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "D1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            assert_eq!(render_checksum(&expected.to_lowercase()).as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        for addr in [LOWER, "0000000000000000000000000000000000000000", "ffffffffffffffffffffffffffffffffffffffff"] {
            let once = render_checksum(addr).unwrap();
            assert_eq!(render_checksum(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_render_into_matches_owned() {
        let mut out = [0u8; ADDRESS_HEX_LEN];
        render_checksum_into(LOWER.as_bytes(), &mut out);
        assert_eq!(std::str::from_utf8(&out).unwrap(), CHECKSUMMED);
    }

    #[test]
    fn test_empty_pattern_always_matches() {
        assert!(validate_checksum_pattern(LOWER.as_bytes(), b"", b""));
        assert!(validate_checksum_pattern(&[b'f'; ADDRESS_HEX_LEN], b"", b""));
    }

    #[test]
    fn test_exact_case_prefix_windows() {
        for n in 1..=8 {
            let window = &CHECKSUMMED[..n];
            for casing in casings(window) {
                let accepted = validate_checksum_pattern(LOWER.as_bytes(), casing.as_bytes(), b"");
                assert_eq!(accepted, casing == window, "prefix {casing}");
            }
        }
    }

    #[test]
    fn test_exact_case_suffix_windows() {
        for n in 1..=8 {
            let window = &CHECKSUMMED[ADDRESS_HEX_LEN - n..];
            for casing in casings(window) {
                let accepted = validate_checksum_pattern(LOWER.as_bytes(), b"", casing.as_bytes());
                assert_eq!(accepted, casing == window, "suffix {casing}");
            }
        }
    }

    #[test]
    fn test_prefix_and_suffix_together() {
        assert!(validate_checksum_pattern(LOWER.as_bytes(), b"5aAe", b"BeAed"));
        assert!(!validate_checksum_pattern(LOWER.as_bytes(), b"5aAe", b"beaed"));
        assert!(!validate_checksum_pattern(LOWER.as_bytes(), b"5aae", b"BeAed"));
    }

    #[test]
    fn test_digit_only_windows() {
        let addr = b"1234567890000000000000000000000000000987";
        assert!(validate_checksum_pattern(addr, b"12345", b"987"));
        assert!(!validate_checksum_pattern(addr, b"12346", b""));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(!validate_checksum_pattern(b"abc", b"abcd", b""));
        assert!(!validate_checksum_pattern(b"abc", b"ab", b"bc"));
        assert!(!validate_checksum_pattern(b"abc", b"a", b""));
        // Uppercase candidates cannot be hashed as the lowercase string.
        assert!(!validate_checksum_pattern(CHECKSUMMED.as_bytes(), b"5aAe", b""));
    }

    #[test]
    fn test_oversized_candidate_is_no_match() {
        let long = [b'a'; 80];
        assert!(!validate_checksum_pattern(&long, b"", b"A"));
        assert!(!validate_checksum_pattern(&long, b"A", b""));
        assert!(!validate_checksum_pattern(&long, b"1", b""));
        assert!(!validate_checksum_pattern(&[b'a'; MAX_CHECKSUM_LEN + 1], b"", b""));
    }

    #[test]
    fn test_render_bounded_by_digest() {
        assert!(render_checksum(&"a".repeat(MAX_CHECKSUM_LEN + 1)).is_none());

        let widest = render_checksum(&"a".repeat(MAX_CHECKSUM_LEN)).unwrap();
        assert_eq!(widest.len(), MAX_CHECKSUM_LEN);
        assert!(widest.eq_ignore_ascii_case(&"a".repeat(MAX_CHECKSUM_LEN)));
    }
}
