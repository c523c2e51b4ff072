//! Ethereum address representation and utilities.

use std::fmt;

use super::checksum::{render_checksum_into, ADDRESS_HEX_LEN};

/// An Ethereum address (20 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Creates an address from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parses a 40-character hex address, with or without `0x`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Writes the lowercase hex form into `out` without allocating.
    #[inline]
    pub fn write_hex(&self, out: &mut [u8; ADDRESS_HEX_LEN]) {
        // 20 bytes always fit 40 chars.
        let _ = hex::encode_to_slice(self.0, out);
    }

    /// Returns the address as a lowercase hex string (without 0x prefix).
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the address with 0x prefix.
    pub fn to_hex_prefixed(&self) -> String {
        format!("0x{}", self.to_hex())
    }

    /// Returns the address with checksum encoding (EIP-55).
    pub fn to_checksum(&self) -> String {
        let mut lower = [0u8; ADDRESS_HEX_LEN];
        self.write_hex(&mut lower);
        let mut mixed = [0u8; ADDRESS_HEX_LEN];
        render_checksum_into(&lower, &mut mixed);

        let mut checksum = String::with_capacity(2 + ADDRESS_HEX_LEN);
        checksum.push_str("0x");
        checksum.extend(mixed.iter().map(|&b| b as char));
        checksum
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_address() {
        let addr = Address::from_hex("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(addr.to_checksum(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_hex_output() {
        let addr = Address::from_bytes([0u8; 20]);
        assert_eq!(addr.to_hex(), "0000000000000000000000000000000000000000");
        assert_eq!(
            addr.to_hex_prefixed(),
            "0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Address::from_hex("0x1234").is_none());
        assert!(Address::from_hex("zz00000000000000000000000000000000000000").is_none());
    }
}
