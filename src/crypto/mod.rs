//! Cryptographic operations for Ethereum key and address generation.
//!
//! This module provides:
//! - Secure random key generation using secp256k1
//! - Ethereum address derivation using Keccak-256
//! - EIP-55 checksum rendering and pattern validation
//! - Scratch buffers reused across candidates

mod address;
pub mod checksum;
mod keypair;
mod scratch;

pub use address::Address;
pub use checksum::{render_checksum, validate_checksum_pattern, ADDRESS_HEX_LEN};
pub use keypair::{KeyError, KeyMaterial, KeyProvider, Secp256k1Provider};
pub use scratch::{Scratch, ScratchPool};
