//! Key material generation and address derivation.

use std::sync::atomic::{compiler_fence, Ordering};

use rand::RngCore;
use secp256k1::{All, PublicKey, Secp256k1, SecretKey};
use tiny_keccak::{Hasher, Keccak};

use super::{Address, Scratch};

/// Failure of a single generation attempt.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),
    #[error("invalid secret key: {0}")]
    InvalidSecret(#[from] secp256k1::Error),
    #[error("address formatting failed: {0}")]
    Format(String),
}

/// Source of fresh keypairs and their candidate addresses.
///
/// Implementations write into caller-owned [`Scratch`] buffers so the search
/// loop stays allocation-free. A failed call only discards that attempt.
pub trait KeyProvider: Send + Sync + 'static {
    /// Draws a new keypair into `scratch.secret` and `scratch.public`.
    fn generate(&self, scratch: &mut Scratch, rng: &mut dyn RngCore) -> Result<(), KeyError>;

    /// Writes the lowercase hex address of `scratch.public` into
    /// `scratch.address`.
    fn format_address(&self, scratch: &mut Scratch) -> Result<(), KeyError>;
}

/// secp256k1 keys with Keccak-256 addresses (Ethereum).
pub struct Secp256k1Provider {
    secp: Secp256k1<All>,
}

impl Secp256k1Provider {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Derives the address of an existing secret key.
    pub fn derive_address(&self, secret: &[u8; 32]) -> Result<Address, KeyError> {
        let secret_key = SecretKey::from_slice(secret)?;
        let public_key = PublicKey::from_secret_key(&self.secp, &secret_key);
        let serialized = public_key.serialize_uncompressed();
        Ok(keccak_address(&serialized[1..]))
    }
}

impl Default for Secp256k1Provider {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashes the 64 public key bytes with Keccak-256 and keeps the last 20.
#[inline]
fn keccak_address(public: &[u8]) -> Address {
    let mut hasher = Keccak::v256();
    hasher.update(public);

    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);

    let mut address_bytes = [0u8; 20];
    address_bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(address_bytes)
}

impl KeyProvider for Secp256k1Provider {
    #[inline]
    fn generate(&self, scratch: &mut Scratch, rng: &mut dyn RngCore) -> Result<(), KeyError> {
        rng.try_fill_bytes(&mut scratch.secret)?;
        let secret_key = SecretKey::from_slice(&scratch.secret)?;
        let public_key = PublicKey::from_secret_key(&self.secp, &secret_key);
        scratch
            .public
            .copy_from_slice(&public_key.serialize_uncompressed()[1..]);
        Ok(())
    }

    #[inline]
    fn format_address(&self, scratch: &mut Scratch) -> Result<(), KeyError> {
        keccak_address(&scratch.public).write_hex(&mut scratch.address);
        Ok(())
    }
}

/// A matched keypair lifted out of scratch space.
///
/// The private key bytes are zeroed when this value is dropped.
pub struct KeyMaterial {
    secret: [u8; 32],
    public: [u8; 64],
    address: [u8; 40],
}

impl KeyMaterial {
    /// Copies the current candidate out of `scratch`.
    pub fn from_scratch(scratch: &Scratch) -> Self {
        Self {
            secret: scratch.secret,
            public: scratch.public,
            address: scratch.address,
        }
    }

    /// Returns the private key as a hex string (without 0x prefix).
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret)
    }

    /// Returns the uncompressed public key (without the 0x04 tag) as hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public)
    }

    /// Returns the lowercase hex address (without 0x prefix).
    pub fn address_hex(&self) -> &[u8; 40] {
        &self.address
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("address", &String::from_utf8_lossy(&self.address))
            .finish_non_exhaustive()
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.secret.fill(0);
        compiler_fence(Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_address_matches_derivation() {
        let provider = Secp256k1Provider::new();
        let mut scratch = Scratch::new();
        let mut rng = rand::thread_rng();

        provider.generate(&mut scratch, &mut rng).unwrap();
        provider.format_address(&mut scratch).unwrap();

        let derived = provider.derive_address(&scratch.secret).unwrap();
        assert_eq!(derived.to_hex().as_bytes(), &scratch.address[..]);
    }

    #[test]
    fn test_deterministic_address() {
        let mut secret = [0u8; 32];
        secret[31] = 1;

        // Address for private key = 1 is well-known
        let address = Secp256k1Provider::new().derive_address(&secret).unwrap();
        assert_eq!(address.to_hex(), "7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn test_zero_secret_is_rejected() {
        let result = Secp256k1Provider::new().derive_address(&[0u8; 32]);
        assert!(matches!(result, Err(KeyError::InvalidSecret(_))));
    }

    #[test]
    fn test_key_material_copies_scratch() {
        let mut scratch = Scratch::new();
        scratch.secret[0] = 0x11;
        scratch.public[63] = 0x22;
        let key = KeyMaterial::from_scratch(&scratch);

        assert!(key.private_key_hex().starts_with("11"));
        assert!(key.public_key_hex().ends_with("22"));
        assert_eq!(key.public_key_hex().len(), 128);
    }
}
