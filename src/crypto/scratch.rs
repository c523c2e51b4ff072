//! Reusable per-worker buffers for key generation.

use std::sync::atomic::{compiler_fence, Ordering};

use parking_lot::Mutex;

use super::checksum::ADDRESS_HEX_LEN;

/// Working buffers for one candidate at a time.
///
/// A worker holds one `Scratch` for a whole run, so the generate/hash/encode
/// loop never allocates.
pub struct Scratch {
    /// Private key bytes of the current candidate.
    pub secret: [u8; 32],
    /// Uncompressed public key without the 0x04 tag.
    pub public: [u8; 64],
    /// Lowercase hex address of the current candidate.
    pub address: [u8; ADDRESS_HEX_LEN],
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            secret: [0u8; 32],
            public: [0u8; 64],
            address: [0u8; ADDRESS_HEX_LEN],
        }
    }

    /// Clears the private key bytes.
    pub fn wipe(&mut self) {
        self.secret.fill(0);
        compiler_fence(Ordering::SeqCst);
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// A free list of [`Scratch`] buffers shared by the workers of one pool.
#[derive(Default)]
pub struct ScratchPool {
    free: Mutex<Vec<Scratch>>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a buffer from the pool, allocating one if the pool is empty.
    pub fn checkout(&self) -> Scratch {
        self.free.lock().pop().unwrap_or_default()
    }

    /// Returns a buffer to the pool. The private key is wiped first.
    pub fn release(&self, mut scratch: Scratch) {
        scratch.wipe();
        self.free.lock().push(scratch);
    }

    /// Number of idle buffers.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}
