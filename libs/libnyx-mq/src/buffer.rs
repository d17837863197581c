//! Receive buffer
//!
//! `mq_receive` rejects any buffer shorter than the queue's `mq_msgsize`, so
//! every handle owns one scratch region of exactly that size. Allocation is
//! fallible: a queue created with a large message size must not abort the
//! process when the allocator refuses.

use crate::error::{Error, ErrorKind, Op, Result};

/// Fixed-capacity scratch target for receive calls
///
/// Freed on drop, exactly once.
#[derive(Debug)]
pub struct ReceiveBuffer {
    storage: Vec<u8>,
}

impl ReceiveBuffer {
    /// Zero-capacity buffer for handles that never receive
    pub fn empty() -> Self {
        Self {
            storage: Vec::new(),
        }
    }

    /// Reserve `size` zeroed bytes
    pub fn allocate(size: usize) -> Result<Self> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(size)
            .map_err(|_| Error::new(Op::Allocate, ErrorKind::AllocationFailed))?;
        storage.resize(size, 0);
        Ok(Self { storage })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Whole region, as handed to the kernel
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage
    }

    /// Received prefix of `len` bytes
    pub fn filled(&self, len: usize) -> &[u8] {
        &self.storage[..len.min(self.storage.len())]
    }
}
