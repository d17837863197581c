//! Shared helpers for kernel-backed tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Queue name that unlinks itself when dropped
///
/// Names embed the pid and a counter so parallel test threads and
/// concurrent test binaries never share a queue.
pub struct ScratchQueue {
    pub name: String,
}

impl ScratchQueue {
    pub fn new(tag: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = format!("/{}_{}_{}", tag, std::process::id(), n);
        // Leftovers from an aborted earlier run
        let _ = libnyx_mq::unlink(&name);
        Self { name }
    }
}

impl Drop for ScratchQueue {
    fn drop(&mut self) {
        let _ = libnyx_mq::unlink(&self.name);
    }
}
