//! Initialization guard for the ecall dispatcher
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use core::sync::atomic::{AtomicU64, Ordering};

use edge::ecall::INIT_MAGIC;

use crate::Status;

/// A sentinel word that gates ecall dispatching
///
/// The word holds INIT_MAGIC once the enclave has been set up. Any other
/// value, including a corrupted one, makes every call fail with
/// Status::NotInitialized.
pub struct Guard {
    sentinel: AtomicU64,
}

impl Guard {

    /// Create an unarmed guard
    pub const fn new() -> Self {
        Self{sentinel: AtomicU64::new(0)}
    }

    /// Store the sentinel
    ///
    /// Everything written before arming is visible to callers that pass
    /// 'check'.
    pub(crate) fn arm(&self) {
        self.sentinel.store(INIT_MAGIC, Ordering::Release);
    }

    /// Check that the sentinel is in place
    pub fn check(&self) -> Result<(), Status> {
        if self.sentinel.load(Ordering::Acquire) != INIT_MAGIC {
            return Err(Status::NotInitialized);
        }

        Ok(())
    }

    /// 'true' if the guard lets calls through
    pub fn is_armed(&self) -> bool {
        self.check().is_ok()
    }

    #[cfg(test)]
    pub(crate) fn overwrite(&self, value: u64) {
        self.sentinel.store(value, Ordering::Release);
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}
