//! An API to make ecalls to the enclave application
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use edge::ecall::{self, Descriptor};

pub use edge::ecall::{ECALL_MAGIC, MAX_ECALLS};

use crate::{Error, Fault, Status};
use crate::enclave::Tcs;
use crate::platform::Enter;

/// Ecall trampoline
///
/// Validates calls against the enclave's dispatch table bound 'N', enters
/// the enclave through the entry primitive 'P' and decodes the status left
/// by the enclave. The trampoline holds no per-call state, so a single
/// instance can be shared by threads calling through distinct execution
/// contexts.

pub struct Trampoline<P: Enter, const N: usize = MAX_ECALLS> {
    /// Entry primitive
    platform: P,
}

impl<P: Enter, const N: usize> Trampoline<P, N> {

    /// Create a new trampoline
    pub fn new(platform: P) -> Self {
        Self{platform: platform}
    }

    /// Get the entry primitive
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Number of ordinals served by the enclave
    pub const fn bound(&self) -> usize {
        N
    }

    /// Make an ecall to the enclave.
    ///
    /// This call blocks the current thread until the enclave exits.
    ///
    /// # Inputs
    ///
    /// * 'ordinal' is the index of the call in the enclave's dispatch table.
    ///
    /// * 'tcs' is the execution context used for the call.
    ///
    /// * 'arg' is the single argument word passed to the handler.
    ///
    /// # Returns
    ///
    /// The handler's result, or:
    ///
    /// * Error::OutOfRange if 'ordinal' is not served. The enclave is not
    ///   entered.
    /// * Error::NotInitialized if the enclave has not completed its
    ///   initialization.
    /// * Error::Fatal if the transition failed, the enclave returned an
    ///   invalid status or 'tcs' is poisoned. 'tcs' is poisoned afterwards
    ///   and every further call on it fails without entering the enclave.
    ///
    /// The ordinal is checked before the state of 'tcs': an unserved ordinal
    /// is Error::OutOfRange even on a poisoned context.
    ///

    pub fn call(&self, ordinal: u64, tcs: &mut Tcs, arg: u64) -> Result<u32, Error> {
        let desc = match Descriptor::new(ordinal, arg, N) {
            Ok(desc)    => desc,
            Err(status) => {
                log::debug!("ecall {} rejected, {} ordinals served", ordinal, N);
                return Err(Error::from(status));
            }
        };

        if tcs.is_poisoned() {
            return Err(Error::Fatal(Fault::Poisoned));
        }

        log::trace!("ecall {} entering through {:#x}", desc.ordinal(), tcs.addr());

        // The handle was created under the contract of Tcs::from_raw and is
        // borrowed mutably for the duration of the call.
        let entered = unsafe {
            self.platform.enter(tcs.addr(), desc.ordinal(), desc.arg())
        };

        let raw = match entered {
            Ok(raw)    => raw,
            Err(fault) => {
                log::error!("ecall {} through {:#x} failed: {}", ordinal, tcs.addr(), fault);
                tcs.poison();
                return Err(Error::Fatal(fault));
            }
        };

        match ecall::decode(raw) {
            Ok(value)          => Ok(value),
            Err(Status::Fatal) => {
                log::error!("ecall {} returned invalid status {:#x}", ordinal, raw);
                tcs.poison();
                Err(Error::Fatal(Fault::BadStatus(raw)))
            },
            Err(status)        => {
                if status == Status::NotInitialized {
                    log::warn!("ecall {}: enclave not initialized", ordinal);
                }
                Err(Error::from(status))
            },
        }
    }

    /// Make an ecall and return the outcome as an integer status.
    ///
    /// Handler results are returned as non-negative values, failures as
    /// the negative code of their category (see Status).

    pub fn call_status(&self, ordinal: u64, tcs: &mut Tcs, arg: u64) -> i64 {
        match self.call(ordinal, tcs, arg) {
            Ok(value)  => value as i64,
            Err(error) => error.status().as_i64(),
        }
    }
}
