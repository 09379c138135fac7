//! Execution contexts of a loaded enclave
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use std::fmt;

use edge::ecall::TCS_SIZE;

use crate::{Error, Fault};

/// An enclave thread control structure (TCS)
///
/// The handle identifies one execution context of an enclave set up by the
/// enclave loader. It is only an address: the loader owns the memory and
/// the lifecycle of the context.
///
/// Ecalls borrow the handle mutably, which keeps a single handle from
/// being used by two calls at the same time.

pub struct Tcs {
    /// Address of the TCS page in the enclave
    addr:     usize,
    /// Set after a fatal failure on this context
    poisoned: bool,
}

impl Tcs {

    /// Wrap a TCS address.
    ///
    /// # Inputs
    ///
    /// * 'addr' is the address of a TCS page of a loaded enclave.
    ///
    /// # Returns
    ///
    /// A Result containing the handle, or Error::Fatal(Fault::BadHandle) if
    /// the address is null or not page aligned.
    ///
    /// # Safety
    ///
    /// 'addr' must be the address of a TCS of an enclave that stays loaded
    /// while the handle is used, and no other handle may be created for the
    /// same address.

    pub unsafe fn from_raw(addr: usize) -> Result<Self, Error> {
        if addr == 0 || addr % TCS_SIZE != 0 {
            return Err(Error::Fatal(Fault::BadHandle));
        }

        Ok(Self{addr: addr, poisoned: false})
    }

    /// Address of the TCS
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// 'true' if an earlier call failed fatally on this context
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }
}

impl fmt::Debug for Tcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tcs")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_addresses_are_rejected() {
        for addr in [0, 1, 0x800, TCS_SIZE + 8] {
            let res = unsafe { Tcs::from_raw(addr) };
            assert_eq!(res.unwrap_err(), Error::Fatal(Fault::BadHandle));
        }
    }

    #[test]
    fn page_aligned_address_is_accepted() {
        let mut tcs = unsafe { Tcs::from_raw(0x7f00_0000_1000) }.unwrap();
        assert_eq!(tcs.addr(), 0x7f00_0000_1000);
        assert!(!tcs.is_poisoned());
        tcs.poison();
        assert!(tcs.is_poisoned());
    }
}
