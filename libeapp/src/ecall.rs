//! ECall dispatching inside the enclave application
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use spin::Once;

use edge::ecall;

pub use edge::ecall::{ECALL_MAGIC, MAX_ECALLS};

use crate::{Error, Status};
use crate::guard::Guard;

/// A listener for receiving ecalls
///
/// Any 'Fn(u64) -> u32' that is 'Sync' is a listener, so plain functions can
/// be placed in a call table directly.
pub trait Listener: Sync {

    /// Callback for handling an ecall
    ///
    /// # Input
    /// * 'arg' is the single argument word passed by the host
    ///
    /// # Return
    ///
    /// Call result returned to the host. The result space is disjoint from
    /// the reserved status codes.

    fn on_ecall(&self, arg: u64) -> u32;
}

impl<F> Listener for F
where
    F: Fn(u64) -> u32 + Sync,
{
    fn on_ecall(&self, arg: u64) -> u32 {
        self(arg)
    }
}

/// Lookup from call ordinal to listener
pub trait Dispatch: Sync {

    /// Number of ordinals served
    fn bound(&self) -> usize;

    /// Resolve the listener for 'ordinal'
    ///
    /// # Return
    ///
    /// The listener, or Status::OutOfRange if the ordinal is not served.

    fn resolve(&self, ordinal: u64) -> Result<&dyn Listener, Status>;
}

/// Dispatch table
///
/// Simply a fixed array of listeners, one for every ordinal starting from
/// ECALL_MAGIC. The table has no operations for changing its entries.
pub struct CallTable<'a, const N: usize = MAX_ECALLS> {
    table: [&'a dyn Listener; N],
}

impl<'a, const N: usize> CallTable<'a, N> {

    /// Create a new table, usually as a 'static'
    ///
    /// Ordinal ECALL_MAGIC + i is served by 'table[i]'.
    pub const fn new(table: [&'a dyn Listener; N]) -> Self {
        assert!(N >= 1, "a call table must have at least one entry");
        Self{table: table}
    }

    /// Number of entries
    pub const fn len(&self) -> usize {
        N
    }

    /// Always 'false', an empty table cannot be constructed
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl<'a, const N: usize> Dispatch for CallTable<'a, N> {

    fn bound(&self) -> usize {
        N
    }

    fn resolve(&self, ordinal: u64) -> Result<&dyn Listener, Status> {
        let index = ecall::index(ordinal, N)?;
        Ok(self.table[index])
    }
}

/// Ecall runtime of an enclave
///
/// Pairs the initialization guard with a dispatch table that can be
/// installed exactly once. After 'init' both are read-only, so the runtime
/// serves calls from any number of threads.
pub struct Runtime {
    /// Sentinel checked before every call
    guard: Guard,
    /// Dispatch table, frozen once installed
    table: Once<&'static dyn Dispatch>,
}

impl Runtime {

    /// Create a runtime that rejects all calls until initialized
    pub const fn new() -> Self {
        Self{guard: Guard::new(), table: Once::new()}
    }

    /// Install the dispatch table and arm the guard
    ///
    /// # Input
    /// * 'table' is the dispatch table for the lifetime of the enclave
    ///
    /// # Return
    ///
    /// Error::BadState if a table has already been installed. The installed
    /// table is never replaced.

    pub fn init(&self, table: &'static dyn Dispatch) -> Result<(), Error> {
        let mut installed = false;
        self.table.call_once(|| {
            installed = true;
            table
        });

        if !installed {
            log::warn!("ecall table already installed");
            return Err(Error::BadState);
        }

        self.guard.arm();
        log::debug!("ecall runtime ready, {} ordinals", table.bound());
        Ok(())
    }

    /// The initialization guard
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Dispatch a single call
    ///
    /// The guard is consulted before the ordinal, so an uninitialized
    /// runtime fails every call with Status::NotInitialized.
    pub fn dispatch(&self, ordinal: u64, arg: u64) -> Result<u32, Status> {
        if let Err(status) = self.guard.check() {
            log::warn!("ecall {} before initialization", ordinal);
            return Err(status);
        }

        let table = match self.table.get() {
            Some(table) => table,
            None        => return Err(Status::NotInitialized),
        };

        let listener = match table.resolve(ordinal) {
            Ok(listener) => listener,
            Err(status)  => {
                log::debug!("ecall {} out of range", ordinal);
                return Err(status);
            }
        };

        log::trace!("ecall {} dispatched", ordinal);
        Ok(listener.on_ecall(arg))
    }

    /// Dispatch a call and encode the outcome as a raw status
    pub fn serve(&self, ordinal: u64, arg: u64) -> i64 {
        ecall::encode(self.dispatch(ordinal, arg))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge::ecall::INIT_MAGIC;

    fn zero(_arg: u64) -> u32 {
        0
    }

    fn double(arg: u64) -> u32 {
        (arg as u32).wrapping_mul(2)
    }

    fn marker(_arg: u64) -> u32 {
        7
    }

    static SINGLE: CallTable<'static> = CallTable::new([&zero]);
    static TRIPLE: CallTable<'static, 3> = CallTable::new([&zero, &double, &marker]);

    #[test]
    fn table_resolves_every_valid_ordinal() {
        assert_eq!(TRIPLE.len(), 3);
        assert_eq!(TRIPLE.resolve(0).unwrap().on_ecall(5), 0);
        assert_eq!(TRIPLE.resolve(1).unwrap().on_ecall(5), 10);
        assert_eq!(TRIPLE.resolve(2).unwrap().on_ecall(5), 7);
    }

    #[test]
    fn table_rejects_out_of_range() {
        assert_eq!(SINGLE.bound(), MAX_ECALLS);
        assert!(SINGLE.resolve(1).is_err());
        assert!(TRIPLE.resolve(3).is_err());
        assert!(TRIPLE.resolve(u64::MAX).is_err());
    }

    #[test]
    fn uninitialized_runtime_rejects_everything() {
        let runtime = Runtime::new();
        assert_eq!(runtime.dispatch(0, 0), Err(Status::NotInitialized));
        assert_eq!(runtime.dispatch(1, 0), Err(Status::NotInitialized));
        assert_eq!(runtime.serve(u64::MAX, 0), Status::NotInitialized.as_i64());
    }

    #[test]
    fn initialized_runtime_dispatches() {
        let runtime = Runtime::new();
        runtime.init(&TRIPLE).unwrap();
        assert!(runtime.guard().is_armed());
        assert_eq!(runtime.dispatch(1, 21), Ok(42));
        assert_eq!(runtime.dispatch(3, 21), Err(Status::OutOfRange));
        assert_eq!(runtime.serve(2, 0), 7);
        assert_eq!(runtime.serve(3, 0), Status::OutOfRange.as_i64());
    }

    #[test]
    fn table_cannot_be_replaced() {
        let runtime = Runtime::new();
        runtime.init(&SINGLE).unwrap();
        assert_eq!(runtime.init(&TRIPLE), Err(Error::BadState));
        // Still served by the first table
        assert_eq!(runtime.dispatch(1, 0), Err(Status::OutOfRange));
    }

    #[test]
    fn corrupted_sentinel_stops_dispatching() {
        let runtime = Runtime::new();
        runtime.init(&SINGLE).unwrap();
        runtime.guard().overwrite(!INIT_MAGIC);
        assert_eq!(runtime.dispatch(0, 0), Err(Status::NotInitialized));
    }

    #[test]
    fn closures_are_listeners() {
        let offset = 3u32;
        let add = move |arg: u64| arg as u32 + offset;
        let table: CallTable<'_, 1> = CallTable::new([&add]);
        assert_eq!(table.resolve(0).unwrap().on_ecall(4), 7);
    }
}
