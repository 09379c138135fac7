//! Entry primitives for crossing into the enclave
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

#[cfg(feature = "sim")]
use std::collections::HashSet;
#[cfg(feature = "sim")]
use std::panic::{self, AssertUnwindSafe};
#[cfg(feature = "sim")]
use std::sync::Mutex;
#[cfg(feature = "sim")]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::Fault;

/// A primitive that enters an enclave and returns once it exits
///
/// The call blocks the current thread for the whole time it executes inside
/// the enclave. There is no timeout: only an exit by the enclave or a
/// hardware fault ends the call.
pub trait Enter: Sync {

    /// Enter the enclave through 'tcs' and wait for the paired exit.
    ///
    /// # Inputs
    ///
    /// * 'tcs' is the address of the TCS used for the entry.
    /// * 'ordinal' is the already validated call ordinal.
    /// * 'arg' is the call argument.
    ///
    /// # Returns
    ///
    /// The raw status left by the enclave, or the reason the transition
    /// failed.
    ///
    /// # Safety
    ///
    /// 'tcs' must belong to a loaded enclave and must not be entered by
    /// any other thread during the call.

    unsafe fn enter(&self, tcs: usize, ordinal: u64, arg: u64) -> Result<i64, Fault>;
}

/// Hardware entry using ENCLU[EENTER]
#[cfg(all(feature = "hw", target_arch = "x86_64"))]
#[derive(Debug, Default, Copy, Clone)]
pub struct Enclu;

#[cfg(all(feature = "hw", target_arch = "x86_64"))]
impl Enter for Enclu {

    unsafe fn enter(&self, tcs: usize, ordinal: u64, arg: u64) -> Result<i64, Fault> {
        use std::arch::asm;
        use edge::ecall::{EENTER, EEXIT};

        let leaf: u64;
        let status: i64;

        // The asynchronous exit pointer is the ENCLU instruction itself: after
        // an interrupt the processor returns there with ERESUME in RAX and
        // continues the enclave. EEXIT returns to the instruction after ENCLU.
        asm!(
            "push rbx",
            "mov rbx, r11",
            "lea rcx, [rip + 2f]",
            "2:",
            "enclu",
            "pop rbx",
            inout("rax") EENTER => leaf,
            in("r10") ordinal,
            in("r11") tcs,
            in("rdi") arg,
            lateout("rdx") status,
            lateout("r12") _,
            lateout("r13") _,
            lateout("r14") _,
            lateout("r15") _,
            clobber_abi("C"),
        );

        if leaf != EEXIT {
            return Err(Fault::BadLeaf(leaf));
        }

        Ok(status)
    }
}

/// Entry function of a simulated enclave
#[cfg(feature = "sim")]
pub type Entry = dyn Fn(u64, u64) -> i64 + Send + Sync;

/// Simulated entry primitive
///
/// Runs the enclave's entry function in the calling thread instead of
/// transitioning into an enclave. The conditions under which the hardware
/// faults are checked and reported as the same faults:
///
/// * a TCS that was not given to the simulator: Fault::BadHandle
/// * a TCS that is already entered: Fault::Busy
/// * an enclave torn down with 'teardown': Fault::NotRunnable
///
/// A panic in the entry function aborts the call with Fault::Aborted and
/// leaves the simulated enclave unrunnable.
#[cfg(feature = "sim")]
pub struct Simulator {
    /// Enclave entry point
    entry:       Box<Entry>,
    /// TCS addresses of the simulated enclave
    tcs:         HashSet<usize>,
    /// TCS addresses currently entered
    busy:        Mutex<HashSet<usize>>,
    /// Cleared when the enclave is torn down
    runnable:    AtomicBool,
    /// Number of transitions into the enclave
    transitions: AtomicUsize,
}

#[cfg(feature = "sim")]
impl Simulator {

    /// Create a simulated enclave.
    ///
    /// # Inputs
    ///
    /// * 'entry' is called for every entry with the ordinal and the argument
    ///   and returns the raw status. Typically this is the 'serve' function of
    ///   the enclave's ecall runtime.
    /// * 'tcs' lists the TCS addresses of the enclave.

    pub fn new<F>(entry: F, tcs: &[usize]) -> Self
    where
        F: Fn(u64, u64) -> i64 + Send + Sync + 'static,
    {
        Self{entry:       Box::new(entry),
             tcs:         tcs.iter().copied().collect(),
             busy:        Mutex::new(HashSet::new()),
             runnable:    AtomicBool::new(true),
             transitions: AtomicUsize::new(0)}
    }

    /// Make the enclave unrunnable. All further entries fail.
    pub fn teardown(&self) {
        self.runnable.store(false, Ordering::SeqCst);
    }

    /// 'true' until the enclave is torn down
    pub fn is_runnable(&self) -> bool {
        self.runnable.load(Ordering::SeqCst)
    }

    /// Number of entries that transitioned into the enclave
    pub fn transitions(&self) -> usize {
        self.transitions.load(Ordering::SeqCst)
    }

    fn acquire(&self, tcs: usize) -> Result<Entered<'_>, Fault> {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(tcs) {
            return Err(Fault::Busy);
        }

        Ok(Entered{sim: self, tcs: tcs})
    }
}

#[cfg(feature = "sim")]
impl Enter for Simulator {

    unsafe fn enter(&self, tcs: usize, ordinal: u64, arg: u64) -> Result<i64, Fault> {
        if !self.is_runnable() {
            return Err(Fault::NotRunnable);
        }

        if !self.tcs.contains(&tcs) {
            return Err(Fault::BadHandle);
        }

        let _entered = self.acquire(tcs)?;
        self.transitions.fetch_add(1, Ordering::SeqCst);

        match panic::catch_unwind(AssertUnwindSafe(|| (self.entry)(ordinal, arg))) {
            Ok(status) => Ok(status),
            Err(_)     => {
                self.teardown();
                Err(Fault::Aborted)
            }
        }
    }
}

// Marks a TCS entered until dropped
#[cfg(feature = "sim")]
struct Entered<'a> {
    sim: &'a Simulator,
    tcs: usize,
}

#[cfg(feature = "sim")]
impl Drop for Entered<'_> {
    fn drop(&mut self) {
        let mut busy = self.sim.busy.lock().unwrap_or_else(|e| e.into_inner());
        busy.remove(&self.tcs);
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;

    use std::sync::{Arc, Barrier};
    use std::thread;

    const TCS: usize = 0x1000;

    #[test]
    fn simulated_entry_calls_entry_function() {
        let sim = Simulator::new(|ordinal, arg| (ordinal * 100 + arg) as i64, &[TCS]);
        assert_eq!(unsafe { sim.enter(TCS, 1, 2) }, Ok(102));
        assert_eq!(sim.transitions(), 1);
    }

    #[test]
    fn unknown_tcs_is_a_bad_handle() {
        let sim = Simulator::new(|_, _| 0, &[TCS]);
        assert_eq!(unsafe { sim.enter(0x2000, 0, 0) }, Err(Fault::BadHandle));
        assert_eq!(sim.transitions(), 0);
    }

    #[test]
    fn torn_down_enclave_is_not_runnable() {
        let sim = Simulator::new(|_, _| 0, &[TCS]);
        sim.teardown();
        assert!(!sim.is_runnable());
        assert_eq!(unsafe { sim.enter(TCS, 0, 0) }, Err(Fault::NotRunnable));
        assert_eq!(sim.transitions(), 0);
    }

    #[test]
    fn panic_aborts_and_tears_down() {
        let sim = Simulator::new(|_, _| panic!("enclave bug"), &[TCS]);
        assert_eq!(unsafe { sim.enter(TCS, 0, 0) }, Err(Fault::Aborted));
        assert!(!sim.is_runnable());
        assert_eq!(unsafe { sim.enter(TCS, 0, 0) }, Err(Fault::NotRunnable));
    }

    #[test]
    fn concurrent_entry_on_same_tcs_is_busy() {
        let inside = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let (i, r) = (inside.clone(), release.clone());
        let sim = Arc::new(Simulator::new(move |_, _| {
            i.wait();
            r.wait();
            1
        }, &[TCS]));

        let worker = {
            let sim = sim.clone();
            thread::spawn(move || unsafe { sim.enter(TCS, 0, 0) })
        };

        inside.wait();
        assert_eq!(unsafe { sim.enter(TCS, 0, 0) }, Err(Fault::Busy));
        release.wait();

        assert_eq!(worker.join().unwrap(), Ok(1));
        assert_eq!(sim.transitions(), 1);
        assert!(sim.busy.lock().unwrap().is_empty());
    }
}
